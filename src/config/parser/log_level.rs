use super::*;

impl NomParser for Level {
    fn parse(input: &str) -> IResult<&str, Self> {
        map_res(alpha1, |s: &str| match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" | "notice" => Ok(Level::INFO),
            "warn" | "warning" => Ok(Level::WARN),
            "error" | "fatal" => Ok(Level::ERROR),
            _ => Err(()),
        })(input)
    }
}
