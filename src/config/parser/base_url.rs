use super::*;

/// Absolute `http` or `https` URLs only.
impl NomParser for Url {
    fn parse(input: &str) -> IResult<&str, Self> {
        verify(
            map_res(is_not(" \t\r\n#"), Url::parse),
            |url: &Url| matches!(url.scheme(), "http" | "https") && url.has_host(),
        )(input)
    }
}
