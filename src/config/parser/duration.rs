use super::*;

/// Go-style durations: `300ms`, `1800s`, `1h30m`, `1.5h` or a bare `0`.
impl NomParser for Duration {
    fn parse(input: &str) -> IResult<&str, Self> {
        let number = map_res(
            recognize(pair(digit1, opt(pair(char('.'), digit1)))),
            |s: &str| s.parse::<f64>(),
        );

        let unit = alt((
            value(1f64, tag("ns")),
            value(1e3, alt((tag("us"), tag("µs")))),
            value(1e6, tag("ms")),
            value(1e9, tag("s")),
            value(60e9, tag("m")),
            value(3600e9, tag("h")),
        ));

        let parts = fold_many1(
            pair(number, unit),
            || 0f64,
            |nanos, (n, unit)| nanos + n * unit,
        );

        alt((
            map(parts, |nanos| Duration::from_nanos(nanos.round() as u64)),
            value(Duration::ZERO, terminated(char('0'), not(digit1))),
        ))(input)
    }
}
