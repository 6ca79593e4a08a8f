use nom::{
    branch::*, bytes::complete::*, character::complete::*, combinator::*, multi::*, sequence::*,
    IResult,
};

mod base_url;
mod bind_addr;
mod duration;
mod log_level;
mod path;
mod tls;
mod zone;

use super::*;

pub trait NomParser: Sized {
    fn parse(input: &str) -> IResult<&str, Self>;
}

impl NomParser for String {
    fn parse(input: &str) -> IResult<&str, Self> {
        map(is_not(" \t\r\n#"), ToString::to_string)(input)
    }
}

/// one line config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OneConfig {
    Bind(SocketAddr),
    LogLevel(Level),
    LogFilter(String),
    /// `netbox [ZONES...] {`, `closed` when the `}` is on the same line.
    Netbox { zones: Vec<Name>, closed: bool },
    BlockEnd,
    Url(Url),
    Token(String),
    Ttl(Duration),
    Timeout(Duration),
    Fallthrough(Vec<Name>),
    Tls(TlsConfig),
}

impl OneConfig {
    /// Whether the directive belongs inside the `netbox` block.
    pub fn is_block_item(&self) -> bool {
        matches!(
            self,
            OneConfig::Url(_)
                | OneConfig::Token(_)
                | OneConfig::Ttl(_)
                | OneConfig::Timeout(_)
                | OneConfig::Fallthrough(_)
                | OneConfig::Tls(_)
        )
    }
}

fn parse_item<'a, T: NomParser>(
    keyword: &'static str,
) -> impl FnMut(&'a str) -> IResult<&'a str, T> {
    preceded(tuple((space0, tag_no_case(keyword), space1)), T::parse)
}

fn names(input: &str) -> IResult<&str, Vec<Name>> {
    many0(preceded(space1, <Name as NomParser>::parse))(input)
}

fn netbox(input: &str) -> IResult<&str, OneConfig> {
    map(
        tuple((
            space0,
            tag_no_case("netbox"),
            names,
            space0,
            char('{'),
            space0,
            opt(char('}')),
        )),
        |(_, _, zones, _, _, _, end)| OneConfig::Netbox {
            zones,
            closed: end.is_some(),
        },
    )(input)
}

fn fallthrough(input: &str) -> IResult<&str, OneConfig> {
    map(
        preceded(tuple((space0, tag_no_case("fallthrough"))), names),
        |zones| {
            if zones.is_empty() {
                OneConfig::Fallthrough(vec![Name::root()])
            } else {
                OneConfig::Fallthrough(zones)
            }
        },
    )(input)
}

pub fn parse_config(input: &str) -> IResult<&str, OneConfig> {
    let comment = opt(preceded(char('#'), not_line_ending));

    let top = alt((
        map(parse_item("bind"), OneConfig::Bind),
        map(parse_item("log-level"), OneConfig::LogLevel),
        map(parse_item("log-filter"), OneConfig::LogFilter),
        netbox,
        value(OneConfig::BlockEnd, preceded(space0, char('}'))),
    ));

    let block = alt((
        map(parse_item("url"), OneConfig::Url),
        map(parse_item("token"), OneConfig::Token),
        map(parse_item("ttl"), OneConfig::Ttl),
        map(parse_item("timeout"), OneConfig::Timeout),
        fallthrough,
        map(TlsConfig::parse, OneConfig::Tls),
    ));

    terminated(alt((top, block)), pair(space0, comment))(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone(s: &str) -> Name {
        crate::zones::normalize_zone(s).unwrap()
    }

    #[test]
    fn test_netbox_block() {
        assert_eq!(
            parse_config("netbox {").unwrap(),
            (
                "",
                OneConfig::Netbox {
                    zones: vec![],
                    closed: false
                }
            )
        );
        assert_eq!(
            parse_config("netbox example.org Example.NET {").unwrap(),
            (
                "",
                OneConfig::Netbox {
                    zones: vec![zone("example.org"), zone("example.net")],
                    closed: false
                }
            )
        );
        assert_eq!(
            parse_config("netbox example.org {}").unwrap(),
            (
                "",
                OneConfig::Netbox {
                    zones: vec![zone("example.org")],
                    closed: true
                }
            )
        );
        assert_eq!(parse_config("  }").unwrap(), ("", OneConfig::BlockEnd));
    }

    #[test]
    fn test_block_items() {
        assert_eq!(
            parse_config("    url https://netbox.example.org/").unwrap(),
            (
                "",
                OneConfig::Url("https://netbox.example.org/".parse().unwrap())
            )
        );
        assert_eq!(
            parse_config("\ttoken foobar # secret").unwrap(),
            ("", OneConfig::Token("foobar".to_string()))
        );
        assert_eq!(
            parse_config("ttl 1800s").unwrap(),
            ("", OneConfig::Ttl(Duration::from_secs(1800)))
        );
        assert_eq!(
            parse_config("timeout 2s").unwrap(),
            ("", OneConfig::Timeout(Duration::from_secs(2)))
        );
    }

    #[test]
    fn test_fallthrough() {
        assert_eq!(
            parse_config("fallthrough").unwrap(),
            ("", OneConfig::Fallthrough(vec![Name::root()]))
        );
        assert_eq!(
            parse_config("fallthrough example.org example.net").unwrap(),
            (
                "",
                OneConfig::Fallthrough(vec![zone("example.org"), zone("example.net")])
            )
        );
    }

    #[test]
    fn test_top_level_items() {
        assert_eq!(
            parse_config("bind 127.0.0.1:5353").unwrap(),
            ("", OneConfig::Bind("127.0.0.1:5353".parse().unwrap()))
        );
        assert_eq!(
            parse_config("log-level debug").unwrap(),
            ("", OneConfig::LogLevel(Level::DEBUG))
        );
        assert_eq!(
            parse_config("log-filter netbox_dns=trace,reqwest=debug").unwrap(),
            (
                "",
                OneConfig::LogFilter("netbox_dns=trace,reqwest=debug".to_string())
            )
        );
    }

    #[test]
    fn test_invalid() {
        assert!(parse_config("ttl INVALID").is_err());
        assert!(parse_config("timeout INVALID").is_err());
        assert!(parse_config("url example.org").is_err());
        assert!(parse_config("localCacheDuration 10s").is_err());
    }

    #[test]
    fn test_unknown_suffix_is_left_over() {
        let (rest, _) = parse_config("ttl 10s extra").unwrap();
        assert_eq!(rest, "extra");
    }

    #[test]
    fn test_block_item_classification() {
        assert!(OneConfig::Token("t".to_string()).is_block_item());
        assert!(!OneConfig::LogLevel(Level::INFO).is_block_item());
        assert!(!OneConfig::BlockEnd.is_block_item());
    }
}
