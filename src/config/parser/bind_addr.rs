use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;

use super::*;

/// `IP:PORT`, `[IPv6]:PORT`, or `:PORT` for all IPv4 interfaces.
impl NomParser for SocketAddr {
    fn parse(input: &str) -> IResult<&str, Self> {
        let any = map(preceded(char(':'), u16), |port| {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, port))
        });
        let addr = map_res(is_not(" \t\r\n#"), SocketAddr::from_str);
        alt((any, addr))(input)
    }
}
