use super::*;
use crate::zones::normalize_zone;

/// A zone name, normalised to a lower-case FQDN.
impl NomParser for Name {
    fn parse(input: &str) -> IResult<&str, Self> {
        map_res(is_not(" \t\r\n{}#"), normalize_zone)(input)
    }
}
