use super::*;

/// `tls`, `tls CA`, `tls CERT KEY` or `tls CERT KEY CA`.
impl NomParser for TlsConfig {
    fn parse(input: &str) -> IResult<&str, Self> {
        let files = many_m_n(0, 3, preceded(space1, PathBuf::parse));
        map(
            preceded(tuple((space0, tag_no_case("tls"))), files),
            |files| {
                let mut files = files.into_iter();
                match (files.next(), files.next(), files.next()) {
                    (Some(ca), None, _) => TlsConfig {
                        ca: Some(ca),
                        ..Default::default()
                    },
                    (cert, key, ca) => TlsConfig { cert, key, ca },
                }
            },
        )(input)
    }
}
