use super::*;

impl NomParser for PathBuf {
    fn parse(input: &str) -> IResult<&str, Self> {
        let quoted = delimited(char('"'), is_not("\""), char('"'));
        let bare = is_not(" \t\r\n#");
        map(alt((quoted, bare)), Into::into)(input)
    }
}
