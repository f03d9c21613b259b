// Shared token parsers for option expressions

use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag, take_while1},
    character::complete::{char, multispace0},
    combinator::{map, value},
    sequence::delimited,
    IResult,
};

/// Wrap a parser to skip surrounding whitespace
pub fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

/// Column or option name: letters, digits, `_`, `-` and `.`
pub fn identifier(input: &str) -> IResult<&str, String> {
    map(
        take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '-' || c == '.'),
        |s: &str| s.to_string(),
    )(input)
}

/// Double-quoted string with `\"` and `\\` escapes
pub fn string_literal(input: &str) -> IResult<&str, String> {
    alt((
        // escaped_transform rejects empty input, so "" is matched separately
        value(String::new(), tag("\"\"")),
        delimited(
            char('"'),
            escaped_transform(
                is_not("\\\""),
                '\\',
                alt((value("\\", tag("\\")), value("\"", tag("\"")))),
            ),
            char('"'),
        ),
    ))(input)
}

/// Unquoted value: everything up to a separator or bracket, trimmed
pub fn bare_word(input: &str) -> IResult<&str, String> {
    map(is_not(",[]\""), |s: &str| s.trim().to_string())(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier() {
        assert_eq!(identifier("degree_bins=1"), Ok(("=1", "degree_bins".to_string())));
        assert!(identifier("=x").is_err());
    }

    #[test]
    fn test_string_literal_escapes() {
        let (rest, s) = string_literal(r#""say \"hi\"" tail"#).unwrap();
        assert_eq!(s, "say \"hi\"");
        assert_eq!(rest, " tail");
        assert_eq!(string_literal("\"\"").unwrap().1, "");
    }

    #[test]
    fn test_bare_word_stops_at_separator() {
        assert_eq!(bare_word(" Sat , Sun"), Ok((", Sun", "Sat".to_string())));
    }

    #[test]
    fn test_ws() {
        let mut parser = ws(identifier);
        assert_eq!(parser("  season  ="), Ok(("=", "season".to_string())));
    }
}
