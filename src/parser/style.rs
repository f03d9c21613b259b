// Style passthrough expressions: key=value

use super::lexer::{identifier, ws};
use nom::{
    character::complete::char,
    combinator::{map, rest},
    sequence::separated_pair,
    IResult,
};
use serde_json::Value;

/// Parse `key=value`. The value is read as JSON when it parses, otherwise
/// it is kept as a plain string.
pub fn style_expr(input: &str) -> IResult<&str, (String, Value)> {
    map(
        separated_pair(ws(identifier), char('='), rest),
        |(key, raw): (String, &str)| {
            let raw = raw.trim();
            let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
            (key, value)
        },
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_values() {
        assert_eq!(style_expr("opacity=0.5").unwrap().1, ("opacity".to_string(), json!(0.5)));
        assert_eq!(
            style_expr(r#"font={"size": 14}"#).unwrap().1,
            ("font".to_string(), json!({"size": 14}))
        );
    }

    #[test]
    fn test_plain_string_value() {
        assert_eq!(
            style_expr("template= plotly_white").unwrap().1,
            ("template".to_string(), json!("plotly_white"))
        );
    }

    #[test]
    fn test_missing_equals_fails() {
        assert!(style_expr("template").is_err());
    }
}
