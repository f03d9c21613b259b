// Parsers for option expressions given on the command line

pub mod aggregate;
pub mod filter;
pub mod lexer;
pub mod style;

use nom::{combinator::all_consuming, IResult};

use crate::aggregation::Aggregation;
use crate::error::{ClockError, Result};
use crate::options::{AggregateSpec, FilterValue};

/// Run `parser` over the whole input
fn parse_complete<'a, O, F>(input: &'a str, parser: F, what: &str) -> Result<O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    match all_consuming(parser)(input) {
        Ok((_, output)) => Ok(output),
        Err(e) => Err(ClockError::invalid_option(format!(
            "Invalid {} expression '{}': {}",
            what, input, e
        ))),
    }
}

/// Parse `column=value` or `column=[a, b]`
pub fn parse_filter(input: &str) -> Result<(String, FilterValue)> {
    parse_complete(input, filter::filter_expr, "filter")
}

/// Parse `column:function` or `function`
pub fn parse_aggregate(input: &str) -> Result<AggregateSpec> {
    let (column, function) = parse_complete(input, aggregate::aggregate_expr, "aggregate")?;
    Ok(AggregateSpec {
        column,
        function: function.parse::<Aggregation>()?,
    })
}

/// Parse `key=value` for the style passthrough
pub fn parse_style(input: &str) -> Result<(String, serde_json::Value)> {
    parse_complete(input, style::style_expr, "style")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filter() {
        let (col, value) = parse_filter("weekend=Weekend").unwrap();
        assert_eq!(col, "weekend");
        assert_eq!(value, FilterValue::from("Weekend"));
    }

    #[test]
    fn test_parse_filter_trailing_input() {
        assert!(matches!(
            parse_filter("dayofweek=[Sat, Sun"),
            Err(ClockError::InvalidOption { .. })
        ));
    }

    #[test]
    fn test_parse_aggregate() {
        let spec = parse_aggregate("season:median").unwrap();
        assert_eq!(spec, AggregateSpec::new(Some("season"), Aggregation::Median));

        let spec = parse_aggregate("mean").unwrap();
        assert_eq!(spec, AggregateSpec::default());
    }

    #[test]
    fn test_parse_aggregate_unknown_function() {
        assert_eq!(
            parse_aggregate("season:mode"),
            Err(ClockError::UnknownAggregation("mode".to_string()))
        );
    }

    #[test]
    fn test_parse_style() {
        let (key, value) = parse_style("paper_bgcolor=\"#eeeeee\"").unwrap();
        assert_eq!(key, "paper_bgcolor");
        assert_eq!(value, serde_json::json!("#eeeeee"));
    }
}
