// Filter expressions: column=value or column=[value, ...]

use super::lexer::{bare_word, identifier, string_literal, ws};
use crate::options::FilterValue;
use nom::{
    branch::alt,
    character::complete::char,
    combinator::map,
    multi::separated_list0,
    sequence::{delimited, preceded, tuple},
    IResult,
};

/// Parse `column=value`. Values are quoted strings, numbers, booleans, bare
/// words or bracketed (possibly nested) lists of values.
pub fn filter_expr(input: &str) -> IResult<&str, (String, FilterValue)> {
    tuple((ws(identifier), preceded(char('='), filter_value)))(input)
}

pub fn filter_value(input: &str) -> IResult<&str, FilterValue> {
    ws(alt((
        list,
        map(string_literal, FilterValue::Text),
        map(bare_word, |word| scalar_from_word(&word)),
    )))(input)
}

fn list(input: &str) -> IResult<&str, FilterValue> {
    map(
        delimited(
            char('['),
            separated_list0(char(','), filter_value),
            ws(char(']')),
        ),
        FilterValue::List,
    )(input)
}

fn scalar_from_word(word: &str) -> FilterValue {
    match word {
        "true" => FilterValue::Bool(true),
        "false" => FilterValue::Bool(false),
        _ => match word.parse::<f64>() {
            Ok(n) if n.is_finite() => FilterValue::Number(n),
            _ => FilterValue::Text(word.to_string()),
        },
    }
}
