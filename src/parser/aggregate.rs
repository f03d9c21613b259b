// Aggregate expressions: column:function or a bare function name

use super::lexer::{identifier, ws};
use nom::{
    branch::alt,
    character::complete::char,
    combinator::map,
    sequence::separated_pair,
    IResult,
};

/// Parse `season:mean` into `(Some("season"), "mean")`, or `mean` into `(None, "mean")`
pub fn aggregate_expr(input: &str) -> IResult<&str, (Option<String>, String)> {
    alt((
        map(
            separated_pair(ws(identifier), char(':'), ws(identifier)),
            |(column, function)| (Some(column), function),
        ),
        map(ws(identifier), |function| (None, function)),
    ))(input)
}
