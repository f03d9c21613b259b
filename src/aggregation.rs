//! Reductions applied to the value column of each group.
//!
//! Missing cells (`None`) are skipped by every function except `size`, which
//! counts rows regardless of content.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ClockError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Aggregation {
    #[default]
    Mean,
    Sum,
    Count,
    Size,
    Min,
    Max,
    Median,
    Std,
    Var,
    First,
    Last,
    Nunique,
    Prod,
}

impl Aggregation {
    pub fn name(&self) -> &'static str {
        match self {
            Aggregation::Mean => "mean",
            Aggregation::Sum => "sum",
            Aggregation::Count => "count",
            Aggregation::Size => "size",
            Aggregation::Min => "min",
            Aggregation::Max => "max",
            Aggregation::Median => "median",
            Aggregation::Std => "std",
            Aggregation::Var => "var",
            Aggregation::First => "first",
            Aggregation::Last => "last",
            Aggregation::Nunique => "nunique",
            Aggregation::Prod => "prod",
        }
    }

    /// Reduce a group's values. Returns NaN where the reduction is undefined
    /// (e.g. the mean of an all-missing group).
    pub fn apply(&self, values: &[Option<f64>]) -> f64 {
        let present: Vec<f64> = values.iter().flatten().copied().collect();
        let n = present.len() as f64;

        match self {
            Aggregation::Size => values.len() as f64,
            Aggregation::Count => n,
            Aggregation::Sum => present.iter().sum(),
            Aggregation::Prod => present.iter().product(),
            Aggregation::Mean => {
                if present.is_empty() {
                    f64::NAN
                } else {
                    present.iter().sum::<f64>() / n
                }
            }
            Aggregation::Min => present.iter().copied().fold(f64::NAN, f64::min),
            Aggregation::Max => present.iter().copied().fold(f64::NAN, f64::max),
            Aggregation::Median => median(&present),
            Aggregation::Var => sample_variance(&present),
            Aggregation::Std => sample_variance(&present).sqrt(),
            Aggregation::First => present.first().copied().unwrap_or(f64::NAN),
            Aggregation::Last => present.last().copied().unwrap_or(f64::NAN),
            Aggregation::Nunique => {
                let mut sorted = present.clone();
                sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                sorted.dedup();
                sorted.len() as f64
            }
        }
    }
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

// ddof = 1
fn sample_variance(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if n < 2.0 {
        return f64::NAN;
    }
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0)
}

impl FromStr for Aggregation {
    type Err = ClockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mean" | "average" | "avg" => Ok(Aggregation::Mean),
            "sum" => Ok(Aggregation::Sum),
            "count" => Ok(Aggregation::Count),
            "size" => Ok(Aggregation::Size),
            "min" => Ok(Aggregation::Min),
            "max" => Ok(Aggregation::Max),
            "median" => Ok(Aggregation::Median),
            "std" => Ok(Aggregation::Std),
            "var" => Ok(Aggregation::Var),
            "first" => Ok(Aggregation::First),
            "last" => Ok(Aggregation::Last),
            "nunique" => Ok(Aggregation::Nunique),
            "prod" => Ok(Aggregation::Prod),
            _ => Err(ClockError::UnknownAggregation(s.to_string())),
        }
    }
}

impl TryFrom<String> for Aggregation {
    type Error = ClockError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Aggregation> for String {
    fn from(value: Aggregation) -> Self {
        value.name().to_string()
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
