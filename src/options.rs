//! Strongly typed options for a clock plot.
//!
//! Every field has a default, so options can be deserialized from a partial
//! JSON document (`#[serde(default)]`) or built in code with
//! `ClockOptions { color: Some("season".into()), ..Default::default() }`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::aggregation::Aggregation;
use crate::data::format_number;

/// A filter value: a scalar keeps rows equal to it, a list keeps rows equal
/// to any of its elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<FilterValue>),
}

impl FilterValue {
    pub fn is_list(&self) -> bool {
        matches!(self, FilterValue::List(_))
    }

    /// Whether the cell passes this filter
    pub fn matches(&self, cell: &str) -> bool {
        match self {
            FilterValue::Bool(b) => cell.trim().eq_ignore_ascii_case(&b.to_string()),
            FilterValue::Number(n) => cell.trim().parse::<f64>().map(|v| v == *n).unwrap_or(false),
            FilterValue::Text(s) => cell == s,
            FilterValue::List(items) => items.iter().any(|item| item.matches(cell)),
        }
    }
}

/// Title text for a filter value; booleans read `True` / `False`
impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Bool(true) => write!(f, "True"),
            FilterValue::Bool(false) => write!(f, "False"),
            FilterValue::Number(n) => write!(f, "{}", format_number(*n)),
            FilterValue::Text(s) => write!(f, "{}", s),
            FilterValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        FilterValue::Text(s.to_string())
    }
}

impl From<f64> for FilterValue {
    fn from(n: f64) -> Self {
        FilterValue::Number(n)
    }
}

impl<T: Into<FilterValue>> From<Vec<T>> for FilterValue {
    fn from(items: Vec<T>) -> Self {
        FilterValue::List(items.into_iter().map(Into::into).collect())
    }
}

/// Single `column -> function` mapping driving the overlay average line.
/// `column: None` means no additional segmentation: one overall line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateSpec {
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default)]
    pub function: Aggregation,
}

impl AggregateSpec {
    pub fn new(column: Option<&str>, function: Aggregation) -> Self {
        Self {
            column: column.map(str::to_string),
            function,
        }
    }
}

impl Default for AggregateSpec {
    fn default() -> Self {
        Self {
            column: None,
            function: Aggregation::Mean,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LineShape {
    Linear,
    #[default]
    Spline,
}

impl fmt::Display for LineShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineShape::Linear => write!(f, "linear"),
            LineShape::Spline => write!(f, "spline"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlotMode {
    #[default]
    Polar,
    #[serde(alias = "line", alias = "flat")]
    Cartesian,
}

impl PlotMode {
    /// Size used when the caller specifies neither width nor height
    pub fn default_size(&self) -> (u32, u32) {
        match self {
            PlotMode::Polar => (800, 800),
            PlotMode::Cartesian => (800, 600),
        }
    }
}

/// Group-count thresholds that drive interpolation and line weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Fewest angular samples a group needs to be spline interpolated
    pub min_interpolation_samples: usize,
    /// Above this many groups, spline shapes are pre-interpolated and drawn linear
    pub spline_group_limit: usize,
    /// Above this many groups, lines are drawn thin and translucent
    pub thin_line_groups: usize,
    /// At or below this many groups, lines are drawn bold
    pub bold_line_groups: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_interpolation_samples: 8,
            spline_group_limit: 20,
            thin_line_groups: 12,
            bold_line_groups: 8,
        }
    }
}

/// Options recognised by [`crate::runtime::clock_plot`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockOptions {
    /// Column -> value(s) to keep, applied in insertion order
    pub filters: IndexMap<String, FilterValue>,
    /// Reduction used for grouping; `Some` also draws the overlay average line
    pub aggregate: Option<AggregateSpec>,
    pub line_group: Option<String>,
    pub color: Option<String>,
    pub line_dash: Option<String>,
    pub line_shape: LineShape,
    pub title_start: String,
    pub title: Option<String>,
    pub bins_per_day: u32,
    pub show: bool,
    pub color_discrete_sequence: Option<Vec<String>>,
    pub category_orders: HashMap<String, Vec<String>>,
    pub text_noon: bool,
    pub mode: PlotMode,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Forwarded verbatim to the figure layout
    pub style: IndexMap<String, serde_json::Value>,
    pub thresholds: Thresholds,
}

impl Default for ClockOptions {
    fn default() -> Self {
        Self {
            filters: IndexMap::new(),
            aggregate: None,
            line_group: None,
            color: None,
            line_dash: None,
            line_shape: LineShape::Spline,
            title_start: String::new(),
            title: None,
            bins_per_day: 24,
            show: false,
            color_discrete_sequence: None,
            category_orders: HashMap::new(),
            text_noon: true,
            mode: PlotMode::Polar,
            width: None,
            height: None,
            style: IndexMap::new(),
            thresholds: Thresholds::default(),
        }
    }
}
