//! Error and warning types for clock plot generation

use thiserror::Error;

/// Result type alias for clockplot operations
pub type Result<T> = std::result::Result<T, ClockError>;

/// Fatal errors raised while building a clock plot
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClockError {
    /// A timestamp cell could not be interpreted as a date/time
    #[error("Failed to parse '{value}' as a datetime in column '{column}' at row {row}")]
    Parse {
        column: String,
        row: usize,
        value: String,
    },

    /// Columns needed for filtering, grouping or aggregation are absent
    #[error("The following columns are missing from the supplied dataset: {columns:?}")]
    MissingColumns { columns: Vec<String> },

    /// Filters removed every row
    #[error("Filtering data leaves 0 rows remaining. Check the filters that have been specified")]
    EmptyResult,

    /// A cell of the value column is not numeric
    #[error("Failed to parse '{value}' as number in column '{column}' at row {row}")]
    InvalidValue {
        column: String,
        row: usize,
        value: String,
    },

    /// The aggregation function name is not recognised
    #[error("Unknown aggregation function '{0}'")]
    UnknownAggregation(String),

    /// An option value is out of range or malformed
    #[error("Invalid option: {message}")]
    InvalidOption { message: String },

    /// The drawing backend failed
    #[error("Render error: {message}")]
    Render { message: String },
}

impl ClockError {
    pub fn invalid_option(message: impl Into<String>) -> Self {
        Self::InvalidOption {
            message: message.into(),
        }
    }

    pub fn render(message: impl Into<String>) -> Self {
        Self::Render {
            message: message.into(),
        }
    }
}

/// Non-fatal advisories produced while building a plot
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub enum ClockWarning {
    /// Aggregated values below zero, which read poorly on a radial axis
    NegativeValues { column: String },
}

impl std::fmt::Display for ClockWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClockWarning::NegativeValues { column } => write!(
                f,
                "Column '{}' contains negative values. A plot will be produced but they are often difficult to interpret",
                column
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_lists_every_column() {
        let err = ClockError::MissingColumns {
            columns: vec!["colour".to_string(), "dayofwek".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("colour"));
        assert!(msg.contains("dayofwek"));
    }

    #[test]
    fn test_empty_result_message() {
        assert!(ClockError::EmptyResult.to_string().contains("0 rows remaining"));
    }

    #[test]
    fn test_negative_warning_display() {
        let w = ClockWarning::NegativeValues { column: "temp".to_string() };
        assert!(w.to_string().contains("difficult to interpret"));
    }
}
