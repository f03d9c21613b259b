// Library exports for clockplot

pub mod aggregation;
pub mod csv_reader;
pub mod data;
pub mod error;
pub mod features;
pub mod graph;
pub mod labels;
pub mod logging;
pub mod options;
pub mod palette;
pub mod parser;
pub mod runtime;

// Pipeline stages
pub mod compiler;
pub mod interpolate;
pub mod ir;
pub mod resolve;
pub mod scale;
pub mod transform;

pub use aggregation::Aggregation;
pub use data::Table;
pub use error::{ClockError, ClockWarning, Result};
pub use ir::Figure;
pub use options::{AggregateSpec, ClockOptions, FilterValue, LineShape, PlotMode, Thresholds};
pub use runtime::{clock_data, clock_plot, render_figure};

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[serde(rename = "png")]
    #[default]
    Png,
    #[serde(rename = "svg")]
    Svg,
    /// Figure as JSON
    #[serde(rename = "json")]
    Json,
    /// Grouped data as CSV
    #[serde(rename = "csv")]
    Csv,
}
