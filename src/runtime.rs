// Top-level pipeline: table + options -> figure -> encoded output

use anyhow::Context;
use tracing::{debug, warn};

use crate::compiler;
use crate::csv_reader;
use crate::data::Table;
use crate::error::Result;
use crate::graph;
use crate::ir::Figure;
use crate::options::ClockOptions;
use crate::resolve;
use crate::transform::{self, GroupedData, Grouping};
use crate::OutputFormat;

/// Filter, group and aggregate `table` according to `options`.
///
/// Time features are always derived here using `options.bins_per_day`.
pub fn clock_data(
    table: &Table,
    datetime_col: &str,
    value_col: &str,
    options: &ClockOptions,
) -> Result<GroupedData> {
    transform::filter_and_group(
        table,
        datetime_col,
        value_col,
        &options.filters,
        options.aggregate.as_ref(),
        &Grouping::from_options(options),
        Some(options.bins_per_day),
    )
}

/// Build a clock plot of `value_col` against the time of day in `datetime_col`.
///
/// With `options.show` set the figure is also rendered to a temporary PNG. A
/// failure there is logged and the figure is still returned.
pub fn clock_plot(
    table: &Table,
    datetime_col: &str,
    value_col: &str,
    options: &ClockOptions,
) -> Result<Figure> {
    let spec = resolve::resolve_options(options)?;
    let data = clock_data(table, datetime_col, value_col, options)?;
    debug!(
        input_rows = table.len(),
        filtered_rows = data.filtered.len(),
        grouped_rows = data.grouped.len(),
        "clock plot data ready"
    );

    let figure = compiler::assemble(&data, &spec)?;
    debug!(traces = ?figure.trace_names(), "clock plot assembled");

    if options.show {
        if let Err(e) = figure.show() {
            warn!("Failed to display figure: {}", e);
        }
    }

    Ok(figure)
}

/// Encode a figure in the requested output format
pub fn render_figure(figure: &Figure, format: OutputFormat) -> anyhow::Result<Vec<u8>> {
    match format {
        OutputFormat::Png => graph::render_png(figure).context("Failed to render PNG"),
        OutputFormat::Svg => graph::render_svg(figure)
            .map(String::into_bytes)
            .context("Failed to render SVG"),
        OutputFormat::Json => Ok(figure.to_json()?.into_bytes()),
        OutputFormat::Csv => anyhow::bail!("CSV output is produced from grouped data, not a figure"),
    }
}

/// Grouped table as CSV bytes
pub fn render_grouped_csv(data: &GroupedData) -> anyhow::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    csv_reader::write_csv(&data.grouped.to_table(), &mut bytes)
        .context("Failed to write grouped data as CSV")?;
    Ok(bytes)
}
