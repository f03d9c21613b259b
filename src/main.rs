use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use clockplot::{
    csv_reader, logging, parser, runtime, ClockOptions, LineShape, OutputFormat, PlotMode, Table,
};

#[derive(Parser, Debug)]
#[command(name = "clockplot")]
#[command(about = "Plot time-of-day patterns from CSV data on a 24 hour clock face", long_about = None)]
struct Args {
    /// Column holding the timestamps
    #[arg(long)]
    datetime: Option<String>,

    /// Column holding the values to plot
    #[arg(long)]
    value: Option<String>,

    /// Keep rows where COLUMN matches, e.g. 'dayofweek=[Sat, Sun]' (repeatable)
    #[arg(long = "filter", value_name = "COLUMN=VALUE")]
    filters: Vec<String>,

    /// Aggregation as 'column:function' or 'function'; also draws an average overlay
    #[arg(long, value_name = "[COLUMN:]FUNCTION")]
    aggregate: Option<String>,

    /// Column whose values get separate colors
    #[arg(long)]
    color: Option<String>,

    /// Column whose values are drawn as separate lines
    #[arg(long)]
    line_group: Option<String>,

    /// Column whose values get separate dash patterns
    #[arg(long)]
    line_dash: Option<String>,

    #[arg(long, value_parser = ["linear", "spline"])]
    line_shape: Option<String>,

    /// Number of angular bins per day
    #[arg(long)]
    bins_per_day: Option<u32>,

    /// Text placed before the generated title
    #[arg(long)]
    title_start: Option<String>,

    /// Replace the generated title
    #[arg(long)]
    title: Option<String>,

    /// Label midnight and noon with numbers instead of words
    #[arg(long)]
    no_text_noon: bool,

    #[arg(long, value_parser = ["polar", "cartesian", "line", "flat"])]
    mode: Option<String>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// Layout styling forwarded to the figure, e.g. 'template=plotly_white' (repeatable)
    #[arg(long = "style", value_name = "KEY=VALUE")]
    styles: Vec<String>,

    /// Comma separated colors used for groups
    #[arg(long, value_delimiter = ',')]
    color_sequence: Option<Vec<String>>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Png)]
    format: OutputFormat,

    /// JSON file with options; flags take precedence
    #[arg(long)]
    config: Option<PathBuf>,

    /// CSV file (or JSON records with a .json extension) to read instead of stdin
    #[arg(long)]
    input: Option<PathBuf>,

    /// File to write instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also render the figure to a temporary PNG and log its path
    #[arg(long)]
    show: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long)]
    log_level: Option<String>,
}

/// Options file: the plot columns plus any `ClockOptions` field
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PlotConfig {
    datetime: Option<String>,
    value: Option<String>,
    #[serde(flatten)]
    options: ClockOptions,
}

impl PlotConfig {
    fn load(path: &PathBuf) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Overlay command line flags on top of the file values
    fn apply_args(&mut self, args: &Args) -> Result<()> {
        let options = &mut self.options;

        if args.datetime.is_some() {
            self.datetime = args.datetime.clone();
        }
        if args.value.is_some() {
            self.value = args.value.clone();
        }
        for expr in &args.filters {
            let (column, value) = parser::parse_filter(expr)?;
            options.filters.insert(column, value);
        }
        if let Some(expr) = &args.aggregate {
            options.aggregate = Some(parser::parse_aggregate(expr)?);
        }
        if args.color.is_some() {
            options.color = args.color.clone();
        }
        if args.line_group.is_some() {
            options.line_group = args.line_group.clone();
        }
        if args.line_dash.is_some() {
            options.line_dash = args.line_dash.clone();
        }
        if let Some(shape) = &args.line_shape {
            options.line_shape = match shape.as_str() {
                "linear" => LineShape::Linear,
                _ => LineShape::Spline,
            };
        }
        if let Some(bins) = args.bins_per_day {
            options.bins_per_day = bins;
        }
        if let Some(start) = &args.title_start {
            options.title_start = start.clone();
        }
        if args.title.is_some() {
            options.title = args.title.clone();
        }
        if args.no_text_noon {
            options.text_noon = false;
        }
        if let Some(mode) = &args.mode {
            options.mode = match mode.as_str() {
                "polar" => PlotMode::Polar,
                _ => PlotMode::Cartesian,
            };
        }
        if args.width.is_some() {
            options.width = args.width;
        }
        if args.height.is_some() {
            options.height = args.height;
        }
        for expr in &args.styles {
            let (key, value) = parser::parse_style(expr)?;
            options.style.insert(key, value);
        }
        if args.color_sequence.is_some() {
            options.color_discrete_sequence = args.color_sequence.clone();
        }
        if args.show {
            options.show = true;
        }
        Ok(())
    }
}

/// Read the input table: CSV from a file or stdin, or JSON records from a `.json` file
fn read_input(path: Option<&Path>) -> Result<Table> {
    let Some(path) = path else {
        return csv_reader::read_csv_from_stdin().context("Failed to read CSV from stdin");
    };
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;

    if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")) {
        let value: serde_json::Value = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse JSON in {}", path.display()))?;
        Table::from_records(&value).with_context(|| format!("Invalid records in {}", path.display()))
    } else {
        csv_reader::read_csv(file).with_context(|| format!("Failed to read CSV from {}", path.display()))
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init_logging(args.log_level.as_deref())?;

    let mut config = match &args.config {
        Some(path) => PlotConfig::load(path)?,
        None => PlotConfig::default(),
    };
    config.apply_args(&args)?;

    let datetime_col = config
        .datetime
        .clone()
        .context("A timestamp column is required (--datetime)")?;
    let value_col = config
        .value
        .clone()
        .context("A value column is required (--value)")?;

    let table = read_input(args.input.as_deref())?;
    debug!(rows = table.len(), columns = table.headers.len(), "read input");

    let bytes = match args.format {
        OutputFormat::Csv => {
            let data = runtime::clock_data(&table, &datetime_col, &value_col, &config.options)?;
            runtime::render_grouped_csv(&data)?
        }
        format => {
            let figure = runtime::clock_plot(&table, &datetime_col, &value_col, &config.options)?;
            runtime::render_figure(&figure, format).context("Failed to render plot")?
        }
    };

    match &args.output {
        Some(path) => std::fs::write(path, &bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(&bytes)
                .context("Failed to write output to stdout")?;
            handle.flush().context("Failed to flush stdout")?;
        }
    }

    Ok(())
}
