use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

use crate::error::{ClockError, ClockWarning, Result};
use crate::options::{LineShape, PlotMode};

// =============================================================================
// Figure model
// =============================================================================

/// A fully assembled clock chart, independent of any drawing backend.
///
/// Serializes to a plotly-like JSON document: a list of traces plus a layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub traces: Vec<Trace>,
    pub layout: Layout,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ClockWarning>,
}

/// One line on the chart: a group (or overlay average) over the clock face
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    /// Legend label
    pub name: String,
    pub legend_group: String,
    pub show_legend: bool,
    /// Angular position (polar) or x position (cartesian), in degrees
    pub degrees: Vec<f64>,
    /// Radius (polar) or y position (cartesian)
    pub values: Vec<f64>,
    pub line: Line,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    /// Aggregate overlay rather than a data group
    pub overlay: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Line {
    pub color: String,
    /// `None` leaves the backend default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    pub dash: String,
    pub shape: LineShape,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    /// May contain `<br>` line breaks
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub mode: PlotMode,
    pub tick_vals: Vec<f64>,
    pub tick_text: Vec<String>,
    pub category_orders: BTreeMap<String, Vec<String>>,
    /// Caller styling forwarded verbatim
    #[serde(flatten)]
    pub style: indexmap::IndexMap<String, serde_json::Value>,
}

/// Default width of traces when no line-weight rule applies
pub const DEFAULT_LINE_WIDTH: f64 = 2.0;

impl Trace {
    pub fn len(&self) -> usize {
        self.degrees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.degrees.is_empty()
    }

    pub fn width(&self) -> f64 {
        self.line.width.unwrap_or(DEFAULT_LINE_WIDTH)
    }

    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.degrees.iter().copied().zip(self.values.iter().copied())
    }
}

impl Figure {
    pub fn trace_names(&self) -> Vec<&str> {
        self.traces.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn overlay_traces(&self) -> impl Iterator<Item = &Trace> {
        self.traces.iter().filter(|t| t.overlay)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ClockError::render(format!("Failed to serialize figure: {}", e)))
    }

    /// Display the figure: renders a PNG into the temp directory and logs its path.
    pub fn show(&self) -> Result<PathBuf> {
        let png = crate::graph::render_png(self).map_err(|e| ClockError::render(format!("{:#}", e)))?;

        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S%.3f");
        let path = std::env::temp_dir().join(format!("clockplot-{}.png", stamp));
        std::fs::write(&path, png).map_err(|e| {
            ClockError::render(format!("Failed to write {}: {}", path.display(), e))
        })?;

        info!(path = %path.display(), "clock plot written");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_figure() -> Figure {
        let mut style = indexmap::IndexMap::new();
        style.insert("template".to_string(), serde_json::json!("plotly_white"));
        Figure {
            traces: vec![Trace {
                name: "Winter".to_string(),
                legend_group: "Winter".to_string(),
                show_legend: true,
                degrees: vec![0.0, 15.0, 0.0],
                values: vec![1.0, 2.0, 1.0],
                line: Line {
                    color: "blue".to_string(),
                    width: Some(3.0),
                    dash: "solid".to_string(),
                    shape: LineShape::Spline,
                },
                opacity: None,
                overlay: false,
            }],
            layout: Layout {
                title: "by Hour of Day".to_string(),
                width: 800,
                height: 800,
                mode: PlotMode::Polar,
                tick_vals: vec![0.0, 15.0],
                tick_text: vec!["Midnight".to_string(), "1".to_string()],
                category_orders: BTreeMap::new(),
                style,
            },
            warnings: vec![],
        }
    }

    #[test]
    fn test_figure_json_shape() {
        let json: serde_json::Value = serde_json::from_str(&sample_figure().to_json().unwrap()).unwrap();
        assert_eq!(json["traces"][0]["name"], "Winter");
        assert_eq!(json["traces"][0]["line"]["shape"], "spline");
        assert!(json["traces"][0].get("opacity").is_none());
        assert_eq!(json["layout"]["mode"], "polar");
        // style keys are flattened into the layout
        assert_eq!(json["layout"]["template"], "plotly_white");
        assert!(json.get("warnings").is_none());
    }

    #[test]
    fn test_trace_helpers() {
        let figure = sample_figure();
        let trace = &figure.traces[0];
        assert_eq!(trace.len(), 3);
        assert_eq!(trace.width(), 3.0);
        assert_eq!(trace.points().nth(1), Some((15.0, 2.0)));
        assert_eq!(figure.trace_names(), vec!["Winter"]);
        assert_eq!(figure.overlay_traces().count(), 0);
    }
}
