use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::data::Table;
use crate::error::Result;
use crate::interpolate;
use crate::ir::{Figure, Layout, Line, Trace};
use crate::labels::{self, CategoryOrders};
use crate::options::{AggregateSpec, LineShape, PlotMode};
use crate::palette::DiscretePalette;
use crate::resolve::ResolvedSpec;
use crate::transform::{self, GroupKey, GroupedData, GroupedTable};

/// Width of overlay average lines
pub const OVERLAY_LINE_WIDTH: f64 = 6.0;

/// Legend label of the overlay when no aggregate column is given
pub const OVERALL_LABEL: &str = "All";

const THIN_LINE_WIDTH: f64 = 0.5;
const THIN_LINE_OPACITY: f64 = 0.7;
const BOLD_LINE_WIDTH: f64 = 3.0;

/// Width and opacity shared by every data trace
#[derive(Debug, Clone, Copy, PartialEq)]
struct Weight {
    width: Option<f64>,
    opacity: Option<f64>,
}

/// Maps each grouping column's values to a domain position
struct Domains {
    by_column: HashMap<String, Vec<String>>,
}

impl Domains {
    fn build(grouped: &GroupedTable, orders: &CategoryOrders) -> Self {
        let by_column = grouped
            .key_columns
            .iter()
            .enumerate()
            .map(|(i, col)| {
                let values = grouped.rows.iter().map(|row| row.keys[i].as_str());
                (col.clone(), labels::category_domain(orders, col, values))
            })
            .collect();
        Self { by_column }
    }

    fn domain(&self, column: &str) -> &[String] {
        self.by_column.get(column).map(Vec::as_slice).unwrap_or(&[])
    }

    fn position(&self, column: &str, value: &str) -> usize {
        self.by_column
            .get(column)
            .and_then(|domain| domain.iter().position(|v| v == value))
            .unwrap_or(0)
    }
}

/// Build the figure from grouped data.
///
/// With more distinct groups than `spline_group_limit`, spline lines are
/// interpolated here and drawn linear. Line weight follows the group count.
/// An aggregate adds overlay average traces on top.
pub fn assemble(data: &GroupedData, spec: &ResolvedSpec) -> Result<Figure> {
    let style_columns = spec.grouping.style_columns();
    let group_count = transform::distinct_groups(&data.filtered, &style_columns)?.len();
    let thresholds = &spec.thresholds;

    let (grouped, line_shape) =
        if group_count > thresholds.spline_group_limit && spec.line_shape == LineShape::Spline {
            debug!(group_count, "pre-interpolating groups for linear drawing");
            let groups = data.grouped.groups();
            let interpolated = interpolate::interpolate(
                &data.grouped,
                &groups,
                thresholds.min_interpolation_samples,
            );
            (interpolated, LineShape::Linear)
        } else {
            (data.grouped.clone(), spec.line_shape)
        };

    let weight = if group_count > thresholds.thin_line_groups {
        Weight {
            width: Some(THIN_LINE_WIDTH),
            opacity: Some(THIN_LINE_OPACITY),
        }
    } else if group_count <= thresholds.bold_line_groups {
        Weight {
            width: Some(BOLD_LINE_WIDTH),
            opacity: None,
        }
    } else {
        Weight {
            width: None,
            opacity: None,
        }
    };

    let mut traces = group_traces(&grouped, spec, line_shape, weight);
    let mut category_orders = spec.category_orders.clone();

    if let Some(aggregate) = &spec.aggregate {
        let (overlay, orders) = overlay_traces(&data.filtered, &grouped.value_column, aggregate, spec)?;
        traces.extend(overlay);
        category_orders = orders;
    }

    debug!(traces = traces.len(), group_count, "assembled figure");

    Ok(Figure {
        traces,
        layout: Layout {
            title: spec.title.clone(),
            width: spec.width,
            height: spec.height,
            mode: spec.mode,
            tick_vals: spec.tick_vals.clone(),
            tick_text: spec.tick_text.clone(),
            category_orders: category_orders.into_iter().collect::<BTreeMap<_, _>>(),
            style: spec.style.clone(),
        },
        warnings: data.warnings.clone(),
    })
}

/// One trace per distinct group key, in domain order
fn group_traces(
    grouped: &GroupedTable,
    spec: &ResolvedSpec,
    line_shape: LineShape,
    weight: Weight,
) -> Vec<Trace> {
    let domains = Domains::build(grouped, &spec.category_orders);
    let grouping = &spec.grouping;
    let dashes = DiscretePalette::dashes();
    let color_map = grouping
        .color
        .as_ref()
        .map(|col| spec.colors.assign(domains.domain(col)))
        .unwrap_or_default();

    let value_of = |key: &GroupKey, column: &Option<String>| -> Option<String> {
        column
            .as_ref()
            .and_then(|col| grouped.key_index(col))
            .map(|i| key[i].clone())
    };
    let rank = |key: &GroupKey| -> Vec<usize> {
        grouping
            .style_columns()
            .iter()
            .filter_map(|col| grouped.key_index(col).map(|i| domains.position(col, &key[i])))
            .collect()
    };

    let mut groups = grouped.groups();
    groups.sort_by_key(|key| rank(key));

    let mut seen_names: Vec<String> = Vec::new();
    let mut traces = Vec::with_capacity(groups.len());

    for key in groups {
        let color_value = value_of(&key, &grouping.color);
        let dash_value = value_of(&key, &grouping.line_dash);

        let color = color_value
            .as_ref()
            .and_then(|value| color_map.get(value).map(String::as_str))
            .or_else(|| spec.colors.get(0))
            .unwrap_or("black")
            .to_string();
        let dash = match (&grouping.line_dash, &dash_value) {
            (Some(col), Some(value)) => dashes.get(domains.position(col, value)),
            _ => dashes.get(0),
        }
        .unwrap_or("solid")
        .to_string();

        let name = [color_value, dash_value]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(", ");
        let show_legend = !name.is_empty() && !seen_names.contains(&name);
        if show_legend {
            seen_names.push(name.clone());
        }

        let (degrees, values) = trace_points(grouped.rows_for(&key).map(|r| (r.degrees, r.value)), spec.mode);

        traces.push(Trace {
            legend_group: name.clone(),
            name,
            show_legend,
            degrees,
            values,
            line: Line {
                color,
                width: weight.width,
                dash,
                shape: line_shape,
            },
            opacity: weight.opacity,
            overlay: false,
        });
    }

    traces
}

/// Reduce the filtered data per aggregate key and degrees, relabel the keys
/// as `"<value> (<function>)"` and draw each as a wide line.
///
/// Returns the traces with the category orders extended by the relabeled
/// values. The resolved orders are left untouched.
fn overlay_traces(
    filtered: &Table,
    value_column: &str,
    aggregate: &AggregateSpec,
    spec: &ResolvedSpec,
) -> Result<(Vec<Trace>, CategoryOrders)> {
    let function = aggregate.function;
    let key_columns: Vec<String> = aggregate.column.iter().cloned().collect();
    let overlay = transform::aggregate_by(filtered, value_column, &key_columns, function)?;

    let relabel = |value: &str| format!("{} ({})", value, function);

    let mut orders = spec.category_orders.clone();
    if let Some(col) = &aggregate.column {
        if let Some(order) = orders.get_mut(col) {
            let relabeled: Vec<String> = order.iter().map(|v| relabel(v.as_str())).collect();
            order.extend(relabeled);
        }
    }

    // Colors follow the un-relabeled values so each overlay matches its base group
    let raw_values: Vec<String> = overlay
        .groups()
        .iter()
        .map(|key| key.first().cloned().unwrap_or_else(|| OVERALL_LABEL.to_string()))
        .collect();
    let raw_domain = match &aggregate.column {
        Some(col) => labels::category_domain(
            &spec.category_orders,
            col,
            raw_values.iter().map(String::as_str),
        ),
        None => raw_values.clone(),
    };
    let colors = spec.colors.assign(&raw_domain);

    let mut entries: Vec<(usize, GroupKey, String, String)> = overlay
        .groups()
        .into_iter()
        .zip(raw_values)
        .map(|(key, raw)| {
            let position = raw_domain.iter().position(|d| *d == raw).unwrap_or(0);
            let color = colors.get(&raw).cloned().unwrap_or_else(|| "black".to_string());
            (position, key, relabel(&raw), color)
        })
        .collect();
    entries.sort_by_key(|entry| entry.0);

    let traces = entries
        .into_iter()
        .map(|(_, key, label, color)| {
            let (degrees, values) =
                trace_points(overlay.rows_for(&key).map(|r| (r.degrees, r.value)), spec.mode);
            Trace {
                legend_group: label.clone(),
                name: label,
                show_legend: true,
                degrees,
                values,
                line: Line {
                    color,
                    width: Some(OVERLAY_LINE_WIDTH),
                    dash: "solid".to_string(),
                    shape: spec.line_shape,
                },
                opacity: None,
                overlay: true,
            }
        })
        .collect();

    Ok((traces, orders))
}

/// Split points into coordinate vectors; polar lines are closed back to their start.
fn trace_points(points: impl Iterator<Item = (f64, f64)>, mode: PlotMode) -> (Vec<f64>, Vec<f64>) {
    let (mut degrees, mut values): (Vec<f64>, Vec<f64>) = points.unzip();
    if mode == PlotMode::Polar && degrees.len() > 1 {
        degrees.push(degrees[0]);
        values.push(values[0]);
    }
    (degrees, values)
}
