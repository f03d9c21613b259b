use crate::error::{ClockError, Result};
use crate::labels::{self, CategoryOrders};
use crate::options::{AggregateSpec, ClockOptions, LineShape, PlotMode, Thresholds};
use crate::palette::DiscretePalette;
use crate::transform::Grouping;

/// Hour ticks around the clock face
pub const TICKS_PER_DAY: u32 = 24;

/// Options with every default and derived choice applied, ready for assembly
#[derive(Debug, Clone)]
pub struct ResolvedSpec {
    pub title: String,
    pub grouping: Grouping,
    pub aggregate: Option<AggregateSpec>,
    pub colors: DiscretePalette,
    pub category_orders: CategoryOrders,
    pub line_shape: LineShape,
    pub mode: PlotMode,
    pub width: u32,
    pub height: u32,
    pub tick_vals: Vec<f64>,
    pub tick_text: Vec<String>,
    pub style: indexmap::IndexMap<String, serde_json::Value>,
    pub thresholds: Thresholds,
}

/// Resolve title, palette, category orders and figure size from the options
pub fn resolve_options(options: &ClockOptions) -> Result<ResolvedSpec> {
    let title = match &options.title {
        Some(title) => title.clone(),
        None => labels::make_title(
            &options.title_start,
            &options.filters,
            options.line_group.as_deref(),
        ),
    };

    let (width, height) = resolve_size(options)?;
    let (tick_vals, tick_text) = hour_ticks(options.text_noon);

    Ok(ResolvedSpec {
        title,
        grouping: Grouping::from_options(options),
        aggregate: options.aggregate.clone(),
        colors: resolve_colors(options)?,
        category_orders: labels::merged_category_orders(&options.category_orders),
        line_shape: options.line_shape,
        mode: options.mode,
        width,
        height,
        tick_vals,
        tick_text,
        style: options.style.clone(),
        thresholds: options.thresholds,
    })
}

/// Caller sequence if given, the season palette when grouping or aggregating
/// by a season column, G10 otherwise
fn resolve_colors(options: &ClockOptions) -> Result<DiscretePalette> {
    if let Some(sequence) = &options.color_discrete_sequence {
        if sequence.is_empty() {
            return Err(ClockError::invalid_option(
                "color_discrete_sequence must contain at least one color",
            ));
        }
        return Ok(DiscretePalette::new(sequence.clone()));
    }

    let by_season = |col: Option<&str>| col.map(|c| c.contains("season")).unwrap_or(false);
    let aggregate_col = options.aggregate.as_ref().and_then(|a| a.column.as_deref());

    if by_season(options.color.as_deref()) || by_season(aggregate_col) {
        Ok(DiscretePalette::season())
    } else {
        Ok(DiscretePalette::g10())
    }
}

fn resolve_size(options: &ClockOptions) -> Result<(u32, u32)> {
    let (default_width, default_height) = options.mode.default_size();
    let width = options.width.unwrap_or(default_width);
    let height = options.height.unwrap_or(default_height);
    if width == 0 || height == 0 {
        return Err(ClockError::invalid_option(format!(
            "figure size must be positive, got {}x{}",
            width, height
        )));
    }
    Ok((width, height))
}

/// Tick positions every 15 degrees, labelled with the hour
pub fn hour_ticks(text_noon: bool) -> (Vec<f64>, Vec<String>) {
    let step = 360 / TICKS_PER_DAY;
    let vals = (0..TICKS_PER_DAY).map(|h| (h * step) as f64).collect();
    let text = (0..TICKS_PER_DAY)
        .map(|h| match h {
            0 if text_noon => "Midnight".to_string(),
            12 if text_noon => "Noon".to_string(),
            _ => h.to_string(),
        })
        .collect();
    (vals, text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::Aggregation;

    #[test]
    fn test_defaults() {
        let spec = resolve_options(&ClockOptions::default()).unwrap();
        assert_eq!(spec.title, "by Hour of Day");
        assert_eq!((spec.width, spec.height), (800, 800));
        assert_eq!(spec.colors.values()[0], "#3366CC");
        assert_eq!(spec.line_shape, LineShape::Spline);
        assert!(spec.category_orders.contains_key("season"));
    }

    #[test]
    fn test_cartesian_size() {
        let options = ClockOptions {
            mode: PlotMode::Cartesian,
            ..Default::default()
        };
        let spec = resolve_options(&options).unwrap();
        assert_eq!((spec.width, spec.height), (800, 600));

        let options = ClockOptions {
            width: Some(1000),
            ..Default::default()
        };
        let spec = resolve_options(&options).unwrap();
        assert_eq!((spec.width, spec.height), (1000, 800));
    }

    #[test]
    fn test_zero_size_rejected() {
        let options = ClockOptions {
            height: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            resolve_options(&options),
            Err(ClockError::InvalidOption { .. })
        ));
    }

    #[test]
    fn test_season_palette() {
        let options = ClockOptions {
            color: Some("season".to_string()),
            ..Default::default()
        };
        assert_eq!(resolve_options(&options).unwrap().colors.values()[0], "green");

        let options = ClockOptions {
            aggregate: Some(AggregateSpec::new(Some("season"), Aggregation::Mean)),
            ..Default::default()
        };
        assert_eq!(resolve_options(&options).unwrap().colors.values()[3], "blue");
    }

    #[test]
    fn test_caller_palette_wins() {
        let options = ClockOptions {
            color: Some("season".to_string()),
            color_discrete_sequence: Some(vec!["black".to_string()]),
            ..Default::default()
        };
        assert_eq!(resolve_options(&options).unwrap().colors.values(), ["black".to_string()]);

        let options = ClockOptions {
            color_discrete_sequence: Some(vec![]),
            ..Default::default()
        };
        assert!(resolve_options(&options).is_err());
    }

    #[test]
    fn test_explicit_title_wins() {
        let options = ClockOptions {
            title: Some("Custom".to_string()),
            line_group: Some("date".to_string()),
            ..Default::default()
        };
        assert_eq!(resolve_options(&options).unwrap().title, "Custom");
    }

    #[test]
    fn test_hour_ticks() {
        let (vals, text) = hour_ticks(true);
        assert_eq!(vals.len(), 24);
        assert_eq!(vals[1], 15.0);
        assert_eq!(vals[23], 345.0);
        assert_eq!(text[0], "Midnight");
        assert_eq!(text[12], "Noon");
        assert_eq!(text[13], "13");

        let (_, text) = hour_ticks(false);
        assert_eq!(text[0], "0");
        assert_eq!(text[12], "12");
    }
}
