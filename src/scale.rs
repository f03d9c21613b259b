use crate::ir::Figure;
use crate::options::PlotMode;

/// Linear value axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueScale {
    pub min: f64,
    pub max: f64,
}

impl ValueScale {
    /// Position of `value` within the domain as a 0..1 fraction
    pub fn normalize(&self, value: f64) -> f64 {
        (value - self.min) / (self.max - self.min)
    }

    /// `count + 1` evenly spaced values from min to max
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        let count = count.max(1);
        let step = (self.max - self.min) / count as f64;
        (0..=count).map(|i| self.min + step * i as f64).collect()
    }
}

/// Value domain over every trace.
///
/// Polar radii start at zero unless the data goes negative. Cartesian axes
/// get 5% padding. A flat or empty domain is widened by one unit.
pub fn build_value_scale(figure: &Figure) -> ValueScale {
    let (min, max) = figure
        .traces
        .iter()
        .flat_map(|t| t.values.iter().copied())
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });

    if !min.is_finite() || !max.is_finite() {
        return ValueScale { min: 0.0, max: 1.0 };
    }

    let (min, max) = match figure.layout.mode {
        PlotMode::Polar => (min.min(0.0), max),
        PlotMode::Cartesian => pad_range(min, max),
    };

    if min == max {
        ValueScale {
            min: min - 1.0,
            max: max + 1.0,
        }
    } else {
        ValueScale { min, max }
    }
}

fn pad_range(min: f64, max: f64) -> (f64, f64) {
    let padding = (max - min) * 0.05;
    (min - padding, max + padding)
}
