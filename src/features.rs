//! Time-feature derivation.
//!
//! Decomposes a timestamp column into the calendar and time-of-day columns
//! that can be used for filtering, grouping and plotting:
//!
//! | column       | example        |
//! |--------------|----------------|
//! | `year`       | `2022`         |
//! | `month`      | `January`      |
//! | `year_month` | `202201`       |
//! | `day`        | `25` (day of month) |
//! | `date`       | `2022-01-25`   |
//! | `week`       | `4` (ISO week) |
//! | `dayofweek`  | `Tue`          |
//! | `weekend`    | `Weekday` / `Weekend` |
//! | `hour`       | `14`           |
//! | `minute`     | `42`           |
//! | `degrees`    | `210` (angle on a 24 hour clock face) |
//! | `season`     | `Winter`       |
//! | `degree_bins`| `[202.5, 217.5)` (only when `bins_per_day != 24`) |

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike, Weekday};
use tracing::debug;

use crate::data::{format_number, Table};
use crate::error::{ClockError, Result};

pub const HOURS_PER_DAY: u32 = 24;

/// Columns written by [`derive`]; `degree_bins` only when binning differs from hourly
pub const FEATURE_COLUMNS: [&str; 13] = [
    "year",
    "month",
    "year_month",
    "day",
    "date",
    "week",
    "dayofweek",
    "weekend",
    "hour",
    "minute",
    "degrees",
    "season",
    "degree_bins",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S%.f",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Parse a timestamp cell. Offsets are honoured by keeping the wall-clock
/// time written in the cell.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f%z") {
        return Some(dt.naive_local());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Season of the (northern hemisphere) year for a month number 1-12
pub fn season_for_month(month: u32) -> &'static str {
    match month {
        12 | 1 | 2 => "Winter",
        3..=5 => "Spring",
        6..=8 => "Summer",
        _ => "Autumn",
    }
}

pub fn weekend_label(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Sat | Weekday::Sun => "Weekend",
        _ => "Weekday",
    }
}

/// An equal-width slice of the clock face, centred on `midpoint`.
///
/// Bin `k` of `n` covers `[k*w - w/2, k*w + w/2)` with `w = 360/n`, wrapping
/// across the 0°/360° seam, so bin 0 always sits at midnight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DegreeBin {
    pub index: u32,
    pub width: f64,
}

impl DegreeBin {
    pub fn containing(degrees: f64, bins_per_day: u32) -> Self {
        let width = 360.0 / bins_per_day as f64;
        let index = ((degrees + width / 2.0) / width).floor() as i64;
        Self {
            index: index.rem_euclid(bins_per_day as i64) as u32,
            width,
        }
    }

    pub fn midpoint(&self) -> f64 {
        (self.index as f64 * self.width).floor()
    }

    pub fn label(&self) -> String {
        let lower = (self.index as f64 * self.width - self.width / 2.0).rem_euclid(360.0);
        let upper = (lower + self.width).rem_euclid(360.0);
        format!("[{}, {})", round_label(lower), round_label(upper))
    }
}

fn round_label(value: f64) -> String {
    format_number((value * 100.0).round() / 100.0)
}

/// Angle of a time of day on the clock face.
///
/// With 24 bins the angle is `360 * hour / 24`. Any other bin count folds
/// the minutes in first and then snaps to the containing bin's midpoint.
pub fn clock_degrees(hour: u32, minute: u32, bins_per_day: u32) -> f64 {
    let degrees = 360.0 * hour as f64 / HOURS_PER_DAY as f64;
    if bins_per_day == HOURS_PER_DAY {
        return degrees;
    }
    let degrees = degrees + 360.0 * minute as f64 / (60.0 * HOURS_PER_DAY as f64);
    DegreeBin::containing(degrees, bins_per_day).midpoint()
}

/// Every feature derived from a single timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct TimeFeatures {
    pub year: i32,
    pub month: String,
    pub year_month: String,
    pub day: u32,
    pub date: String,
    pub week: u32,
    pub dayofweek: String,
    pub weekend: &'static str,
    pub hour: u32,
    pub minute: u32,
    pub degrees: f64,
    pub season: &'static str,
    pub degree_bin: Option<String>,
}

impl TimeFeatures {
    pub fn from_datetime(dt: &NaiveDateTime, bins_per_day: u32) -> Self {
        let degree_bin = if bins_per_day != HOURS_PER_DAY {
            let raw = 360.0 * dt.hour() as f64 / HOURS_PER_DAY as f64
                + 360.0 * dt.minute() as f64 / (60.0 * HOURS_PER_DAY as f64);
            Some(DegreeBin::containing(raw, bins_per_day).label())
        } else {
            None
        };

        Self {
            year: dt.year(),
            month: dt.format("%B").to_string(),
            year_month: dt.format("%Y%m").to_string(),
            day: dt.day(),
            date: dt.format("%Y-%m-%d").to_string(),
            week: dt.iso_week().week(),
            dayofweek: dt.format("%a").to_string(),
            weekend: weekend_label(dt.weekday()),
            hour: dt.hour(),
            minute: dt.minute(),
            degrees: clock_degrees(dt.hour(), dt.minute(), bins_per_day),
            season: season_for_month(dt.month()),
            degree_bin,
        }
    }
}

/// Return a copy of `table` with all time features added (or overwritten).
pub fn derive(table: &Table, timestamp_column: &str, bins_per_day: u32) -> Result<Table> {
    if bins_per_day == 0 {
        return Err(ClockError::invalid_option("bins_per_day must be a positive integer"));
    }

    let cells = table
        .column(timestamp_column)
        .ok_or_else(|| ClockError::MissingColumns {
            columns: vec![timestamp_column.to_string()],
        })?;

    let mut features = Vec::with_capacity(cells.len());
    for (row_idx, cell) in cells.iter().enumerate() {
        let dt = parse_timestamp(cell).ok_or_else(|| ClockError::Parse {
            column: timestamp_column.to_string(),
            row: row_idx + 1,
            value: cell.to_string(),
        })?;
        features.push(TimeFeatures::from_datetime(&dt, bins_per_day));
    }

    debug!(rows = features.len(), bins_per_day, "derived time features");

    let mut out = table.clone();
    let col = |f: fn(&TimeFeatures) -> String| features.iter().map(f).collect::<Vec<_>>();

    out.set_column("year", col(|t| t.year.to_string()));
    out.set_column("month", col(|t| t.month.clone()));
    out.set_column("year_month", col(|t| t.year_month.clone()));
    out.set_column("day", col(|t| t.day.to_string()));
    out.set_column("date", col(|t| t.date.clone()));
    out.set_column("week", col(|t| t.week.to_string()));
    out.set_column("dayofweek", col(|t| t.dayofweek.clone()));
    out.set_column("weekend", col(|t| t.weekend.to_string()));
    out.set_column("hour", col(|t| t.hour.to_string()));
    out.set_column("minute", col(|t| t.minute.to_string()));
    out.set_column("degrees", col(|t| format_number(t.degrees)));
    out.set_column("season", col(|t| t.season.to_string()));
    if bins_per_day != HOURS_PER_DAY {
        out.set_column("degree_bins", col(|t| t.degree_bin.clone().unwrap_or_default()));
    }

    Ok(out)
}
