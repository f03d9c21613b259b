use indexmap::IndexMap;
use std::cmp::Ordering;
use tracing::{debug, warn};

use crate::aggregation::Aggregation;
use crate::data::{compare_cells, format_number, Table};
use crate::error::{ClockError, ClockWarning, Result};
use crate::features::{self, HOURS_PER_DAY};
use crate::options::{AggregateSpec, ClockOptions, FilterValue};

pub const DEGREES_COLUMN: &str = "degrees";

/// Values of the grouping columns for one plotted line, in key-column order
pub type GroupKey = Vec<String>;

/// The categorical columns that split data into separate lines
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grouping {
    pub line_group: Option<String>,
    pub color: Option<String>,
    pub line_dash: Option<String>,
}

impl Grouping {
    pub fn from_options(options: &ClockOptions) -> Self {
        Self {
            line_group: options.line_group.clone(),
            color: options.color.clone(),
            line_dash: options.line_dash.clone(),
        }
    }

    /// Grouping key order: line_group, color, line_dash (unset keys omitted)
    pub fn columns(&self) -> Vec<String> {
        [&self.line_group, &self.color, &self.line_dash]
            .into_iter()
            .flatten()
            .cloned()
            .collect()
    }

    /// Columns that distinguish traces visually: color, line_group, line_dash
    pub fn style_columns(&self) -> Vec<String> {
        [&self.color, &self.line_group, &self.line_dash]
            .into_iter()
            .flatten()
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.line_group.is_none() && self.color.is_none() && self.line_dash.is_none()
    }
}

/// One aggregated value at one angular bucket for one group
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedRow {
    pub keys: GroupKey,
    pub degrees: f64,
    pub value: f64,
}

/// Result of grouping by `(key_columns.., degrees)` and reducing `value_column`.
/// Rows are sorted by key then by degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedTable {
    pub key_columns: Vec<String>,
    pub value_column: String,
    pub rows: Vec<GroupedRow>,
}

impl GroupedTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn key_index(&self, column: &str) -> Option<usize> {
        self.key_columns.iter().position(|c| c == column)
    }

    /// Distinct group keys in row order
    pub fn groups(&self) -> Vec<GroupKey> {
        let mut seen: Vec<GroupKey> = Vec::new();
        for row in &self.rows {
            if seen.last() != Some(&row.keys) && !seen.contains(&row.keys) {
                seen.push(row.keys.clone());
            }
        }
        seen
    }

    pub fn rows_for<'a>(&'a self, key: &'a [String]) -> impl Iterator<Item = &'a GroupedRow> + 'a {
        self.rows.iter().filter(move |row| row.keys.as_slice() == key)
    }

    pub fn has_negative_values(&self) -> bool {
        self.rows.iter().any(|row| row.value < 0.0)
    }

    /// Flatten back into a string table: key columns, degrees, value
    pub fn to_table(&self) -> Table {
        let mut headers = self.key_columns.clone();
        headers.push(DEGREES_COLUMN.to_string());
        headers.push(self.value_column.clone());

        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut cells = row.keys.clone();
                cells.push(format_number(row.degrees));
                cells.push(format_number(row.value));
                cells
            })
            .collect();

        Table::new(headers, rows)
    }
}

/// Output of the filter & aggregate stage
#[derive(Debug, Clone)]
pub struct GroupedData {
    /// Filtered, ungrouped rows (used again for overlay averages)
    pub filtered: Table,
    pub grouped: GroupedTable,
    pub warnings: Vec<ClockWarning>,
}

/// Keep rows matching every filter, applied in insertion order.
pub fn apply_filters(table: &Table, filters: &IndexMap<String, FilterValue>) -> Result<Table> {
    let mut filtered = table.clone();
    for (column, value) in filters {
        let idx = filtered
            .column_index(column)
            .ok_or_else(|| ClockError::MissingColumns {
                columns: vec![column.clone()],
            })?;
        filtered = filtered.filter_rows(idx, |cell| value.matches(cell));
        debug!(column = %column, remaining = filtered.len(), "applied filter");
    }
    Ok(filtered)
}

/// Group `table` by `key_columns` plus degrees and reduce `value_column`.
pub fn aggregate_by(
    table: &Table,
    value_column: &str,
    key_columns: &[String],
    aggregation: Aggregation,
) -> Result<GroupedTable> {
    let values = table.numeric_column(value_column)?;
    let degrees = table.numeric_column(DEGREES_COLUMN)?;

    let key_indices: Vec<usize> = key_columns
        .iter()
        .map(|col| {
            table.column_index(col).ok_or_else(|| ClockError::MissingColumns {
                columns: vec![col.clone()],
            })
        })
        .collect::<Result<_>>()?;

    let mut buckets: IndexMap<(GroupKey, u64), Vec<Option<f64>>> = IndexMap::new();
    for (row_idx, row) in table.rows.iter().enumerate() {
        // rows without an angle cannot be placed on the clock
        let Some(deg) = degrees[row_idx] else { continue };
        let keys: GroupKey = key_indices
            .iter()
            .map(|&i| row.get(i).cloned().unwrap_or_default())
            .collect();
        buckets
            .entry((keys, deg.to_bits()))
            .or_default()
            .push(values[row_idx]);
    }

    let mut rows: Vec<GroupedRow> = buckets
        .into_iter()
        .map(|((keys, deg_bits), vals)| GroupedRow {
            keys,
            degrees: f64::from_bits(deg_bits),
            value: aggregation.apply(&vals),
        })
        .filter(|row| row.value.is_finite())
        .collect();

    rows.sort_by(compare_rows);

    Ok(GroupedTable {
        key_columns: key_columns.to_vec(),
        value_column: value_column.to_string(),
        rows,
    })
}

/// Distinct value combinations of `columns`, sorted. Empty when no columns are given.
pub fn distinct_groups(table: &Table, columns: &[String]) -> Result<Vec<GroupKey>> {
    if columns.is_empty() {
        return Ok(Vec::new());
    }
    let indices: Vec<usize> = columns
        .iter()
        .map(|col| {
            table.column_index(col).ok_or_else(|| ClockError::MissingColumns {
                columns: vec![col.clone()],
            })
        })
        .collect::<Result<_>>()?;

    let mut groups: Vec<GroupKey> = table
        .rows
        .iter()
        .map(|row| {
            indices
                .iter()
                .map(|&i| row.get(i).cloned().unwrap_or_default())
                .collect()
        })
        .collect();
    groups.sort_by(|a, b| compare_keys(a, b));
    groups.dedup();
    Ok(groups)
}

pub(crate) fn compare_keys(a: &[String], b: &[String]) -> Ordering {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| compare_cells(x, y))
        .find(|o| *o != Ordering::Equal)
        .unwrap_or_else(|| a.len().cmp(&b.len()))
}

fn compare_rows(a: &GroupedRow, b: &GroupedRow) -> Ordering {
    compare_keys(&a.keys, &b.keys).then_with(|| {
        a.degrees
            .partial_cmp(&b.degrees)
            .unwrap_or(Ordering::Equal)
    })
}

/// Every column the pipeline will touch, without duplicates
fn required_columns(
    value_col: &str,
    filters: &IndexMap<String, FilterValue>,
    aggregate: Option<&AggregateSpec>,
    grouping: &Grouping,
) -> Vec<String> {
    let mut columns = grouping.columns();
    columns.push(DEGREES_COLUMN.to_string());
    if let Some(col) = aggregate.and_then(|a| a.column.as_ref()) {
        columns.push(col.clone());
    }
    columns.extend(filters.keys().cloned());
    columns.push(value_col.to_string());

    let mut unique = Vec::new();
    for col in columns {
        if !unique.contains(&col) {
            unique.push(col);
        }
    }
    unique
}

/// Filter the table, then group by `(line_group, color, line_dash, degrees)`
/// and reduce the value column.
///
/// Time features are (re)derived when a required column is missing, when
/// `bins_per_day` is given, or when no grouping column is requested.
pub fn filter_and_group(
    table: &Table,
    datetime_col: &str,
    value_col: &str,
    filters: &IndexMap<String, FilterValue>,
    aggregate: Option<&AggregateSpec>,
    grouping: &Grouping,
    bins_per_day: Option<u32>,
) -> Result<GroupedData> {
    let relevant = required_columns(value_col, filters, aggregate, grouping);

    let all_present = relevant.iter().all(|c| table.has_column(c));
    let needs_features = !all_present || bins_per_day.is_some() || grouping.is_empty();

    // Without timestamps nothing can be derived; name every absent column at once
    if needs_features && !table.has_column(datetime_col) {
        let mut missing = vec![datetime_col.to_string()];
        missing.extend(
            relevant
                .iter()
                .filter(|c| !table.has_column(c) && !features::FEATURE_COLUMNS.contains(&c.as_str()))
                .filter(|c| c.as_str() != datetime_col)
                .cloned(),
        );
        return Err(ClockError::MissingColumns { columns: missing });
    }

    let data = if needs_features {
        features::derive(table, datetime_col, bins_per_day.unwrap_or(HOURS_PER_DAY))?
    } else {
        table.clone()
    };

    let missing: Vec<String> = relevant
        .iter()
        .filter(|c| !data.has_column(c))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(ClockError::MissingColumns { columns: missing });
    }

    let filtered = apply_filters(&data, filters)?;
    if filtered.is_empty() {
        return Err(ClockError::EmptyResult);
    }

    let aggregation = aggregate.map(|a| a.function).unwrap_or_default();
    let grouped = aggregate_by(&filtered, value_col, &grouping.columns(), aggregation)?;
    debug!(
        filtered_rows = filtered.len(),
        grouped_rows = grouped.len(),
        aggregation = %aggregation,
        "grouped data"
    );

    let mut warnings = Vec::new();
    if grouped.has_negative_values() {
        let warning = ClockWarning::NegativeValues {
            column: value_col.to_string(),
        };
        warn!("{}", warning);
        warnings.push(warning);
    }

    Ok(GroupedData {
        filtered,
        grouped,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hourly_rows(days: u32, value: impl Fn(u32, u32) -> f64) -> Table {
        let mut rows = Vec::new();
        for day in 0..days {
            for hour in 0..24 {
                rows.push(vec![
                    format!("2022-01-{:02} {:02}:00:00", day + 3, hour),
                    format_number(value(day, hour)),
                ]);
            }
        }
        Table::new(vec!["ts".to_string(), "value".to_string()], rows)
    }

    fn filters(entries: Vec<(&str, FilterValue)>) -> IndexMap<String, FilterValue> {
        entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn test_constant_series_single_group() {
        let table = hourly_rows(2, |_, _| 5.0);
        let result = filter_and_group(
            &table,
            "ts",
            "value",
            &IndexMap::new(),
            Some(&AggregateSpec::default()),
            &Grouping::default(),
            Some(24),
        )
        .unwrap();

        assert_eq!(result.filtered.len(), 48);
        assert_eq!(result.grouped.len(), 24);
        for (i, row) in result.grouped.rows.iter().enumerate() {
            assert_eq!(row.degrees, 15.0 * i as f64);
            assert_eq!(row.value, 5.0);
            assert!(row.keys.is_empty());
        }
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_mean_per_bucket() {
        let table = hourly_rows(2, |day, hour| (day * 10 + hour) as f64);
        let result = filter_and_group(
            &table,
            "ts",
            "value",
            &IndexMap::new(),
            None,
            &Grouping::default(),
            None,
        )
        .unwrap();
        let row = &result.grouped.rows[3];
        assert_eq!(row.degrees, 45.0);
        assert_eq!(row.value, (3.0 + 13.0) / 2.0);
    }

    #[test]
    fn test_group_by_color_column() {
        // 2022-01-03 (Mon) .. 2022-01-09 (Sun)
        let table = hourly_rows(7, |_, _| 1.0);
        let grouping = Grouping {
            color: Some("weekend".to_string()),
            ..Default::default()
        };
        let result = filter_and_group(&table, "ts", "value", &IndexMap::new(), None, &grouping, None)
            .unwrap();
        assert_eq!(result.grouped.key_columns, vec!["weekend"]);
        assert_eq!(result.grouped.groups(), vec![vec!["Weekday".to_string()], vec!["Weekend".to_string()]]);
        assert_eq!(result.grouped.len(), 48);
    }

    #[test]
    fn test_key_order_line_group_color_dash() {
        let grouping = Grouping {
            line_group: Some("date".to_string()),
            color: Some("weekend".to_string()),
            line_dash: Some("season".to_string()),
        };
        assert_eq!(grouping.columns(), vec!["date", "weekend", "season"]);
        assert_eq!(grouping.style_columns(), vec!["weekend", "date", "season"]);
    }

    #[test]
    fn test_filters_equality_and_membership() {
        let table = hourly_rows(7, |_, _| 1.0);
        let f = filters(vec![
            ("dayofweek", FilterValue::from(vec!["Sat", "Sun"])),
            ("hour", FilterValue::Number(6.0)),
        ]);
        let result = filter_and_group(&table, "ts", "value", &f, None, &Grouping::default(), None)
            .unwrap();
        assert_eq!(result.filtered.len(), 2);
        assert_eq!(result.grouped.len(), 1);
        assert_eq!(result.grouped.rows[0].degrees, 90.0);
    }

    #[test]
    fn test_filtering_is_idempotent() {
        let table = features::derive(&hourly_rows(7, |_, h| h as f64), "ts", 24).unwrap();
        let f = filters(vec![("weekend", FilterValue::from("Weekend"))]);
        let once = apply_filters(&table, &f).unwrap();
        let twice = apply_filters(&once, &f).unwrap();
        assert_eq!(once, twice);
        assert_eq!(once.len(), 48);
    }

    #[test]
    fn test_empty_filter_result() {
        let table = hourly_rows(1, |_, _| 1.0);
        let f = filters(vec![("dayofweek", FilterValue::from("Sun"))]);
        let err = filter_and_group(&table, "ts", "value", &f, None, &Grouping::default(), None)
            .unwrap_err();
        assert_eq!(err, ClockError::EmptyResult);
    }

    #[test]
    fn test_missing_column_listed() {
        let table = hourly_rows(1, |_, _| 1.0);
        let grouping = Grouping {
            color: Some("dayofwek".to_string()),
            ..Default::default()
        };
        let f = filters(vec![("region", FilterValue::from("north"))]);
        let err = filter_and_group(&table, "ts", "value", &f, None, &grouping, None).unwrap_err();
        assert_eq!(
            err,
            ClockError::MissingColumns {
                columns: vec!["dayofwek".to_string(), "region".to_string()]
            }
        );
    }

    #[test]
    fn test_missing_timestamp_listed_with_other_columns() {
        let table = hourly_rows(1, |_, _| 1.0);
        let grouping = Grouping {
            color: Some("meter".to_string()),
            line_dash: Some("weekend".to_string()),
            ..Default::default()
        };
        let err = filter_and_group(&table, "time", "value", &IndexMap::new(), None, &grouping, Some(24))
            .unwrap_err();
        // weekend is derivable, so only the timestamp and meter are reported
        assert_eq!(
            err,
            ClockError::MissingColumns {
                columns: vec!["time".to_string(), "meter".to_string()]
            }
        );
    }

    #[test]
    fn test_existing_columns_skip_derivation() {
        let table = Table::new(
            vec!["ts".to_string(), "degrees".to_string(), "site".to_string(), "value".to_string()],
            vec![
                vec!["garbage".to_string(), "0".to_string(), "A".to_string(), "1".to_string()],
                vec!["garbage".to_string(), "0".to_string(), "A".to_string(), "3".to_string()],
            ],
        );
        let grouping = Grouping {
            color: Some("site".to_string()),
            ..Default::default()
        };
        let result = filter_and_group(&table, "ts", "value", &IndexMap::new(), None, &grouping, None)
            .unwrap();
        assert_eq!(result.grouped.rows[0].value, 2.0);
    }

    #[test]
    fn test_negative_values_warn() {
        let table = hourly_rows(1, |_, hour| hour as f64 - 12.0);
        let result = filter_and_group(
            &table,
            "ts",
            "value",
            &IndexMap::new(),
            None,
            &Grouping::default(),
            None,
        )
        .unwrap();
        assert_eq!(
            result.warnings,
            vec![ClockWarning::NegativeValues { column: "value".to_string() }]
        );
    }

    #[test]
    fn test_numeric_keys_sorted_numerically() {
        let table = Table::new(
            vec!["k".to_string(), "degrees".to_string(), "v".to_string()],
            vec![
                vec!["10".to_string(), "0".to_string(), "1".to_string()],
                vec!["9".to_string(), "0".to_string(), "1".to_string()],
            ],
        );
        let grouped = aggregate_by(&table, "v", &["k".to_string()], Aggregation::Sum).unwrap();
        assert_eq!(grouped.groups(), vec![vec!["9".to_string()], vec!["10".to_string()]]);
    }

    #[test]
    fn test_distinct_groups() {
        let table = features::derive(&hourly_rows(7, |_, _| 1.0), "ts", 24).unwrap();
        let groups = distinct_groups(&table, &["weekend".to_string(), "dayofweek".to_string()]).unwrap();
        assert_eq!(groups.len(), 7);
        assert_eq!(groups[0], vec!["Weekday".to_string(), "Fri".to_string()]);
        assert!(distinct_groups(&table, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_to_table() {
        let grouped = GroupedTable {
            key_columns: vec!["season".to_string()],
            value_column: "v".to_string(),
            rows: vec![GroupedRow {
                keys: vec!["Winter".to_string()],
                degrees: 15.0,
                value: 2.5,
            }],
        };
        let table = grouped.to_table();
        assert_eq!(table.headers, vec!["season", "degrees", "v"]);
        assert_eq!(table.rows[0], vec!["Winter", "15", "2.5"]);
    }
}
