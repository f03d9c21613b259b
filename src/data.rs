use anyhow::{anyhow, Result};
use serde_json::Value;

use crate::error::ClockError;

/// In-memory table with string cells, addressed by column name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Build a table from JSON records (an array of objects).
    ///
    /// Columns are the union of record keys, in the order first seen. Null
    /// and absent fields become empty cells.
    pub fn from_records(value: &Value) -> Result<Self> {
        let records = value
            .as_array()
            .ok_or_else(|| anyhow!("JSON input must be an array of records"))?;

        let mut headers: Vec<String> = Vec::new();
        for (i, record) in records.iter().enumerate() {
            let fields = record
                .as_object()
                .ok_or_else(|| anyhow!("Record {} is not a JSON object", i + 1))?;
            for key in fields.keys() {
                if !headers.contains(key) {
                    headers.push(key.clone());
                }
            }
        }

        let rows = records
            .iter()
            .filter_map(Value::as_object)
            .map(|fields| {
                headers
                    .iter()
                    .map(|column| match fields.get(column) {
                        None | Some(Value::Null) => Ok(String::new()),
                        Some(Value::String(s)) => Ok(s.clone()),
                        Some(Value::Number(n)) => Ok(n.to_string()),
                        Some(Value::Bool(b)) => Ok(b.to_string()),
                        Some(_) => Err(anyhow!("Field '{}' holds a nested value", column)),
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { headers, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Borrow every cell of a column, in row order
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(idx).map(String::as_str).unwrap_or(""))
                .collect(),
        )
    }

    /// Replace the column if it exists, append it otherwise.
    pub fn set_column(&mut self, name: &str, values: Vec<String>) {
        debug_assert_eq!(values.len(), self.rows.len());
        match self.column_index(name) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    if row.len() <= idx {
                        row.resize(idx + 1, String::new());
                    }
                    row[idx] = value;
                }
            }
            None => {
                self.headers.push(name.to_string());
                let width = self.headers.len();
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.resize(width - 1, String::new());
                    row.push(value);
                }
            }
        }
    }

    /// Keep only the rows whose cell at `idx` satisfies `predicate`
    pub fn filter_rows<F>(&self, idx: usize, predicate: F) -> Table
    where
        F: Fn(&str) -> bool,
    {
        let rows = self
            .rows
            .iter()
            .filter(|row| predicate(row.get(idx).map(String::as_str).unwrap_or("")))
            .cloned()
            .collect();
        Table {
            headers: self.headers.clone(),
            rows,
        }
    }

    /// Parse a column as numbers. Empty cells are missing values.
    pub fn numeric_column(&self, name: &str) -> crate::error::Result<Vec<Option<f64>>> {
        let cells = self.column(name).ok_or_else(|| ClockError::MissingColumns {
            columns: vec![name.to_string()],
        })?;
        cells
            .into_iter()
            .enumerate()
            .map(|(row_idx, cell)| parse_cell(cell, name, row_idx))
            .collect()
    }
}

fn parse_cell(cell: &str, column: &str, row_idx: usize) -> crate::error::Result<Option<f64>> {
    let trimmed = cell.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    trimmed
        .parse::<f64>()
        .map(Some)
        .map_err(|_| ClockError::InvalidValue {
            column: column.to_string(),
            row: row_idx + 1,
            value: cell.to_string(),
        })
}

/// Format a number the way it should appear in a cell: integers without a
/// fractional part, everything else in shortest round-trip form.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Order cells numerically when both parse as numbers, lexically otherwise
pub fn compare_cells(a: &str, b: &str) -> std::cmp::Ordering {
    match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
        (Ok(fa), Ok(fb)) => fa.partial_cmp(&fb).unwrap_or(std::cmp::Ordering::Equal),
        (Ok(_), Err(_)) => std::cmp::Ordering::Less,
        (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
        _ => a.cmp(b),
    }
}
