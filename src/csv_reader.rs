// CSV ingestion and export

use crate::data::Table;
use anyhow::{Context, Result};
use std::io::{self, Read, Write};

/// Read CSV from stdin
pub fn read_csv_from_stdin() -> Result<Table> {
    let stdin = io::stdin();
    read_csv(stdin.lock())
}

/// Read CSV with a header row from any reader
pub fn read_csv<R: Read>(reader: R) -> Result<Table> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .context("Failed to read CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    if headers.is_empty() {
        anyhow::bail!("CSV input has no header row");
    }

    let mut rows = Vec::new();
    for (idx, record) in rdr.records().enumerate() {
        let record = record.with_context(|| format!("Failed to read CSV record {}", idx + 1))?;
        rows.push(record.iter().map(|s| s.to_string()).collect());
    }

    if rows.is_empty() {
        anyhow::bail!("CSV input must contain at least one data row");
    }

    Ok(Table::new(headers, rows))
}

/// Write a table as CSV, header row first
pub fn write_csv<W: Write>(table: &Table, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(&table.headers)
        .context("Failed to write CSV headers")?;
    for row in &table.rows {
        wtr.write_record(row).context("Failed to write CSV record")?;
    }
    wtr.flush().context("Failed to flush CSV output")?;
    Ok(())
}
