// src/table/csv_io.rs
use anyhow::{Context, Result};
use csv::{QuoteStyle, ReaderBuilder, WriterBuilder};
use std::{
    fs::{self, File},
    io::{Read, Write},
    path::Path,
};
use tracing::debug;

use super::{Cell, Table};

/// Read a headed CSV file into a [`Table`], inferring each cell's kind.
#[tracing::instrument(level = "debug", skip(path), fields(path = %path.as_ref().display()))]
pub fn read_csv<P: AsRef<Path>>(path: P, name: &str) -> Result<Table> {
    let file = File::open(&path)
        .with_context(|| format!("Failed to open CSV file: {:?}", path.as_ref()))?;
    read_csv_from(file, name).with_context(|| format!("Failed to load {:?}", path.as_ref()))
}

/// Same as [`read_csv`] but from any reader (used by tests with in-memory data).
pub fn read_csv_from<R: Read>(reader: R, name: &str) -> Result<Table> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .context("reading CSV header row")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut table = Table::new(name, headers);
    for (idx, result) in rdr.records().enumerate() {
        let record =
            result.with_context(|| format!("CSV parse error in {} at record {}", name, idx))?;
        table.rows.push(record.iter().map(Cell::parse).collect());
    }
    debug!(rows = table.len(), cols = table.width(), "loaded {}", name);
    Ok(table)
}

/// Write `table` as CSV with a header row and no index column.
/// `quote_all` quotes every field.
pub fn write_csv<W: Write>(table: &Table, writer: W, quote_all: bool) -> Result<()> {
    let style = if quote_all {
        QuoteStyle::Always
    } else {
        QuoteStyle::Necessary
    };
    let mut wtr = WriterBuilder::new().quote_style(style).from_writer(writer);
    wtr.write_record(&table.headers)?;
    for row in &table.rows {
        wtr.write_record(row.iter().map(Cell::render))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write atomically: to `<path>.tmp`, then rename over the target.
pub fn write_csv_file<P: AsRef<Path>>(table: &Table, path: P, quote_all: bool) -> Result<()> {
    let path = path.as_ref();
    let tmp = path.with_extension("csv.tmp");
    let file = File::create(&tmp).with_context(|| format!("creating {:?}", tmp))?;
    write_csv(table, file, quote_all)?;
    fs::rename(&tmp, path).with_context(|| format!("renaming {:?} -> {:?}", tmp, path))?;
    Ok(())
}
