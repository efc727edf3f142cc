// src/summary/mod.rs
//! Univariate summary of every column of the final table.

use anyhow::Result;
use arrow::datatypes::DataType;
use std::{collections::HashMap, path::Path};
use tracing::info;

use crate::schema::infer_arrow_schema;
use crate::table::{csv_io, Cell, Table};

pub const SUMMARY_HEADERS: [&str; 15] = [
    "variable",
    "col_number",
    "type",
    "count",
    "missing_pct",
    "unique",
    "top",
    "freq",
    "mean",
    "std",
    "min",
    "25%",
    "50%",
    "75%",
    "max",
];

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    pub variable: String,
    /// 1-based position in the table.
    pub col_number: usize,
    /// "str", "date" or "float64".
    pub kind: &'static str,
    pub count: usize,
    pub missing_pct: Option<f64>,
    pub unique: usize,
    pub top: Option<String>,
    pub freq: Option<usize>,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<Cell>,
    pub q25: Option<f64>,
    pub q50: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<Cell>,
}

fn kind_name(dt: &DataType) -> &'static str {
    match dt {
        DataType::Float64 => "float64",
        DataType::Date32 => "date",
        _ => "str",
    }
}

/// Linear-interpolated quantile of an ascending slice.
fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

fn numeric_stats(summary: &mut ColumnSummary, cells: &[&Cell]) {
    let mut values: Vec<f64> = cells.iter().filter_map(|c| c.as_f64()).collect();
    if values.is_empty() {
        return;
    }
    values.sort_by(f64::total_cmp);
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    summary.mean = Some(mean);
    if values.len() > 1 {
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        summary.std = Some(var.sqrt());
    }
    summary.min = values.first().copied().map(Cell::Number);
    summary.max = values.last().copied().map(Cell::Number);
    summary.q25 = quantile(&values, 0.25);
    summary.q50 = quantile(&values, 0.50);
    summary.q75 = quantile(&values, 0.75);
}

fn categorical_stats(summary: &mut ColumnSummary, cells: &[&Cell]) {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    for key in cells.iter().filter_map(|c| c.key()) {
        let n = counts.entry(key.clone()).or_insert(0);
        if *n == 0 {
            order.push(key);
        }
        *n += 1;
    }
    // first seen wins ties
    let mut best: Option<(&String, usize)> = None;
    for key in &order {
        let n = counts[key];
        if best.map_or(true, |(_, b)| n > b) {
            best = Some((key, n));
        }
    }
    if let Some((key, n)) = best {
        summary.top = Some(key.clone());
        summary.freq = Some(n);
    }

    let dates: Vec<_> = cells.iter().filter_map(|c| c.as_date()).collect();
    summary.min = dates.iter().min().copied().map(Cell::Date);
    summary.max = dates.iter().max().copied().map(Cell::Date);
}

/// Describe every column of `table`.
pub fn summarize(table: &Table) -> Vec<ColumnSummary> {
    let schema = infer_arrow_schema(table);
    schema
        .fields()
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let cells: Vec<&Cell> = table.rows.iter().map(|r| &r[i]).collect();
            let count = cells.iter().filter(|c| !c.is_missing()).count();
            let unique = {
                let mut seen: Vec<String> = cells.iter().filter_map(|c| c.key()).collect();
                seen.sort();
                seen.dedup();
                seen.len()
            };
            let mut summary = ColumnSummary {
                variable: field.name().clone(),
                col_number: i + 1,
                kind: kind_name(field.data_type()),
                count,
                missing_pct: (!table.is_empty())
                    .then(|| 1.0 - count as f64 / table.len() as f64),
                unique,
                top: None,
                freq: None,
                mean: None,
                std: None,
                min: None,
                q25: None,
                q50: None,
                q75: None,
                max: None,
            };
            match field.data_type() {
                DataType::Float64 => numeric_stats(&mut summary, &cells),
                _ => categorical_stats(&mut summary, &cells),
            }
            summary
        })
        .collect()
}

/// Lay the summaries out as a table with [`SUMMARY_HEADERS`].
pub fn summary_table(summaries: &[ColumnSummary]) -> Table {
    let num = |v: Option<f64>| v.map(Cell::Number).unwrap_or(Cell::Missing);
    let rows = summaries
        .iter()
        .map(|s| {
            vec![
                Cell::text(s.variable.as_str()),
                Cell::Number(s.col_number as f64),
                Cell::text(s.kind),
                Cell::Number(s.count as f64),
                num(s.missing_pct),
                Cell::Number(s.unique as f64),
                s.top.clone().map(Cell::Text).unwrap_or(Cell::Missing),
                num(s.freq.map(|f| f as f64)),
                num(s.mean),
                num(s.std),
                s.min.clone().unwrap_or(Cell::Missing),
                num(s.q25),
                num(s.q50),
                num(s.q75),
                s.max.clone().unwrap_or(Cell::Missing),
            ]
        })
        .collect();
    Table::from_rows("var_summary", &SUMMARY_HEADERS, rows)
}

/// Summarize `table` and write the report with every field quoted.
pub fn write_summary<P: AsRef<Path>>(table: &Table, path: P) -> Result<Vec<ColumnSummary>> {
    let summaries = summarize(table);
    csv_io::write_csv_file(&summary_table(&summaries), &path, true)?;
    info!(path = %path.as_ref().display(), columns = summaries.len(), "wrote summary");
    Ok(summaries)
}
