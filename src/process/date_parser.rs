// src/process/date_parser.rs
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::{Datasets, DATE, POLICY_COUNTRY};
use crate::error::{PipelineError, Result};
use crate::table::{Cell, Table};

/// Slice a date string into year/month/day and parse it.
///
/// Accepts `YYYYMMDD` (8 ASCII digits) or any 10-char `YYYY?MM?DD` with a
/// non-digit separator at positions 4 and 7.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if !s.is_ascii() {
        return None;
    }
    let b = s.as_bytes();
    let (y, m, d) = match b.len() {
        8 if b.iter().all(u8::is_ascii_digit) => (&s[0..4], &s[4..6], &s[6..8]),
        10 if !b[4].is_ascii_digit() && !b[7].is_ascii_digit() => {
            (&s[0..4], &s[5..7], &s[8..10])
        }
        _ => return None,
    };
    let all_digits = |p: &str| p.bytes().all(|c| c.is_ascii_digit());
    if !(all_digits(y) && all_digits(m) && all_digits(d)) {
        return None;
    }
    NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, d.parse().ok()?)
}

/// Convert one cell of a `date` column. Integer-valued numbers are read as
/// `YYYYMMDD` (CSV inference turns `20200101` into a number).
fn date_cell(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Date(d) => Some(*d),
        Cell::Text(s) => parse_date(s),
        Cell::Number(v) if v.fract() == 0.0 && *v >= 0.0 => parse_date(&format!("{:.0}", v)),
        _ => None,
    }
}

/// Lowercase headers and convert the `date` column of `table` in place.
pub fn normalize_table(table: &mut Table) -> Result<()> {
    table.lowercase_headers();
    let idx = table.column_index(DATE)?;
    for (row_no, row) in table.rows.iter_mut().enumerate() {
        let parsed = date_cell(&row[idx]).ok_or_else(|| PipelineError::UnparseableDate {
            table: table.name.clone(),
            row: row_no,
            value: row[idx].render(),
        })?;
        row[idx] = Cell::Date(parsed);
    }
    debug!(table = %table.name, rows = table.len(), "dates normalized");
    Ok(())
}

/// Rewrite policy-side country names through the alias table.
pub fn apply_country_aliases(table: &mut Table, aliases: &BTreeMap<String, String>) -> Result<usize> {
    if aliases.is_empty() {
        return Ok(0);
    }
    let idx = table.column_index(POLICY_COUNTRY)?;
    let mut renamed = 0;
    for row in table.rows.iter_mut() {
        let target = row[idx].as_str().and_then(|name| aliases.get(name));
        if let Some(target) = target {
            row[idx] = Cell::Text(target.clone());
            renamed += 1;
        }
    }
    Ok(renamed)
}

/// Schema normalizer: lowercase every header, canonicalize every `date`
/// column, then apply country aliases to the two policy tables.
#[tracing::instrument(level = "info", skip_all)]
pub fn normalize(datasets: &mut Datasets, aliases: &BTreeMap<String, String>) -> Result<()> {
    for table in datasets.tables_mut() {
        normalize_table(table)?;
    }
    for table in [&mut datasets.oxford, &mut datasets.oxford_nice] {
        let renamed = apply_country_aliases(table, aliases)?;
        if renamed > 0 {
            info!(table = %table.name, renamed, "applied country aliases");
        }
    }
    Ok(())
}
