// src/process/filler.rs
//! The policy table has a row for every country on every date, while the
//! outcomes table only has rows where something was reported. After the
//! left join, outcome attributes that never change for a country (median
//! age, population, ...) are missing on those filler rows. They are
//! restored here from the country's other rows.

use std::collections::HashMap;
use tracing::debug;

use super::POLICY_COUNTRY;
use crate::error::{PipelineError, Result};
use crate::table::{Cell, Table};

/// Outcome attributes that are constant per country in the source.
pub const FILLER_COLUMNS: [&str; 16] = [
    "continent",
    "population",
    "population_density",
    "median_age",
    "aged_65_older",
    "aged_70_older",
    "gdp_per_capita",
    "extreme_poverty",
    "cardiovasc_death_rate",
    "diabetes_prevalence",
    "female_smokers",
    "male_smokers",
    "handwashing_facilities",
    "hospital_beds_per_thousand",
    "life_expectancy",
    "human_development_index",
];

/// Largest non-blank cell; blank text sorts below everything, so it only
/// wins when nothing else is present (and then becomes missing).
fn canonical(current: Option<&Cell>, candidate: &Cell) -> bool {
    if candidate.is_blank() {
        return false;
    }
    match current {
        None => true,
        Some(cur) => candidate.total_cmp(cur).is_gt(),
    }
}

/// Filler reconciler: give every row its country's canonical value for each
/// of [`FILLER_COLUMNS`]. Countries with no observation stay missing.
#[tracing::instrument(level = "info", skip_all)]
pub fn update_filler_rows(table: &mut Table) -> Result<()> {
    update_columns(table, &FILLER_COLUMNS)
}

pub fn update_columns(table: &mut Table, columns: &[&str]) -> Result<()> {
    let country = table.column_index(POLICY_COUNTRY)?;
    let cols = columns
        .iter()
        .map(|c| {
            table.column_index(c).map_err(|_| PipelineError::SchemaDrift {
                stage: "filler rows",
                column: c.to_string(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut values: HashMap<String, Vec<Option<Cell>>> = HashMap::new();
    for row in &table.rows {
        let Some(key) = row[country].key() else {
            continue;
        };
        let slot = values
            .entry(key)
            .or_insert_with(|| vec![None; cols.len()]);
        for (j, &ci) in cols.iter().enumerate() {
            if canonical(slot[j].as_ref(), &row[ci]) {
                slot[j] = Some(row[ci].clone());
            }
        }
    }

    let mut filled = 0usize;
    for row in table.rows.iter_mut() {
        let Some(found) = row[country].key().and_then(|k| values.get(&k)) else {
            continue;
        };
        for (j, &ci) in cols.iter().enumerate() {
            let value = found[j].clone().unwrap_or(Cell::Missing);
            if row[ci].is_missing() && !value.is_missing() {
                filled += 1;
            }
            row[ci] = value;
        }
    }
    debug!(filled, countries = values.len(), "filler values restored");
    Ok(())
}
