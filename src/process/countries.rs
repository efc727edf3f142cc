// src/process/countries.rs
use std::collections::HashSet;
use tracing::info;

use super::{Datasets, DATE, OUTCOMES_COUNTRY, POLICY_COUNTRY, POLICY_REGION};
use crate::error::{PipelineError, Result};
use crate::table::Table;

fn membership_mask(table: &Table, column: &str, keep: &HashSet<&str>) -> Result<Vec<bool>> {
    Ok(table
        .column(column)?
        .into_iter()
        .map(|c| c.key().is_some_and(|k| keep.contains(k.as_str())))
        .collect())
}

/// Country intersector: keep only countries named in both primary tables.
///
/// Names are compared verbatim; spelling differences between the feeds
/// must be harmonized beforehand through the alias table. Returns the
/// surviving countries in outcomes-table order.
#[tracing::instrument(level = "info", skip_all)]
pub fn intersect_countries(datasets: &mut Datasets) -> Result<Vec<String>> {
    let owid_countries = datasets.owid.distinct(OUTCOMES_COUNTRY)?;
    let oxford_countries = datasets.oxford.distinct(POLICY_COUNTRY)?;

    let owid_set: HashSet<&str> = owid_countries.iter().map(String::as_str).collect();
    let oxford_set: HashSet<&str> = oxford_countries.iter().map(String::as_str).collect();

    let only_oxford: Vec<&str> = oxford_countries
        .iter()
        .map(String::as_str)
        .filter(|c| !owid_set.contains(c))
        .collect();
    let only_owid: Vec<&str> = owid_countries
        .iter()
        .map(String::as_str)
        .filter(|c| !oxford_set.contains(c))
        .collect();
    info!("countries in oxford, but not in OWID: {:?}", only_oxford);
    info!("countries in OWID, but not in oxford: {:?}", only_owid);

    let shared: Vec<String> = owid_countries
        .iter()
        .filter(|c| oxford_set.contains(c.as_str()))
        .cloned()
        .collect();
    if shared.is_empty() {
        return Err(PipelineError::EmptyIntersection {
            stage: "country intersection",
            detail: format!(
                "{} outcome countries and {} policy countries share no name",
                owid_countries.len(),
                oxford_countries.len()
            ),
        });
    }

    let keep: HashSet<&str> = shared.iter().map(String::as_str).collect();
    let masks = [
        membership_mask(&datasets.owid, OUTCOMES_COUNTRY, &keep)?,
        membership_mask(&datasets.oxford, POLICY_COUNTRY, &keep)?,
        membership_mask(&datasets.oxford_nice, POLICY_COUNTRY, &keep)?,
    ];
    datasets.retain("drop countries missing from either dataset", masks);
    info!(countries = shared.len(), "country intersection");
    Ok(shared)
}

fn national_mask(table: &Table) -> Result<Vec<bool>> {
    Ok(table
        .column(POLICY_REGION)?
        .into_iter()
        .map(|c| c.is_blank())
        .collect())
}

/// Regional-row filter: drop sub-national policy rows, then insist on one
/// row per (country, date) in both policy tables.
#[tracing::instrument(level = "info", skip_all)]
pub fn remove_regional_rows(datasets: &mut Datasets) -> Result<()> {
    let masks = [
        vec![true; datasets.owid.len()],
        national_mask(&datasets.oxford)?,
        national_mask(&datasets.oxford_nice)?,
    ];
    datasets.retain("remove regional data", masks);

    datasets.oxford.ensure_unique(&[POLICY_COUNTRY, DATE])?;
    datasets.oxford_nice.ensure_unique(&[POLICY_COUNTRY, DATE])?;
    Ok(())
}
