// src/process/mod.rs
//! The alignment-and-reconciliation pipeline.
//!
//! Stages run strictly in order, each fully materializing its output:
//! normalize → date window → countries → regional rows → merge → ISO codes →
//! filler rows → recode → derived columns → finalize.

use anyhow::{Context, Result};
use tracing::info;

use crate::config::{PipelineOptions, Sources};
use crate::table::{csv_io, Table};

pub mod countries;
pub mod date_parser;
pub mod filler;
pub mod finalize;
pub mod iso;
pub mod merge;
pub mod recode;
pub mod window;

/// Country column of the outcomes (OWID) table.
pub const OUTCOMES_COUNTRY: &str = "location";
/// Country column of both policy (OxCGRT) tables.
pub const POLICY_COUNTRY: &str = "countryname";
/// Sub-national region column of the policy tables.
pub const POLICY_REGION: &str = "regionname";
pub const DATE: &str = "date";

/// The three source tables threaded through the early stages.
#[derive(Debug, Clone)]
pub struct Datasets {
    /// Outcomes: one row per (country, date) with reported data.
    pub owid: Table,
    /// Policy tracker, combined flavour: dense (country-or-region, date) grid.
    pub oxford: Table,
    /// Policy tracker variant; only four indicator columns are used.
    pub oxford_nice: Table,
}

impl Datasets {
    pub fn tables(&self) -> [&Table; 3] {
        [&self.owid, &self.oxford, &self.oxford_nice]
    }

    pub fn tables_mut(&mut self) -> [&mut Table; 3] {
        [&mut self.owid, &mut self.oxford, &mut self.oxford_nice]
    }

    pub fn row_counts(&self) -> [usize; 3] {
        [self.owid.len(), self.oxford.len(), self.oxford_nice.len()]
    }

    /// Apply one keep-mask per table (owid, oxford, oxford_nice), logging the
    /// before/planned/after row counts whenever anything is dropped.
    /// Returns the number of rows dropped from each table.
    pub fn retain(&mut self, reason: &str, masks: [Vec<bool>; 3]) -> [usize; 3] {
        let planned = masks
            .each_ref()
            .map(|m| m.iter().filter(|keep| !**keep).count());
        if planned.iter().all(|&n| n == 0) {
            return planned;
        }

        let [owid, oxford, nice] = self.row_counts();
        info!(owid, oxford, oxford_nice = nice, "{reason}: before drop");
        info!(
            owid = planned[0],
            oxford = planned[1],
            oxford_nice = planned[2],
            "{reason}: plan to drop"
        );

        for (table, mask) in self.tables_mut().into_iter().zip(masks.iter()) {
            table.retain_mask(mask);
        }

        let [owid, oxford, nice] = self.row_counts();
        info!(owid, oxford, oxford_nice = nice, "{reason}: after drop");
        planned
    }
}

/// Read the three cached source CSVs.
pub fn load_datasets(sources: &Sources) -> Result<Datasets> {
    let ds = Datasets {
        owid: csv_io::read_csv(&sources.owid.path, "owid").context("loading OWID")?,
        oxford: csv_io::read_csv(&sources.oxford.path, "oxford").context("loading Oxford")?,
        oxford_nice: csv_io::read_csv(&sources.oxford_nice.path, "oxford_nice")
            .context("loading Oxford (nice)")?,
    };
    let [owid, oxford, nice] = ds.row_counts();
    info!(owid, oxford, oxford_nice = nice, "initial row counts");
    Ok(ds)
}

/// Run every stage, returning the finalized public table.
#[tracing::instrument(level = "info", skip_all)]
pub fn run(
    mut datasets: Datasets,
    iso_codes: &Table,
    opts: &PipelineOptions,
) -> crate::error::Result<Table> {
    date_parser::normalize(&mut datasets, &opts.country_aliases)?;
    let window = window::intersect_dates(&mut datasets, opts.lag_days)?;
    info!(start = %window.start, end = %window.end, "aligned date window");
    countries::intersect_countries(&mut datasets)?;
    countries::remove_regional_rows(&mut datasets)?;

    let merged = merge::merge_datasets(&datasets, opts.variant_join)?;
    let mut df = iso::add_iso_codes(merged, iso_codes)?;
    filler::update_filler_rows(&mut df)?;
    recode::recode_policy_flags(&mut df)?;
    recode::relabel_combined(&mut df)?;
    finalize::add_vaccinations_per_hundred(&mut df)?;
    finalize::OutputSchema::standard().apply(&mut df)?;

    info!(rows = df.len(), cols = df.width(), "final output shape");
    Ok(df)
}
