// src/process/iso.rs
use std::collections::HashSet;
use tracing::{info, warn};

use super::POLICY_COUNTRY;
use crate::error::{PipelineError, Result};
use crate::table::{join, JoinKind, Table};

/// Country-name column of the ISO reference table.
pub const ISO_COUNTRY: &str = "country";
pub const ISO_CODE: &str = "iso_code";

/// ISO code joiner: inner join against the country → alpha-3 reference.
///
/// Countries missing from the reference are dropped by the join; they are
/// listed in a warning so the reference can be brought back in sync.
#[tracing::instrument(level = "info", skip_all)]
pub fn add_iso_codes(df: Table, iso_codes: &Table) -> Result<Table> {
    iso_codes.column_index(ISO_CODE)?;
    let known: HashSet<String> = iso_codes.distinct(ISO_COUNTRY)?.into_iter().collect();
    let unknown: Vec<String> = df
        .distinct(POLICY_COUNTRY)?
        .into_iter()
        .filter(|c| !known.contains(c))
        .collect();
    if !unknown.is_empty() {
        warn!(?unknown, "countries without an ISO code will be dropped");
    }

    info!(rows = df.len(), cols = df.width(), "shape before adding ISO codes");
    let mut out = join(&df, iso_codes, &[(POLICY_COUNTRY, ISO_COUNTRY)], JoinKind::Inner)?;
    out.drop_columns(&[ISO_COUNTRY])?;
    info!(rows = out.len(), cols = out.width(), "shape after adding ISO codes");

    if out.is_empty() {
        return Err(PipelineError::EmptyIntersection {
            stage: "ISO code join",
            detail: "no merged country has an ISO code".to_string(),
        });
    }
    Ok(out)
}
