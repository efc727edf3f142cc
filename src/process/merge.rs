// src/process/merge.rs
use tracing::{info, warn};

use super::{Datasets, DATE, OUTCOMES_COUNTRY, POLICY_COUNTRY};
use crate::config::VariantJoin;
use crate::error::{PipelineError, Result};
use crate::table::{join, JoinKind, Table};

/// Indicator columns sourced from the policy-variant table (lowercased,
/// spaces included as published).
pub const VARIANT_COLUMNS: [&str; 4] = [
    "e3_fiscal measures",
    "e4_international support",
    "h4_emergency investment in healthcare",
    "h5_investment in vaccines",
];

/// Merger: `oxford ⟕ owid` on (country, date), then the four variant
/// columns on (countryname, date).
///
/// The result has exactly one row per policy row; anything else is a
/// `JoinCardinality` failure.
#[tracing::instrument(level = "info", skip_all)]
pub fn merge_datasets(datasets: &Datasets, variant_join: VariantJoin) -> Result<Table> {
    let expected = datasets.oxford.len();

    let mut df = join(
        &datasets.oxford,
        &datasets.owid,
        &[(POLICY_COUNTRY, OUTCOMES_COUNTRY), (DATE, DATE)],
        JoinKind::Left,
    )?;
    if df.len() != expected {
        return Err(PipelineError::JoinCardinality {
            stage: "outcomes join",
            expected,
            actual: df.len(),
        });
    }

    let mut projection = vec![POLICY_COUNTRY, DATE];
    projection.extend(VARIANT_COLUMNS);
    let variant = datasets.oxford_nice.select(&projection)?;

    let kind = match variant_join {
        VariantJoin::Strict => JoinKind::Inner,
        VariantJoin::Lenient => JoinKind::Left,
    };
    df = join(&df, &variant, &[(POLICY_COUNTRY, POLICY_COUNTRY), (DATE, DATE)], kind)?;
    if df.len() != expected {
        return Err(PipelineError::JoinCardinality {
            stage: "policy-variant join",
            expected,
            actual: df.len(),
        });
    }

    if variant_join == VariantJoin::Lenient {
        let idx = df.column_index(VARIANT_COLUMNS[0])?;
        let unmatched = df.rows.iter().filter(|r| r[idx].is_missing()).count();
        if unmatched > 0 {
            warn!(unmatched, "policy rows without a variant match kept with missing values");
        }
    }

    df.name = "merged".to_string();
    info!(rows = df.len(), cols = df.width(), "shape after merging");
    Ok(df)
}
