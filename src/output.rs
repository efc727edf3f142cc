// src/output.rs
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::info;

use crate::schema::write_parquet;
use crate::summary::write_summary;
use crate::table::{csv_io, Table};

/// Files produced by one run.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputPaths {
    pub data: PathBuf,
    pub summary: PathBuf,
    pub parquet: Option<PathBuf>,
}

impl OutputPaths {
    /// `covid_data_<YYYYmmdd-HHMMSS>.csv` and `var_summary_<YYYYmmdd>.csv`.
    pub fn stamped(dir: &Path, now: DateTime<Local>, parquet: bool) -> Self {
        let stamp = now.format("%Y%m%d-%H%M%S");
        Self {
            data: dir.join(format!("covid_data_{stamp}.csv")),
            summary: dir.join(format!("var_summary_{}.csv", now.format("%Y%m%d"))),
            parquet: parquet.then(|| dir.join(format!("covid_data_{stamp}.parquet"))),
        }
    }
}

/// Write the finalized table, its summary and the optional Parquet mirror.
pub fn write_outputs(table: &Table, dir: &Path, parquet: bool) -> Result<OutputPaths> {
    fs::create_dir_all(dir).with_context(|| format!("creating output directory {:?}", dir))?;
    let paths = OutputPaths::stamped(dir, Local::now(), parquet);

    csv_io::write_csv_file(table, &paths.data, false)
        .with_context(|| format!("writing {:?}", paths.data))?;
    info!(path = %paths.data.display(), rows = table.len(), "wrote dataset");

    write_summary(table, &paths.summary)?;
    if let Some(p) = &paths.parquet {
        write_parquet(table, p)?;
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Cell;
    use chrono::TimeZone;
    use tempfile::tempdir;

    #[test]
    fn file_names_carry_timestamps() {
        let now = Local.with_ymd_and_hms(2021, 6, 1, 13, 5, 9).unwrap();
        let p = OutputPaths::stamped(Path::new("out"), now, false);
        assert_eq!(p.data, PathBuf::from("out/covid_data_20210601-130509.csv"));
        assert_eq!(p.summary, PathBuf::from("out/var_summary_20210601.csv"));
        assert_eq!(p.parquet, None);
    }

    #[test]
    fn writes_every_artifact() -> Result<()> {
        let dir = tempdir()?;
        let t = Table::from_rows(
            "final",
            &["countryname", "stringency_index"],
            vec![vec![Cell::text("Aruba"), Cell::Number(5.0)]],
        );
        let paths = write_outputs(&t, &dir.path().join("nested"), true)?;
        assert!(paths.data.exists());
        assert!(paths.summary.exists());
        assert!(paths.parquet.as_ref().is_some_and(|p| p.exists()));
        assert_eq!(
            fs::read_to_string(&paths.data)?,
            "countryname,stringency_index\nAruba,5\n"
        );
        Ok(())
    }
}
