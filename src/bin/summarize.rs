//! Regenerate the variable summary for an already exported dataset.
//!
//! Usage: `summarize <covid_data.csv> [summary.csv]`

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

use covidjoin::{process::date_parser, summary, table::csv_io};

fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let input = args
        .next()
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("usage: summarize <dataset.csv> [summary.csv]"))?;
    let output = args.next().map(PathBuf::from).unwrap_or_else(|| {
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("dataset");
        input
            .parent()
            .unwrap_or(Path::new("."))
            .join(format!("{stem}_summary.csv"))
    });

    let mut table = csv_io::read_csv(&input, "dataset")?;
    if table.has_column("date") {
        date_parser::normalize_table(&mut table).context("parsing date column")?;
    }

    let summaries = summary::write_summary(&table, &output)?;
    tracing::info!(
        columns = summaries.len(),
        rows = table.len(),
        path = %output.display(),
        "summary written"
    );
    Ok(())
}
