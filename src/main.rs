use anyhow::{Context, Result};
use covidjoin::{
    config::Config,
    fetch, output,
    process::{self, load_datasets},
    table::csv_io,
};
use reqwest::Client;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,covidjoin=info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) configuration ────────────────────────────────────────────
    let config = Config::load()?;

    // ─── 3) make sure the three source tables are on disk ────────────
    let client = Client::new();
    fetch::fetch_sources(&client, &config.sources, config.refresh).await?;

    // ─── 4) reconcile, off the async runtime ─────────────────────────
    let paths = tokio::task::spawn_blocking(move || -> Result<output::OutputPaths> {
        let datasets = load_datasets(&config.sources)?;
        let iso_codes = csv_io::read_csv(&config.iso_table, "countries_iso")
            .context("loading ISO reference table")?;
        let table = process::run(datasets, &iso_codes, &config.pipeline)?;
        output::write_outputs(&table, &config.output_dir, config.write_parquet)
    })
    .await??;

    info!(data = %paths.data.display(), summary = %paths.summary.display(), "all done");
    Ok(())
}
