// src/fetch/mod.rs
use anyhow::{Context, Result};
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::{fs, time::Instant};
use tracing::{error, info};
use url::Url;

use crate::config::{Source, Sources};

/// Download `url` and save the body at `dest`, creating parent directories.
/// The body lands in `<dest>.tmp` first and is renamed once complete.
pub async fn download_csv(client: &Client, url: &Url, dest: &Path) -> Result<PathBuf> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {:?}", parent))?;
    }
    let resp = client
        .get(url.clone())
        .send()
        .await
        .with_context(|| format!("GET {}", url))?
        .error_for_status()?;
    let bytes = resp
        .bytes()
        .await
        .with_context(|| format!("reading body from {}", url))?;

    let tmp = dest.with_extension("csv.tmp");
    fs::write(&tmp, &bytes)
        .await
        .with_context(|| format!("writing {:?}", tmp))?;
    fs::rename(&tmp, dest)
        .await
        .with_context(|| format!("renaming {:?} -> {:?}", tmp, dest))?;
    Ok(dest.to_path_buf())
}

/// Make sure every source has a local copy, downloading concurrently.
/// Cached copies are reused unless `refresh` is set.
pub async fn fetch_sources(client: &Client, sources: &Sources, refresh: bool) -> Result<()> {
    let named: [(&'static str, &Source); 3] = [
        ("owid", &sources.owid),
        ("oxford", &sources.oxford),
        ("oxford_nice", &sources.oxford_nice),
    ];

    let mut handles = Vec::with_capacity(named.len());
    for (name, source) in named {
        if !refresh && source.path.exists() {
            info!(name, path = %source.path.display(), "using cached copy");
            continue;
        }
        let client = client.clone();
        let url = source.url.clone();
        let dest = source.path.clone();
        handles.push(tokio::spawn(async move {
            info!(name, url = %url, "downloading");
            let start = Instant::now();
            let res = download_csv(&client, &url, &dest).await;
            match &res {
                Ok(path) => info!(name, elapsed = ?start.elapsed(), path = %path.display(), "downloaded"),
                Err(err) => error!(name, "download failed: {err:#}"),
            }
            res
        }));
    }

    for handle in handles {
        handle.await??;
    }
    Ok(())
}
