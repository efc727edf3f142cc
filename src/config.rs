// src/config.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use tracing::info;
use url::Url;

/// Environment variable pointing at a YAML config file.
pub const CONFIG_ENV: &str = "COVIDJOIN_CONFIG";
/// Config file picked up from the working directory when the env var is unset.
pub const DEFAULT_CONFIG_FILE: &str = "covidjoin.yaml";

const OWID_LINK: &str =
    "https://raw.githubusercontent.com/owid/covid-19-data/master/public/data/owid-covid-data.csv";
const OXFORD_LINK: &str = "https://raw.githubusercontent.com/OxCGRT/covid-policy-tracker/master/data/OxCGRT_latest_combined.csv";
const OXFORD_NICE_LINK: &str =
    "https://raw.githubusercontent.com/OxCGRT/covid-policy-tracker/master/data/OxCGRT_latest.csv";

/// One remotely published CSV and where its local copy lives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Source {
    pub url: Url,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sources {
    pub owid: Source,
    pub oxford: Source,
    pub oxford_nice: Source,
}

/// How the policy-variant join treats `(country, date)` pairs that only
/// exist in the main policy table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum VariantJoin {
    /// Inner join; any change in row count aborts the run.
    #[default]
    Strict,
    /// Left join; unmatched rows keep missing variant columns.
    Lenient,
}

/// Knobs for the reconciliation stages themselves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineOptions {
    /// Days trimmed off the end of the common date window.
    pub lag_days: i64,
    pub variant_join: VariantJoin,
    /// Policy-table country name → outcomes-table country name.
    pub country_aliases: BTreeMap<String, String>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            lag_days: 14,
            variant_join: VariantJoin::Strict,
            country_aliases: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub sources: Sources,
    /// Re-download sources even when a cached copy exists.
    pub refresh: bool,
    /// Country name → ISO alpha-3 reference table.
    pub iso_table: PathBuf,
    pub output_dir: PathBuf,
    /// Also write the final table as Parquet next to the CSV.
    pub write_parquet: bool,
    pub pipeline: PipelineOptions,
}

impl Default for Config {
    fn default() -> Self {
        let source = |link: &str, file: &str| Source {
            url: Url::parse(link).expect("built-in source URL is valid"),
            path: PathBuf::from("downloads").join(file),
        };
        Self {
            sources: Sources {
                owid: source(OWID_LINK, "owid-covid-data.csv"),
                oxford: source(OXFORD_LINK, "OxCGRT_latest_combined.csv"),
                oxford_nice: source(OXFORD_NICE_LINK, "OxCGRT_latest.csv"),
            },
            refresh: false,
            iso_table: PathBuf::from("data/countries_iso.csv"),
            output_dir: PathBuf::from("output"),
            write_parquet: false,
            pipeline: PipelineOptions::default(),
        }
    }
}

impl Config {
    /// Load from `$COVIDJOIN_CONFIG`, else `./covidjoin.yaml`, else defaults.
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::from_file(&path);
        }
        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.exists() {
            return Self::from_file(local);
        }
        info!("no config file found, using defaults");
        Ok(Self::default())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let cfg: Config = serde_yaml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        info!(path = %path.display(), "loaded config");
        Ok(cfg)
    }
}
