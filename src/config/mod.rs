//! Dataset configuration and runtime settings.
//!
//! Datasets are described in a small TOML file (one table per dataset):
//!
//! ```toml
//! [treasuryyields]
//! localpath = ["data", "treasuryyields.csv"]
//! link = "https://home.treasury.gov/...&year={}"
//! ```
//!
//! The file is read once at start-up and handed to `TimeData` as a value;
//! nothing here is global.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::AppError;

pub const DEFAULT_CONFIG_FILE: &str = "datalocations.toml";
pub const DEFAULT_DATASET: &str = "treasuryyields";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const YEAR_PLACEHOLDER: &str = "{}";

fn default_table_index() -> usize {
    1
}

/// Where one dataset lives locally and where it is published remotely.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatasetDescriptor {
    /// Path segments of the local CSV, relative to the configuration file.
    pub localpath: Vec<String>,
    /// URL template with a single `{}` placeholder for the year.
    pub link: String,
    /// Year substituted into `link`. Falls back to the requested date's year.
    #[serde(default)]
    pub year: Option<i32>,
    /// Zero-based position of the data table on the published page.
    #[serde(default = "default_table_index")]
    pub table_index: usize,
}

impl DatasetDescriptor {
    pub fn link_for(&self, year: i32) -> String {
        self.link.replacen(YEAR_PLACEHOLDER, &year.to_string(), 1)
    }

    fn validate(&self, name: &str) -> Result<(), AppError> {
        if self.localpath.is_empty() || self.localpath.iter().any(|s| s.trim().is_empty()) {
            return Err(AppError::config(format!(
                "Dataset `{name}`: `localpath` must be a non-empty list of path segments."
            )));
        }
        let placeholders = self.link.matches(YEAR_PLACEHOLDER).count();
        if placeholders != 1 {
            return Err(AppError::config(format!(
                "Dataset `{name}`: `link` must contain exactly one `{{}}` year placeholder (found {placeholders})."
            )));
        }
        Ok(())
    }
}

/// All configured datasets plus the directory their local paths resolve against.
#[derive(Debug, Clone, Default)]
pub struct DataConfig {
    base_dir: PathBuf,
    datasets: BTreeMap<String, DatasetDescriptor>,
}

impl DataConfig {
    /// Read and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            AppError::config(format!("Failed to read dataset configuration '{}': {e}", path.display()))
        })?;
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self::from_toml_str(&text, base_dir)
    }

    pub fn from_toml_str(text: &str, base_dir: impl Into<PathBuf>) -> Result<Self, AppError> {
        let datasets: BTreeMap<String, DatasetDescriptor> =
            toml::from_str(text).map_err(|e| AppError::config(format!("Invalid dataset configuration: {e}")))?;
        for (name, descriptor) in &datasets {
            descriptor.validate(name)?;
        }
        log::debug!("loaded {} dataset descriptor(s)", datasets.len());
        Ok(Self {
            base_dir: base_dir.into(),
            datasets,
        })
    }

    /// Build a configuration in code (useful for tests and embedding).
    pub fn from_descriptors(
        base_dir: impl Into<PathBuf>,
        datasets: impl IntoIterator<Item = (String, DatasetDescriptor)>,
    ) -> Result<Self, AppError> {
        let datasets: BTreeMap<_, _> = datasets.into_iter().collect();
        for (name, descriptor) in &datasets {
            descriptor.validate(name)?;
        }
        Ok(Self {
            base_dir: base_dir.into(),
            datasets,
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.datasets.keys().map(String::as_str)
    }

    pub fn descriptor(&self, name: &str) -> Result<&DatasetDescriptor, AppError> {
        self.datasets
            .get(name)
            .ok_or_else(|| AppError::config(format!("Unknown dataset `{name}` (not in configuration).")))
    }

    pub fn local_path(&self, name: &str) -> Result<PathBuf, AppError> {
        let descriptor = self.descriptor(name)?;
        let mut path = self.base_dir.clone();
        for segment in &descriptor.localpath {
            path.push(segment.trim());
        }
        Ok(path)
    }

    pub fn remote_link(&self, name: &str, year: i32) -> Result<String, AppError> {
        Ok(self.descriptor(name)?.link_for(year))
    }
}

/// Process-level settings resolved from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct Settings {
    pub config_path: PathBuf,
    pub http_timeout: Duration,
}

impl Settings {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let config_path = std::env::var("YIELDS_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));

        let http_timeout = match std::env::var("YIELDS_HTTP_TIMEOUT_SECS") {
            Ok(raw) => {
                let secs = raw.trim().parse::<u64>().map_err(|_| {
                    AppError::config(format!("YIELDS_HTTP_TIMEOUT_SECS must be a whole number of seconds, got '{raw}'."))
                })?;
                Duration::from_secs(secs)
            }
            Err(_) => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Self {
            config_path,
            http_timeout,
        })
    }
}
