use kakeibo_core::Yen;
use kakeibo_ocr::vision::DEFAULT_ENDPOINT;
use kakeibo_ocr::{ExtractorConfig, DEFAULT_MAX_DIMENSION};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_API_KEY_ENV: &str = "GOOGLE_VISION_API_KEY";
const CONFIG_FILE: &str = "config.toml";
const DB_FILE: &str = "kakeibo.db";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Could not determine a home directory for application data")]
    NoHomeDir,
}

/// Contents of `config.toml`. Every table and key is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ocr: OcrConfig,
    pub extract: ExtractorConfig,
    pub budget: BudgetConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub endpoint: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub max_dimension: u32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        OcrConfig {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// Budget reported until one is set.
    pub default: i64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        BudgetConfig {
            default: kakeibo_core::DEFAULT_BUDGET.amount(),
        }
    }
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load `explicit` if given (it must exist), otherwise the per-user
    /// config file if present, otherwise defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::read(path),
            None => match project_dirs().map(|d| d.config_dir().join(CONFIG_FILE)) {
                Some(path) if path.exists() => Self::read(&path),
                _ => Ok(Config::default()),
            },
        }
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded config");
        Self::from_toml_str(&content)
    }

    pub fn default_budget(&self) -> Yen {
        Yen(self.budget.default)
    }

    /// The OCR API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.ocr.api_key_env).ok()
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "kakeibo", "Kakeibo")
}

/// Per-user data directory, unless overridden.
pub fn data_dir(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    match explicit {
        Some(dir) => Ok(dir.to_path_buf()),
        None => project_dirs()
            .map(|d| d.data_dir().to_path_buf())
            .ok_or(ConfigError::NoHomeDir),
    }
}

pub fn db_path(data_dir: &Path) -> PathBuf {
    data_dir.join(DB_FILE)
}
