use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::constants::{CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH, GAZETTEER_PATH_ENV, NAME_STYLE_ENV};
use crate::error::{LocationError, Result};
use crate::gazetteer::GazetteerFormat;
use crate::location::{NameStyle, OverrideRule};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub gazetteer: GazetteerConfig,
    pub ranking: RankingConfig,
    pub fixer: FixerConfig,
    pub batch: BatchConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GazetteerConfig {
    pub path: Option<PathBuf>,
    pub format: GazetteerFormat,
    /// Drop SQLite rows whose parent is missing instead of failing the load
    pub skip_orphans: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Appended to the built-in override rules
    pub overrides: Vec<OverrideRule>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FixerConfig {
    pub name_style: NameStyle,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub chunk_size: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { chunk_size: 256 }
    }
}

impl Config {
    /// Load `.env`, then the config file named by `LOCATION_SERVICE_CONFIG`
    /// (default `location_service.toml`), then apply environment overrides.
    /// A missing default config file yields the defaults.
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let (path, explicit) = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => (PathBuf::from(path), true),
            Err(_) => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };

        let mut config = if path.exists() || explicit {
            Self::from_file(&path)?
        } else {
            debug!("No config file at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_env()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            LocationError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(path) = std::env::var(GAZETTEER_PATH_ENV) {
            self.gazetteer.path = Some(PathBuf::from(path));
        }
        if let Ok(style) = std::env::var(NAME_STYLE_ENV) {
            self.fixer.name_style = style.parse()?;
        }
        Ok(())
    }
}
