//! Console configuration, read from a TOML file.

use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::chart::ChartType;
use crate::schema::DEFAULT_KEY_SEPARATOR;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Invalid config {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("Invalid config: {0}")]
    Invalid(String),
}

fn default_key_separator() -> String {
    DEFAULT_KEY_SEPARATOR.to_string()
}

fn default_chart_type() -> String {
    ChartType::default().name().to_string()
}

fn default_chart_height() -> u32 {
    260
}

fn default_page_size() -> usize {
    5
}

fn default_max_cell_width() -> usize {
    32
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub tree: TreeSettings,
    #[serde(default)]
    pub chart: ChartSettings,
    #[serde(default)]
    pub table: TableSettings,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TreeSettings {
    /// Joins ancestor names into node keys
    #[serde(default = "default_key_separator")]
    pub key_separator: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ChartSettings {
    #[serde(default = "default_chart_type")]
    pub default_type: String,
    #[serde(default = "default_chart_height")]
    pub height: u32,
    #[serde(default)]
    pub animation: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TableSettings {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_max_cell_width")]
    pub max_cell_width: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tree: TreeSettings::default(),
            chart: ChartSettings::default(),
            table: TableSettings::default(),
        }
    }
}

impl Default for TreeSettings {
    fn default() -> Self {
        Self {
            key_separator: default_key_separator(),
        }
    }
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            default_type: default_chart_type(),
            height: default_chart_height(),
            animation: false,
        }
    }
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_cell_width: default_max_cell_width(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file. A missing file yields defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();

        if !path.exists() {
            info!("{display} not found, using defaults");
            return Ok(Self::default());
        }

        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        let cfg = Self::from_toml(&data).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: display.clone(),
                source,
            },
            other => other,
        })?;

        info!("Loaded configuration from {display}");
        Ok(cfg)
    }

    pub fn from_toml(data: &str) -> Result<Self, ConfigError> {
        let cfg: Config = toml::from_str(data).map_err(|source| ConfigError::Parse {
            path: "<inline>".to_string(),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tree.key_separator.is_empty() {
            return Err(ConfigError::Invalid("tree.key_separator must not be empty".into()));
        }
        if self.table.page_size == 0 {
            return Err(ConfigError::Invalid("table.page_size must be positive".into()));
        }
        if self.table.max_cell_width < 2 {
            return Err(ConfigError::Invalid("table.max_cell_width must be at least 2".into()));
        }
        Ok(())
    }

    /// Configured default chart, falling back to Column on unknown names.
    pub fn default_chart(&self) -> ChartType {
        ChartType::from_str(&self.chart.default_type).unwrap_or_else(|| {
            warn!(
                "unknown chart.default_type {:?}, using {}",
                self.chart.default_type,
                ChartType::default()
            );
            ChartType::default()
        })
    }
}
