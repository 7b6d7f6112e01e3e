use anyhow::{Context, Result};
use schedlab_analysis::ChartOptions;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("time_ceiling_secs must be positive, got {0}")]
    NonPositiveCeiling(f64),
    #[error("systems must list at least one target system")]
    NoSystems,
    #[error("chart dimensions must be non-zero, got {width}x{height}")]
    EmptyChart { width: u32, height: u32 },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub results_root: PathBuf,
    /// Runs slower than this are left out of the analyse views.
    pub time_ceiling_secs: f64,
    pub systems: Vec<String>,
    pub charts: ChartOptions,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            results_root: PathBuf::from("./results/"),
            time_ceiling_secs: 300.0,
            systems: vec!["S1".to_string(), "S2".to_string(), "S3".to_string()],
            charts: ChartOptions::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = Self::from_yaml(&raw)
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to a mapping.
        let config: Config = if raw.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(raw)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.time_ceiling_secs.is_nan() || self.time_ceiling_secs <= 0.0 {
            return Err(ConfigError::NonPositiveCeiling(self.time_ceiling_secs));
        }
        if self.systems.is_empty() {
            return Err(ConfigError::NoSystems);
        }
        if self.charts.width == 0 || self.charts.height == 0 {
            return Err(ConfigError::EmptyChart {
                width: self.charts.width,
                height: self.charts.height,
            });
        }
        Ok(())
    }
}
