use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{UfhError, UfhResult};

/// Top-level configuration (loaded from unifuzz.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UnifuzzConfig {
    pub hash: HashConfig,
    pub compare: CompareConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HashConfig {
    /// Chunking factor used when hashing files (odd, >= 3)
    pub factor: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareConfig {
    /// Similarity mode: similarity, reverse, maximum, minimum,
    /// arithmetic-mean or geometric-mean
    pub mode: String,
    /// Minimum score reported by `unifuzz scan`
    pub threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for HashConfig {
    fn default() -> Self {
        Self { factor: 251 }
    }
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            mode: "maximum".into(),
            threshold: 0.0,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl UnifuzzConfig {
    pub fn from_toml_str(content: &str) -> UfhResult<Self> {
        toml::from_str(content).map_err(|e| UfhError::Config(format!("parsing config: {e}")))
    }

    /// Load config from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> UfhResult<Self> {
        if !path.exists() {
            tracing::debug!("config file not found: {}  (using defaults)", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)
            .map_err(|e| UfhError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> UfhResult<String> {
        toml::to_string_pretty(self).map_err(|e| UfhError::Config(format!("serializing config: {e}")))
    }

    /// Range checks that do not need the hashing crate. The factor rule is
    /// enforced where the factor is used.
    pub fn validate(&self) -> UfhResult<()> {
        if !(0.0..=1.0).contains(&self.compare.threshold) {
            return Err(UfhError::Config(format!(
                "compare.threshold must be within [0, 1] (got {})",
                self.compare.threshold
            )));
        }
        match self.log.format.as_str() {
            "text" | "json" => Ok(()),
            other => Err(UfhError::Config(format!(
                "log.format must be \"text\" or \"json\" (got {other:?})"
            ))),
        }
    }
}
