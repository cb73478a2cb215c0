//! `tpch-collect.toml` config loading.

use serde::{Deserialize, Serialize};

use std::path::Path;

use crate::{CollectError, CollectResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Queries running this long (seconds) or longer count as cancelled.
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,

    /// Fail on garbled `results.log` lines instead of coercing them.
    #[serde(default)]
    pub strict_results: bool,
}

fn default_query_timeout_secs() -> u64 {
    300
}

impl Default for Config {
    fn default() -> Self {
        Self {
            query_timeout_secs: default_query_timeout_secs(),
            strict_results: false,
        }
    }
}

impl Config {
    pub fn load_optional(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(s) => match toml::from_str::<Config>(&s) {
                Ok(cfg) => cfg,
                Err(err) => {
                    tracing::warn!("failed to parse config {}: {err}", path.display());
                    Self::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(err) => {
                tracing::warn!("failed to read config {}: {err}", path.display());
                Self::default()
            }
        }
    }

    /// Applies command-line overrides on top of the file values.
    pub fn with_overrides(mut self, timeout: Option<u64>, strict: bool) -> Self {
        if let Some(secs) = timeout {
            self.query_timeout_secs = secs;
        }
        if strict {
            self.strict_results = true;
        }
        self
    }

    pub fn validate(&self) -> CollectResult<()> {
        if self.query_timeout_secs == 0 {
            return Err(CollectError::Config(
                "query_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn query_timeout(&self) -> f64 {
        self.query_timeout_secs as f64
    }
}
