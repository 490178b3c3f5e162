//! Configuration file loading

use anyhow::{Context, Result};
use flinkwatch_transport::WatchConfig;
use serde::Deserialize;
use std::path::Path;

/// Contents of the TOML configuration file
///
/// ```toml
/// base_url = "http://flink-admin:8088"
/// log_level = "info"
/// metrics_port = 9090
///
/// [backoff]
/// ceiling_ms = 60000
///
/// [watchdog]
/// timeout_ms = 20000
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(flatten)]
    pub watch: WatchConfig,
    pub log_level: Option<String>,
    pub metrics_port: Option<u16>,
}

impl Settings {
    /// Read `path`, or the defaults when no file was given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Command line and environment take precedence over the file
    pub fn with_overrides(
        mut self,
        url: Option<String>,
        log_level: Option<String>,
        metrics_port: Option<u16>,
    ) -> Self {
        if let Some(url) = url {
            self.watch.base_url = url;
        }
        if log_level.is_some() {
            self.log_level = log_level;
        }
        if metrics_port.is_some() {
            self.metrics_port = metrics_port;
        }
        self
    }
}
