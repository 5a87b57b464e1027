//! Configuration management
//!
//! Defaults, overridden by an optional TOML file, overridden by
//! `SWITCHBOARD__<SECTION>__<KEY>` environment variables.

use crate::domain::relay::settings::RelaySettings;
use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use ::config::{Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const ENV_PREFIX: &str = "SWITCHBOARD";
pub const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub network: NetworkConfig,
    pub relay: RelaySettings,
    pub shaping: ShapingConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Client tick period
    pub tick_interval_ms: u64,
    /// Unanswered calls are dropped after this long; 0 disables
    pub ring_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapingConfig {
    /// 0.0 (worst line) to 1.0 (best line)
    pub call_quality: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing filter when RUST_LOG is unset
    pub level: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 300,
            ring_timeout_secs: 30,
        }
    }
}

impl Default for ShapingConfig {
    fn default() -> Self {
        Self { call_quality: 1.0 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load from an optional file plus the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::from_sources(
            path,
            Environment::with_prefix(ENV_PREFIX)
                .separator(ENV_SEPARATOR)
                .try_parsing(true),
        )
    }

    pub fn from_sources(path: Option<&Path>, env: Environment) -> Result<Self> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(&path.to_string_lossy()).required(false));
        }

        let config: Config = builder
            .add_source(env)
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| DomainError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.network.tick_interval_ms == 0 {
            return Err(DomainError::Config(
                "network.tick_interval_ms must be positive".to_string(),
            ));
        }
        if self.relay.recording_range <= 0.0 {
            return Err(DomainError::Config(
                "relay.recording_range must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.relay.max_volume) {
            return Err(DomainError::Config(
                "relay.max_volume must be within 0..=1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.shaping.call_quality) {
            return Err(DomainError::Config(
                "shaping.call_quality must be within 0..=1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.network.tick_interval_ms)
    }

    pub fn ring_timeout(&self) -> Option<Duration> {
        match self.network.ring_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| DomainError::Config(e.to_string()))
    }
}
