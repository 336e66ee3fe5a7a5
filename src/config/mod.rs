//! Configuration management for LlamaPull
//!
//! Defaults + optional config file + environment variables via .env

use anyhow::{Context, Result};
use config::builder::{ConfigBuilder, DefaultState};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::time::Duration;

use crate::dune::DuneCredentials;

/// Library settings
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

/// Builder carrying only the baked-in defaults, before any file or
/// environment source is layered on.
fn default_builder() -> Result<ConfigBuilder<DefaultState>> {
    Config::builder()
        .set_default("http.timeout_secs", 30)
        .context("Failed to set configuration defaults")
}

impl Settings {
    /// Load configuration from defaults, an optional `config/default` file
    /// and `LLAMAPULL_`-prefixed environment variables.
    pub fn load() -> Result<Self> {
        // Load .env first so credentials are visible too
        dotenvy::dotenv().ok();

        let config = default_builder()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(Environment::with_prefix("LLAMAPULL").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Request timeout as a `Duration`
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }

    /// Dune credentials from the environment (`.env` already loaded by
    /// [`Settings::load`]).
    pub fn dune_credentials(&self) -> Result<DuneCredentials> {
        DuneCredentials::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeout() {
        // Deserialize from the defaults alone so ambient LLAMAPULL_* vars
        // or a config/default file cannot skew the assertion.
        let settings: Settings = default_builder()
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(settings.http_timeout(), Duration::from_secs(30));
    }
}
