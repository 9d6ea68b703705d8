//! Configuration loading.
//!
//! Reads `airtime.toml`, applies command line and environment overrides,
//! validates the result and turns it into the runtime [`AppConfig`].

pub mod file;

use crate::config::file::FileConfig;
use airtime_core::config::{ApiConfig, AppConfig, ChainConfig};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("invalid url for {field}: {source}")]
    InvalidUrl {
        field: &'static str,
        #[source]
        source: url::ParseError,
    },

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Values given on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_base: Option<Url>,
    pub rpc_url: Option<Url>,
    pub wallet_url: Option<Url>,
}

pub struct ConfigLoader {
    config_path: PathBuf,
    overrides: Overrides,
}

impl ConfigLoader {
    pub fn new(config_path: impl AsRef<Path>, overrides: Overrides) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            overrides,
        }
    }

    /// Load the file (if any), apply overrides and validate.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let file_config = if self.config_path.exists() {
            let content = std::fs::read_to_string(&self.config_path)?;
            toml::from_str(&content)?
        } else {
            tracing::debug!(path = ?self.config_path, "No config file, using defaults");
            FileConfig::default()
        };
        self.build(file_config)
    }

    fn build(&self, file_config: FileConfig) -> Result<AppConfig, ConfigError> {
        let FileConfig {
            api,
            chain,
            contracts,
            placeholders,
        } = file_config;

        if api.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "api.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if chain.receipt_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "chain.receipt_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if chain.poll_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "chain.poll_interval_secs must be greater than zero".to_string(),
            ));
        }

        let base_url = pick_url("api.base_url", &api.base_url, &self.overrides.api_base)?;
        let rpc_url = pick_url("chain.rpc_url", &chain.rpc_url, &self.overrides.rpc_url)?;
        let wallet_url = pick_url(
            "chain.wallet_url",
            &chain.wallet_url,
            &self.overrides.wallet_url,
        )?;

        Ok(AppConfig {
            api: ApiConfig {
                base_url,
                timeout: Duration::from_secs(api.timeout_secs),
            },
            chain: ChainConfig {
                rpc_url,
                wallet_url,
                receipt_timeout: Duration::from_secs(chain.receipt_timeout_secs),
                poll_interval: Duration::from_secs(chain.poll_interval_secs),
            },
            contracts: contracts.into(),
            placeholders: placeholders.into(),
        })
    }
}

fn pick_url(
    field: &'static str,
    from_file: &str,
    overridden: &Option<Url>,
) -> Result<Url, ConfigError> {
    match overridden {
        Some(url) => Ok(url.clone()),
        None => Url::parse(from_file).map_err(|source| ConfigError::InvalidUrl { field, source }),
    }
}
