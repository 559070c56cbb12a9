// src/config.rs
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::source::{FileSource, RecordSource, RestSource, SourceError};

pub const ENV_PREFIX: &str = "CAPACITY_";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid environment configuration: {0}")]
    Env(#[from] envy::Error),

    #[error("Invalid bind address '{0}'")]
    BindAddr(String),

    #[error("No record source configured: set {ENV_PREFIX}BACKEND_URL or {ENV_PREFIX}DATA_FILE")]
    MissingSource,

    #[error("Record source setup failed")]
    Source(#[from] SourceError),
}

fn default_bind_addr() -> String {
    DEFAULT_BIND_ADDR.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

/// Settings read from `CAPACITY_*` environment variables (a `.env` file is loaded first by the binary).
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub data_file: Option<PathBuf>,
    #[serde(default)]
    pub backend_url: Option<String>,
    #[serde(default)]
    pub backend_token: Option<String>,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(envy::prefixed(ENV_PREFIX).from_env::<AppConfig>()?)
    }

    pub fn from_pairs<I>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Ok(envy::prefixed(ENV_PREFIX).from_iter::<_, AppConfig>(pairs)?)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind_addr
            .parse()
            .map_err(|_| ConfigError::BindAddr(self.bind_addr.clone()))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// The REST backend wins when both a backend URL and a data file are set.
    pub fn record_source(&self) -> Result<Arc<dyn RecordSource>, ConfigError> {
        if let Some(base_url) = &self.backend_url {
            let source = RestSource::new(base_url, self.backend_token.clone(), self.request_timeout())?;
            info!("Using REST record source at {}", base_url);
            return Ok(Arc::new(source));
        }
        if let Some(path) = &self.data_file {
            info!("Using file record source {}", path.display());
            return Ok(Arc::new(FileSource::new(path.clone())));
        }
        Err(ConfigError::MissingSource)
    }
}
