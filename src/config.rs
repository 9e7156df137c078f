use std::net::SocketAddr;

use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "Diagnostica";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "medgemma";
/// Whole-request bound on a single model call. No retry follows a timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_TEMPERATURE: f32 = 0.2;
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "diagnostica=info,diagnostica_lib=info,tower_http=info"
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{var} must be a positive integer, got '{value}'")]
    InvalidTimeout { var: &'static str, value: String },

    #[error("{var} must be a number between 0 and 2, got '{value}'")]
    InvalidTemperature { var: &'static str, value: String },

    #[error("{var} must be a socket address like 127.0.0.1:8080, got '{value}'")]
    InvalidBindAddr { var: &'static str, value: String },

    #[error("{var} must not be empty")]
    Empty { var: &'static str },
}

/// Runtime settings for the service.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub ollama_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub temperature: f32,
    pub bind_addr: SocketAddr,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            temperature: DEFAULT_TEMPERATURE,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
        }
    }
}

impl ServiceConfig {
    /// Read `DIAGNOSTICA_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable lookup. Unset variables keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("DIAGNOSTICA_OLLAMA_URL") {
            config.ollama_url = non_empty("DIAGNOSTICA_OLLAMA_URL", url)?;
        }
        if let Some(model) = lookup("DIAGNOSTICA_MODEL") {
            config.model = non_empty("DIAGNOSTICA_MODEL", model)?;
        }
        if let Some(value) = lookup("DIAGNOSTICA_TIMEOUT_SECS") {
            config.timeout_secs = value
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::InvalidTimeout {
                    var: "DIAGNOSTICA_TIMEOUT_SECS",
                    value,
                })?;
        }
        if let Some(value) = lookup("DIAGNOSTICA_TEMPERATURE") {
            config.temperature = value
                .trim()
                .parse::<f32>()
                .ok()
                .filter(|t| (0.0..=2.0).contains(t))
                .ok_or(ConfigError::InvalidTemperature {
                    var: "DIAGNOSTICA_TEMPERATURE",
                    value,
                })?;
        }
        if let Some(value) = lookup("DIAGNOSTICA_BIND") {
            config.bind_addr = value
                .trim()
                .parse::<SocketAddr>()
                .map_err(|_| ConfigError::InvalidBindAddr {
                    var: "DIAGNOSTICA_BIND",
                    value,
                })?;
        }

        Ok(config)
    }
}

fn non_empty(var: &'static str, value: String) -> Result<String, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Empty { var });
    }
    Ok(trimmed.to_string())
}
