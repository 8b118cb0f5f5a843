//! Gateway configuration
//!
//! Settings come from built-in defaults, an optional `config.toml` and
//! `BBS_GATEWAY_*` environment variables, in increasing priority.

use config::{Config, Environment, File};
use serde::Deserialize;
use std::time::Duration;

use crate::error::GatewayError;
use crate::protocol::Charset;

const CONFIG_PATH: &str = "config";
const ENV_PREFIX: &str = "BBS_GATEWAY";

/// Raw gateway configuration as read from file and environment
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GatewayConfig {
    /// Address the node controller connects to
    pub bind_address: String,
    pub listen_port: u16,

    /// Upstream Telnet BBS
    pub remote_host: String,
    pub remote_port: u16,

    /// Charset labels for the node link and the BBS link
    pub local_charset: String,
    pub remote_charset: String,

    /// Line that ends the session, compared case-insensitively after trimming
    pub exit_command: String,

    /// Quiet period after which buffered BBS output is flushed
    pub flush_interval_ms: u64,

    /// Close sessions idle for this long; 0 keeps them open forever
    pub idle_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            listen_port: 12345,
            remote_host: "bbs.retrocampus.com".to_string(),
            remote_port: 23,
            local_charset: "utf-8".to_string(),
            remote_charset: "cp437".to_string(),
            exit_command: "exit".to_string(),
            flush_interval_ms: 50,
            idle_timeout_secs: 0,
        }
    }
}

impl GatewayConfig {
    /// Load configuration from ./config.toml (optional) with environment overrides
    pub fn load() -> Result<Self, GatewayError> {
        Self::load_from(CONFIG_PATH)
    }

    /// Load configuration from the given file (optional) with environment overrides
    pub fn load_from(path: &str) -> Result<Self, GatewayError> {
        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        let config: GatewayConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.remote_host.trim().is_empty() {
            return Err(config::ConfigError::Message("remote_host cannot be empty".into()).into());
        }

        if self.remote_port == 0 {
            return Err(config::ConfigError::Message("remote_port cannot be 0".into()).into());
        }

        if self.exit_command.trim().is_empty() {
            return Err(config::ConfigError::Message("exit_command cannot be empty".into()).into());
        }

        if !(1..=5000).contains(&self.flush_interval_ms) {
            return Err(config::ConfigError::Message(
                "flush_interval_ms must be between 1 and 5000".into(),
            )
            .into());
        }

        Charset::from_label(&self.local_charset)?;
        Charset::from_label(&self.remote_charset)?;

        Ok(())
    }

    /// Get bind address and listen port as socket address
    pub fn listen_socket(&self) -> String {
        format!("{}:{}", self.bind_address, self.listen_port)
    }
}

/// Resolved, immutable settings shared by every session
#[derive(Debug, Clone)]
pub struct BridgeSettings {
    pub remote_host: String,
    pub remote_port: u16,
    pub local_charset: Charset,
    pub remote_charset: Charset,
    pub exit_command: String,
    pub flush_interval: Duration,
    pub idle_timeout: Option<Duration>,
}

impl BridgeSettings {
    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        config.validate()?;
        Ok(Self {
            remote_host: config.remote_host.trim().to_string(),
            remote_port: config.remote_port,
            local_charset: Charset::from_label(&config.local_charset)?,
            remote_charset: Charset::from_label(&config.remote_charset)?,
            exit_command: config.exit_command.trim().to_string(),
            flush_interval: Duration::from_millis(config.flush_interval_ms),
            idle_timeout: (config.idle_timeout_secs > 0)
                .then(|| Duration::from_secs(config.idle_timeout_secs)),
        })
    }

    /// Get remote host and port as a connect address
    pub fn remote_addr(&self) -> String {
        format!("{}:{}", self.remote_host, self.remote_port)
    }
}
