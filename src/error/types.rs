//! Error types
//!
//! Defines the error types of the gateway: process-level failures and the
//! session-level failures that end a relay.

use std::fmt;
use std::io;

/// Relay failures. Each one ends the relay that hit it.
#[derive(Debug)]
pub enum RelayError {
    LocalRead(io::Error),
    LocalWrite(io::Error),
    RemoteRead(io::Error),
    RemoteWrite(io::Error),
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayError::LocalRead(e) => write!(f, "Failed to read from node: {}", e),
            RelayError::LocalWrite(e) => write!(f, "Failed to write to node: {}", e),
            RelayError::RemoteRead(e) => write!(f, "Failed to read from BBS: {}", e),
            RelayError::RemoteWrite(e) => write!(f, "Failed to write to BBS: {}", e),
        }
    }
}

impl std::error::Error for RelayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RelayError::LocalRead(e)
            | RelayError::LocalWrite(e)
            | RelayError::RemoteRead(e)
            | RelayError::RemoteWrite(e) => Some(e),
        }
    }
}

/// General gateway error that encompasses all error types
#[derive(Debug)]
pub enum GatewayError {
    Bind { addr: String, source: io::Error },
    RemoteConnect { addr: String, source: io::Error },
    Relay(RelayError),
    Config(config::ConfigError),
    UnknownCharset(String),
    IoError(io::Error),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::Bind { addr, source } => {
                write!(f, "Failed to bind to {}: {}", addr, source)
            }
            GatewayError::RemoteConnect { addr, source } => {
                write!(f, "Failed to connect to BBS at {}: {}", addr, source)
            }
            GatewayError::Relay(e) => write!(f, "Relay error: {}", e),
            GatewayError::Config(e) => write!(f, "Configuration error: {}", e),
            GatewayError::UnknownCharset(label) => write!(f, "Unknown charset: {}", label),
            GatewayError::IoError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for GatewayError {}

impl From<RelayError> for GatewayError {
    fn from(error: RelayError) -> Self {
        GatewayError::Relay(error)
    }
}

impl From<config::ConfigError> for GatewayError {
    fn from(error: config::ConfigError) -> Self {
        GatewayError::Config(error)
    }
}

impl From<io::Error> for GatewayError {
    fn from(error: io::Error) -> Self {
        GatewayError::IoError(error)
    }
}
