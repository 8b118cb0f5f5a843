//! Error handlers
//!
//! Maps gateway errors to log lines and to the text shown to the node.

use log::Level;

use crate::error::types::{GatewayError, RelayError};
use crate::protocol::messages;
use crate::utils::logging::LogSink;

/// Report a gateway error to the log sink
pub fn handle_error(sink: &dyn LogSink, err: &GatewayError) {
    sink.log_line(severity(err), &err.to_string());
}

/// Severity an error is logged with
pub fn severity(err: &GatewayError) -> Level {
    match err {
        GatewayError::Bind { .. } => Level::Error,
        GatewayError::Config(_) => Level::Error,
        GatewayError::UnknownCharset(_) => Level::Error,
        GatewayError::RemoteConnect { .. } => Level::Error,
        GatewayError::Relay(RelayError::RemoteWrite(_)) => Level::Error,
        GatewayError::Relay(_) => Level::Info,
        GatewayError::IoError(_) => Level::Warn,
    }
}

/// Convert error to the line sent to the node controller, if any
pub fn user_message(err: &GatewayError) -> Option<&'static str> {
    match err {
        GatewayError::RemoteConnect { .. } => Some(messages::CONNECT_FAILED),
        GatewayError::Relay(RelayError::RemoteWrite(_)) => Some(messages::REMOTE_WRITE_FAILED),
        _ => None,
    }
}
