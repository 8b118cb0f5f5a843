//! Server core functionality
//!
//! The listening socket and accept loop, plus the gateway configuration.

pub mod config;
pub mod core;

pub use self::config::{BridgeSettings, GatewayConfig};
pub use self::core::Server;
