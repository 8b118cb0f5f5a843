//! Utility functions
//!
//! Provides logging setup and the injected log sink.

pub mod logging;
