//! Logging utilities
//!
//! Provides logging setup and the sink the gateway reports status lines to.

use env_logger::Env;
use log::Level;
use std::sync::{Mutex, PoisonError};

/// Setup logging for the gateway (`RUST_LOG` overrides the `info` default)
pub fn setup_logging() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
}

/// Receives status and diagnostic lines from the server, sessions and
/// relays. Implementations must not block.
pub trait LogSink: Send + Sync {
    fn log_line(&self, level: Level, line: &str);

    fn info(&self, line: &str) {
        self.log_line(Level::Info, line);
    }

    fn warn(&self, line: &str) {
        self.log_line(Level::Warn, line);
    }

    fn error(&self, line: &str) {
        self.log_line(Level::Error, line);
    }

    fn debug(&self, line: &str) {
        self.log_line(Level::Debug, line);
    }
}

/// Forwards lines to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogCrateSink;

impl LogSink for LogCrateSink {
    fn log_line(&self, level: Level, line: &str) {
        log::log!(target: "bbs_gateway", level, "{}", line);
    }
}

/// Keeps every line in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<(Level, String)>>,
}

impl MemorySink {
    pub fn records(&self) -> Vec<(Level, String)> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.records().into_iter().map(|(_, line)| line).collect()
    }

    /// Whether any recorded line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| line.contains(needle))
    }
}

impl LogSink for MemorySink {
    fn log_line(&self, level: Level, line: &str) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((level, line.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_records_levels() {
        let sink = MemorySink::default();
        sink.info("listening");
        sink.warn("teardown failed");
        assert_eq!(
            sink.records(),
            vec![
                (Level::Info, "listening".to_string()),
                (Level::Warn, "teardown failed".to_string()),
            ]
        );
        assert!(sink.contains("teardown"));
    }
}
