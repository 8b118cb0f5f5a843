//! BBS gateway - Entry Point
//!
//! Listens for node controller connections and bridges each one to the
//! configured Telnet BBS.

use log::info;
use std::process::ExitCode;
use std::sync::Arc;

use bbs_gateway::error::handlers::handle_error;
use bbs_gateway::server::{GatewayConfig, Server};
use bbs_gateway::utils::logging::{LogCrateSink, LogSink, setup_logging};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize the logger (env_logger picks up RUST_LOG environment variable)
    setup_logging();

    info!("Launching BBS gateway...");

    let sink: Arc<dyn LogSink> = Arc::new(LogCrateSink);

    let config = match GatewayConfig::load() {
        Ok(config) => config,
        Err(e) => {
            handle_error(&*sink, &e);
            return ExitCode::FAILURE;
        }
    };

    let server = match Server::bind(&config, Arc::clone(&sink)).await {
        Ok(server) => server,
        Err(e) => {
            handle_error(&*sink, &e);
            return ExitCode::FAILURE;
        }
    };

    server.start().await;
    ExitCode::SUCCESS
}
