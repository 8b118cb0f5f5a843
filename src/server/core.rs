use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use crate::error::GatewayError;
use crate::server::config::{BridgeSettings, GatewayConfig};
use crate::session::SessionManager;
use crate::utils::logging::LogSink;

/// Pause after a failed accept before trying again
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

pub struct Server {
    listener: TcpListener,
    settings: Arc<BridgeSettings>,
    sink: Arc<dyn LogSink>,
}

impl Server {
    /// Binds the listening socket. Failure here is fatal for the process.
    pub async fn bind(config: &GatewayConfig, sink: Arc<dyn LogSink>) -> Result<Self, GatewayError> {
        let settings = Arc::new(BridgeSettings::from_config(config)?);
        let addr = config.listen_socket();

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| GatewayError::Bind {
                addr: addr.clone(),
                source,
            })?;

        sink.info(&format!(
            "Server listening on {} (BBS {}, node charset {}, BBS charset {})",
            listener.local_addr()?,
            settings.remote_addr(),
            settings.local_charset.name(),
            settings.remote_charset.name()
        ));

        Ok(Self {
            listener,
            settings,
            sink,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts node connections forever, one session task per connection.
    pub async fn start(self) {
        let mut next_id: u64 = 1;

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let id = next_id;
                    next_id += 1;
                    self.sink
                        .info(&format!("Node connection accepted from {} (session {})", addr, id));

                    let manager = SessionManager::new(
                        id,
                        stream,
                        addr,
                        Arc::clone(&self.settings),
                        Arc::clone(&self.sink),
                    );

                    // Spawn a task for each session so accept loop doesn't block
                    tokio::spawn(manager.run());
                }
                Err(e) => {
                    self.sink.error(&format!("Error accepting connection: {}", e));
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            }
        }
    }
}
