//! Relays between the node link and the BBS link
//!
//! The uplink forwards node lines to the BBS, the downlink forwards
//! sanitized BBS output to the node. Both run for the life of a session.

pub mod downlink;
pub mod line_reader;
pub mod uplink;

pub use downlink::Downlink;
pub use uplink::{Uplink, UplinkExit};

use std::io;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::Mutex;

use crate::protocol::{Charset, messages};
use crate::server::config::BridgeSettings;
use crate::session::Activity;
use crate::utils::logging::LogSink;

/// Write half of a connection, serialized between the workers of a session
pub type SharedWriter = Arc<Mutex<OwnedWriteHalf>>;

pub fn shared(writer: OwnedWriteHalf) -> SharedWriter {
    Arc::new(Mutex::new(writer))
}

/// What a relay needs to know about its session
#[derive(Clone)]
pub struct RelayContext {
    pub label: String,
    pub settings: Arc<BridgeSettings>,
    pub sink: Arc<dyn LogSink>,
    pub activity: Arc<Activity>,
}

pub async fn write_all(writer: &SharedWriter, bytes: &[u8]) -> io::Result<()> {
    let mut guard = writer.lock().await;
    guard.write_all(bytes).await?;
    guard.flush().await
}

/// Sends a gateway message line to the node.
pub async fn send_line(writer: &SharedWriter, charset: Charset, message: &str) -> io::Result<()> {
    write_all(writer, &charset.encode(&messages::format_line(message))).await
}

/// Shuts down the write side of a connection. Closing a connection that is
/// already closed is not an error; other failures are logged and dropped.
pub async fn close(writer: &SharedWriter, side: &str, label: &str, sink: &dyn LogSink) {
    match writer.lock().await.shutdown().await {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotConnected => {
            sink.debug(&format!("{}: {} connection already closed", label, side));
        }
        Err(e) => {
            sink.warn(&format!("{}: error closing {} connection: {}", label, side, e));
        }
    }
}
