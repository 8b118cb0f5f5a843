//! Uplink relay (node to BBS)
//!
//! Forwards each line typed on the node to the BBS and watches for the
//! exit command.

use std::io;
use tokio::net::tcp::OwnedReadHalf;

use crate::error::{GatewayError, RelayError};
use crate::error::handlers::{severity, user_message};
use crate::protocol::messages;
use crate::relay::line_reader::LineReader;
use crate::relay::{self, RelayContext, SharedWriter};

/// Why the uplink stopped without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UplinkExit {
    /// The node sent the exit command
    ExitCommand,
    /// The node closed its connection
    LocalClosed,
}

pub struct Uplink {
    ctx: RelayContext,
    reader: LineReader<OwnedReadHalf>,
    local: SharedWriter,
    remote: SharedWriter,
}

impl Uplink {
    pub fn new(
        ctx: RelayContext,
        local_reader: OwnedReadHalf,
        local: SharedWriter,
        remote: SharedWriter,
    ) -> Self {
        Self {
            ctx,
            reader: LineReader::new(local_reader),
            local,
            remote,
        }
    }

    /// Relays node lines until the exit command, end of stream or a read
    /// error on the node link.
    ///
    /// A failed write to the BBS is reported but does not stop the loop;
    /// a dead BBS connection ends the session through the downlink.
    pub async fn run(mut self) -> Result<UplinkExit, RelayError> {
        let settings = &self.ctx.settings;
        let mut raw = Vec::new();

        loop {
            match self.reader.read_line(&mut raw).await {
                Ok(true) => {}
                Ok(false) => {
                    self.ctx
                        .sink
                        .info(&format!("{}: node closed the connection", self.ctx.label));
                    return Ok(UplinkExit::LocalClosed);
                }
                Err(e) => return Err(RelayError::LocalRead(e)),
            }
            self.ctx.activity.touch();

            let line = settings.local_charset.decode(&raw);
            self.ctx
                .sink
                .info(&format!("{}: received from node: {}", self.ctx.label, line));

            if is_exit_command(&line, &settings.exit_command) {
                if let Err(e) =
                    relay::send_line(&self.local, settings.local_charset, messages::DISCONNECTING)
                        .await
                {
                    self.ctx
                        .sink
                        .debug(&format!("{}: disconnect notice not sent: {}", self.ctx.label, e));
                }
                return Ok(UplinkExit::ExitCommand);
            }

            if let Err(e) = self.forward(&line).await {
                self.report_write_failure(e).await;
            }
        }
    }

    async fn forward(&self, line: &str) -> io::Result<()> {
        let bytes = self.ctx.settings.remote_charset.encode(&format!("{line}\n"));
        relay::write_all(&self.remote, &bytes).await
    }

    async fn report_write_failure(&self, e: io::Error) {
        let err = GatewayError::from(RelayError::RemoteWrite(e));
        self.ctx
            .sink
            .log_line(severity(&err), &format!("{}: {}", self.ctx.label, err));

        if let Some(message) = user_message(&err) {
            if let Err(e) =
                relay::send_line(&self.local, self.ctx.settings.local_charset, message).await
            {
                self.ctx
                    .sink
                    .debug(&format!("{}: error notice not sent: {}", self.ctx.label, e));
            }
        }
    }
}

/// Case-insensitive match of a line against the exit command, ignoring
/// surrounding whitespace.
pub fn is_exit_command(line: &str, exit_command: &str) -> bool {
    line.trim().to_lowercase() == exit_command.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::config::{BridgeSettings, GatewayConfig};
    use crate::session::Activity;
    use crate::utils::logging::MemorySink;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    #[test]
    fn test_exit_command_matching() {
        assert!(is_exit_command("exit", "exit"));
        assert!(is_exit_command("  EXIT \t", "exit"));
        assert!(is_exit_command("Exit", "EXIT"));
        assert!(!is_exit_command("exit now", "exit"));
        assert!(!is_exit_command("", "exit"));
    }

    async fn socket_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (client, accepted) = tokio::join!(TcpStream::connect(addr), listener.accept());
        (client.unwrap(), accepted.unwrap().0)
    }

    struct Harness {
        node: TcpStream,
        bbs: TcpStream,
        sink: Arc<MemorySink>,
        task: tokio::task::JoinHandle<Result<UplinkExit, RelayError>>,
    }

    async fn start() -> Harness {
        let (node, gateway_local) = socket_pair().await;
        let (bbs, gateway_remote) = socket_pair().await;
        let (local_read, local_write) = gateway_local.into_split();
        let (_, remote_write) = gateway_remote.into_split();
        let sink = Arc::new(MemorySink::default());
        let ctx = RelayContext {
            label: "session 7".into(),
            settings: Arc::new(BridgeSettings::from_config(&GatewayConfig::default()).unwrap()),
            sink: sink.clone(),
            activity: Arc::new(Activity::new()),
        };
        let uplink = Uplink::new(
            ctx,
            local_read,
            relay::shared(local_write),
            relay::shared(remote_write),
        );
        Harness {
            node,
            bbs,
            sink,
            task: tokio::spawn(uplink.run()),
        }
    }

    #[tokio::test]
    async fn test_lines_forwarded_in_order() {
        let mut h = start().await;
        h.node.write_all(b"hello\r\nworld\r").await.unwrap();
        h.node.shutdown().await.unwrap();

        let exit = h.task.await.unwrap().unwrap();
        assert_eq!(exit, UplinkExit::LocalClosed);

        let mut received = Vec::new();
        tokio::time::timeout(Duration::from_secs(2), h.bbs.read_to_end(&mut received))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received, b"hello\nworld\n");
        assert!(h.sink.contains("received from node: hello"));
    }

    #[tokio::test]
    async fn test_exit_command_stops_forwarding() {
        let mut h = start().await;
        h.node.write_all(b"bye\n  Exit \n").await.unwrap();

        let exit = h.task.await.unwrap().unwrap();
        assert_eq!(exit, UplinkExit::ExitCommand);

        let mut notice = [0u8; 64];
        let n = h.node.read(&mut notice).await.unwrap();
        assert_eq!(&notice[..n], b"Disconnecting from the BBS...\r\n");

        let mut received = Vec::new();
        tokio::time::timeout(Duration::from_secs(2), h.bbs.read_to_end(&mut received))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received, b"bye\n");
    }

    #[tokio::test]
    async fn test_utf8_transcoded_to_cp437() {
        let mut h = start().await;
        h.node.write_all("città €\n".as_bytes()).await.unwrap();
        h.node.shutdown().await.unwrap();
        h.task.await.unwrap().unwrap();

        let mut received = Vec::new();
        h.bbs.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"citt\x85 ?\n");
    }

    #[tokio::test]
    async fn test_bbs_write_failure_reported_and_loop_continues() {
        let Harness {
            mut node,
            bbs,
            sink,
            task,
        } = start().await;
        drop(bbs);

        // The first write after the BBS closes may still succeed; keep
        // typing until the reset surfaces as a write error.
        let notice = "Error: problem communicating with the BBS.\r\n";
        let mut received = Vec::new();
        let mut buf = [0u8; 256];
        for _ in 0..100 {
            node.write_all(b"R 1\n").await.unwrap();
            if let Ok(Ok(n)) =
                tokio::time::timeout(Duration::from_millis(50), node.read(&mut buf)).await
            {
                received.extend_from_slice(&buf[..n]);
            }
            if String::from_utf8_lossy(&received).contains(notice) {
                break;
            }
        }
        assert!(String::from_utf8_lossy(&received).starts_with(notice));

        node.write_all(b"exit\n").await.unwrap();
        let exit = tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(exit, UplinkExit::ExitCommand);

        let logged = "session 7: Relay error: Failed to write to BBS";
        assert!(
            sink.records()
                .iter()
                .any(|(level, line)| *level == log::Level::Error && line.contains(logged))
        );
    }
}
