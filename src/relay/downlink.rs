//! Downlink relay (BBS to node)
//!
//! BBS prompts often lack a trailing newline, so output is not read line by
//! line. Bytes are buffered while they keep arriving and flushed as soon as
//! the BBS goes quiet for one flush interval.

use tokio::io::AsyncReadExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::time::timeout;

use crate::error::RelayError;
use crate::protocol::StreamSanitizer;
use crate::relay::{self, RelayContext, SharedWriter};

const READ_CHUNK: usize = 4096;

/// Buffered output is flushed at this size even if the BBS keeps sending.
const MAX_BUFFERED: usize = 16 * 1024;

pub struct Downlink {
    ctx: RelayContext,
    remote: OwnedReadHalf,
    local: SharedWriter,
    sanitizer: StreamSanitizer,
}

impl Downlink {
    pub fn new(ctx: RelayContext, remote: OwnedReadHalf, local: SharedWriter) -> Self {
        let sanitizer = StreamSanitizer::new(ctx.settings.remote_charset);
        Self {
            ctx,
            remote,
            local,
            sanitizer,
        }
    }

    /// Relays until the BBS closes or fails, then closes the node link.
    ///
    /// `Ok(())` means the BBS ended the stream normally.
    pub async fn run(mut self) -> Result<(), RelayError> {
        let result = self.pump().await;

        match &result {
            Ok(()) => self.ctx.sink.info(&format!(
                "{}: BBS connection lost, closing node connection",
                self.ctx.label
            )),
            Err(e) => self.ctx.sink.info(&format!(
                "{}: {}, closing node connection",
                self.ctx.label, e
            )),
        }

        if !matches!(result, Err(RelayError::LocalWrite(_))) {
            let tail = self.sanitizer.finish();
            if let Err(e) = self.deliver(&tail).await {
                self.ctx.sink.debug(&format!("{}: {}", self.ctx.label, e));
            }
        }
        relay::close(&self.local, "node", &self.ctx.label, &*self.ctx.sink).await;
        result
    }

    async fn pump(&mut self) -> Result<(), RelayError> {
        let mut chunk = vec![0u8; READ_CHUNK];
        let mut pending = Vec::with_capacity(READ_CHUNK);
        let quiet = self.ctx.settings.flush_interval;

        loop {
            let read = if pending.is_empty() {
                self.remote.read(&mut chunk).await
            } else {
                match timeout(quiet, self.remote.read(&mut chunk)).await {
                    Ok(read) => read,
                    Err(_) => {
                        self.flush(&mut pending).await?;
                        continue;
                    }
                }
            };

            match read {
                Ok(0) => {
                    self.flush(&mut pending).await?;
                    return Ok(());
                }
                Ok(n) => {
                    self.ctx.activity.touch();
                    pending.extend_from_slice(&chunk[..n]);
                    if pending.len() >= MAX_BUFFERED {
                        self.flush(&mut pending).await?;
                    }
                }
                Err(e) => {
                    self.flush(&mut pending).await?;
                    return Err(RelayError::RemoteRead(e));
                }
            }
        }
    }

    async fn flush(&mut self, pending: &mut Vec<u8>) -> Result<(), RelayError> {
        if pending.is_empty() {
            return Ok(());
        }
        let text = self.sanitizer.push(pending);
        pending.clear();
        self.deliver(&text).await
    }

    async fn deliver(&self, text: &str) -> Result<(), RelayError> {
        if text.is_empty() {
            return Ok(());
        }
        self.ctx
            .sink
            .debug(&format!("{}: from BBS (clean): {:?}", self.ctx.label, text));
        let bytes = self.ctx.settings.local_charset.encode(text);
        relay::write_all(&self.local, &bytes)
            .await
            .map_err(RelayError::LocalWrite)
    }
}
