//! Line reader for the node link
//!
//! Node controllers terminate lines with CR, LF or CR LF; all three end a
//! line here.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// Lines longer than this are handed out in pieces.
pub const MAX_LINE_LENGTH: usize = 8192;

/// What the start of the next read may still owe to the previous line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Nothing,
    /// The previous line ended in CR; a following LF belongs to it.
    Lf,
    /// The previous line was cut at the length cap; a following CR, LF or
    /// CR LF is its terminator.
    Terminator,
}

pub struct LineReader<R> {
    reader: BufReader<R>,
    pending: Pending,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
            pending: Pending::Nothing,
        }
    }

    /// Reads the next line into `line`, without its terminator.
    ///
    /// Returns `Ok(false)` at end of stream when nothing was read. A final
    /// unterminated line is still returned.
    pub async fn read_line(&mut self, line: &mut Vec<u8>) -> std::io::Result<bool> {
        line.clear();
        loop {
            let (consumed, done) = {
                let available = self.reader.fill_buf().await?;
                if available.is_empty() {
                    return Ok(!line.is_empty());
                }

                match (self.pending, available[0]) {
                    (Pending::Lf | Pending::Terminator, b'\n') => {
                        self.pending = Pending::Nothing;
                        (1, false)
                    }
                    (Pending::Terminator, b'\r') => {
                        self.pending = Pending::Lf;
                        (1, false)
                    }
                    _ => scan(available, line, &mut self.pending),
                }
            };
            self.reader.consume(consumed);
            if done {
                return Ok(true);
            }
        }
    }
}

/// Copies bytes up to the next terminator; returns bytes consumed and
/// whether a line is complete.
fn scan(available: &[u8], line: &mut Vec<u8>, pending: &mut Pending) -> (usize, bool) {
    *pending = Pending::Nothing;
    let room = MAX_LINE_LENGTH.saturating_sub(line.len());
    match available.iter().position(|&b| b == b'\n' || b == b'\r') {
        Some(end) if end <= room => {
            line.extend_from_slice(&available[..end]);
            if available[end] == b'\r' {
                *pending = Pending::Lf;
            }
            (end + 1, true)
        }
        _ if available.len() >= room => {
            line.extend_from_slice(&available[..room]);
            *pending = Pending::Terminator;
            (room, true)
        }
        _ => {
            line.extend_from_slice(available);
            (available.len(), false)
        }
    }
}
