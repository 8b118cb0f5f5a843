//! BBS output sanitizer
//!
//! Strips ANSI escape sequences, Telnet negotiation and control characters
//! so that a line-mode terminal only ever sees printable text.

use regex::Regex;
use std::sync::LazyLock;

use crate::protocol::charset::{Charset, StreamDecoder};
use crate::protocol::telnet;

/// Glyph some BBS menus emit that the node controller cannot render.
const FORBIDDEN_GLYPH: char = '\u{2640}';

/// Longest trailing fragment of an escape sequence held for the next chunk.
const MAX_PENDING_ESCAPE: usize = 64;

static CSI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1B\[[0-9;\x20-\x2F]*?[\x40-\x7E]").expect("valid pattern")
});

static CSI_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1B(?:\[[0-9;\x20-\x2F]*)?\z").expect("valid pattern")
});

static SUBNEGOTIATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\x{FF}\x{FA}.*?\x{FF}\x{F0}").expect("valid pattern"));

static NEGOTIATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\x{FF}[\x{FB}-\x{FE}].").expect("valid pattern"));

static LONE_IAC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\x{FF}.").expect("valid pattern"));

/// Cleans a decoded chunk of BBS output.
///
/// Telnet bytes are matched in their Latin-1 form (IAC is U+00FF). The
/// function is total and idempotent.
pub fn sanitize(text: &str) -> String {
    let cleaned = CSI.replace_all(text, "");
    let cleaned = SUBNEGOTIATION.replace_all(&cleaned, "");
    let cleaned = NEGOTIATION.replace_all(&cleaned, "");
    let cleaned = LONE_IAC.replace_all(&cleaned, "");
    cleaned.chars().filter(|&c| is_displayable(c)).collect()
}

fn is_displayable(c: char) -> bool {
    match c {
        FORBIDDEN_GLYPH | '\u{7F}' => false,
        '\n' | '\r' | '\t' => true,
        c => c >= ' ',
    }
}

/// Returns where an unfinished CSI sequence starts at the end of `text`.
pub fn incomplete_escape_start(text: &str) -> Option<usize> {
    CSI_PREFIX
        .find(text)
        .filter(|m| m.end() - m.start() <= MAX_PENDING_ESCAPE)
        .map(|m| m.start())
}

/// Sanitizer for one downlink stream.
///
/// Negotiation is removed from the raw bytes before decoding, since a
/// legacy charset may map 0xFF to a printable glyph. Sequences cut by a
/// chunk boundary are held back and completed by the next chunk.
pub struct StreamSanitizer {
    decoder: StreamDecoder,
    raw_tail: Vec<u8>,
    text_tail: String,
}

impl StreamSanitizer {
    pub fn new(charset: Charset) -> Self {
        Self {
            decoder: charset.stream_decoder(),
            raw_tail: Vec::new(),
            text_tail: String::new(),
        }
    }

    /// Cleans the next chunk read from the BBS.
    pub fn push(&mut self, bytes: &[u8]) -> String {
        let mut raw = std::mem::take(&mut self.raw_tail);
        raw.extend_from_slice(bytes);
        let keep = telnet::incomplete_tail_start(&raw);
        self.raw_tail = raw.split_off(keep);

        let mut text = std::mem::take(&mut self.text_tail);
        text.push_str(&self.decoder.decode(&telnet::strip_negotiation(&raw)));
        if let Some(start) = incomplete_escape_start(&text) {
            self.text_tail = text.split_off(start);
        }
        sanitize(&text)
    }

    /// Flushes everything still held back. A truncated escape sequence at
    /// the very end of the stream is dropped.
    pub fn finish(&mut self) -> String {
        let raw = std::mem::take(&mut self.raw_tail);
        let mut text = std::mem::take(&mut self.text_tail);
        text.push_str(&self.decoder.decode(&telnet::strip_negotiation(&raw)));
        text.push_str(&self.decoder.finish());
        if let Some(start) = incomplete_escape_start(&text) {
            text.truncate(start);
        }
        sanitize(&text)
    }
}
