//! Telnet negotiation bytes
//!
//! The gateway never negotiates options with the BBS. It only recognizes
//! negotiation sequences in the raw byte stream so they can be discarded
//! before the stream is decoded.

use regex::bytes::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

/// Interpret As Command
pub const IAC: u8 = 0xFF;
/// Subnegotiation begin
pub const SB: u8 = 0xFA;
/// Subnegotiation end
pub const SE: u8 = 0xF0;
pub const WILL: u8 = 0xFB;
pub const WONT: u8 = 0xFC;
pub const DO: u8 = 0xFD;
pub const DONT: u8 = 0xFE;

/// An unterminated subnegotiation longer than this is not held back.
pub const MAX_PENDING_SUBNEGOTIATION: usize = 4096;

static SUBNEGOTIATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s-u)\xFF\xFA.*?\xFF\xF0").expect("valid pattern"));

static NEGOTIATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s-u)\xFF[\xFB-\xFE].").expect("valid pattern"));

static LONE_IAC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s-u)\xFF.").expect("valid pattern"));

/// Removes every negotiation sequence from a raw byte buffer.
///
/// Subnegotiations and WILL/WONT/DO/DONT triplets go first; a remaining
/// IAC swallows exactly one following byte.
pub fn strip_negotiation(raw: &[u8]) -> Vec<u8> {
    if !raw.contains(&IAC) {
        return raw.to_vec();
    }
    let cleaned = SUBNEGOTIATION.replace_all(raw, &b""[..]);
    let cleaned = strip_with(&NEGOTIATION, cleaned);
    strip_with(&LONE_IAC, cleaned).into_owned()
}

fn strip_with<'a>(pattern: &Regex, input: Cow<'a, [u8]>) -> Cow<'a, [u8]> {
    let stripped = match pattern.replace_all(&input, &b""[..]) {
        Cow::Borrowed(_) => None,
        Cow::Owned(stripped) => Some(stripped),
    };
    stripped.map_or(input, Cow::Owned)
}

/// Returns the index where an incomplete trailing negotiation sequence
/// starts, or `raw.len()` when the buffer ends on a clean boundary.
pub fn incomplete_tail_start(raw: &[u8]) -> usize {
    let len = raw.len();

    if let Some(start) = raw.windows(2).rposition(|w| w == [IAC, SB]) {
        let terminated = raw[start + 2..].windows(2).any(|w| w == [IAC, SE]);
        if !terminated && len - start <= MAX_PENDING_SUBNEGOTIATION {
            return start;
        }
    }

    match raw {
        [.., IAC, WILL..=DONT] => len - 2,
        // IAC IAC is a complete pair; only an odd run leaves one open.
        [.., IAC] if trailing_iac_run(raw) % 2 == 1 => len - 1,
        _ => len,
    }
}

fn trailing_iac_run(raw: &[u8]) -> usize {
    raw.iter().rev().take_while(|&&b| b == IAC).count()
}
