//! Charset transcoding
//!
//! Each side of the bridge speaks one fixed charset. Text is decoded when it
//! is read from a socket and encoded again when it is written to the other
//! one.

use codepage_437::CP437_CONTROL;
use encoding_rs::{CoderResult, Decoder, Encoding, EncoderResult};

use crate::error::GatewayError;

/// Byte written in place of a character the target charset cannot represent.
const UNMAPPABLE: u8 = b'?';

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Charset {
    /// IBM code page 437 with C0 controls kept as controls.
    Cp437,
    Other(&'static Encoding),
}

impl Charset {
    /// Resolves a charset label such as `utf-8`, `cp437` or `iso-8859-1`.
    pub fn from_label(label: &str) -> Result<Self, GatewayError> {
        let normalized = label.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "cp437" | "ibm437" | "437" | "ibm-437" => Ok(Charset::Cp437),
            _ => Encoding::for_label(normalized.as_bytes())
                .map(Charset::Other)
                .ok_or_else(|| GatewayError::UnknownCharset(label.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Charset::Cp437 => "IBM437",
            Charset::Other(encoding) => encoding.name(),
        }
    }

    /// Decodes a complete buffer. Malformed input becomes U+FFFD.
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            Charset::Cp437 => bytes.iter().map(|&b| CP437_CONTROL.decode(b)).collect(),
            Charset::Other(encoding) => encoding
                .decode_without_bom_handling(bytes)
                .0
                .into_owned(),
        }
    }

    /// Encodes text, replacing characters the charset lacks with `?`.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            Charset::Cp437 => text
                .chars()
                .map(|c| CP437_CONTROL.encode(c).unwrap_or(UNMAPPABLE))
                .collect(),
            Charset::Other(encoding) => encode_with(encoding, text),
        }
    }

    /// Returns a decoder that keeps partial multi-byte characters between
    /// calls.
    pub fn stream_decoder(&self) -> StreamDecoder {
        match self {
            Charset::Cp437 => StreamDecoder::Cp437,
            Charset::Other(encoding) => {
                StreamDecoder::Encoding(encoding.new_decoder_without_bom_handling())
            }
        }
    }
}

fn encode_with(encoding: &'static Encoding, text: &str) -> Vec<u8> {
    let mut encoder = encoding.new_encoder();
    let mut out = Vec::with_capacity(text.len());
    let mut input = text;
    loop {
        let (result, read) =
            encoder.encode_from_utf8_to_vec_without_replacement(input, &mut out, true);
        input = &input[read..];
        match result {
            EncoderResult::InputEmpty => return out,
            EncoderResult::OutputFull => out.reserve(input.len().max(16)),
            EncoderResult::Unmappable(_) => out.push(UNMAPPABLE),
        }
    }
}

/// Incremental decoder for one direction of a session.
pub enum StreamDecoder {
    Cp437,
    Encoding(Decoder),
}

impl StreamDecoder {
    /// Decodes the next chunk of the stream. Bytes of a character that is
    /// not yet complete are held until the following call.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        match self {
            StreamDecoder::Cp437 => Charset::Cp437.decode(bytes),
            StreamDecoder::Encoding(decoder) => decode_chunk(decoder, bytes, false),
        }
    }

    /// Flushes anything still held, as replacement characters if incomplete.
    pub fn finish(&mut self) -> String {
        match self {
            StreamDecoder::Cp437 => String::new(),
            StreamDecoder::Encoding(decoder) => decode_chunk(decoder, &[], true),
        }
    }
}

fn decode_chunk(decoder: &mut Decoder, bytes: &[u8], last: bool) -> String {
    let mut out = String::with_capacity(
        decoder
            .max_utf8_buffer_length(bytes.len())
            .unwrap_or(bytes.len() * 3 + 4),
    );
    let mut input = bytes;
    loop {
        let (result, read, _) = decoder.decode_to_string(input, &mut out, last);
        input = &input[read..];
        match result {
            CoderResult::InputEmpty => return out,
            CoderResult::OutputFull => out.reserve(input.len() * 3 + 4),
        }
    }
}
