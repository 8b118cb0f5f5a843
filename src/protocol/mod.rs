//! Gateway protocol layer
//!
//! Charset transcoding, Telnet byte handling, output sanitizing and the
//! messages the gateway itself sends to the node controller.

pub mod charset;
pub mod messages;
pub mod sanitizer;
pub mod telnet;

pub use charset::{Charset, StreamDecoder};
pub use sanitizer::{StreamSanitizer, sanitize};
