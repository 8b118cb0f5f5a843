//! Telnet BBS gateway for packet-radio node controllers.
//!
//! Bridges a line-mode node connection to a Telnet bulletin board,
//! transcoding between the two charsets and stripping terminal control
//! noise from the BBS output.

pub mod error;
pub mod protocol;
pub mod relay;
pub mod server;
pub mod session;
pub mod utils;

pub use server::Server;
