//! User-visible messages
//!
//! Status and error lines sent to the node controller over the same
//! connection that carries BBS output.

pub const CONNECT_FAILED: &str = "Error: unable to connect to the BBS.";
pub const DISCONNECTING: &str = "Disconnecting from the BBS...";
pub const REMOTE_WRITE_FAILED: &str = "Error: problem communicating with the BBS.";
pub const IDLE_TIMEOUT: &str = "Idle timeout, disconnecting from the BBS.";

/// Line terminator expected by packet-radio node controllers.
pub const LINE_ENDING: &str = "\r\n";

/// Announces an established bridge.
pub fn connected(host: &str, port: u16) -> String {
    format!("Connected to BBS {host}:{port}.")
}

/// Terminates a message for the local link.
pub fn format_line(message: &str) -> String {
    format!("{message}{LINE_ENDING}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_line() {
        assert_eq!(format_line(DISCONNECTING), "Disconnecting from the BBS...\r\n");
        assert_eq!(connected("bbs.example.org", 23), "Connected to BBS bbs.example.org:23.");
    }
}
