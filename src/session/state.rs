//! Session state
//!
//! Tracks one node connection from the moment it is accepted until both of
//! its sockets have been released.

use std::fmt;
use std::net::SocketAddr;

use crate::utils::logging::LogSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Opening the BBS connection
    Connecting,
    /// Both relays running
    Bridging,
    /// A relay ended; tearing down
    Closing,
    /// Both connections released
    Closed,
}

impl SessionState {
    /// Whether `next` is a legal successor of this state.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Connecting, Bridging)
                | (Connecting, Closing)
                | (Connecting, Closed)
                | (Bridging, Closing)
                | (Closing, Closed)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Connecting => "connecting",
            SessionState::Bridging => "bridging",
            SessionState::Closing => "closing",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// One accepted node connection
#[derive(Debug)]
pub struct Session {
    id: u64,
    peer: SocketAddr,
    state: SessionState,
}

impl Session {
    pub fn new(id: u64, peer: SocketAddr) -> Self {
        Self {
            id,
            peer,
            state: SessionState::Connecting,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Prefix used on every log line of this session.
    pub fn label(&self) -> String {
        format!("session {} ({})", self.id, self.peer)
    }

    /// Moves to `next`. Repeating the current state is a no-op; an illegal
    /// transition is logged and ignored.
    pub fn advance(&mut self, next: SessionState, sink: &dyn LogSink) {
        if self.state == next {
            return;
        }
        if self.state.can_transition_to(next) {
            sink.debug(&format!("{}: {} -> {}", self.label(), self.state, next));
            self.state = next;
        } else {
            sink.warn(&format!(
                "{}: ignoring transition {} -> {}",
                self.label(),
                self.state,
                next
            ));
        }
    }
}
