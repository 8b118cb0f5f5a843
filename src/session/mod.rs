//! Session management
//!
//! One session per accepted node connection: opens the BBS connection,
//! runs both relays and releases both sockets when either side ends.

pub mod idle;
pub mod manager;
pub mod state;

pub use idle::Activity;
pub use manager::SessionManager;
pub use state::{Session, SessionState};
