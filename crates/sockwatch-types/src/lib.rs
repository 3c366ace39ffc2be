//! # sockwatch-types
//!
//! Shared domain types used across the sockwatch workspace: the payloads of
//! relayed events, the handshake outcome, and the state snapshot delivered to
//! observers once they are authorized.

pub mod auth;
pub mod events;
pub mod snapshot;

pub use auth::{AuthError, AuthOutcome};
pub use events::{BroadcastEvent, JoinEvent, LeaveEvent, SocketEvent, StringEvent, TrafficEvent};
pub use snapshot::{RoomSummary, SocketSummary, StateSnapshot};

/// Identifier of a socket on the observed messaging server.
pub type SocketId = String;

/// Default TCP port of the monitor channel.
pub const DEFAULT_PORT: u16 = 9042;

/// Default host of the monitor channel.
pub const DEFAULT_HOST: &str = "localhost";

/// Default time a client has to answer the password challenge (milliseconds).
pub const DEFAULT_AUTH_TIMEOUT_MS: u64 = 1500;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(DEFAULT_PORT, 9042);
        assert_eq!(DEFAULT_HOST, "localhost");
        assert_eq!(DEFAULT_AUTH_TIMEOUT_MS, 1500);
    }
}
