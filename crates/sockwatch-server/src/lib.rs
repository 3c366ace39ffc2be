//! # sockwatch-server
//!
//! Relays the domain events of a messaging server to remote observers.
//!
//! The host wires its internals to a [`Monitor`] (one `on_*` call per event)
//! and implements [`StateSource`] so new observers can be sent the current
//! rooms and sockets. A [`MonitorServer`] accepts observers over TCP, runs
//! the password handshake, and registers authorized sessions with the
//! [`Broker`] that fans events out.
//!
//! ```text
//! host ──on_*──► Monitor ──► Broker ──► session queue ──► writer ──► TCP
//!                   │
//!                   └──► in-process subscribers
//! ```

pub mod auth;
pub mod broker;
pub mod config;
pub mod monitor;
pub mod server;
pub mod session;
pub mod snapshot;

pub use auth::{AuthSession, HandshakeState, Step};
pub use broker::{Broker, SessionHandle, SessionId};
pub use config::ServerConfig;
pub use monitor::Monitor;
pub use server::MonitorServer;
pub use snapshot::{reduce, ConnectionInfo, RegistryView, RoomMembers, StateSource};

use sockwatch_transport::FrameError;

/// Errors raised while starting or running the monitor server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The listen address could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{0}")]
    Delimiter(#[from] FrameError),
}

/// Result type alias for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ServerError::Bind {
            addr: "localhost:9042".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use"),
        };
        assert_eq!(err.to_string(), "failed to bind localhost:9042: in use");
    }
}
