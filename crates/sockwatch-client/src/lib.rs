//! # sockwatch-client
//!
//! Connects to a sockwatch monitor server as an observer and yields the
//! relayed events.
//!
//! ```no_run
//! # async fn run() -> sockwatch_client::Result<()> {
//! use sockwatch_client::{connect, ClientConfig};
//!
//! let mut client = connect(&ClientConfig::default().with_password("secret")).await?;
//! while let Some(event) = client.next_event().await? {
//!     println!("{}", event.kind());
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;

pub use client::{connect, MonitorClient};
pub use config::ClientConfig;

use sockwatch_transport::{EventKind, FrameError};
use sockwatch_types::AuthError;

/// Errors raised by an observer connection.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport failure; connection refused, reset, ...
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The handshake failed. Displays as the bare protocol code.
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("connection closed during handshake")]
    ConnectionClosed,

    /// A handshake message without the payload its kind requires.
    #[error("unexpected {0} message")]
    UnexpectedMessage(EventKind),

    /// Bad delimiter configuration or an unframed stream.
    #[error("framing error: {0}")]
    Frame(FrameError),
}

impl From<FrameError> for ClientError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::Io(e) => Self::Io(e),
            other => Self::Frame(other),
        }
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
