//! # sockwatch-transport
//!
//! Wire codec and stream framing for the sockwatch monitor channel.
//!
//! ## Architecture
//!
//! ```text
//! Envelope (event.rs)        -- event kind + optional typed payload
//!     |
//!     v
//! codec.rs                   -- 2-byte code ++ base64(CBOR payload)
//!     |
//!     v
//! framer.rs                  -- message ++ delimiter, reassembly from chunks
//!     |
//!     v
//! channel.rs                 -- async reader/writer halves over a TCP stream
//! ```
//!
//! A single malformed message never stalls the stream: decode failures are
//! logged and only the offending message is dropped.

pub mod cbor;
pub mod channel;
pub mod codec;
pub mod event;
pub mod framer;

pub use channel::{split, FramedReader, FramedWriter};
pub use event::{Envelope, EventKind, Payload};
pub use framer::{Delimiter, FrameDecoder};

/// Errors raised while encoding or decoding a single message.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The leading two bytes do not name any event kind.
    #[error("unknown event code: {0:?}")]
    UnknownCode(String),

    /// An event name that is not part of the protocol.
    #[error("unknown event name: {0}")]
    UnknownEventName(String),

    /// The body does not match the schema of its event kind.
    #[error("malformed {kind} payload: {reason}")]
    MalformedPayload { kind: EventKind, reason: String },

    /// A payload could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Errors raised by the framing layer. These concern the stream, not a single
/// message, and end the connection.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The configured delimiter could occur inside an encoded message.
    #[error("invalid delimiter: {0}")]
    InvalidDelimiter(String),

    /// A peer sent more than the allowed bytes without a delimiter.
    #[error("message exceeds {max} bytes without a delimiter")]
    MessageTooLarge { max: usize },

    /// I/O error on the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CodecError::UnknownCode("zz".to_string());
        assert_eq!(err.to_string(), "unknown event code: \"zz\"");

        let err = CodecError::MalformedPayload {
            kind: EventKind::Join,
            reason: "bad".to_string(),
        };
        assert_eq!(err.to_string(), "malformed join payload: bad");

        let err = FrameError::MessageTooLarge { max: 8 };
        assert_eq!(err.to_string(), "message exceeds 8 bytes without a delimiter");
    }
}
