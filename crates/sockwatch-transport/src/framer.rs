//! Delimiter framing and stream reassembly.
//!
//! ## Wire format
//!
//! ```text
//! <code:2><armored payload:0..n><delimiter>
//! ```
//!
//! An encoded message only contains armor bytes (see [`cbor::is_armor_byte`]).
//! A delimiter whose first byte lies outside that alphabet therefore can
//! neither occur inside a message nor start inside one, so the first match
//! after a message start always ends that message.

use std::fmt;
use std::str::FromStr;

use crate::cbor;
use crate::codec;
use crate::event::Envelope;
use crate::{CodecError, FrameError};

/// Default message delimiter.
pub const DEFAULT_DELIMITER: &[u8] = b"\n";

/// Maximum number of bytes buffered for a single, not yet delimited message.
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Byte sequence terminating every message. Both ends of a deployment must
/// agree on it.
#[derive(Clone, PartialEq, Eq)]
pub struct Delimiter(Vec<u8>);

impl Delimiter {
    /// # Errors
    ///
    /// Returns [`FrameError::InvalidDelimiter`] if the sequence is empty or
    /// starts with a byte that may appear inside an encoded message.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, FrameError> {
        let bytes = bytes.into();
        match bytes.first() {
            None => Err(FrameError::InvalidDelimiter("empty delimiter".to_string())),
            Some(&first) if cbor::is_armor_byte(first) => Err(FrameError::InvalidDelimiter(
                format!("{:?} may occur inside an encoded message", first as char),
            )),
            Some(_) => Ok(Self(bytes)),
        }
    }

    /// Raw delimiter bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false` for a validated delimiter.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for Delimiter {
    fn default() -> Self {
        Self(DEFAULT_DELIMITER.to_vec())
    }
}

impl fmt::Debug for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Delimiter({:?})", String::from_utf8_lossy(&self.0))
    }
}

impl FromStr for Delimiter {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.as_bytes())
    }
}

/// Encode an envelope and append the delimiter.
///
/// # Errors
///
/// Returns the [`CodecError`] raised by the codec.
pub fn encode_frame(envelope: &Envelope, delimiter: &Delimiter) -> Result<Vec<u8>, CodecError> {
    let mut frame = codec::encode(envelope)?;
    frame.extend_from_slice(delimiter.as_bytes());
    Ok(frame)
}

/// Reassembles delimited messages from arbitrary chunks.
///
/// Chunks are appended with [`push`](Self::push); complete messages are taken
/// out one at a time with [`next_message`](Self::next_message), which walks an
/// explicit cursor over the buffer.
pub struct FrameDecoder {
    delimiter: Delimiter,
    buffer: Vec<u8>,
    /// Start of the first unconsumed message.
    cursor: usize,
    /// Position from which the next delimiter search starts; everything
    /// between `cursor` and here is known not to contain a delimiter.
    scanned: usize,
    max_message_size: usize,
}

impl FrameDecoder {
    /// Decoder for `delimiter` with the default size cap.
    pub fn new(delimiter: Delimiter) -> Self {
        Self {
            delimiter,
            buffer: Vec::new(),
            cursor: 0,
            scanned: 0,
            max_message_size: MAX_MESSAGE_SIZE,
        }
    }

    /// Override the cap on a single undelimited message.
    pub fn with_max_message_size(mut self, max: usize) -> Self {
        self.max_message_size = max;
        self
    }

    /// Append newly received bytes.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Number of buffered bytes not yet consumed as a message.
    pub fn pending(&self) -> usize {
        self.buffer.len() - self.cursor
    }

    /// Take the next complete, decodable message.
    ///
    /// Messages that fail to decode are logged and skipped. Returns `Ok(None)`
    /// when no complete message is buffered; the partial remainder is kept for
    /// the next chunk.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::MessageTooLarge`] if the partial remainder grows
    /// beyond the maximum message size.
    pub fn next_message(&mut self) -> Result<Option<Envelope>, FrameError> {
        let delim_len = self.delimiter.len();
        loop {
            let Some(offset) = find(&self.buffer[self.scanned..], self.delimiter.as_bytes()) else {
                self.compact();
                return if self.pending() > self.max_message_size {
                    Err(FrameError::MessageTooLarge {
                        max: self.max_message_size,
                    })
                } else {
                    Ok(None)
                };
            };

            let end = self.scanned + offset;
            let start = self.cursor;
            self.cursor = end + delim_len;
            self.scanned = self.cursor;

            match codec::decode(&self.buffer[start..end]) {
                Ok(envelope) => return Ok(Some(envelope)),
                Err(e) => {
                    tracing::warn!(error = %e, len = end - start, "dropping undecodable message");
                }
            }
        }
    }

    /// Feed a chunk and collect every complete message it finishes.
    ///
    /// # Errors
    ///
    /// See [`next_message`](Self::next_message).
    pub fn decode_chunk(&mut self, chunk: &[u8]) -> Result<Vec<Envelope>, FrameError> {
        self.push(chunk);
        let mut messages = Vec::new();
        while let Some(envelope) = self.next_message()? {
            messages.push(envelope);
        }
        Ok(messages)
    }

    /// Drop consumed bytes and remember how far the remainder was searched.
    fn compact(&mut self) {
        let searched_to = self
            .buffer
            .len()
            .saturating_sub(self.delimiter.len() - 1)
            .max(self.cursor);
        self.buffer.drain(..self.cursor);
        self.scanned = searched_to - self.cursor;
        self.cursor = 0;
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.len() == 1 {
        return haystack.iter().position(|b| *b == needle[0]);
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
