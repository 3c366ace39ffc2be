//! CBOR serialization and base64 armor for payload bodies.
//!
//! Payloads are serialized to CBOR (RFC 8949) with [`ciborium`], then armored
//! with standard base64. The armored alphabet (`A-Z a-z 0-9 + / =`) is what
//! lets the framer use a plain delimiter without escaping.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{de::DeserializeOwned, Serialize};

use crate::event::EventKind;
use crate::CodecError;

/// Whether `byte` can occur in an armored body (or in an event code).
pub fn is_armor_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'+' | b'/' | b'=')
}

/// Serialize a value to armored CBOR.
///
/// # Errors
///
/// Returns [`CodecError::Serialization`] if the value cannot be serialized.
pub fn to_armored<T: Serialize>(value: &T, kind: EventKind) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| {
        CodecError::Serialization(format!("CBOR serialization of {kind} failed: {e}"))
    })?;
    Ok(STANDARD.encode(buf).into_bytes())
}

/// Deserialize a value from an armored CBOR body.
///
/// # Errors
///
/// Returns [`CodecError::MalformedPayload`] if the body is not valid base64,
/// not valid CBOR, or does not match the target schema.
pub fn from_armored<T: DeserializeOwned>(body: &[u8], kind: EventKind) -> Result<T, CodecError> {
    let raw = STANDARD
        .decode(body)
        .map_err(|e| CodecError::MalformedPayload {
            kind,
            reason: format!("invalid base64: {e}"),
        })?;
    ciborium::from_reader(raw.as_slice()).map_err(|e| CodecError::MalformedPayload {
        kind,
        reason: format!("CBOR deserialization failed: {e}"),
    })
}
