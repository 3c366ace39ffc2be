//! Message codec: `<2-byte ASCII code><armored payload, possibly empty>`.
//!
//! Pure functions, no I/O. Argument lists of `broadcast`, `emit` and `recv`
//! carry application values of unknown shape: each argument is serialized to
//! its own JSON text before being placed in the CBOR body, and parsed back
//! independently on decode.
//!
//! Encoding is deterministic: `encode(decode(encode(e)))` is byte-identical to
//! `encode(e)`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sockwatch_types::{BroadcastEvent, TrafficEvent};

use crate::cbor::{from_armored, to_armored};
use crate::event::{Envelope, EventKind, Payload};
use crate::{CodecError, Result};

/// Length of the event code prefix.
pub const CODE_LEN: usize = 2;

/// Deepest array/object nesting accepted in an argument. The JSON parser on
/// the decode side refuses anything deeper, so encode refuses it too.
pub const MAX_ARG_DEPTH: usize = 127;

#[derive(Serialize)]
struct BroadcastOut<'a> {
    rooms: &'a [String],
    flags: &'a [String],
    name: &'a str,
    args: Vec<String>,
}

#[derive(Deserialize)]
struct BroadcastIn {
    rooms: Vec<String>,
    flags: Vec<String>,
    name: String,
    args: Vec<String>,
}

#[derive(Serialize)]
struct TrafficOut<'a> {
    id: &'a str,
    name: &'a str,
    args: Vec<String>,
}

#[derive(Deserialize)]
struct TrafficIn {
    id: String,
    name: String,
    args: Vec<String>,
}

/// Encode an envelope.
///
/// # Errors
///
/// Returns [`CodecError::Serialization`] if the payload cannot be serialized,
/// including an argument nested deeper than [`MAX_ARG_DEPTH`].
pub fn encode(envelope: &Envelope) -> Result<Vec<u8>> {
    let mut out = envelope.kind().code().as_bytes().to_vec();
    if let Some(payload) = envelope.payload() {
        out.extend(encode_payload(payload)?);
    }
    Ok(out)
}

/// Encode an event given by its protocol name.
///
/// # Errors
///
/// Returns [`CodecError::UnknownEventName`] if `name` is not registered.
pub fn encode_named(name: &str, payload: Option<Payload>) -> Result<Vec<u8>> {
    encode(&Envelope::named(name, payload)?)
}

/// Decode one message (without its delimiter).
///
/// # Errors
///
/// Returns [`CodecError::UnknownCode`] if the two leading bytes do not name a
/// kind, or [`CodecError::MalformedPayload`] if the body does not match the
/// kind's schema.
pub fn decode(bytes: &[u8]) -> Result<Envelope> {
    if bytes.len() < CODE_LEN {
        return Err(CodecError::UnknownCode(
            String::from_utf8_lossy(bytes).into_owned(),
        ));
    }
    let (code, body) = bytes.split_at(CODE_LEN);
    let kind = EventKind::from_code(code)
        .ok_or_else(|| CodecError::UnknownCode(String::from_utf8_lossy(code).into_owned()))?;

    if body.is_empty() {
        return Ok(Envelope::empty(kind));
    }

    let payload = match kind {
        EventKind::ReqAuth => Payload::ReqAuth(from_armored(body, kind)?),
        EventKind::Password => Payload::Password(from_armored(body, kind)?),
        EventKind::Auth => Payload::Auth(from_armored(body, kind)?),
        EventKind::Init => Payload::Init(from_armored(body, kind)?),
        EventKind::Broadcast => {
            let wire: BroadcastIn = from_armored(body, kind)?;
            Payload::Broadcast(BroadcastEvent {
                rooms: wire.rooms,
                flags: wire.flags,
                name: wire.name,
                args: args_from_text(wire.args, kind)?,
            })
        }
        EventKind::Join => Payload::Join(from_armored(body, kind)?),
        EventKind::Leave => Payload::Leave(from_armored(body, kind)?),
        EventKind::LeaveAll => Payload::LeaveAll(from_armored(body, kind)?),
        EventKind::Connect => Payload::Connect(from_armored(body, kind)?),
        EventKind::Disconnect => Payload::Disconnect(from_armored(body, kind)?),
        EventKind::Emit => Payload::Emit(traffic_from_wire(body, kind)?),
        EventKind::Recv => Payload::Recv(traffic_from_wire(body, kind)?),
        EventKind::String => Payload::String(from_armored(body, kind)?),
        EventKind::Error => Payload::Error(from_armored(body, kind)?),
    };
    Ok(Envelope::new(payload))
}

fn encode_payload(payload: &Payload) -> Result<Vec<u8>> {
    let kind = payload.kind();
    match payload {
        Payload::ReqAuth(required) => to_armored(required, kind),
        Payload::Password(text) | Payload::Error(text) => to_armored(text, kind),
        Payload::Auth(outcome) => to_armored(outcome, kind),
        Payload::Init(snapshot) => to_armored(snapshot, kind),
        Payload::Broadcast(event) => to_armored(
            &BroadcastOut {
                rooms: &event.rooms,
                flags: &event.flags,
                name: &event.name,
                args: args_to_text(&event.args, kind)?,
            },
            kind,
        ),
        Payload::Join(event) => to_armored(event, kind),
        Payload::Leave(event) => to_armored(event, kind),
        Payload::LeaveAll(event) | Payload::Connect(event) | Payload::Disconnect(event) => {
            to_armored(event, kind)
        }
        Payload::Emit(event) | Payload::Recv(event) => to_armored(
            &TrafficOut {
                id: &event.id,
                name: &event.name,
                args: args_to_text(&event.args, kind)?,
            },
            kind,
        ),
        Payload::String(event) => to_armored(event, kind),
    }
}

fn traffic_from_wire(body: &[u8], kind: EventKind) -> Result<TrafficEvent> {
    let wire: TrafficIn = from_armored(body, kind)?;
    Ok(TrafficEvent {
        id: wire.id,
        name: wire.name,
        args: args_from_text(wire.args, kind)?,
    })
}

fn args_to_text(args: &[Value], kind: EventKind) -> Result<Vec<String>> {
    args.iter()
        .map(|arg| {
            if nesting_depth(arg) > MAX_ARG_DEPTH {
                return Err(CodecError::Serialization(format!(
                    "{kind} argument nests deeper than {MAX_ARG_DEPTH} levels"
                )));
            }
            serde_json::to_string(arg).map_err(|e| {
                CodecError::Serialization(format!("{kind} argument is not serializable: {e}"))
            })
        })
        .collect()
}

/// Array/object nesting depth of `value`; scalars are depth 0.
fn nesting_depth(value: &Value) -> usize {
    let mut deepest = 0;
    let mut stack = vec![(value, 0)];
    while let Some((value, depth)) = stack.pop() {
        let depth = depth + 1;
        match value {
            Value::Array(items) => stack.extend(items.iter().map(|child| (child, depth))),
            Value::Object(map) => stack.extend(map.values().map(|child| (child, depth))),
            _ => continue,
        }
        deepest = deepest.max(depth);
    }
    deepest
}

fn args_from_text(args: Vec<String>, kind: EventKind) -> Result<Vec<Value>> {
    args.iter()
        .map(|text| {
            serde_json::from_str(text).map_err(|e| CodecError::MalformedPayload {
                kind,
                reason: format!("argument is not valid JSON: {e}"),
            })
        })
        .collect()
}
