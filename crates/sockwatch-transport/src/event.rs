//! Event kinds and the typed envelope exchanged on the monitor channel.
//!
//! Every kind is bound to a fixed 2-character ASCII code. The code table is
//! part of the protocol and must never be renumbered:
//!
//! | kind         | code | payload                                  |
//! |--------------|------|------------------------------------------|
//! | `reqAuth`    | `00` | `bool` (password required)               |
//! | `password`   | `01` | `string`                                 |
//! | `auth`       | `02` | [`AuthOutcome`]                          |
//! | `init`       | `10` | [`StateSnapshot`]                        |
//! | `broadcast`  | `11` | [`BroadcastEvent`]                       |
//! | `join`       | `12` | [`JoinEvent`]                            |
//! | `leave`      | `13` | [`LeaveEvent`]                           |
//! | `leaveAll`   | `14` | [`SocketEvent`]                          |
//! | `connect`    | `15` | [`SocketEvent`]                          |
//! | `disconnect` | `16` | [`SocketEvent`]                          |
//! | `emit`       | `17` | [`TrafficEvent`]                         |
//! | `recv`       | `18` | [`TrafficEvent`]                         |
//! | `string`     | `20` | [`StringEvent`]                          |
//! | `error`      | `99` | `string`                                 |

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use sockwatch_types::{
    AuthOutcome, BroadcastEvent, JoinEvent, LeaveEvent, SocketEvent, StateSnapshot, StringEvent,
    TrafficEvent,
};

use crate::CodecError;

/// Closed set of event kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    ReqAuth,
    Password,
    Auth,
    Init,
    Broadcast,
    Join,
    Leave,
    LeaveAll,
    Connect,
    Disconnect,
    Emit,
    Recv,
    String,
    Error,
}

impl EventKind {
    /// Every kind, in code order.
    pub const ALL: [EventKind; 14] = [
        Self::ReqAuth,
        Self::Password,
        Self::Auth,
        Self::Init,
        Self::Broadcast,
        Self::Join,
        Self::Leave,
        Self::LeaveAll,
        Self::Connect,
        Self::Disconnect,
        Self::Emit,
        Self::Recv,
        Self::String,
        Self::Error,
    ];

    /// The 2-character wire code.
    pub const fn code(self) -> &'static str {
        match self {
            Self::ReqAuth => "00",
            Self::Password => "01",
            Self::Auth => "02",
            Self::Init => "10",
            Self::Broadcast => "11",
            Self::Join => "12",
            Self::Leave => "13",
            Self::LeaveAll => "14",
            Self::Connect => "15",
            Self::Disconnect => "16",
            Self::Emit => "17",
            Self::Recv => "18",
            Self::String => "20",
            Self::Error => "99",
        }
    }

    /// The protocol name of the event.
    pub const fn name(self) -> &'static str {
        match self {
            Self::ReqAuth => "reqAuth",
            Self::Password => "password",
            Self::Auth => "auth",
            Self::Init => "init",
            Self::Broadcast => "broadcast",
            Self::Join => "join",
            Self::Leave => "leave",
            Self::LeaveAll => "leaveAll",
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::Emit => "emit",
            Self::Recv => "recv",
            Self::String => "string",
            Self::Error => "error",
        }
    }

    /// Kind for a 2-byte wire code.
    pub fn from_code(code: &[u8]) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.code().as_bytes() == code)
    }

    /// Kind for a protocol event name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EventKind {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| CodecError::UnknownEventName(s.to_string()))
    }
}

/// Typed payload of an event. The variant determines the kind.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    ReqAuth(bool),
    Password(String),
    Auth(AuthOutcome),
    Init(StateSnapshot),
    Broadcast(BroadcastEvent),
    Join(JoinEvent),
    Leave(LeaveEvent),
    LeaveAll(SocketEvent),
    Connect(SocketEvent),
    Disconnect(SocketEvent),
    Emit(TrafficEvent),
    Recv(TrafficEvent),
    String(StringEvent),
    Error(String),
}

impl Payload {
    /// Kind this payload belongs to.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::ReqAuth(_) => EventKind::ReqAuth,
            Self::Password(_) => EventKind::Password,
            Self::Auth(_) => EventKind::Auth,
            Self::Init(_) => EventKind::Init,
            Self::Broadcast(_) => EventKind::Broadcast,
            Self::Join(_) => EventKind::Join,
            Self::Leave(_) => EventKind::Leave,
            Self::LeaveAll(_) => EventKind::LeaveAll,
            Self::Connect(_) => EventKind::Connect,
            Self::Disconnect(_) => EventKind::Disconnect,
            Self::Emit(_) => EventKind::Emit,
            Self::Recv(_) => EventKind::Recv,
            Self::String(_) => EventKind::String,
            Self::Error(_) => EventKind::Error,
        }
    }
}

/// One message on the channel: a kind and, unless the body is empty, its
/// payload. The payload always matches the kind.
#[derive(Clone, Debug, PartialEq)]
pub struct Envelope {
    kind: EventKind,
    payload: Option<Payload>,
}

impl Envelope {
    /// Envelope carrying `payload`; the kind is taken from it.
    pub fn new(payload: Payload) -> Self {
        Self {
            kind: payload.kind(),
            payload: Some(payload),
        }
    }

    /// An event without payload; encodes to a zero-length body.
    pub fn empty(kind: EventKind) -> Self {
        Self {
            kind,
            payload: None,
        }
    }

    /// Build an envelope from a protocol event name.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnknownEventName`] if `name` is not registered,
    /// or [`CodecError::MalformedPayload`] if the payload belongs to another
    /// kind.
    pub fn named(name: &str, payload: Option<Payload>) -> Result<Self, CodecError> {
        let kind: EventKind = name.parse()?;
        match payload {
            Some(p) if p.kind() != kind => Err(CodecError::MalformedPayload {
                kind,
                reason: format!("payload belongs to {}", p.kind()),
            }),
            payload => Ok(Self { kind, payload }),
        }
    }

    /// Event kind.
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Payload, or `None` for an empty event.
    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }
}

impl From<Payload> for Envelope {
    fn from(payload: Payload) -> Self {
        Self::new(payload)
    }
}
