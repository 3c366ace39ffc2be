//! Payloads of the domain events reported by the observed messaging server.
//!
//! Argument lists (`args`) are arbitrary application values, kept as
//! [`serde_json::Value`] so they round-trip without constraining their type.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::SocketId;

/// A packet broadcast to a set of rooms.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BroadcastEvent {
    /// Target rooms (empty = every socket).
    pub rooms: Vec<String>,
    /// Broadcast flags set by the emitter (e.g. `volatile`, `compress`).
    pub flags: Vec<String>,
    /// Event name.
    pub name: String,
    /// Application arguments, in emission order.
    pub args: Vec<Value>,
}

/// A socket joined one or more rooms.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinEvent {
    /// Socket that joined.
    pub id: SocketId,
    /// Rooms joined.
    pub rooms: Vec<String>,
}

/// A socket left a single room.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveEvent {
    /// Socket that left.
    pub id: SocketId,
    /// Room left.
    pub room: String,
}

/// An event that only concerns one socket: `connect`, `disconnect`, `leaveAll`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketEvent {
    /// Socket concerned.
    pub id: SocketId,
}

impl SocketEvent {
    /// Event about socket `id`.
    pub fn new(id: impl Into<SocketId>) -> Self {
        Self { id: id.into() }
    }
}

/// A message sent to (`emit`) or received from (`recv`) a single socket.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrafficEvent {
    /// Socket the message was sent to or received from.
    pub id: SocketId,
    /// Event name.
    pub name: String,
    /// Application arguments, in emission order.
    pub args: Vec<Value>,
}

/// A raw string message exchanged with a socket.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringEvent {
    /// Socket concerned.
    pub id: SocketId,
    /// Raw text.
    pub string: String,
}
