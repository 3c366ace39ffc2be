//! Point-in-time view of the observed server, delivered as `init`.

use serde::{Deserialize, Serialize};

use crate::SocketId;

/// Rooms and connected sockets at the moment an observer was authorized.
///
/// Personal rooms (a room named after its only occupant) never appear in
/// `rooms`, and every socket appears at most once in `sockets`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Shared rooms, sorted by name.
    pub rooms: Vec<RoomSummary>,
    /// Known sockets, sorted by id.
    pub sockets: Vec<SocketSummary>,
}

/// A room and the ids of its members.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummary {
    /// Room name.
    pub name: String,
    /// Member ids, sorted.
    pub sockets: Vec<SocketId>,
}

/// A connected socket.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketSummary {
    /// Socket id.
    pub id: SocketId,
    /// Unix timestamp in milliseconds, when the host reported one.
    #[serde(rename = "connectedAt")]
    pub connected_at: Option<u64>,
}

impl StateSnapshot {
    /// Look up a room by name.
    pub fn room(&self, name: &str) -> Option<&RoomSummary> {
        self.rooms.iter().find(|r| r.name == name)
    }

    /// Whether a socket id is listed as connected.
    pub fn has_socket(&self, id: &str) -> bool {
        self.sockets.iter().any(|s| s.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connected_at_wire_name() {
        let snapshot = StateSnapshot {
            rooms: vec![],
            sockets: vec![SocketSummary {
                id: "a".to_string(),
                connected_at: Some(1_494_426_891_618),
            }],
        };
        let json = serde_json::to_value(&snapshot).expect("serialize");
        assert_eq!(json["sockets"][0]["connectedAt"], 1_494_426_891_618u64);
        assert!(json["rooms"].is_array());
    }

    #[test]
    fn test_lookup_helpers() {
        let snapshot = StateSnapshot {
            rooms: vec![RoomSummary {
                name: "lobby".to_string(),
                sockets: vec!["a".to_string(), "b".to_string()],
            }],
            sockets: vec![SocketSummary {
                id: "a".to_string(),
                connected_at: None,
            }],
        };
        assert_eq!(snapshot.room("lobby").map(|r| r.sockets.len()), Some(2));
        assert!(snapshot.room("missing").is_none());
        assert!(snapshot.has_socket("a"));
        assert!(!snapshot.has_socket("z"));
    }
}
