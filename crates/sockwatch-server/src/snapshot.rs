//! State snapshot: the host's room/socket registry reduced to the `init`
//! payload.
//!
//! The host implements [`StateSource`]; [`reduce`] turns its answer into a
//! [`StateSnapshot`]. Snapshots are computed fresh for every authorized
//! observer, since membership changes between requests.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use sockwatch_types::{RoomSummary, SocketId, SocketSummary, StateSnapshot};

/// A room as reported by the host.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoomMembers {
    /// Room name.
    pub name: String,
    /// Ids of the sockets in the room, in any order.
    pub members: Vec<SocketId>,
}

/// A live connection as reported by the host.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConnectionInfo {
    /// Socket id.
    pub id: SocketId,
    /// Unix timestamp in milliseconds.
    pub connected_at: Option<u64>,
}

/// Raw registry of the observed server.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegistryView {
    /// Every room, personal ones included.
    pub rooms: Vec<RoomMembers>,
    /// Every live connection.
    pub connections: Vec<ConnectionInfo>,
}

impl RegistryView {
    /// Add a room with its members.
    pub fn with_room(
        mut self,
        name: impl Into<String>,
        members: impl IntoIterator<Item = impl Into<SocketId>>,
    ) -> Self {
        self.rooms.push(RoomMembers {
            name: name.into(),
            members: members.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Add a connection.
    pub fn with_connection(mut self, id: impl Into<SocketId>, connected_at: Option<u64>) -> Self {
        self.connections.push(ConnectionInfo {
            id: id.into(),
            connected_at,
        });
        self
    }
}

/// Read access to the observed server's registry, implemented by the host.
#[async_trait]
pub trait StateSource: Send + Sync {
    async fn registry(&self) -> RegistryView;
}

/// A fixed registry; useful for hosts without rooms and in tests.
#[async_trait]
impl StateSource for RegistryView {
    async fn registry(&self) -> RegistryView {
        self.clone()
    }
}

/// Query `source` and reduce its answer.
pub async fn snapshot(source: &dyn StateSource) -> StateSnapshot {
    reduce(&source.registry().await)
}

/// Reduce a registry to its wire summary.
///
/// - a room whose only member is named like the room (personal room) is
///   dropped;
/// - every id seen in a connection or a room is listed once in `sockets`,
///   with the first known connection timestamp;
/// - rooms, members and sockets are sorted, so equal registries give equal
///   snapshots.
pub fn reduce(view: &RegistryView) -> StateSnapshot {
    let mut rooms: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for room in &view.rooms {
        rooms
            .entry(room.name.as_str())
            .or_default()
            .extend(room.members.iter().map(String::as_str));
    }

    let mut sockets: BTreeMap<&str, Option<u64>> = BTreeMap::new();
    for conn in &view.connections {
        let entry = sockets.entry(conn.id.as_str()).or_insert(None);
        if entry.is_none() {
            *entry = conn.connected_at;
        }
    }
    for members in rooms.values() {
        for &id in members {
            sockets.entry(id).or_insert(None);
        }
    }

    StateSnapshot {
        rooms: rooms
            .into_iter()
            .filter(|(name, members)| !is_personal_room(name, members))
            .map(|(name, members)| RoomSummary {
                name: name.to_string(),
                sockets: members.into_iter().map(str::to_string).collect(),
            })
            .collect(),
        sockets: sockets
            .into_iter()
            .map(|(id, connected_at)| SocketSummary {
                id: id.to_string(),
                connected_at,
            })
            .collect(),
    }
}

fn is_personal_room(name: &str, members: &BTreeSet<&str>) -> bool {
    members.len() == 1 && members.contains(name)
}
