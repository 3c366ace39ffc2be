//! Hook surface of the observed messaging server.
//!
//! The host calls one `on_*` method per domain event. Each event is relayed
//! to every authorized remote observer (through the [`Broker`]) and to every
//! in-process subscriber (through a broadcast channel), so a `Monitor` is
//! useful on its own, without any TCP server.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;
use sockwatch_transport::{Envelope, Payload};
use sockwatch_types::{
    BroadcastEvent, JoinEvent, LeaveEvent, SocketEvent, StateSnapshot, StringEvent, TrafficEvent,
};
use tokio::sync::broadcast;

use crate::broker::Broker;
use crate::snapshot::{self, RegistryView, StateSource};

/// Buffer of each in-process subscriber; slower subscribers lag.
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 1000;

/// Relay of domain events. Cheap to clone; clones share the same observers.
#[derive(Clone)]
pub struct Monitor {
    inner: Arc<Inner>,
}

struct Inner {
    broker: Broker,
    state: Arc<dyn StateSource>,
    local: broadcast::Sender<Arc<Envelope>>,
    sequence: AtomicU64,
}

impl Monitor {
    /// Create a monitor reading room/socket state from `state`.
    pub fn new(state: impl StateSource + 'static) -> Self {
        Self::with_capacity(state, DEFAULT_SUBSCRIBER_CAPACITY)
    }

    /// Like [`Monitor::new`], with room for `capacity` undelivered events per
    /// in-process subscriber.
    pub fn with_capacity(state: impl StateSource + 'static, capacity: usize) -> Self {
        let (local, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(Inner {
                broker: Broker::new(),
                state: Arc::new(state),
                local,
                sequence: AtomicU64::new(0),
            }),
        }
    }

    /// Remote observers currently receiving events.
    pub fn broker(&self) -> &Broker {
        &self.inner.broker
    }

    /// Registry the `init` snapshot is computed from.
    pub fn state_source(&self) -> Arc<dyn StateSource> {
        Arc::clone(&self.inner.state)
    }

    /// Current room/socket summary of the observed server.
    pub async fn state(&self) -> StateSnapshot {
        snapshot::snapshot(self.inner.state.as_ref()).await
    }

    /// Receive every event relayed from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Envelope>> {
        self.inner.local.subscribe()
    }

    /// Number of events relayed so far.
    pub fn sequence(&self) -> u64 {
        self.inner.sequence.load(Ordering::SeqCst)
    }

    /// Relay one event. Returns the number of remote observers it was queued
    /// for.
    pub async fn relay(&self, payload: Payload) -> usize {
        let envelope = Envelope::new(payload);
        self.inner.sequence.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(kind = %envelope.kind(), "relaying event");
        // No in-process subscriber is not an error.
        let _ = self.inner.local.send(Arc::new(envelope.clone()));
        self.inner.broker.fan_out(envelope).await
    }

    /// A packet was broadcast to `rooms` (all sockets when empty).
    pub async fn on_broadcast(&self, event: BroadcastEvent) -> usize {
        self.relay(Payload::Broadcast(event)).await
    }

    /// Socket `id` joined `rooms`.
    pub async fn on_join(&self, id: &str, rooms: Vec<String>) -> usize {
        self.relay(Payload::Join(JoinEvent {
            id: id.to_string(),
            rooms,
        }))
        .await
    }

    /// Relay `leave`: socket `id` left `room`.
    pub async fn on_leave(&self, id: &str, room: &str) -> usize {
        self.relay(Payload::Leave(LeaveEvent {
            id: id.to_string(),
            room: room.to_string(),
        }))
        .await
    }

    /// Socket `id` left every room it was in.
    pub async fn on_leave_all(&self, id: &str) -> usize {
        self.relay(Payload::LeaveAll(SocketEvent::new(id))).await
    }

    /// Relay `connect`: socket `id` connected.
    pub async fn on_connect(&self, id: &str) -> usize {
        self.relay(Payload::Connect(SocketEvent::new(id))).await
    }

    /// Relay `disconnect`: socket `id` went away.
    pub async fn on_disconnect(&self, id: &str) -> usize {
        self.relay(Payload::Disconnect(SocketEvent::new(id))).await
    }

    /// The server sent event `name` to socket `id` (relayed as `emit`).
    pub async fn on_client_send(&self, id: &str, name: &str, args: Vec<Value>) -> usize {
        self.relay(Payload::Emit(TrafficEvent {
            id: id.to_string(),
            name: name.to_string(),
            args,
        }))
        .await
    }

    /// Socket `id` sent event `name` to the server (relayed as `recv`).
    pub async fn on_client_receive(&self, id: &str, name: &str, args: Vec<Value>) -> usize {
        self.relay(Payload::Recv(TrafficEvent {
            id: id.to_string(),
            name: name.to_string(),
            args,
        }))
        .await
    }

    /// Raw string traffic of socket `id`.
    pub async fn on_string(&self, id: &str, string: &str) -> usize {
        self.relay(Payload::String(StringEvent {
            id: id.to_string(),
            string: string.to_string(),
        }))
        .await
    }

    /// An error reported by the observed server.
    pub async fn on_error(&self, message: &str) -> usize {
        self.relay(Payload::Error(message.to_string())).await
    }
}

impl Default for Monitor {
    /// A monitor whose host exposes no room/socket state.
    fn default() -> Self {
        Self::new(RegistryView::default())
    }
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("sequence", &self.sequence())
            .field("subscribers", &self.inner.local.receiver_count())
            .finish_non_exhaustive()
    }
}
