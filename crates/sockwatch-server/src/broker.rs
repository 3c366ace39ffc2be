//! Registry of authorized observer sessions and event fan-out.
//!
//! Each session owns an unbounded outbound queue drained by its writer task.
//! Fan-out copies each session's id and queue sender under the read lock and
//! delivers outside of it: register/deregister (write lock) are atomic with respect
//! to the membership a fan-out sees, and a slow or dead recipient never holds
//! the lock or blocks the others.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use sockwatch_transport::Envelope;
use tokio::sync::{mpsc, RwLock};
use tokio::task::AbortHandle;

/// Identifier assigned to each accepted connection.
pub type SessionId = u64;

/// Outbound queue of a session.
pub type Outbound = mpsc::UnboundedSender<Arc<Envelope>>;

/// Broker-side handle of an authorized session.
#[derive(Debug)]
pub struct SessionHandle {
    /// Connection the handle belongs to.
    pub id: SessionId,
    /// Remote address of the observer.
    pub peer: SocketAddr,
    outbound: Outbound,
    /// Background jobs owned by the session, cancelled on deregistration.
    jobs: Vec<AbortHandle>,
}

impl SessionHandle {
    /// Handle for session `id`, queueing into `outbound`.
    pub fn new(id: SessionId, peer: SocketAddr, outbound: Outbound) -> Self {
        Self {
            id,
            peer,
            outbound,
            jobs: Vec::new(),
        }
    }

    /// Tie a background job (e.g. the snapshot fetch) to the session lifetime.
    pub fn with_job(mut self, job: AbortHandle) -> Self {
        self.jobs.push(job);
        self
    }

    fn cancel_jobs(&self) {
        for job in &self.jobs {
            job.abort();
        }
    }
}

/// Process-wide set of observers receiving relayed events.
#[derive(Debug, Default)]
pub struct Broker {
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
}

impl Broker {
    /// An empty broker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an authorized session. Registering an id twice keeps the first
    /// handle; returns whether the session was newly added.
    pub async fn register(&self, handle: SessionHandle) -> bool {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&handle.id) {
            return false;
        }
        tracing::debug!(session = handle.id, peer = %handle.peer, "observer registered");
        sessions.insert(handle.id, handle);
        true
    }

    /// Remove a session and cancel its background jobs. Returns whether the
    /// session was registered.
    pub async fn deregister(&self, id: SessionId) -> bool {
        let removed = self.sessions.write().await.remove(&id);
        match removed {
            Some(handle) => {
                handle.cancel_jobs();
                tracing::debug!(session = id, peer = %handle.peer, "observer deregistered");
                true
            }
            None => false,
        }
    }

    /// Deliver one event to every registered session. Returns the number of
    /// sessions it was queued for.
    pub async fn fan_out(&self, envelope: Envelope) -> usize {
        let recipients: Vec<(SessionId, Outbound)> = self
            .sessions
            .read()
            .await
            .values()
            .map(|handle| (handle.id, handle.outbound.clone()))
            .collect();
        if recipients.is_empty() {
            return 0;
        }

        let envelope = Arc::new(envelope);
        let mut delivered = 0;
        for (id, outbound) in &recipients {
            match outbound.send(Arc::clone(&envelope)) {
                Ok(()) => delivered += 1,
                Err(_) => tracing::warn!(
                    session = *id,
                    kind = %envelope.kind(),
                    "observer is gone, event not delivered"
                ),
            }
        }
        delivered
    }

    /// Number of registered observers.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether no observer is registered.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
