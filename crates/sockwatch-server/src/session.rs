//! One accepted observer connection.
//!
//! The connection task runs the handshake and then only watches the inbound
//! stream for closure; outbound traffic (handshake replies, `init`, relayed
//! events) goes through a single queue drained by a writer task, which keeps
//! per-observer ordering.

use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use sockwatch_transport::{split, Delimiter, Envelope, FrameError, Payload};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Sleep;

use crate::auth::{AuthSession, Step};
use crate::broker::{Outbound, SessionHandle, SessionId};
use crate::monitor::Monitor;
use crate::snapshot::{self, StateSource};

/// Per-connection parameters derived from the server configuration.
#[derive(Clone, Debug)]
pub struct SessionSettings {
    /// Expected secret; `None` disables authentication.
    pub password: Option<String>,
    /// Time allowed to answer the password challenge.
    pub auth_timeout: Duration,
    /// Message delimiter on this connection.
    pub delimiter: Delimiter,
}

enum Input {
    Deadline,
    Inbound(Result<Option<Envelope>, FrameError>),
}

/// Drive a connection until the peer leaves or the handshake fails.
pub async fn handle_connection(
    monitor: Monitor,
    settings: Arc<SessionSettings>,
    id: SessionId,
    stream: TcpStream,
    peer: SocketAddr,
) {
    let (mut reader, mut writer) = split(stream, settings.delimiter.clone());
    let (outbound, mut queue) = mpsc::unbounded_channel::<Arc<Envelope>>();

    let writer_task = tokio::spawn(async move {
        while let Some(envelope) = queue.recv().await {
            if let Err(e) = writer.send(&envelope).await {
                tracing::debug!(session = id, error = %e, "write failed");
                return;
            }
        }
        if let Err(e) = writer.shutdown().await {
            tracing::debug!(session = id, error = %e, "shutdown failed");
        }
    });

    let mut auth = AuthSession::new(settings.password.clone());
    queue_envelope(&outbound, auth.hello());

    let mut deadline: Option<Pin<Box<Sleep>>> = auth
        .awaits_password()
        .then(|| Box::pin(tokio::time::sleep(settings.auth_timeout)));

    loop {
        let input = match deadline.as_mut() {
            Some(sleep) => tokio::select! {
                () = sleep.as_mut() => Input::Deadline,
                received = reader.recv() => Input::Inbound(received),
            },
            None => Input::Inbound(reader.recv().await),
        };

        let step = match input {
            Input::Deadline => {
                deadline = None;
                auth.on_timeout()
            }
            Input::Inbound(Ok(Some(envelope))) => auth.on_message(&envelope),
            Input::Inbound(Ok(None)) => {
                tracing::debug!(session = id, %peer, "observer closed the connection");
                break;
            }
            Input::Inbound(Err(FrameError::Io(e))) => {
                tracing::debug!(session = id, %peer, error = %e, "read failed");
                break;
            }
            Input::Inbound(Err(e)) => {
                tracing::warn!(session = id, %peer, error = %e, "closing connection");
                queue_envelope(&outbound, Envelope::new(Payload::Error(e.to_string())));
                break;
            }
        };

        match step {
            Step::Pending => {}
            Step::Authorized { reply } => {
                deadline = None;
                if let Some(reply) = reply {
                    queue_envelope(&outbound, reply);
                }
                let job = spawn_snapshot(monitor.state_source(), outbound.clone(), id);
                let handle =
                    SessionHandle::new(id, peer, outbound.clone()).with_job(job.abort_handle());
                monitor.broker().register(handle).await;
                tracing::info!(session = id, %peer, "observer authorized");
            }
            Step::Rejected { reply, reason } => {
                queue_envelope(&outbound, reply);
                tracing::warn!(session = id, %peer, %reason, "handshake rejected");
                break;
            }
        }
    }

    monitor.broker().deregister(id).await;
    // The writer flushes what is queued, then closes once every sender is gone.
    drop(outbound);
    if let Err(e) = writer_task.await {
        tracing::debug!(session = id, error = %e, "writer task failed");
    }
}

fn queue_envelope(outbound: &Outbound, envelope: Envelope) {
    // The writer only stops early when the peer is gone; the read side
    // notices that on its own.
    let _ = outbound.send(Arc::new(envelope));
}

/// Fetch the snapshot in the background and queue it as `init`.
fn spawn_snapshot(
    source: Arc<dyn StateSource>,
    outbound: Outbound,
    id: SessionId,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let snapshot = snapshot::snapshot(source.as_ref()).await;
        tracing::debug!(
            session = id,
            rooms = snapshot.rooms.len(),
            sockets = snapshot.sockets.len(),
            "sending init"
        );
        queue_envelope(&outbound, Envelope::new(Payload::Init(snapshot)));
    })
}
