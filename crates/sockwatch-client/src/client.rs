//! Observer side of the monitor channel.
//!
//! [`connect`] opens the TCP connection and runs the handshake; the returned
//! [`MonitorClient`] then yields relayed events in arrival order.

use std::collections::VecDeque;
use std::net::SocketAddr;

use sockwatch_transport::{split, Envelope, EventKind, FramedReader, FramedWriter, Payload};
use sockwatch_types::{AuthError, AuthOutcome};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::config::ClientConfig;
use crate::{ClientError, Result};

/// An authorized observer connection.
pub struct MonitorClient {
    reader: FramedReader<OwnedReadHalf>,
    writer: FramedWriter<OwnedWriteHalf>,
    peer: SocketAddr,
    /// Events that arrived while waiting for the `auth` reply.
    pending: VecDeque<Envelope>,
}

/// Connect to a monitor server and complete the handshake.
///
/// # Errors
///
/// - [`ClientError::Io`] if the connection cannot be established;
/// - [`ClientError::Auth`] with `PASSWORD_REQUIRED` or `PASSWORD_UNEXPECTED`
///   when the local configuration does not match the server, or with the
///   reason the server rejected the password for;
/// - [`ClientError::ConnectionClosed`] if the server hangs up mid-handshake.
pub async fn connect(config: &ClientConfig) -> Result<MonitorClient> {
    let delimiter = config.delimiter()?;
    let stream = TcpStream::connect((config.host.as_str(), config.port)).await?;
    let peer = stream.peer_addr()?;
    let (reader, writer) = split(stream, delimiter);
    let mut client = MonitorClient {
        reader,
        writer,
        peer,
        pending: VecDeque::new(),
    };

    let required = client.await_challenge().await?;
    match (required, config.password()) {
        (true, None) => Err(AuthError::PasswordRequired.into()),
        (false, Some(_)) => Err(AuthError::PasswordUnexpected.into()),
        (false, None) => {
            // The server still waits for an echo before streaming events.
            client.send_password("").await?;
            tracing::debug!(peer = %client.peer, "connected without authentication");
            Ok(client)
        }
        (true, Some(password)) => {
            client.send_password(password).await?;
            client.await_outcome().await?;
            tracing::debug!(peer = %client.peer, "authenticated");
            Ok(client)
        }
    }
}

impl MonitorClient {
    /// Address of the monitor server.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Next relayed event, or `None` once the server closed the connection.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Io`] if the read fails.
    pub async fn next_event(&mut self) -> Result<Option<Envelope>> {
        if let Some(envelope) = self.pending.pop_front() {
            return Ok(Some(envelope));
        }
        Ok(self.reader.recv().await?)
    }

    /// Close the write direction; the server then drops the session.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Io`] if the shutdown fails.
    pub async fn close(mut self) -> Result<()> {
        self.writer.shutdown().await?;
        Ok(())
    }

    async fn recv_required(&mut self) -> Result<Envelope> {
        self.reader
            .recv()
            .await?
            .ok_or(ClientError::ConnectionClosed)
    }

    async fn send_password(&mut self, password: &str) -> Result<()> {
        self.writer
            .send(&Envelope::new(Payload::Password(password.to_string())))
            .await?;
        Ok(())
    }

    /// Wait for `reqAuth`; returns whether the server requires a password.
    async fn await_challenge(&mut self) -> Result<bool> {
        loop {
            let envelope = self.recv_required().await?;
            match envelope.payload() {
                Some(Payload::ReqAuth(required)) => return Ok(*required),
                _ if envelope.kind() == EventKind::ReqAuth => {
                    return Err(ClientError::UnexpectedMessage(EventKind::ReqAuth));
                }
                _ => tracing::debug!(kind = %envelope.kind(), "ignoring message before reqAuth"),
            }
        }
    }

    async fn await_outcome(&mut self) -> Result<()> {
        loop {
            let envelope = self.recv_required().await?;
            match envelope.payload() {
                Some(Payload::Auth(AuthOutcome::Authorized)) => return Ok(()),
                Some(Payload::Auth(AuthOutcome::Rejected { error })) => {
                    return Err(AuthError::from_code(error).into());
                }
                _ => {}
            }
            if envelope.kind() == EventKind::Auth {
                return Err(ClientError::UnexpectedMessage(EventKind::Auth));
            }
            self.pending.push_back(envelope);
        }
    }
}
