//! Server side of the handshake.
//!
//! ```text
//!              hello()
//! AwaitHello ──────────┬──► AwaitEcho ──── password(_) ──────────► Authorized
//!                      │
//!                      └──► AwaitPassword ── password(secret) ───► Authorized
//!                                 │
//!                                 ├─ password(other) ─► Rejected(INVALID_PASSWORD)
//!                                 └─ timeout ─────────► Rejected(TIMEOUT)
//! ```
//!
//! The echo round-trip of a passwordless server guarantees the client has
//! processed `reqAuth` before any event is streamed to it.
//!
//! [`AuthSession`] does no I/O and owns no timer: the connection task sends
//! what it returns and races the deadline against the inbound stream.

use sockwatch_transport::{Envelope, EventKind, Payload};
use sockwatch_types::{AuthError, AuthOutcome};

/// Where a connection stands in the password exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandshakeState {
    /// `reqAuth` not sent yet.
    AwaitHello,
    /// No password configured; waiting for the client's empty echo.
    AwaitEcho,
    /// Waiting for the password, under the deadline.
    AwaitPassword,
    /// The connection is an observer.
    Authorized,
    /// Terminal; the connection is closing.
    Rejected,
}

/// What the connection must do after feeding the state machine.
#[derive(Debug, PartialEq)]
pub enum Step {
    /// Nothing changed; keep waiting.
    Pending,
    /// Send `reply` (if any) and promote the connection to an observer.
    Authorized { reply: Option<Envelope> },
    /// Send `reply`, then close the connection.
    Rejected { reply: Envelope, reason: AuthError },
}

/// Server side of the handshake for one connection.
pub struct AuthSession {
    state: HandshakeState,
    password: Option<String>,
}

impl AuthSession {
    /// `password` is the configured secret; `None` disables authentication.
    pub fn new(password: Option<String>) -> Self {
        Self {
            state: HandshakeState::AwaitHello,
            password,
        }
    }

    /// Current handshake state.
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Whether the server demands a password.
    pub fn password_required(&self) -> bool {
        self.password.is_some()
    }

    /// Whether the connection must run the password deadline.
    pub fn awaits_password(&self) -> bool {
        self.state == HandshakeState::AwaitPassword
    }

    /// The `reqAuth` greeting sent as soon as the connection is accepted.
    pub fn hello(&mut self) -> Envelope {
        self.state = if self.password_required() {
            HandshakeState::AwaitPassword
        } else {
            HandshakeState::AwaitEcho
        };
        Envelope::new(Payload::ReqAuth(self.password_required()))
    }

    /// Feed a message received from the client.
    pub fn on_message(&mut self, envelope: &Envelope) -> Step {
        if envelope.kind() != EventKind::Password {
            tracing::debug!(
                kind = %envelope.kind(),
                state = ?self.state,
                "ignoring message outside of the handshake"
            );
            return Step::Pending;
        }

        match self.state {
            HandshakeState::AwaitEcho => {
                self.state = HandshakeState::Authorized;
                Step::Authorized { reply: None }
            }
            HandshakeState::AwaitPassword => {
                let received = match envelope.payload() {
                    Some(Payload::Password(p)) => p.as_str(),
                    _ => "",
                };
                if self.password.as_deref() == Some(received) {
                    self.state = HandshakeState::Authorized;
                    Step::Authorized {
                        reply: Some(Envelope::new(Payload::Auth(AuthOutcome::Authorized))),
                    }
                } else {
                    self.reject(AuthError::InvalidPassword)
                }
            }
            HandshakeState::AwaitHello
            | HandshakeState::Authorized
            | HandshakeState::Rejected => {
                tracing::debug!(state = ?self.state, "ignoring unexpected password message");
                Step::Pending
            }
        }
    }

    /// The password deadline elapsed.
    pub fn on_timeout(&mut self) -> Step {
        if self.awaits_password() {
            self.reject(AuthError::Timeout)
        } else {
            Step::Pending
        }
    }

    fn reject(&mut self, reason: AuthError) -> Step {
        self.state = HandshakeState::Rejected;
        Step::Rejected {
            reply: Envelope::new(Payload::Auth(AuthOutcome::rejected(&reason))),
            reason,
        }
    }
}
