//! Handshake outcome and failure reasons.
//!
//! On the wire the outcome is a two-armed union: `{authorized: true}` or
//! `{authorized: false, error: "..."}`. The arm is selected by the presence of
//! `error`; any other combination is rejected when decoding.

use serde::{Deserialize, Serialize};

/// Reason a handshake failed, on either side of the connection.
///
/// `Display` yields the protocol code exactly (`"INVALID_PASSWORD"`, ...), so
/// a client surfacing this error reports the reason the server sent.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The server requires a password but none was configured locally.
    #[error("PASSWORD_REQUIRED")]
    PasswordRequired,
    /// The server requires no password but one was configured locally.
    #[error("PASSWORD_UNEXPECTED")]
    PasswordUnexpected,
    /// The password did not match the server's secret.
    #[error("INVALID_PASSWORD")]
    InvalidPassword,
    /// The password was not received before the server's deadline.
    #[error("TIMEOUT")]
    Timeout,
    /// Any other reason reported by a server.
    #[error("{0}")]
    Other(String),
}

impl AuthError {
    /// Protocol code of this error.
    pub fn code(&self) -> &str {
        match self {
            Self::PasswordRequired => "PASSWORD_REQUIRED",
            Self::PasswordUnexpected => "PASSWORD_UNEXPECTED",
            Self::InvalidPassword => "INVALID_PASSWORD",
            Self::Timeout => "TIMEOUT",
            Self::Other(reason) => reason,
        }
    }

    /// Parse a protocol code. Unknown codes are kept verbatim.
    pub fn from_code(code: &str) -> Self {
        match code {
            "PASSWORD_REQUIRED" => Self::PasswordRequired,
            "PASSWORD_UNEXPECTED" => Self::PasswordUnexpected,
            "INVALID_PASSWORD" => Self::InvalidPassword,
            "TIMEOUT" => Self::Timeout,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Result of the password exchange, sent by the server as `auth`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "AuthWire", try_from = "AuthWire")]
pub enum AuthOutcome {
    Authorized,
    /// `error` is the protocol code of the [`AuthError`].
    Rejected { error: String },
}

impl AuthOutcome {
    /// Rejection carrying the protocol code of `reason`.
    pub fn rejected(reason: &AuthError) -> Self {
        Self::Rejected {
            error: reason.code().to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct AuthWire {
    authorized: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<AuthOutcome> for AuthWire {
    fn from(outcome: AuthOutcome) -> Self {
        match outcome {
            AuthOutcome::Authorized => Self {
                authorized: true,
                error: None,
            },
            AuthOutcome::Rejected { error } => Self {
                authorized: false,
                error: Some(error),
            },
        }
    }
}

impl TryFrom<AuthWire> for AuthOutcome {
    type Error = String;

    fn try_from(wire: AuthWire) -> Result<Self, Self::Error> {
        match (wire.authorized, wire.error) {
            (true, None) => Ok(Self::Authorized),
            (false, Some(error)) => Ok(Self::Rejected { error }),
            (true, Some(_)) => Err("authorized outcome must not carry an error".to_string()),
            (false, None) => Err("rejected outcome is missing its error".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_is_code() {
        assert_eq!(AuthError::PasswordRequired.to_string(), "PASSWORD_REQUIRED");
        assert_eq!(AuthError::PasswordUnexpected.to_string(), "PASSWORD_UNEXPECTED");
        assert_eq!(AuthError::InvalidPassword.to_string(), "INVALID_PASSWORD");
        assert_eq!(AuthError::Timeout.to_string(), "TIMEOUT");
        assert_eq!(AuthError::Other("BANNED".into()).to_string(), "BANNED");
    }

    #[test]
    fn test_from_code() {
        assert_eq!(AuthError::from_code("TIMEOUT"), AuthError::Timeout);
        assert_eq!(
            AuthError::from_code("SOMETHING"),
            AuthError::Other("SOMETHING".to_string())
        );
        for err in [
            AuthError::PasswordRequired,
            AuthError::PasswordUnexpected,
            AuthError::InvalidPassword,
            AuthError::Timeout,
        ] {
            assert_eq!(AuthError::from_code(err.code()), err);
        }
    }

    #[test]
    fn test_outcome_json_arms() {
        let ok = serde_json::to_value(AuthOutcome::Authorized).expect("serialize");
        assert_eq!(ok, serde_json::json!({"authorized": true}));

        let rejected =
            serde_json::to_value(AuthOutcome::rejected(&AuthError::Timeout)).expect("serialize");
        assert_eq!(
            rejected,
            serde_json::json!({"authorized": false, "error": "TIMEOUT"})
        );
    }

    #[test]
    fn test_outcome_arm_selected_by_error_presence() {
        let parsed: AuthOutcome =
            serde_json::from_value(serde_json::json!({"authorized": false, "error": "X"}))
                .expect("deserialize");
        assert_eq!(parsed, AuthOutcome::Rejected { error: "X".into() });

        let missing: Result<AuthOutcome, _> =
            serde_json::from_value(serde_json::json!({"authorized": false}));
        assert!(missing.is_err());

        let contradictory: Result<AuthOutcome, _> =
            serde_json::from_value(serde_json::json!({"authorized": true, "error": "X"}));
        assert!(contradictory.is_err());
    }
}
