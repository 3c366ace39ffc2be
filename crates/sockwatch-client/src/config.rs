//! Observer connection parameters.

use serde::{Deserialize, Serialize};
use sockwatch_transport::{Delimiter, FrameError};
use sockwatch_types::{DEFAULT_HOST, DEFAULT_PORT};

/// Where and how an observer connects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Monitor server host.
    #[serde(default = "default_host")]
    pub host: String,
    /// Monitor server port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Shared secret; must be set exactly when the server requires one.
    #[serde(default)]
    pub password: Option<String>,
    /// Must match the server's delimiter.
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_delimiter() -> String {
    "\n".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            password: None,
            delimiter: default_delimiter(),
        }
    }
}

impl ClientConfig {
    /// Default settings for `host:port`, without a password.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Set the shared secret.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// The configured secret, treating an empty string as unset.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }

    /// # Errors
    ///
    /// Returns [`FrameError::InvalidDelimiter`] if the delimiter could occur
    /// inside an encoded message.
    pub fn delimiter(&self) -> Result<Delimiter, FrameError> {
        self.delimiter.parse()
    }
}
