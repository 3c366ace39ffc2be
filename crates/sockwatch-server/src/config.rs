//! Monitor server configuration.
//!
//! Every field has a default, so an empty TOML document is a valid
//! configuration:
//!
//! ```toml
//! host = "localhost"
//! port = 9042
//! password = "secret"     # unset = no authentication
//! auth_timeout_ms = 1500
//! delimiter = "\n"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sockwatch_transport::framer::Delimiter;
use sockwatch_types::{DEFAULT_AUTH_TIMEOUT_MS, DEFAULT_HOST, DEFAULT_PORT};

use crate::ConfigError;

/// Connection parameters of the monitor server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to listen on.
    #[serde(default = "default_host")]
    pub host: String,
    /// 0 = OS-assigned ephemeral port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Shared secret. `None` (or empty) disables authentication.
    #[serde(default)]
    pub password: Option<String>,
    /// Time a client has to send its password.
    #[serde(default = "default_auth_timeout_ms")]
    pub auth_timeout_ms: u64,
    /// Message delimiter; must match the clients of this deployment.
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_auth_timeout_ms() -> u64 {
    DEFAULT_AUTH_TIMEOUT_MS
}

fn default_delimiter() -> String {
    "\n".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            password: None,
            auth_timeout_ms: default_auth_timeout_ms(),
            delimiter: default_delimiter(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Parse`] if it is not valid TOML for this schema.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on invalid TOML.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// The configured secret, treating an empty string as unset.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }

    /// `auth_timeout_ms` as a [`Duration`].
    pub fn auth_timeout(&self) -> Duration {
        Duration::from_millis(self.auth_timeout_ms)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Delimiter`] if the delimiter could occur inside
    /// an encoded message.
    pub fn delimiter(&self) -> Result<Delimiter, ConfigError> {
        Ok(self.delimiter.parse()?)
    }
}
