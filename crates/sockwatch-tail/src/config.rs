//! Tail configuration: a TOML file plus environment overrides.
//!
//! ```toml
//! # only print these events (empty = all)
//! events = ["broadcast", "emit"]
//!
//! [monitor]
//! host = "localhost"
//! port = 9042
//! password = "secret"
//! ```

use std::path::PathBuf;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use sockwatch_client::ClientConfig;
use sockwatch_transport::EventKind;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "SOCKWATCH_CONFIG";

/// Config file used when [`CONFIG_ENV`] is unset.
pub const DEFAULT_CONFIG_FILE: &str = "sockwatch.toml";

/// Settings of the `sockwatch-tail` binary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TailConfig {
    /// Connection to the monitor server.
    #[serde(default)]
    pub monitor: ClientConfig,
    /// Event names to print. Empty = all.
    #[serde(default)]
    pub events: Vec<String>,
}

impl TailConfig {
    /// Load from `$SOCKWATCH_CONFIG`, else `./sockwatch.toml` when it exists,
    /// else defaults; then apply `SOCKWATCH_HOST`, `SOCKWATCH_PORT` and
    /// `SOCKWATCH_PASSWORD`.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(PathBuf::from(path))?,
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::from_file(path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: PathBuf) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: TailConfig =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Override connection settings from variables found by `lookup`.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<()> {
        if let Some(host) = lookup("SOCKWATCH_HOST") {
            self.monitor.host = host;
        }
        if let Some(port) = lookup("SOCKWATCH_PORT") {
            self.monitor.port = port
                .parse()
                .with_context(|| format!("invalid SOCKWATCH_PORT: {port}"))?;
        }
        if let Some(password) = lookup("SOCKWATCH_PASSWORD") {
            self.monitor.password = Some(password);
        }
        Ok(())
    }

    /// Reject unknown event names and unusable delimiters up front.
    pub fn validate(&self) -> anyhow::Result<()> {
        for name in &self.events {
            name.parse::<EventKind>()?;
        }
        self.monitor.delimiter()?;
        Ok(())
    }

    /// Whether events of `kind` should be printed.
    pub fn wants(&self, kind: EventKind) -> bool {
        self.events.is_empty() || self.events.iter().any(|name| name == kind.name())
    }
}
