//! TCP listener for remote observers.
//!
//! Binds the configured address, accepts connections, and spawns one
//! connection task per observer.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::monitor::Monitor;
use crate::session::{handle_connection, SessionSettings};
use crate::ServerError;

/// The monitor server.
pub struct MonitorServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    monitor: Monitor,
    settings: Arc<SessionSettings>,
    next_id: AtomicU64,
}

impl MonitorServer {
    /// Bind the listener. Observers are only accepted once the server runs.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] for an unusable delimiter and
    /// [`ServerError::Bind`] if the address cannot be bound.
    pub async fn bind(config: &ServerConfig, monitor: Monitor) -> Result<Self, ServerError> {
        let delimiter = config.delimiter()?;
        let addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;

        let settings = SessionSettings {
            password: config.password().map(str::to_string),
            auth_timeout: config.auth_timeout(),
            delimiter,
        };
        info!(
            %local_addr,
            auth = settings.password.is_some(),
            "monitor server listening"
        );

        Ok(Self {
            listener,
            local_addr,
            monitor,
            settings: Arc::new(settings),
            next_id: AtomicU64::new(1),
        })
    }

    /// The bound address; reports the OS-assigned port when bound to port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Hooks feeding this server's observers.
    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }

    /// Accept observers until the task is dropped.
    ///
    /// # Errors
    ///
    /// Currently never fails; accept errors are logged and skipped.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(std::future::pending()).await
    }

    /// Accept observers until `shutdown` resolves. Established connections
    /// keep running.
    ///
    /// # Errors
    ///
    /// Currently never fails; accept errors are logged and skipped.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!(local_addr = %self.local_addr, "monitor server stopped accepting");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                        debug!(session = id, %peer, "observer connected");
                        let monitor = self.monitor.clone();
                        let settings = Arc::clone(&self.settings);
                        tokio::spawn(handle_connection(monitor, settings, id, stream, peer));
                    }
                    Err(e) => {
                        warn!(error = %e, "accept failed");
                    }
                }
            }
        }
    }

    /// Run the server on its own task.
    pub fn spawn(self) -> JoinHandle<Result<(), ServerError>> {
        tokio::spawn(self.run())
    }
}
