//! sockwatch-tail: print the events relayed by a sockwatch monitor server.
//!
//! Connects as an observer and writes one JSON object per event to stdout:
//! `{"event": "<name>", "data": <payload>}`. Logs go to stderr.

mod config;

use std::io::Write;

use anyhow::Context;
use sockwatch_client::{connect, MonitorClient};
use sockwatch_transport::Envelope;
use tracing::{info, warn};

use crate::config::TailConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sockwatch=info".parse()?),
        )
        .init();

    let config = TailConfig::load()?;
    let host = config.monitor.host.clone();
    let port = config.monitor.port;

    info!(%host, port, "connecting to monitor server");
    let client = connect(&config.monitor)
        .await
        .with_context(|| format!("connecting to {host}:{port}"))?;
    info!(peer = %client.peer_addr(), "observing");

    tokio::select! {
        result = tail(client, &config) => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, stopping");
        }
    }
    Ok(())
}

/// Print events until the server closes the connection.
async fn tail(mut client: MonitorClient, config: &TailConfig) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    while let Some(envelope) = client.next_event().await? {
        if !config.wants(envelope.kind()) {
            continue;
        }
        let line = render(&envelope)?;
        let mut out = stdout.lock();
        if let Err(e) = writeln!(out, "{line}").and_then(|()| out.flush()) {
            if e.kind() == std::io::ErrorKind::BrokenPipe {
                return Ok(());
            }
            return Err(e.into());
        }
    }
    warn!("monitor server closed the connection");
    Ok(())
}

fn render(envelope: &Envelope) -> serde_json::Result<String> {
    serde_json::to_string(&serde_json::json!({
        "event": envelope.kind().name(),
        "data": envelope.payload(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sockwatch_transport::{EventKind, Payload};
    use sockwatch_types::SocketEvent;

    #[test]
    fn test_render_with_payload() {
        let envelope = Envelope::new(Payload::Connect(SocketEvent::new("abc")));
        let line = render(&envelope).expect("render");
        let value: serde_json::Value = serde_json::from_str(&line).expect("json");
        assert_eq!(value["event"], "connect");
        assert_eq!(value["data"]["id"], "abc");
    }

    #[test]
    fn test_render_without_payload() {
        let line = render(&Envelope::empty(EventKind::Password)).expect("render");
        assert_eq!(line, r#"{"data":null,"event":"password"}"#);
    }
}
