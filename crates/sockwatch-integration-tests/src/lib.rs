//! Integration test crate for sockwatch.
//!
//! Helpers to run a monitor server on an ephemeral port and to talk to it,
//! either through `sockwatch-client` or as a raw TCP peer. The tests
//! themselves live in `tests/`:
//!
//! ```sh
//! cargo test -p sockwatch-integration-tests
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use sockwatch_client::{ClientConfig, MonitorClient};
use sockwatch_server::{Monitor, MonitorServer, ServerConfig, ServerError};
use sockwatch_transport::framer::encode_frame;
use sockwatch_transport::{Delimiter, Envelope, EventKind, FramedReader};
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

/// Upper bound for anything a test waits on.
pub const STEP_TIMEOUT: Duration = Duration::from_secs(5);

/// A monitor server running on its own task; stopped on drop.
pub struct TestServer {
    /// Address the server is listening on.
    pub addr: SocketAddr,
    /// Hooks of the running server.
    pub monitor: Monitor,
    /// Configuration the server was started with.
    pub config: ServerConfig,
    task: JoinHandle<Result<(), ServerError>>,
}

/// Server configuration bound to an ephemeral loopback port.
pub fn server_config(password: Option<&str>) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        password: password.map(str::to_string),
        ..ServerConfig::default()
    }
}

/// Start a server with the given password and a monitor without state.
pub async fn start_server(password: Option<&str>) -> TestServer {
    start_server_with(server_config(password), Monitor::default()).await
}

/// Start a server with an explicit configuration and monitor.
pub async fn start_server_with(config: ServerConfig, monitor: Monitor) -> TestServer {
    let server = MonitorServer::bind(&config, monitor.clone())
        .await
        .expect("bind monitor server");
    let addr = server.local_addr();
    TestServer {
        addr,
        monitor,
        config,
        task: server.spawn(),
    }
}

impl TestServer {
    /// Client configuration pointing at this server, with the server's
    /// delimiter and no password.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            host: self.addr.ip().to_string(),
            port: self.addr.port(),
            password: None,
            delimiter: self.config.delimiter.clone(),
        }
    }

    /// Wait until exactly `count` observers are registered.
    pub async fn wait_for_observers(&self, count: usize) {
        tokio::time::timeout(STEP_TIMEOUT, async {
            while self.monitor.broker().len().await != count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("expected {count} observers"));
    }

    /// Open a raw TCP connection speaking the framed protocol.
    pub async fn raw(&self) -> RawPeer {
        let stream = TcpStream::connect(self.addr).await.expect("connect");
        let delimiter = self.config.delimiter().expect("delimiter");
        RawPeer::new(stream, delimiter)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// A peer that bypasses the client handshake logic.
pub struct RawPeer {
    reader: FramedReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    delimiter: Delimiter,
}

impl RawPeer {
    fn new(stream: TcpStream, delimiter: Delimiter) -> Self {
        let (reader, writer) = stream.into_split();
        Self {
            reader: FramedReader::new(reader, delimiter.clone()),
            writer,
            delimiter,
        }
    }

    /// Send one well-formed envelope.
    pub async fn send(&mut self, envelope: &Envelope) {
        let frame = encode_frame(envelope, &self.delimiter).expect("encode");
        self.send_bytes(&frame).await;
    }

    /// Send arbitrary bytes as-is.
    pub async fn send_bytes(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).await.expect("write");
        self.writer.flush().await.expect("flush");
    }

    /// Next envelope, or `None` once the server closed the connection.
    pub async fn recv(&mut self) -> Option<Envelope> {
        tokio::time::timeout(STEP_TIMEOUT, self.reader.recv())
            .await
            .expect("server answered in time")
            .expect("read")
    }
}

/// Next event of `client`, skipping the initial `init`.
pub async fn next_relayed(client: &mut MonitorClient) -> Envelope {
    loop {
        let envelope = tokio::time::timeout(STEP_TIMEOUT, client.next_event())
            .await
            .expect("event in time")
            .expect("read")
            .expect("connection open");
        if envelope.kind() != EventKind::Init {
            return envelope;
        }
    }
}

/// The first event of `client`, which must be `init`.
pub async fn expect_init(client: &mut MonitorClient) -> Envelope {
    let envelope = tokio::time::timeout(STEP_TIMEOUT, client.next_event())
        .await
        .expect("init in time")
        .expect("read")
        .expect("connection open");
    assert_eq!(envelope.kind(), EventKind::Init);
    envelope
}
