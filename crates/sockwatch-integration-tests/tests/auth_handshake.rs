//! Integration test: observer handshake against a live monitor server.
//!
//! Covers the four password combinations, the `init` snapshot delivered on
//! authorization, and the password deadline.

use std::time::{Duration, Instant};

use sockwatch_client::{connect, ClientError};
use sockwatch_integration_tests::{expect_init, server_config, start_server, start_server_with};
use sockwatch_server::{Monitor, RegistryView};
use sockwatch_transport::{Envelope, EventKind, Payload};
use sockwatch_types::{AuthError, AuthOutcome};

fn auth_code(result: Result<sockwatch_client::MonitorClient, ClientError>) -> String {
    match result {
        Err(ClientError::Auth(e)) => e.to_string(),
        Err(other) => panic!("expected an auth error, got {other}"),
        Ok(_) => panic!("expected an auth error, got a connection"),
    }
}

fn registry() -> RegistryView {
    RegistryView::default()
        .with_room("abc", ["abc"])
        .with_room("def", ["def"])
        .with_room("lobby", ["abc", "def"])
        .with_connection("abc", Some(1_494_426_891_618))
        .with_connection("def", Some(1_494_426_891_700))
}

#[tokio::test]
async fn password_unexpected() {
    let server = start_server(None).await;
    let config = server.client_config().with_password("toto");
    assert_eq!(auth_code(connect(&config).await), "PASSWORD_UNEXPECTED");
}

#[tokio::test]
async fn password_required() {
    let server = start_server(Some("toto")).await;
    let config = server.client_config();
    assert_eq!(auth_code(connect(&config).await), "PASSWORD_REQUIRED");
}

#[tokio::test]
async fn invalid_password() {
    let server = start_server(Some("toto")).await;
    let config = server.client_config().with_password("tata");
    assert_eq!(auth_code(connect(&config).await), "INVALID_PASSWORD");
    assert!(server.monitor.broker().is_empty().await);
}

#[tokio::test]
async fn valid_password_receives_init() {
    let server = start_server_with(server_config(Some("toto")), Monitor::new(registry())).await;
    let config = server.client_config().with_password("toto");
    let mut client = connect(&config).await.expect("connect");

    let init = expect_init(&mut client).await;
    let Some(Payload::Init(snapshot)) = init.payload() else {
        panic!("init without snapshot: {init:?}");
    };

    // Personal rooms are left out, the shared one is kept.
    let names: Vec<_> = snapshot.rooms.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["lobby"]);
    assert_eq!(snapshot.rooms[0].sockets, vec!["abc", "def"]);

    let ids: Vec<_> = snapshot.sockets.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["abc", "def"]);
    assert_eq!(snapshot.sockets[0].connected_at, Some(1_494_426_891_618));

    server.wait_for_observers(1).await;
}

#[tokio::test]
async fn passwordless_receives_init() {
    let server = start_server_with(server_config(None), Monitor::new(registry())).await;
    let mut client = connect(&server.client_config()).await.expect("connect");
    expect_init(&mut client).await;
    server.wait_for_observers(1).await;
}

#[tokio::test]
async fn password_timeout() {
    let config = sockwatch_server::ServerConfig {
        auth_timeout_ms: 50,
        ..server_config(Some("toto"))
    };
    let server = start_server_with(config, Monitor::default()).await;
    let started = Instant::now();
    let mut peer = server.raw().await;

    assert_eq!(peer.recv().await, Some(Envelope::new(Payload::ReqAuth(true))));

    let reply = peer.recv().await.expect("auth reply");
    assert_eq!(
        reply,
        Envelope::new(Payload::Auth(AuthOutcome::rejected(&AuthError::Timeout)))
    );
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(50), "fired early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(2), "fired late: {elapsed:?}");

    // Then the server hangs up.
    assert_eq!(peer.recv().await, None);
    assert!(server.monitor.broker().is_empty().await);
}

#[tokio::test]
async fn answered_challenge_does_not_time_out() {
    let config = sockwatch_server::ServerConfig {
        auth_timeout_ms: 50,
        ..server_config(Some("toto"))
    };
    let server = start_server_with(config, Monitor::default()).await;
    let mut peer = server.raw().await;

    assert_eq!(peer.recv().await, Some(Envelope::new(Payload::ReqAuth(true))));
    peer.send(&Envelope::new(Payload::Password("toto".to_string())))
        .await;
    assert_eq!(
        peer.recv().await,
        Some(Envelope::new(Payload::Auth(AuthOutcome::Authorized)))
    );
    assert_eq!(peer.recv().await.map(|e| e.kind()), Some(EventKind::Init));

    // Well past the deadline, the session is still registered.
    tokio::time::sleep(Duration::from_millis(150)).await;
    server.wait_for_observers(1).await;
}

#[tokio::test]
async fn garbage_during_handshake_is_skipped() {
    let server = start_server(Some("toto")).await;
    let mut peer = server.raw().await;
    assert_eq!(peer.recv().await, Some(Envelope::new(Payload::ReqAuth(true))));

    // Unknown code, then a password whose body is not valid armor.
    peer.send_bytes(b"zzgarbage\n01%%%%\n").await;
    peer.send(&Envelope::new(Payload::Password("toto".to_string())))
        .await;

    assert_eq!(
        peer.recv().await,
        Some(Envelope::new(Payload::Auth(AuthOutcome::Authorized)))
    );
}

#[tokio::test]
async fn connection_refused() {
    let server = start_server(None).await;
    let config = server.client_config();
    drop(server);
    // Give the aborted accept loop time to release the listener.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let result = connect(&config).await;
    assert!(matches!(result, Err(ClientError::Io(_))));
}
