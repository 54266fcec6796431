// tests/integration/session_lifecycle_test.rs

//! Connection lifecycle: the magic handshake, the busy-list capacity bound, and
//! the `stop` command's daemon-wide shutdown signal.

use super::test_helpers::{TestContext, read_line, send_line};
use reloadctl::connection::ConnectionGuard;
use tokio::io::AsyncWriteExt;

#[tokio::test]
async fn bad_magic_closes_without_reply() {
    let ctx = TestContext::new().await;
    let (mut client, task) = ctx.connect().await;

    client
        .write_all(b"HELO01\n")
        .await
        .expect("write should succeed even if the peer will close right after");

    // The server never writes anything back; the connection simply closes.
    assert_eq!(read_line(&mut client).await, None);
    task.await.expect("handler task should not panic");
}

#[tokio::test]
async fn correct_magic_then_stats_gets_a_reply() {
    let ctx = TestContext::new().await;
    let (mut client, _task) = ctx.connect_handshaked().await;

    send_line(&mut client, "status").await;
    let line = read_line(&mut client).await.expect("status should reply");
    assert!(line.starts_with("version reloadctld"));
}

#[tokio::test]
async fn stop_command_triggers_daemon_shutdown() {
    let ctx = TestContext::new().await;
    let mut shutdown_rx = ctx.state.shutdown_tx.subscribe();
    let (mut client, _task) = ctx.connect_handshaked().await;

    send_line(&mut client, "stop").await;
    let reply = read_line(&mut client).await.expect("stop should ack");
    assert_eq!(reply, "ok");

    tokio::time::timeout(std::time::Duration::from_secs(1), shutdown_rx.recv())
        .await
        .expect("shutdown broadcast should fire promptly")
        .unwrap();
}

#[tokio::test]
async fn busy_list_tracks_active_sessions_up_to_max_active() {
    use std::net::SocketAddr;

    let ctx = TestContext::with_config(reloadctl::config::Config {
        max_active: 2,
        ..Default::default()
    })
    .await;

    let addr: SocketAddr = ([127, 0, 0, 1], 0).into();
    let g1 = ConnectionGuard::new(ctx.state.clone(), 1, addr);
    assert!(!ctx.state.at_capacity());
    let _g2 = ConnectionGuard::new(ctx.state.clone(), 2, addr);
    assert!(ctx.state.at_capacity());

    // Dropping one guard frees a slot, matching §8's "active = |busy_list|" at
    // every observation point.
    drop(g1);
    assert!(!ctx.state.at_capacity());
}
