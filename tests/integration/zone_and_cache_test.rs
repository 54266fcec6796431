// tests/integration/zone_and_cache_test.rs

//! Local-zone/local-data, forward-table, and cache-flush round trips (§8).

use super::test_helpers::{TestContext, read_line, send_line};

#[tokio::test]
async fn local_data_is_visible_through_lookup() {
    let ctx = TestContext::new().await;
    let (mut client, _task) = ctx.connect_handshaked().await;

    send_line(&mut client, "local_zone example. static").await;
    assert_eq!(read_line(&mut client).await.unwrap(), "ok");

    send_line(&mut client, "local_data example. 3600 IN A 10.0.0.1").await;
    assert_eq!(read_line(&mut client).await.unwrap(), "ok");

    send_line(&mut client, "lookup example.").await;
    let reply = read_line(&mut client).await.unwrap();
    assert!(
        reply.contains("10.0.0.1"),
        "lookup should surface the local-data record, got '{reply}'"
    );
}

#[tokio::test]
async fn forward_add_is_visible_through_list_forwards() {
    let ctx = TestContext::new().await;
    let (mut client, _task) = ctx.connect_handshaked().await;

    send_line(&mut client, "forward_add +i example. 1.2.3.4").await;
    assert_eq!(read_line(&mut client).await.unwrap(), "ok");

    send_line(&mut client, "list_forwards").await;
    let reply = read_line(&mut client).await.unwrap();
    assert!(
        reply.starts_with("example. IN forward +i"),
        "got '{reply}'"
    );
    assert!(reply.contains("1.2.3.4"));
}

#[tokio::test]
async fn flushing_an_empty_zone_twice_reports_zero_both_times() {
    let ctx = TestContext::new().await;
    let (mut client, _task) = ctx.connect_handshaked().await;

    send_line(&mut client, "flush_zone example.").await;
    let first = read_line(&mut client).await.unwrap();
    assert_eq!(first, "ok removed 0 rrsets, 0 messages and 0 key entries");

    send_line(&mut client, "flush_zone example.").await;
    let second = read_line(&mut client).await.unwrap();
    assert_eq!(second, "ok removed 0 rrsets, 0 messages and 0 key entries");
}
