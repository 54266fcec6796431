// tests/integration/dispatch_test.rs

//! The distribution policy: a `DISTRIBUTE`-flagged mutation issued on the primary
//! must land on every peer worker's own resolver tree (§4.3, §8 scenario 3).

use super::test_helpers::{TestContext, read_line, send_line};
use reloadctl::config::Config;
use reloadctl::core::dispatch::handlers::zones::list_local_zones;

#[tokio::test]
async fn local_zone_is_distributed_to_every_worker() {
    let ctx = TestContext::with_config(Config {
        num_workers: 4,
        ..Config::default()
    })
    .await;
    let (mut client, _task) = ctx.connect_handshaked().await;

    send_line(&mut client, "local_zone example. static").await;
    assert_eq!(read_line(&mut client).await.unwrap(), "ok");

    // Distribution is fire-and-forget over an mpsc channel; give the workers a
    // moment to apply it before inspecting their trees.
    for _ in 0..50 {
        let all_applied = ctx
            .state
            .workers
            .iter()
            .all(|w| list_local_zones(&w.resolver).contains("example. static"));
        if all_applied {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    for worker in ctx.state.workers.iter() {
        let listing = list_local_zones(&worker.resolver);
        assert!(
            listing.contains("example. static"),
            "worker {} missing distributed zone, got '{listing}'",
            worker.id
        );
    }
}

#[tokio::test]
async fn readonly_commands_are_not_distributed() {
    let ctx = TestContext::with_config(Config {
        num_workers: 2,
        ..Config::default()
    })
    .await;
    let (mut client, _task) = ctx.connect_handshaked().await;

    send_line(&mut client, "lookup example.").await;
    let reply = read_line(&mut client).await.unwrap();
    assert_eq!(reply, "no match, using direct resolution");

    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    for worker in ctx.state.workers.iter() {
        assert!(list_local_zones(&worker.resolver).is_empty());
    }
}
