// tests/property/capacity_test.rs

//! The busy list never exceeds `max_active`, for arbitrary sequences of connects
//! and disconnects (§8).

use crate::test_helpers::TestContext;
use proptest::prelude::*;
use reloadctl::config::Config;
use reloadctl::connection::ConnectionGuard;
use std::net::SocketAddr;

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 50,
        max_shrink_iters: 500,
        ..ProptestConfig::default()
    })]

    #[test]
    fn active_count_never_exceeds_max_active(
        max_active in 1usize..8,
        // true = open a new session, false = close the oldest still-open one.
        ops in prop::collection::vec(any::<bool>(), 1..40),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let ctx = TestContext::with_config(Config {
                max_active,
                ..Config::default()
            })
            .await;

            let addr: SocketAddr = ([127, 0, 0, 1], 0).into();
            let mut open: Vec<ConnectionGuard> = Vec::new();
            let mut next_id = 0u64;

            for open_new in ops {
                if open_new {
                    if !ctx.state.at_capacity() {
                        next_id += 1;
                        open.push(ConnectionGuard::new(ctx.state.clone(), next_id, addr));
                    }
                } else if !open.is_empty() {
                    open.remove(0);
                }
                assert!(ctx.state.sessions.len() <= max_active);
            }
        });
    }
}
