// tests/property/cache_test.rs

//! Flushing never raises a TTL, and repeated flushes of the same entries converge
//! to zero newly-affected entries (§4.3, §8).

use crate::test_helpers::TestContext;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 50,
        max_shrink_iters: 500,
        ..ProptestConfig::default()
    })]

    #[test]
    fn flush_zone_is_idempotent_after_the_first_pass(
        names in prop::collection::vec("[a-z]{1,10}\\.example\\.", 1..20),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let ctx = TestContext::new().await;
            for name in &names {
                ctx.state.resolver.caches.insert_for_test("rrset", name, false, false);
            }

            let first = ctx.state.resolver.caches.flush_zone("example.");
            let second = ctx.state.resolver.caches.flush_zone("example.");

            assert_eq!(second.rrsets, 0, "a second flush must find nothing left to lower");
            assert!(first.rrsets <= names.len() as u64);
        });
    }

    #[test]
    fn flush_bogus_only_ever_counts_bogus_entries(
        entries in prop::collection::vec((any::<bool>(), "[a-z]{1,10}"), 1..20),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let ctx = TestContext::new().await;
            let expected_bogus = entries.iter().filter(|(bogus, _)| *bogus).count() as u64;
            for (idx, (bogus, name)) in entries.iter().enumerate() {
                ctx.state.resolver.caches.insert_for_test("message", &format!("{name}{idx}"), *bogus, false);
            }

            let counts = ctx.state.resolver.caches.flush_bogus();
            assert_eq!(counts.messages, expected_bogus);
        });
    }
}
