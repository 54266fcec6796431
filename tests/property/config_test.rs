// tests/property/config_test.rs

//! `Config` survives a TOML round trip for arbitrary valid max_active/num_workers
//! combinations (§8).

use proptest::prelude::*;
use reloadctl::config::Config;

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 50,
        max_shrink_iters: 500,
        ..ProptestConfig::default()
    })]

    #[test]
    fn max_active_and_num_workers_round_trip(
        max_active in 1usize..10_000,
        num_workers in 1usize..64,
        port in 1u16..=u16::MAX,
    ) {
        let mut config = Config::default();
        config.max_active = max_active;
        config.num_workers = num_workers;
        config.tcp_endpoints[0].port = port;

        let toml_text = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_text).unwrap();

        assert_eq!(parsed.max_active, max_active);
        assert_eq!(parsed.num_workers, num_workers);
        assert_eq!(parsed.tcp_endpoints[0].port, port);
    }
}
