use reloadctl::core::state::resolver::Caches;

#[test]
fn flush_name_only_lowers_the_matching_entry() {
    let caches = Caches::default();
    caches.insert_for_test("rrset", "a.example.", false, false);
    caches.insert_for_test("rrset", "b.example.", false, false);

    let counts = caches.flush_name("a.example.");
    assert_eq!(counts.rrsets, 1);
    assert_eq!(counts.messages, 0);
    assert_eq!(counts.keys, 0);
}

#[test]
fn flush_zone_matches_subdomains() {
    let caches = Caches::default();
    caches.insert_for_test("rrset", "www.example.", false, false);
    caches.insert_for_test("rrset", "example.", false, false);
    caches.insert_for_test("rrset", "other.", false, false);

    let counts = caches.flush_zone("example.");
    assert_eq!(counts.rrsets, 2);
}

#[test]
fn flushing_the_same_zone_twice_is_idempotent() {
    let caches = Caches::default();
    caches.insert_for_test("rrset", "example.", false, false);

    let first = caches.flush_zone("example.");
    assert_eq!(first.rrsets, 1);

    // Already lowered to the cutoff: a second flush finds nothing left to lower.
    let second = caches.flush_zone("example.");
    assert_eq!(second.rrsets, 0);
}

#[test]
fn flush_bogus_ignores_clean_entries() {
    let caches = Caches::default();
    caches.insert_for_test("message", "bad.", true, false);
    caches.insert_for_test("message", "good.", false, false);

    let counts = caches.flush_bogus();
    assert_eq!(counts.messages, 1);
}

#[test]
fn flush_negative_does_not_touch_the_key_cache() {
    let caches = Caches::default();
    caches.insert_for_test("key", "example.", false, true);
    let counts = caches.flush_negative();
    assert_eq!(counts.keys, 0);
}

#[test]
fn flush_infra_without_host_clears_everything() {
    let caches = Caches::default();
    caches.insert_for_test("infra", "1.2.3.4", false, false);
    caches.insert_for_test("infra", "5.6.7.8", false, false);

    assert_eq!(caches.flush_infra(None), 2);
    assert_eq!(caches.flush_infra(None), 0);
}

#[test]
fn dump_then_load_round_trips_into_a_fresh_cache_set() {
    let source = Caches::default();
    source.insert_for_test("rrset", "a.example.", false, false);
    source.insert_for_test("message", "b.example.", true, false);
    source.insert_for_test("key", "c.example.", false, true);
    source.insert_for_test("infra", "1.2.3.4", false, false);

    let dump = source.dump();

    let restored = Caches::default();
    for line in dump.lines() {
        restored.load_line(line).unwrap();
    }

    assert_eq!(restored.dump(), dump);
}

#[test]
fn load_line_rejects_an_unknown_label() {
    let caches = Caches::default();
    assert!(caches.load_line("bogus_label a.example. 1 false false").is_err());
}

#[test]
fn load_line_ignores_blank_lines() {
    let caches = Caches::default();
    caches.load_line("").unwrap();
    caches.load_line("   ").unwrap();
    assert_eq!(caches.dump(), "");
}
