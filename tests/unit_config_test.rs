use reloadctl::config::Config;

#[test]
fn from_file_round_trips_a_minimal_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
tcp_endpoints = [{ host = "127.0.0.1", port = 8953 }]
max_active = 5
num_workers = 3
"#,
    )
    .unwrap();

    let config = Config::from_file(path.to_str().unwrap()).unwrap();
    assert_eq!(config.max_active, 5);
    assert_eq!(config.num_workers, 3);
    assert_eq!(config.tcp_endpoints[0].port, 8953);
    assert!(!config.tls.enabled);
}

#[test]
fn rejects_zero_max_active() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "max_active = 0\n").unwrap();
    assert!(Config::from_file(path.to_str().unwrap()).is_err());
}

#[test]
fn rejects_zero_num_workers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "num_workers = 0\n").unwrap();
    assert!(Config::from_file(path.to_str().unwrap()).is_err());
}

#[test]
fn rejects_no_control_endpoints_configured() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "tcp_endpoints = []\n").unwrap();
    assert!(Config::from_file(path.to_str().unwrap()).is_err());
}

#[test]
fn rejects_tcp_endpoint_with_port_zero() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, r#"tcp_endpoints = [{ host = "127.0.0.1", port = 0 }]"#).unwrap();
    assert!(Config::from_file(path.to_str().unwrap()).is_err());
}

#[test]
fn rejects_tls_enabled_with_empty_cert_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[tls]
enabled = true
server_cert = ""
"#,
    )
    .unwrap();
    assert!(Config::from_file(path.to_str().unwrap()).is_err());
}

#[test]
fn missing_file_is_a_config_read_error() {
    let err = Config::from_file("/nonexistent/path/config.toml").unwrap_err();
    assert!(format!("{err}").contains("failed"));
}

#[test]
fn excluded_fields_differ_detects_tag_table_changes() {
    let mut a = Config::default();
    let mut b = Config::default();
    assert!(!a.excluded_fields_differ(&b));

    a.excluded.tag_table = vec!["one".to_string()];
    assert!(a.excluded_fields_differ(&b));

    b.excluded.tag_table = vec!["one".to_string()];
    assert!(!a.excluded_fields_differ(&b));
}
