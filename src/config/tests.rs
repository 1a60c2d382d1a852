use std::fs;

use serial_test::serial;
use tempfile::TempDir;

use super::settings::Settings;
use super::{load_config, load_config_from};

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.server.host, "127.0.0.1");
    assert_eq!(settings.server.port, 8080);
    assert_eq!(settings.broker.keepalive_secs, 13);
    assert_eq!(settings.client.disabled_retry_secs, 10);
    assert!(!settings.pulsar.enabled);
}

#[test]
#[serial]
fn test_missing_file_yields_defaults() {
    let settings = load_config_from("does/not/exist").expect("load_config failed");
    assert_eq!(settings, Settings::default());
}

#[test]
#[serial]
fn test_file_overrides_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let path = tmp.path().join("pollnotify.toml");
    fs::write(
        &path,
        r#"
            [server]
            host = "0.0.0.0"
            port = 9000

            [broker]
            keepalive_secs = 30

            [pulsar]
            enabled = true
            send_type = "burst"
            target = "1,2"
        "#,
    )
    .expect("write config file");

    let cfg = load_config_from(path.to_str().unwrap()).expect("load_config failed");
    assert_eq!(cfg.server.host, "0.0.0.0");
    assert_eq!(cfg.server.port, 9000);
    assert_eq!(cfg.server.log_level, "info");
    assert_eq!(cfg.broker.keepalive_secs, 30);
    assert_eq!(cfg.broker.registration_buffer, 64);
    assert!(cfg.pulsar.enabled);
    assert_eq!(cfg.pulsar.send_type, "burst");
    assert_eq!(cfg.pulsar.target, "1,2");
}

#[test]
#[serial]
fn test_environment_overrides_defaults() {
    temp_env::with_vars(
        [
            ("POLLNOTIFY__SERVER__PORT", Some("7070")),
            ("POLLNOTIFY__BROKER__KEEPALIVE_SECS", Some("5")),
            ("POLLNOTIFY__CLIENT__URL", Some("ws://example.test:7070")),
        ],
        || {
            let cfg = load_config().expect("load_config failed");
            assert_eq!(cfg.server.port, 7070);
            assert_eq!(cfg.broker.keepalive_secs, 5);
            assert_eq!(cfg.client.url, "ws://example.test:7070");
            assert_eq!(cfg.server.host, "127.0.0.1");
        },
    );
}
