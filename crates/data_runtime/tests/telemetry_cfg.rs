use data_runtime::configs::telemetry::{load_default, load_from, TelemetryCfg};
use serial_test::serial;
use std::io::Write;

fn clear_env() {
    for k in ["LOG_LEVEL", "JSON_LOGS", "METRICS_ADDR"] {
        std::env::remove_var(k);
    }
}

#[test]
#[serial]
fn env_overrides_parse() {
    clear_env();
    std::env::set_var("LOG_LEVEL", "debug");
    std::env::set_var("JSON_LOGS", "true");
    std::env::set_var("METRICS_ADDR", "127.0.0.1:9100");
    let cfg = load_default().expect("load");
    clear_env();
    assert_eq!(cfg.log_level, "debug");
    assert!(cfg.json_logs);
    assert_eq!(cfg.metrics_addr.as_deref(), Some("127.0.0.1:9100"));
}

#[test]
#[serial]
fn partial_file_keeps_defaults() {
    clear_env();
    let mut f = tempfile::NamedTempFile::new().unwrap();
    writeln!(f, "log_level = \"warn\"").unwrap();
    let cfg = load_from(f.path()).expect("load");
    assert_eq!(cfg.log_level, "warn");
    assert_eq!(cfg.json_logs, TelemetryCfg::default().json_logs);
    assert!(cfg.metrics_addr.is_none());
}
