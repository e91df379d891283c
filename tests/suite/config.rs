//! Config file discovery and resolution into session settings.

use std::time::Duration;

use reach_engine::{CONFIG_ENV, ReachConfig, SessionSettings, config_path};

#[test]
fn env_override_drives_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reach.toml");
    std::fs::write(
        &path,
        r#"
[oracle]
endpoint = "http://${REACH_SUITE_HOST}:7000/rpc"
timeout_ms = 250

[explore]
default_step_depth = 7
halt_tags = ["loop-head"]

[processes]
retention = 2
"#,
    )
    .unwrap();

    unsafe {
        std::env::set_var(CONFIG_ENV, &path);
        std::env::set_var("REACH_SUITE_HOST", "10.0.0.2");
    }
    assert_eq!(config_path(), Some(path.clone()));
    let config = ReachConfig::load().unwrap().unwrap();

    let missing = dir.path().join("absent.toml");
    unsafe {
        std::env::set_var(CONFIG_ENV, &missing);
    }
    assert!(ReachConfig::load().unwrap().is_none());
    unsafe {
        std::env::remove_var(CONFIG_ENV);
        std::env::remove_var("REACH_SUITE_HOST");
    }

    let settings = SessionSettings::from_config(&config);
    assert_eq!(settings.oracle_endpoint, "http://10.0.0.2:7000/rpc");
    assert_eq!(settings.oracle_timeout, Duration::from_millis(250));
    assert_eq!(settings.default_step_depth, 7);
    assert_eq!(settings.halt_tags, vec!["loop-head".to_string()]);
    assert_eq!(settings.retention, 2);
    assert_eq!(
        settings.build_max_depth,
        SessionSettings::default().build_max_depth
    );
}
