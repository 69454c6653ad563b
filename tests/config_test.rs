//! Config loading and defaults integration tests

use pathforge_client::Config;

/// Verify that a minimal config parses and the omitted fields take their
/// documented defaults.
#[test]
fn test_minimal_config_defaults() {
    let toml_str = r#"
[planner]
webhook_url = "https://hooks.example.com/trigger/abc"

[airtable]
base_id = "appTest123"
api_key = "patTestKey"
"#;

    let config = Config::from_toml_str(toml_str).expect("valid TOML");

    assert_eq!(
        config.planner.webhook_url,
        "https://hooks.example.com/trigger/abc"
    );
    assert_eq!(config.airtable.api_url, "https://api.airtable.com/v0");
    assert_eq!(config.airtable.progress_table, "Progress");
    assert_eq!(config.airtable.users_table, "Users");

    assert_eq!(config.poll.interval_ms, 8_000);
    assert_eq!(config.poll.max_attempts, 75);
    assert_eq!(config.poll.initial_delay_ms, 10_000);

    assert_eq!(
        config.session.path.to_string_lossy(),
        ".pathforge/session.json"
    );
}

#[test]
fn test_config_with_all_fields() {
    let toml_str = r#"
[planner]
webhook_url = "http://localhost:9000/trigger"

[airtable]
api_url = "http://localhost:9001/v0"
base_id = "appLocal"
progress_table = "Tasks"
users_table = "Members"
api_key = "secret123"

[poll]
interval_ms = 250
max_attempts = 4
initial_delay_ms = 100

[session]
path = "/tmp/pathforge-test/session.json"
"#;

    let config = Config::from_toml_str(toml_str).expect("valid TOML");

    assert_eq!(config.airtable.progress_table, "Tasks");
    assert_eq!(config.airtable.users_table, "Members");
    assert_eq!(
        config.airtable.table_url("Tasks"),
        "http://localhost:9001/v0/appLocal/Tasks"
    );
    assert_eq!(config.poll.interval_ms, 250);
    assert_eq!(config.poll.max_attempts, 4);
    assert_eq!(
        config.session.path.to_string_lossy(),
        "/tmp/pathforge-test/session.json"
    );
}

#[test]
fn test_config_rejects_malformed_toml() {
    let result = Config::from_toml_str("[planner\nwebhook_url = 1");
    assert!(result.is_err());
}

#[test]
fn test_config_load_from_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("pathforge.toml");
    std::fs::write(
        &path,
        r#"
[planner]
webhook_url = "https://hooks.example.com/t"

[airtable]
base_id = "appFile"
api_key = "patFile"
"#,
    )
    .expect("write config");

    let config = Config::load(&path).expect("load config");
    assert_eq!(config.airtable.base_id, "appFile");

    assert!(Config::load(dir.path().join("missing.toml")).is_err());
}
