//! Configuration integration tests for the agent binary.

use logward_core::config::AgentConfig;
use logward_core::types::{Category, Platform};

const SAMPLE_CONFIG: &str = r#"
[general]
log_level = "info"
log_format = "json"

[agent]
os = "linux"
client_name = "edge-01"

[server]
address = "192.168.0.254"
port = 8080
use_tls = false
api_path = "/api/events"
api_key = "dev-key"
timeout_secs = 30
max_retries = 3
retry_delay_secs = 5

[collection]
interval_secs = 60
max_records_per_source = 1000
lookback_hours = 24
enabled_categories = [
    "authentication",
    "privilege_escalation",
    "remote_access",
    "system",
    "service",
    "software",
]
max_events_per_batch = 500
"#;

#[test]
fn sample_config_parses_and_validates() {
    let config = AgentConfig::parse(SAMPLE_CONFIG).unwrap();
    config.validate().unwrap();

    assert_eq!(config.server.endpoint_url(), "http://192.168.0.254:8080/api/events");
    assert_eq!(config.agent.resolve_platform(), Platform::Linux);
    assert_eq!(config.collection.categories().len(), 6);
    assert!(config.collection.categories().contains(&Category::Software));
}

#[tokio::test]
async fn config_loads_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logward.toml");
    tokio::fs::write(&path, SAMPLE_CONFIG).await.unwrap();

    let config = AgentConfig::from_file(&path).await.unwrap();
    config.validate().unwrap();
    assert_eq!(config.agent.client_name, "edge-01");
}

#[tokio::test]
async fn missing_server_address_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logward.toml");
    tokio::fs::write(&path, "[collection]\ninterval_secs = 30\n")
        .await
        .unwrap();

    let config = AgentConfig::from_file(&path).await.unwrap();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("server.address"));
}
