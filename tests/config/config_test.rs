//! Coverage for config parsing, env overrides and path resolution.

use std::fs;
use std::path::PathBuf;

use concierge::config::ConciergeConfig;

#[test]
fn parse_full_toml() {
    let toml_str = r#"
[registry]
path = "/srv/concierge/tenants.json"
default_tenant = "dar_fes"
query_param = "property"

[persona]
assistant_name = "Youssef"
template_path = "/srv/concierge/persona.md"

[model]
name = "gemini-2.5-pro"
base_url = "http://localhost:9999"
api_key_env = "MY_KEY"
request_timeout_secs = 15
max_output_tokens = 800
temperature = 0.3

[server]
bind = "0.0.0.0:8080"
session_idle_timeout_secs = 600
max_sessions = 50

[logging]
level = "debug"
dir = "/var/log/concierge"
"#;
    let config = ConciergeConfig::from_toml(toml_str).expect("should parse");
    assert_eq!(config.registry.path, PathBuf::from("/srv/concierge/tenants.json"));
    assert_eq!(config.registry.default_tenant, "dar_fes");
    assert_eq!(config.registry.query_param, "property");
    assert_eq!(config.persona.assistant_name, "Youssef");
    assert_eq!(config.model.name, "gemini-2.5-pro");
    assert_eq!(config.model.api_key_env, "MY_KEY");
    assert_eq!(config.model.request_timeout_secs, 15);
    assert_eq!(config.model.max_output_tokens, Some(800));
    assert_eq!(config.server.bind, "0.0.0.0:8080");
    assert_eq!(config.server.max_sessions, 50);
    assert_eq!(config.logging.dir, Some(PathBuf::from("/var/log/concierge")));
}

#[test]
fn parse_partial_toml_uses_defaults() {
    let config = ConciergeConfig::from_toml("[registry]\ndefault_tenant = \"dar_fes\"\n")
        .expect("should parse");
    assert_eq!(config.registry.default_tenant, "dar_fes");
    assert_eq!(config.registry.path, PathBuf::from("tenants.json"));
    assert_eq!(config.model.name, "gemini-2.5-flash");
    assert_eq!(config.server.session_idle_timeout_secs, 1800);
}

#[test]
fn invalid_toml_returns_error() {
    assert!(ConciergeConfig::from_toml("this is {{ not valid toml").is_err());
    assert!(ConciergeConfig::from_toml("[model]\nrequest_timeout_secs = \"soon\"").is_err());
}

#[test]
fn env_overrides_config_values() {
    let mut config = ConciergeConfig::from_toml("[model]\nname = \"from-file\"\n").expect("parse");
    config.apply_overrides(|key| match key {
        "CONCIERGE_REGISTRY_PATH" => Some("/env/tenants.json".to_string()),
        "CONCIERGE_DEFAULT_TENANT" => Some("env_tenant".to_string()),
        "CONCIERGE_MODEL" => Some("from-env".to_string()),
        "CONCIERGE_TIMEOUT_SECS" => Some("5".to_string()),
        "CONCIERGE_BIND" => Some("127.0.0.1:9000".to_string()),
        "CONCIERGE_LOG_DIR" => Some("/env/logs".to_string()),
        _ => None,
    });

    assert_eq!(config.registry.path, PathBuf::from("/env/tenants.json"));
    assert_eq!(config.registry.default_tenant, "env_tenant");
    assert_eq!(config.model.name, "from-env");
    assert_eq!(config.model.request_timeout_secs, 5);
    assert_eq!(config.server.bind, "127.0.0.1:9000");
    assert_eq!(config.logging.dir, Some(PathBuf::from("/env/logs")));
}

#[test]
fn load_with_explicit_file() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let path = tmp.path().join("concierge.toml");
    fs::write(&path, "[registry]\ndefault_tenant = \"dar_fes\"\n").expect("should write");

    let config = ConciergeConfig::load_with(Some(path), |_| None).expect("should load");
    assert_eq!(config.registry.default_tenant, "dar_fes");
}

#[test]
fn explicit_missing_file_is_an_error() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let result = ConciergeConfig::load_with(Some(tmp.path().join("absent.toml")), |_| None);
    assert!(result.is_err());
}

#[test]
fn env_config_path_wins_over_flag() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let env_path = tmp.path().join("env.toml");
    fs::write(&env_path, "[server]\nbind = \"127.0.0.1:1111\"\n").expect("should write");
    let env_path_str = env_path.display().to_string();

    let config = ConciergeConfig::load_with(Some(tmp.path().join("flag.toml")), |key| {
        (key == "CONCIERGE_CONFIG_PATH").then(|| env_path_str.clone())
    })
    .expect("should load");
    assert_eq!(config.server.bind, "127.0.0.1:1111");
}

#[test]
fn zero_timeout_is_rejected_at_load() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let path = tmp.path().join("concierge.toml");
    fs::write(&path, "[model]\nrequest_timeout_secs = 0\n").expect("should write");

    let err = ConciergeConfig::load_with(Some(path), |_| None).expect_err("should fail");
    assert!(err.to_string().contains("request_timeout_secs"), "got: {err}");
}

#[test]
fn zero_session_limit_is_rejected_at_load() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let path = tmp.path().join("concierge.toml");
    fs::write(&path, "[server]\nmax_sessions = 0\n").expect("should write");

    let err = ConciergeConfig::load_with(Some(path), |_| None).expect_err("should fail");
    assert!(err.to_string().contains("max_sessions"), "got: {err}");
}

#[test]
fn zero_timeout_from_env_is_rejected() {
    let result = ConciergeConfig::load_with(None, |key| {
        (key == "CONCIERGE_TIMEOUT_SECS").then(|| "0".to_string())
    });
    assert!(result.is_err());
}
