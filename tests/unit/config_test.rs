//! Tests for configuration loading and defaults

use std::io::Write;
use std::time::Duration;

use pve_client::config::{ApiConfig, ClientConfig};
use pve_client::error::Error;

#[test]
fn defaults_cover_every_transport() {
    let config = ClientConfig::default();
    assert_eq!(config.api.entry_point, "api2/json");
    assert!(config.api.verify_ssl);
    assert_eq!(config.cli.entry_point, "pvesh");
    assert_eq!(config.ssh.port, 22);
    assert!(!config.ssh.agent);
    assert!(!config.ssh.accept_host_key);
    assert_eq!(config.timeout(), Duration::from_secs(60));
    assert_eq!(config.polling_interval(), Duration::from_secs(2));
}

#[test]
fn token_is_assembled_from_id_and_secret() {
    let api = ApiConfig {
        token_id: "root@pam!ci".to_string(),
        token_secret: "secret".to_string(),
        ..ApiConfig::default()
    };
    assert_eq!(api.token(), "root@pam!ci=secret");
}

#[test]
fn toml_file_loads_with_partial_sections() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
timeout_secs = 300

[api]
base_url = "https://pve.local:8006"
token_id = "root@pam!ci"
token_secret = "secret"
verify_ssl = false

[ssh]
hostname = "pve.local"
username = "root"
agent = true
"#
    )
    .unwrap();

    let config = ClientConfig::from_file(file.path()).unwrap();
    assert_eq!(config.api.base_url, "https://pve.local:8006");
    assert!(!config.api.verify_ssl);
    // Unset fields keep their defaults.
    assert_eq!(config.api.entry_point, "api2/json");
    assert_eq!(config.cli.entry_point, "pvesh");
    assert_eq!(config.ssh.hostname, "pve.local");
    assert_eq!(config.ssh.port, 22);
    assert!(config.ssh.agent);
    assert_eq!(config.timeout(), Duration::from_secs(300));
    assert_eq!(config.polling_interval(), Duration::from_secs(2));
}

#[test]
fn empty_file_is_all_defaults() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let config = ClientConfig::from_file(file.path()).unwrap();
    assert_eq!(config.cli.entry_point, "pvesh");
    assert_eq!(config.timeout(), Duration::from_secs(60));
}

#[test]
fn missing_file_reports_the_path() {
    let result = ClientConfig::from_file("/nonexistent/pve-client.toml");
    match result {
        Err(Error::ConfigRead { path, .. }) => {
            assert_eq!(path.to_str(), Some("/nonexistent/pve-client.toml"));
        }
        other => panic!("expected ConfigRead, got {other:?}"),
    }
}

#[test]
fn invalid_toml_reports_a_parse_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "timeout_secs = [not toml").unwrap();
    let result = ClientConfig::from_file(file.path());
    assert!(matches!(result, Err(Error::ConfigParse { .. })));
}
