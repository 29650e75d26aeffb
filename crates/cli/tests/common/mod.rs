//! Helpers shared by the runner test binaries

#![allow(dead_code)]

use serde_json::json;
use std::path::Path;
use std::time::Duration;
use vault_env_config::{Config, ConfigFile, ConfigLoader};
use vault_env_supervisor::CommandSpec;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Configuration pointing at `server`, with `extra` merged over the
/// top-level keys
pub fn config(server: &MockServer, extra: serde_json::Value) -> Config {
    let mut raw = json!({
        "vault": {"address": server.uri(), "token": "s.test"},
        "secrets": [{"path": "secret/app", "format": "<%= key %>"}],
        "retry": {"interval": 10, "maxAttempts": 2},
        "debounce": 50
    });
    if let (Some(base), Some(extra)) = (raw.as_object_mut(), extra.as_object()) {
        for (k, v) in extra {
            base.insert(k.clone(), v.clone());
        }
    }
    let file = ConfigFile::parse(&raw.to_string()).unwrap();
    ConfigLoader::new().resolve(file).unwrap()
}

pub fn secret_body(data: serde_json::Value, lease: u64) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"lease_duration": lease, "data": data}))
}

/// `secret/app` answers `first` for `times` reads, then `then` forever
pub async fn mount_changing_secret(
    server: &MockServer,
    first: serde_json::Value,
    times: u64,
    then: serde_json::Value,
    lease: u64,
) {
    Mock::given(method("GET"))
        .and(path("/v1/secret/app"))
        .respond_with(secret_body(first, lease))
        .up_to_n_times(times)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/secret/app"))
        .respond_with(secret_body(then, lease))
        .mount(server)
        .await;
}

pub fn sh(script: String) -> CommandSpec {
    CommandSpec::new("sh", vec!["-c".to_string(), script])
}

pub fn read_lines(file: &Path) -> Vec<String> {
    std::fs::read_to_string(file)
        .map(|contents| contents.lines().map(str::to_string).collect())
        .unwrap_or_default()
}

pub async fn wait_for_lines(file: &Path, count: usize) -> Vec<String> {
    for _ in 0..200 {
        let lines = read_lines(file);
        if lines.len() >= count {
            return lines;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("{} never reached {count} lines", file.display());
}

pub async fn wait_for_file(file: &Path) {
    for _ in 0..200 {
        if file.exists() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("{} never appeared", file.display());
}
