//! `VaultEnv` end to end against a mock Vault

mod common;

use common::{config, mount_changing_secret, read_lines, secret_body, sh, wait_for_lines};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use vault_env::VaultEnv;
use vault_env_config::{ConfigFile, ConfigLoader};
use vault_env_core::{Error, Signal};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test(flavor = "multi_thread")]
async fn test_secret_reaches_child_environment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/secret/app"))
        .respond_with(secret_body(json!({"value": "abc"}), 0))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("env.txt");

    let code = VaultEnv::new(
        config(
            &server,
            json!({"secrets": [{"path": "secret/app", "format": "SECRET_<%= key %>"}]}),
        ),
        sh(format!("env > '{}'", out.display())),
    )
    .unwrap()
    .forward_signals(false)
    .run()
    .await
    .unwrap();

    assert_eq!(code, 0);
    let env = std::fs::read_to_string(&out).unwrap();
    assert!(env.lines().any(|l| l == "SECRET_VALUE=abc"), "{env}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_exit_code_is_propagated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/secret/app"))
        .respond_with(secret_body(json!({"a": "1"}), 0))
        .mount(&server)
        .await;

    let code = VaultEnv::new(config(&server, json!({})), sh("exit 42".into()))
        .unwrap()
        .forward_signals(false)
        .run()
        .await
        .unwrap();

    assert_eq!(code, 42);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fetch_failure_prevents_spawn() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/secret/app"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"errors": ["permission denied"]})))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("started");

    let err = VaultEnv::new(
        config(&server, json!({})),
        sh(format!("touch '{}'", marker.display())),
    )
    .unwrap()
    .forward_signals(false)
    .run()
    .await
    .unwrap_err();

    assert!(matches!(err, Error::SecretFetch { .. }), "{err}");
    assert!(!marker.exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_kill_handle_reaches_child() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/secret/app"))
        .respond_with(secret_body(json!({"a": "1"}), 0))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let started = dir.path().join("started");

    let vault_env = VaultEnv::new(
        config(&server, json!({})),
        sh(format!("echo up > '{}'; exec sleep 30", started.display())),
    )
    .unwrap()
    .forward_signals(false);
    let kill = vault_env.kill_handle();
    let run = tokio::spawn(vault_env.run());

    wait_for_lines(&started, 1).await;
    kill.kill(Signal::Term);

    let code = tokio::time::timeout(Duration::from_secs(10), run)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(code, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_watch_restarts_only_on_change_without_overlap() {
    let server = MockServer::start().await;
    // lease of 2s means a re-fetch every second; the third read changes
    mount_changing_secret(&server, json!({"token": "one"}), 2, json!({"token": "two"}), 2).await;

    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("children.log");

    // the loop keeps the shell alive so its TERM trap runs
    let script = format!(
        "trap 'echo \"exit $TOKEN\" >> \"{log}\"; exit 0' TERM; \
         echo \"start $TOKEN\" >> \"{log}\"; \
         while true; do sleep 0.05; done",
        log = log.display()
    );

    let vault_env = VaultEnv::new(config(&server, json!({"watch": true})), sh(script))
        .unwrap()
        .forward_signals(false);
    let kill = vault_env.kill_handle();
    let run = tokio::spawn(vault_env.run());

    let lines = wait_for_lines(&log, 3).await;
    assert_eq!(lines, vec!["start one", "exit one", "start two"]);

    // "two" keeps coming back; no further restarts
    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(read_lines(&log).len(), 3);

    kill.kill(Signal::Term);
    let code = tokio::time::timeout(Duration::from_secs(10), run)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(code, 0);
    assert_eq!(
        read_lines(&log),
        vec!["start one", "exit one", "start two", "exit two"]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_watch_gives_up_without_spawning() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/secret/app"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"errors": ["Vault is sealed"]})))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("started");

    let err = VaultEnv::new(
        config(&server, json!({"watch": true})),
        sh(format!("touch '{}'", marker.display())),
    )
    .unwrap()
    .forward_signals(false)
    .run()
    .await
    .unwrap_err();

    assert!(err.is_retry_exhausted(), "{err}");
    assert!(err.to_string().contains("Vault is sealed"));
    assert!(!marker.exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_dummy_mode_runs_without_vault() {
    let file = ConfigFile::parse(
        r#"{"dummy": true, "secrets": [{"path": "secret/app", "format": "SECRET_<%= key %>"}]}"#,
    )
    .unwrap();
    let config = ConfigLoader::new().resolve(file).unwrap();

    let code = VaultEnv::new(config, sh("test -z \"$SECRET_VALUE\"".into()))
        .unwrap()
        .forward_signals(false)
        .run()
        .await
        .unwrap();

    assert_eq!(code, 0);
}
