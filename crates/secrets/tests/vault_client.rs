//! `VaultClient` against a mock Vault HTTP API

use serde_json::json;
use std::time::Duration;
use url::Url;
use vault_env_core::Error;
use vault_env_secrets::{SecretStore, VaultClient, VaultConfig};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, token: Option<&str>) -> VaultClient {
    let mut config = VaultConfig::new(Url::parse(&server.uri()).unwrap());
    if let Some(token) = token {
        config = config.with_token(token);
    }
    VaultClient::new(config).unwrap()
}

#[tokio::test]
async fn test_read_sends_token_and_parses_lease() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/secret/db"))
        .and(header("X-Vault-Token", "s.root"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "request_id": "1",
            "lease_id": "",
            "renewable": false,
            "lease_duration": 2764800,
            "data": {"user": "app", "password": "secret"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(&server, Some("s.root")).read("secret/db").await.unwrap();

    assert_eq!(response.data["user"], "app");
    assert_eq!(response.data["password"], "secret");
    assert_eq!(
        response.lease.map(|l| l.renew_after()),
        Some(Duration::from_secs(1_382_400))
    );
}

#[tokio::test]
async fn test_zero_lease_means_no_lease() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/secret/static"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "lease_duration": 0,
            "data": {"k": "v"}
        })))
        .mount(&server)
        .await;

    let response = client(&server, None).read("/secret/static").await.unwrap();

    assert_eq!(response.lease, None);
    assert_eq!(response.data.len(), 1);
}

#[tokio::test]
async fn test_list_uses_list_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/secret/services"))
        .and(query_param("list", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"keys": ["rmq", "newrelic"]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let keys = client(&server, Some("t")).list("secret/services").await.unwrap();

    assert_eq!(keys, vec!["rmq".to_string(), "newrelic".to_string()]);
}

#[tokio::test]
async fn test_error_carries_method_uri_and_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/secret/forbidden"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({"errors": ["permission denied"]})),
        )
        .mount(&server)
        .await;

    let err = client(&server, Some("bad")).read("secret/forbidden").await.unwrap_err();

    match err {
        Error::Store {
            method,
            uri,
            message,
        } => {
            assert_eq!(method, "GET");
            assert!(uri.ends_with("/v1/secret/forbidden"), "{uri}");
            assert!(message.contains("permission denied"), "{message}");
            assert!(message.contains("403"), "{message}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_list_error_reports_list_method() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/secret/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"errors": []})))
        .mount(&server)
        .await;

    let err = client(&server, None).list("secret/missing").await.unwrap_err();

    assert!(matches!(err, Error::Store { ref method, .. } if method == "LIST"));
}
