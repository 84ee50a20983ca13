// DebouncedValidator driven against the real REST client and a wiremock backend.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bmsdash_api::ConfigApiClient;
use bmsdash_core::{AvailabilityState, DebouncedValidator, Protocol, ValidatorOptions};

fn options() -> ValidatorOptions {
    ValidatorOptions {
        debounce: Duration::from_millis(20),
        protocol: Some(Protocol::Bacnet),
        enabled: true,
    }
}

async fn settled(validator: &DebouncedValidator) -> AvailabilityState {
    let mut rx = validator.subscribe();
    tokio::time::timeout(
        Duration::from_secs(5),
        rx.wait_for(|s| !matches!(s, AvailabilityState::Idle | AvailabilityState::Checking)),
    )
    .await
    .expect("validator did not settle")
    .unwrap()
    .clone()
}

#[tokio::test]
async fn test_free_and_taken_ids() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/hvac/config/exists"))
        .and(query_param("protocol", "BACNET"))
        .and(query_param("deviceId", "12345"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "exists": false })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/hvac/config/exists"))
        .and(query_param("deviceId", "777"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "exists": true })))
        .mount(&server)
        .await;

    let client = ConfigApiClient::from_reqwest(&server.uri(), reqwest::Client::new()).unwrap();
    let validator = DebouncedValidator::spawn(Arc::new(client), options());

    validator.set_input("12345");
    assert_eq!(settled(&validator).await, AvailabilityState::Available);
    assert!(validator.can_save());

    validator.set_input("777");
    let mut rx = validator.subscribe();
    tokio::time::timeout(
        Duration::from_secs(5),
        rx.wait_for(|s| *s == AvailabilityState::Taken),
    )
    .await
    .unwrap()
    .unwrap();
    assert!(!validator.can_save());

    validator.shutdown().await;
}

#[tokio::test]
async fn test_trimmed_value_is_sent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/hvac/config/exists"))
        .and(query_param("deviceId", "42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "exists": false })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ConfigApiClient::from_reqwest(&server.uri(), reqwest::Client::new()).unwrap();
    let validator = DebouncedValidator::spawn(Arc::new(client), options());

    validator.set_input("  42 ");
    assert_eq!(settled(&validator).await, AvailabilityState::Available);
    validator.shutdown().await;
}

#[tokio::test]
async fn test_server_error_becomes_error_state() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/hvac/config/exists"))
        .respond_with(ResponseTemplate::new(500).set_body_string("lookup failed"))
        .mount(&server)
        .await;

    let client = ConfigApiClient::from_reqwest(&server.uri(), reqwest::Client::new()).unwrap();
    let validator = DebouncedValidator::spawn(Arc::new(client), options());

    validator.set_input("12345");
    match settled(&validator).await {
        AvailabilityState::Error(message) => assert!(message.contains("lookup failed")),
        other => panic!("expected error, got {other:?}"),
    }
    assert!(!validator.can_save());
    validator.shutdown().await;
}
