// Integration tests for `ConfigApiClient` using wiremock.

use std::sync::Arc;

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bmsdash_api::{ConfigApiClient, Error, HvacUnitConfig, Protocol, StaticToken};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, ConfigApiClient) {
    let server = MockServer::start().await;
    let client = ConfigApiClient::from_reqwest(&server.uri(), reqwest::Client::new()).unwrap();
    (server, client)
}

// ── Uniqueness check ────────────────────────────────────────────────

#[tokio::test]
async fn test_exists_true_and_false() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/hvac/config/exists"))
        .and(query_param("protocol", "BACNET"))
        .and(query_param("deviceId", "12345"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "exists": true })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/hvac/config/exists"))
        .and(query_param("deviceId", "777"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "exists": false })))
        .mount(&server)
        .await;

    assert!(client.device_id_exists(Protocol::Bacnet, "12345").await.unwrap());
    assert!(!client.device_id_exists(Protocol::Bacnet, "777").await.unwrap());
}

#[tokio::test]
async fn test_exists_sends_bearer_token() {
    let server = MockServer::start().await;
    let client = ConfigApiClient::from_reqwest(&server.uri(), reqwest::Client::new())
        .unwrap()
        .with_tokens(Arc::new(StaticToken::new(SecretString::from("tok-abc"))));

    Mock::given(method("GET"))
        .and(path("/api/hvac/config/exists"))
        .and(header("authorization", "Bearer tok-abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "exists": false })))
        .expect(1)
        .mount(&server)
        .await;

    assert!(!client.device_id_exists(Protocol::Bacnet, "1").await.unwrap());
}

#[tokio::test]
async fn test_exists_non_2xx_carries_body_as_message() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/hvac/config/exists"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database unavailable"))
        .mount(&server)
        .await;

    let err = client
        .device_id_exists(Protocol::Bacnet, "12345")
        .await
        .unwrap_err();

    match err {
        Error::Http { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "database unavailable");
        }
        other => panic!("expected Http error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unauthorized_maps_to_authentication() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/hvac/config/exists"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client
        .device_id_exists(Protocol::Bacnet, "12345")
        .await
        .unwrap_err();
    assert!(err.is_auth_expired());
}

#[tokio::test]
async fn test_exists_garbage_body_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/hvac/config/exists"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let err = client
        .device_id_exists(Protocol::Bacnet, "12345")
        .await
        .unwrap_err();
    match err {
        Error::Deserialization { body, .. } => assert_eq!(body, "<html>login</html>"),
        other => panic!("expected Deserialization error, got {other:?}"),
    }
}

// ── Configuration records ───────────────────────────────────────────

#[tokio::test]
async fn test_list_configs() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/hvac/config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": 1,
                "deviceId": "AHU-1",
                "unitName": "Lobby AHU",
                "building": "HQ",
                "protocol": "SIMULATOR",
                "enabled": true
            },
            {
                "id": 2,
                "deviceId": "502",
                "unitName": "Roof RTU",
                "protocol": "MODBUS",
                "modbusHost": "10.0.0.5",
                "modbusPort": 502,
                "modbusUnitId": 1,
                "regTemp": 100,
                "enabled": false
            }
        ])))
        .mount(&server)
        .await;

    let configs = client.list_configs().await.unwrap();
    assert_eq!(configs.len(), 2);
    assert_eq!(configs[0].unit_name, "Lobby AHU");
    assert_eq!(configs[0].building.as_deref(), Some("HQ"));
    assert_eq!(configs[1].protocol, Protocol::Modbus);
    assert_eq!(configs[1].modbus_port, Some(502));
    assert_eq!(configs[1].reg_temp, Some(100));
    assert!(!configs[1].enabled);
}

#[tokio::test]
async fn test_create_config_posts_camel_case_body() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/hvac/config"))
        .and(body_partial_json(json!({
            "deviceId": "12345",
            "unitName": "AHU-7",
            "protocol": "BACNET",
            "bacnetDeviceInstance": 12345
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 9,
            "deviceId": "12345",
            "unitName": "AHU-7",
            "protocol": "BACNET",
            "bacnetDeviceInstance": 12345,
            "enabled": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let created = client
        .create_config(&HvacUnitConfig {
            device_id: "12345".into(),
            unit_name: "AHU-7".into(),
            protocol: Protocol::Bacnet,
            bacnet_device_instance: Some(12345),
            enabled: true,
            ..HvacUnitConfig::default()
        })
        .await
        .unwrap();

    assert_eq!(created.id, Some(9));
}
