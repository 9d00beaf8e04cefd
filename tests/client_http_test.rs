//! HTTP client integration tests
//!
//! Exercises `ApiClient` against a `wiremock` mock server: retry counts,
//! header construction, proxy rewriting, timeouts and uploads.

mod common;

use common::{direct_settings, fast_client, proxy_settings};
use manoman::client::RequestOptions;
use manoman::config::{ApplicationSettings, AuthorizationType};
use manoman::ManomanError;
use serde_json::{json, Value as JsonValue};
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ---------------------------------------------------------------------------
// Retry
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_failing_request_makes_max_retries_plus_one_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/things"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let settings = ApplicationSettings {
        max_retries: 2,
        ..direct_settings(&server.uri())
    };
    let err = fast_client(settings)
        .get_json::<JsonValue>("/api/v1/things")
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert_eq!(
        err.to_string(),
        "HTTP error! status: 500 Internal Server Error"
    );
}

#[tokio::test]
async fn test_disabled_auto_retry_makes_one_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let settings = ApplicationSettings {
        auto_retry_enabled: false,
        max_retries: 5,
        ..direct_settings(&server.uri())
    };
    let result = fast_client(settings).get_json::<JsonValue>("/x").await;
    assert_eq!(result.unwrap_err().status(), Some(503));
}

#[tokio::test]
async fn test_zero_max_retries_makes_one_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let settings = ApplicationSettings {
        max_retries: 0,
        ..direct_settings(&server.uri())
    };
    assert!(fast_client(settings).get_json::<JsonValue>("/x").await.is_err());
}

#[tokio::test]
async fn test_retry_recovers_after_transient_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let value: JsonValue = fast_client(direct_settings(&server.uri()))
        .get_json("/x")
        .await
        .expect("second attempt should succeed");
    assert_eq!(value["ok"], true);
}

#[tokio::test]
async fn test_request_timeout_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let settings = ApplicationSettings {
        default_timeout: 100,
        auto_retry_enabled: false,
        ..direct_settings(&server.uri())
    };
    let err = fast_client(settings)
        .get_json::<JsonValue>("/slow")
        .await
        .unwrap_err();

    assert!(matches!(err, ManomanError::Timeout(100)));
    assert_eq!(err.to_string(), "Request timed out after 100ms");
}

#[tokio::test]
async fn test_unreachable_backend_is_network_error() {
    let settings = ApplicationSettings {
        auto_retry_enabled: false,
        ..direct_settings(&common::closed_port_url())
    };
    let err = fast_client(settings)
        .get_json::<JsonValue>("/x")
        .await
        .unwrap_err();
    assert!(err.is_transport());
    assert_eq!(err.status(), None);
}

// ---------------------------------------------------------------------------
// Headers and proxy routing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_direct_mode_sends_native_auth_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/services"))
        .and(header("authorization", "infraonDNS secret"))
        .and(header("x-csrftoken", "csrf-1"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let settings = ApplicationSettings {
        authorization_key: "secret".to_string(),
        authorization_type: AuthorizationType::InfraonDns,
        csrf_token: "csrf-1".to_string(),
        ..direct_settings(&server.uri())
    };
    let value: JsonValue = fast_client(settings)
        .target_request("/api/v1/services", RequestOptions::get())
        .await
        .expect("headers should match");
    assert_eq!(value, json!([]));
}

#[tokio::test]
async fn test_proxy_mode_rewrites_target_path_and_forwards_credentials() {
    let proxy = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/proxy/infraon/api/v1/tickets"))
        .and(header("x-infraon-base-url", "https://infraon.example.com"))
        .and(header("x-infraon-auth-type", "bearer"))
        .and(header("x-infraon-auth-token", "abc"))
        .and(header("x-infraon-csrf-token", "csrf-2"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 7})))
        .expect(1)
        .mount(&proxy)
        .await;

    let settings = ApplicationSettings {
        authorization_key: "abc".to_string(),
        csrf_token: "csrf-2".to_string(),
        ..proxy_settings("https://infraon.example.com", &format!("{}/", proxy.uri()))
    };
    let value: JsonValue = fast_client(settings)
        .target_request("api/v1/tickets", RequestOptions::post(json!({"title": "t"})))
        .await
        .expect("proxy route should match");
    assert_eq!(value["id"], 7);
}

#[tokio::test]
async fn test_proxy_mode_generic_requests_use_proxy_base() {
    let proxy = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/manoman/services"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "services": [],
            "total_services": 0
        })))
        .expect(1)
        .mount(&proxy)
        .await;

    let client = fast_client(proxy_settings("https://infraon.example.com", &proxy.uri()));
    assert_eq!(client.base_url(), proxy.uri());
    assert!(client.get_services().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_per_call_header_overrides_computed_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("authorization", "Token override"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let settings = ApplicationSettings {
        authorization_key: "from-settings".to_string(),
        ..direct_settings(&server.uri())
    };
    let options = RequestOptions::get()
        .with_header("Authorization", "Token override")
        .unwrap();
    let _: JsonValue = fast_client(settings)
        .request_json("/x", options)
        .await
        .expect("override header should match");
}

// ---------------------------------------------------------------------------
// Backend endpoints
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_get_services_and_service() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/manoman/services"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "services": [{
                "service_name": "tickets",
                "endpoint_count": 12,
                "suggested_description": "Ticket management",
                "confidence_score": 0.9,
                "needs_review": false,
                "keywords": ["ticket"],
                "synonyms": []
            }],
            "total_services": 1,
            "upload_id": "u-1"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/manoman/services/tickets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "service_name": "tickets",
            "endpoint_count": 12
        })))
        .mount(&server)
        .await;

    let client = fast_client(direct_settings(&server.uri()));
    let services = client.get_services().await.unwrap();
    assert_eq!(services.len(), 1);
    assert_eq!(services[0].endpoint_count, 12);

    let service = client.get_service("tickets").await.expect("service exists");
    assert_eq!(service.service_name, "tickets");
}

#[tokio::test]
async fn test_get_service_failure_is_absent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let settings = ApplicationSettings {
        auto_retry_enabled: false,
        ..direct_settings(&server.uri())
    };
    assert!(fast_client(settings).get_service("missing").await.is_none());
}

#[tokio::test]
async fn test_upload_spec_and_poll_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/manoman/upload"))
        .and(header("authorization", "Bearer k"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"upload_id": "u-42"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/manoman/upload/u-42/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "processing",
            "progress": 40.0
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("openapi.json");
    std::fs::write(&file, r#"{"openapi":"3.0.0"}"#).unwrap();

    let settings = ApplicationSettings {
        authorization_key: "k".to_string(),
        ..direct_settings(&server.uri())
    };
    let client = fast_client(settings);
    let upload = client.upload_api_spec(&file).await.expect("upload succeeds");
    assert_eq!(upload.upload_id, "u-42");

    let status = client.get_upload_status("u-42").await.unwrap();
    assert_eq!(status.status, "processing");
    assert_eq!(status.progress, Some(40.0));

    let received = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&received[0].body);
    assert!(body.contains("filename=\"openapi.json\""));
    assert!(body.contains(r#"{"openapi":"3.0.0"}"#));
}

#[tokio::test]
async fn test_upload_rejection_is_single_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/manoman/upload"))
        .respond_with(ResponseTemplate::new(413))
        .expect(1)
        .mount(&server)
        .await;

    let err = fast_client(direct_settings(&server.uri()))
        .upload_bytes("big.yaml", vec![0u8; 16])
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Upload failed: 413 Payload Too Large");
    assert_eq!(err.status(), Some(413));
}
