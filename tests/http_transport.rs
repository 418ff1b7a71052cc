mod common;

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sdk_token::{ApiRequest, Error, HttpTransport, Transport};

use common::init_logging;

#[tokio::test]
async fn post_sends_headers_and_json_body() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/items"))
        .and(header("X-Custom", "1"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({ "id": 7 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "stored": true })))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new(server.uri(), Duration::from_secs(5)).unwrap();
    let request = ApiRequest::post("/items", "", &json!({ "id": 7 }))
        .unwrap()
        .with_header("X-Custom", "1");
    let response = transport.send(request).await.unwrap();
    assert_eq!(response, json!({ "stored": true }));
}

#[tokio::test]
async fn service_name_is_substituted_into_base_url() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/identity/v1/ping"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "pong": 1 })))
        .expect(1)
        .mount(&server)
        .await;

    let base = format!("{}/{{service}}", server.uri());
    let transport = HttpTransport::new(base, Duration::from_secs(5)).unwrap();
    let response = transport
        .send(ApiRequest::get("v1/ping", "identity"))
        .await
        .unwrap();
    assert_eq!(response["pong"], 1);
}

#[tokio::test]
async fn non_success_status_maps_to_network_failure() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("nope"))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(server.uri(), Duration::from_secs(5)).unwrap();
    let err = transport
        .send(ApiRequest::get("/missing", ""))
        .await
        .unwrap_err();
    match err {
        Error::Network { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body, "nope");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn slow_response_maps_to_timeout() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let transport = HttpTransport::new(server.uri(), Duration::from_millis(200)).unwrap();
    let err = transport.send(ApiRequest::get("/slow", "")).await.unwrap_err();
    assert!(matches!(err, Error::Timeout(_)), "unexpected error: {err:?}");
    assert!(err.is_timeout());
}

#[tokio::test]
async fn connection_failure_maps_to_status_zero() {
    init_logging();
    // Reserve a free port, then close it so nothing is listening.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let transport =
        HttpTransport::new(format!("http://127.0.0.1:{port}"), Duration::from_secs(2)).unwrap();
    let err = transport.send(ApiRequest::get("/any", "")).await.unwrap_err();
    assert_eq!(err.status_code(), Some(0), "unexpected error: {err:?}");
}

#[tokio::test]
async fn empty_body_decodes_to_null() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/profile"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(server.uri(), Duration::from_secs(5)).unwrap();
    let response = transport
        .send(ApiRequest::put("/profile", "", &json!({ "name": "n" })).unwrap())
        .await
        .unwrap();
    assert!(response.is_null());
}
