mod common;

use jiff::SignedDuration;
use serde_json::{Value, json};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sdk_token::{AUTH_HEADER, Error, Platform, SDK_VERSION, SdkConfig, SdkContext};

use common::{init_logging, mint_token};

async fn mount_token_endpoint(server: &MockServer, token: &str, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/identity/token"))
        .and(body_json(json!({
            "projectId": "proj",
            "apiKey": "secret",
            "sdkVersion": SDK_VERSION,
            "platform": Platform::current().as_str(),
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Token": token })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn start_fetches_token_and_authenticates_calls() {
    init_logging();
    let server = MockServer::start().await;
    let token = mint_token("sdk", SignedDuration::from_hours(1));
    mount_token_endpoint(&server, &token, 1).await;

    Mock::given(method("GET"))
        .and(path("/profile"))
        .and(header(AUTH_HEADER, token.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "ada" })))
        .expect(2)
        .mount(&server)
        .await;

    let context = SdkContext::start(SdkConfig::from_values("proj", "secret", server.uri()))
        .await
        .expect("sdk start");
    assert!(context.token_manager().is_refresh_scheduled());

    for _ in 0..2 {
        let profile: Value = context.dispatcher().get("/profile", "").await.unwrap();
        assert_eq!(profile["name"], "ada");
    }

    context.shutdown();
    assert!(!context.token_manager().is_refresh_scheduled());
    let err = context
        .dispatcher()
        .get::<Value>("/profile", "")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AuthMissing(Some(_))));
}

#[tokio::test]
async fn start_fails_when_issuer_rejects() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/identity/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = SdkContext::start(SdkConfig::from_values("proj", "secret", server.uri())).await;
    let err = match result {
        Ok(_) => panic!("start should fail"),
        Err(err) => err,
    };
    assert!(matches!(err, Error::Initialization(_)), "unexpected error: {err:?}");
    assert_eq!(err.status_code(), Some(401));
}

#[tokio::test]
async fn start_rejects_invalid_config_without_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = SdkContext::start(SdkConfig::from_values("", "secret", server.uri())).await;
    assert!(matches!(result, Err(Error::Config(_))));
}

#[tokio::test]
async fn posts_and_puts_carry_the_token() {
    init_logging();
    let server = MockServer::start().await;
    let token = mint_token("sdk", SignedDuration::from_hours(1));
    mount_token_endpoint(&server, &token, 1).await;

    Mock::given(method("POST"))
        .and(path("/scores"))
        .and(header(AUTH_HEADER, token.as_str()))
        .and(body_json(json!({ "score": 42 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "rank": 1 })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/scores/1"))
        .and(header(AUTH_HEADER, token.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "updated": true })))
        .expect(1)
        .mount(&server)
        .await;

    let config = SdkConfig::from_values("proj", "secret", server.uri()).with_auto_refresh(false);
    let context = SdkContext::start(config).await.unwrap();
    assert!(!context.token_manager().is_refresh_scheduled());

    let rank: Value = context
        .dispatcher()
        .post("/scores", "", &json!({ "score": 42 }))
        .await
        .unwrap();
    assert_eq!(rank["rank"], 1);
    let updated: Value = context
        .dispatcher()
        .put("/scores/1", "", &json!({ "score": 43 }))
        .await
        .unwrap();
    assert_eq!(updated["updated"], true);
}
