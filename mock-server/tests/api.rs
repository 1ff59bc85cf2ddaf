use axum::http::{self, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mock_server::{app, DEMO_PASSWORD, DEMO_USER};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: &str) -> Request<String> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(http::header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(body.to_string()).unwrap()
}

async fn login(app: &Router) -> String {
    let body = json!({"User": DEMO_USER, "Password": DEMO_PASSWORD}).to_string();
    let resp = app
        .clone()
        .oneshot(json_request("POST", "/api/login", None, &body))
        .await
        .unwrap();
    let envelope = body_json(resp).await;
    envelope["Token"].as_str().unwrap().to_string()
}

// --- login ---

#[tokio::test]
async fn login_returns_token_message_and_payload() {
    let app = app();
    let body = json!({"User": DEMO_USER, "Password": DEMO_PASSWORD}).to_string();
    let resp = app
        .oneshot(json_request("POST", "/api/login", None, &body))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let envelope = body_json(resp).await;
    assert!(!envelope["Token"].as_str().unwrap().is_empty());
    assert_eq!(envelope["Message"], "Welcome back, admin");
    assert_eq!(envelope["Payload"], json!({"User": "admin"}));
}

#[tokio::test]
async fn login_with_wrong_password_is_error_envelope() {
    let app = app();
    let body = json!({"User": DEMO_USER, "Password": "wrong"}).to_string();
    let resp = app
        .oneshot(json_request("POST", "/api/login", None, &body))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let envelope = body_json(resp).await;
    assert_eq!(envelope["Error"]["Code"], 403);
    assert!(envelope.get("Token").is_none());
}

// --- profile ---

#[tokio::test]
async fn profile_without_token_is_401_envelope() {
    let app = app();
    let resp = app
        .oneshot(Request::builder().uri("/api/profile").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let envelope = body_json(resp).await;
    assert_eq!(envelope["Error"]["Code"], 401);
}

#[tokio::test]
async fn profile_with_session_token() {
    let app = app();
    let token = login(&app).await;
    let resp = app
        .oneshot(json_request("GET", "/api/profile", Some(&token), ""))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({"Payload": {"User": "admin"}}));
}

#[tokio::test]
async fn logout_invalidates_token() {
    let app = app();
    let token = login(&app).await;
    let resp = app
        .clone()
        .oneshot(json_request("POST", "/api/logout", Some(&token), ""))
        .await
        .unwrap();
    let envelope = body_json(resp).await;
    assert_eq!(envelope["Message"], "Signed out");
    assert_eq!(envelope["Payload"], true);

    let resp = app
        .oneshot(json_request("GET", "/api/profile", Some(&token), ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- plain endpoints ---

#[tokio::test]
async fn echo_wraps_body_in_payload() {
    let app = app();
    let resp = app
        .oneshot(json_request("PATCH", "/api/echo", None, r#"{"a":[1,2]}"#))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await, json!({"Payload": {"a": [1, 2]}}));
}

#[tokio::test]
async fn echo_without_body_is_null_payload() {
    let app = app();
    let resp = app
        .oneshot(json_request("DELETE", "/api/echo", None, ""))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await, json!({"Payload": null}));
}

#[tokio::test]
async fn version_is_a_bare_body() {
    let app = app();
    let resp = app
        .oneshot(Request::builder().uri("/api/version").body(String::new()).unwrap())
        .await
        .unwrap();
    assert_eq!(body_json(resp).await, json!({"Version": "1.0.0"}));
}

#[tokio::test]
async fn counter_increments_per_call() {
    let app = app();
    for expected in 1..=2 {
        let resp = app
            .clone()
            .oneshot(Request::builder().uri("/api/counter").body(String::new()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_json(resp).await["Payload"]["Hits"], expected);
    }
}

#[tokio::test]
async fn broken_is_500_with_empty_body() {
    let app = app();
    let resp = app
        .oneshot(Request::builder().uri("/api/broken").body(String::new()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_bytes(resp).await.is_empty());
}

// --- stream ---

#[tokio::test]
async fn stream_emits_event_segments() {
    let app = app();
    let token = login(&app).await;
    let resp = app
        .oneshot(json_request("POST", "/api/stream", Some(&token), r#"{"Lines":["a","b"]}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(http::header::CONTENT_TYPE).unwrap(),
        "text/event-stream"
    );
    assert_eq!(&body_bytes(resp).await[..], b"data: a\n\ndata: b\n\n");
}

#[tokio::test]
async fn stream_requires_session() {
    let app = app();
    let resp = app
        .oneshot(json_request("POST", "/api/stream", None, r#"{"Lines":["a"]}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(resp).await["Error"]["Code"], 401);
}
