use std::{
    collections::HashSet,
    convert::Infallible,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const DEMO_USER: &str = "admin";
pub const DEMO_PASSWORD: &str = "secret";

#[derive(Clone, Default)]
pub struct AppState {
    sessions: Arc<RwLock<HashSet<String>>>,
    hits: Arc<AtomicU64>,
}

#[derive(Deserialize)]
pub struct Login {
    #[serde(rename = "User")]
    pub user: String,
    #[serde(rename = "Password")]
    pub password: String,
}

#[derive(Deserialize)]
pub struct StreamLines {
    #[serde(rename = "Lines", default)]
    pub lines: Vec<String>,
}

pub fn app() -> Router {
    Router::new()
        .route("/api/login", post(login))
        .route("/api/logout", post(logout))
        .route("/api/profile", get(profile))
        .route("/api/echo", post(echo).patch(echo).delete(echo))
        .route("/api/version", get(version))
        .route("/api/counter", get(counter))
        .route("/api/broken", get(broken))
        .route("/api/stream", post(stream))
        .with_state(AppState::default())
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn envelope(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

fn error(status: StatusCode, code: u16, message: &str) -> Response {
    envelope(status, json!({"Error": {"Code": code, "Message": message}}))
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

async fn authorized(state: &AppState, headers: &HeaderMap) -> bool {
    match bearer(headers) {
        Some(token) => state.sessions.read().await.contains(token),
        None => false,
    }
}

async fn login(State(state): State<AppState>, Json(input): Json<Login>) -> Response {
    if input.user != DEMO_USER || input.password != DEMO_PASSWORD {
        return error(StatusCode::OK, 403, "invalid credentials");
    }
    let token = Uuid::new_v4().to_string();
    state.sessions.write().await.insert(token.clone());
    tracing::info!(user = %input.user, "login");
    envelope(
        StatusCode::OK,
        json!({
            "Token": token,
            "Message": format!("Welcome back, {}", input.user),
            "Payload": {"User": input.user},
        }),
    )
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = bearer(&headers) {
        state.sessions.write().await.remove(token);
    }
    envelope(StatusCode::OK, json!({"Message": "Signed out", "Payload": true}))
}

async fn profile(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if !authorized(&state, &headers).await {
        return error(StatusCode::UNAUTHORIZED, 401, "session expired");
    }
    envelope(StatusCode::OK, json!({"Payload": {"User": DEMO_USER}}))
}

async fn echo(body: Bytes) -> Response {
    let payload = serde_json::from_slice::<Value>(&body).unwrap_or(Value::Null);
    envelope(StatusCode::OK, json!({ "Payload": payload }))
}

async fn version() -> Response {
    envelope(StatusCode::OK, json!({"Version": "1.0.0"}))
}

async fn counter(State(state): State<AppState>) -> Response {
    let hits = state.hits.fetch_add(1, Ordering::SeqCst) + 1;
    envelope(StatusCode::OK, json!({"Payload": {"Hits": hits}}))
}

async fn broken() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn stream(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<StreamLines>,
) -> Response {
    if !authorized(&state, &headers).await {
        return error(StatusCode::UNAUTHORIZED, 401, "session expired");
    }
    let events = input
        .lines
        .into_iter()
        .map(|line| Ok::<_, Infallible>(format!("data: {line}\n\n")));
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .body(Body::from_stream(futures::stream::iter(events)))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
