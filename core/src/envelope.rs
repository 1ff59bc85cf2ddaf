//! Response envelope decoding and the buffered interpretation policy.
//!
//! # Design
//! A backend response is a JSON object that may carry any subset of `Error`,
//! `Token`, `Message` and `Payload`. Rather than probing fields one by one,
//! `Envelope::decode` folds the body into a sum type where `Error` always
//! wins. `Token` and `Message` are side-channel signals that ride along with
//! a successful result. A body with no `Payload` field is itself the payload.
//!
//! Fields count only when truthy: `null`, `false`, `0` and `""` read as
//! absent, so `{"Error": false}` is not an error and `{"Payload": null}`
//! resolves to the whole body.
//!
//! The interpreter then applies the side effects in order: reset the session
//! on an unauthorized error, store a refreshed token, forward a notice to the
//! user, and hand back the payload.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::error::{ApiError, UNAUTHORIZED};
use crate::http::{ByteStream, StreamResponse};
use crate::notify::Notifier;
use crate::session::{ClientEvent, Session};

const ERROR: &str = "Error";
const TOKEN: &str = "Token";
const MESSAGE: &str = "Message";
const PAYLOAD: &str = "Payload";

/// The `Error` object of an envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(rename = "Code", default, deserialize_with = "lenient_code")]
    pub code: i64,
    #[serde(rename = "Message", default)]
    pub message: String,
    /// Any other fields the server attached.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ErrorBody {
    /// Lenient conversion: a malformed `Error` value still counts as an error,
    /// with code 0 and its JSON text as the message.
    fn from_value(value: Value) -> Self {
        match value {
            Value::String(message) => Self {
                code: 0,
                message,
                extra: Map::new(),
            },
            other => serde_json::from_value(other.clone()).unwrap_or_else(|_| Self {
                code: 0,
                message: other.to_string(),
                extra: Map::new(),
            }),
        }
    }
}

/// Accepts `401`, `401.0` and `"401"` alike. Anything else is code 0.
fn lenient_code<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let code = match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    };
    Ok(code)
}

/// JSON truthiness: `null`, `false`, zero and the empty string are falsy.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// A decoded response envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Failure(ErrorBody),
    Success {
        token: Option<String>,
        message: Option<String>,
        payload: Value,
    },
}

impl Envelope {
    /// Classify a parsed response body. A truthy `Error` short-circuits every
    /// other field. Non-object bodies are bare payloads.
    pub fn decode(body: Value) -> Self {
        let Value::Object(mut map) = body else {
            return Envelope::Success {
                token: None,
                message: None,
                payload: body,
            };
        };
        if let Some(error) = map.get(ERROR).filter(|e| truthy(e)) {
            return Envelope::Failure(ErrorBody::from_value(error.clone()));
        }
        let token = non_empty_str(&map, TOKEN);
        let message = non_empty_str(&map, MESSAGE);
        let payload = if map.get(PAYLOAD).is_some_and(truthy) {
            map.remove(PAYLOAD).unwrap_or_default()
        } else {
            Value::Object(map)
        };
        Envelope::Success {
            token,
            message,
            payload,
        }
    }
}

fn non_empty_str(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Parse a response body. Empty, malformed and `null` bodies are all absent.
pub fn parse_body(body: &str) -> Option<Value> {
    serde_json::from_str::<Value>(body)
        .ok()
        .filter(|value| !value.is_null())
}

/// Applies envelope semantics against the client's collaborators.
pub(crate) struct Interpreter<'a> {
    pub session: &'a dyn Session,
    pub notifier: &'a dyn Notifier,
    pub events: &'a broadcast::Sender<ClientEvent>,
}

impl Interpreter<'_> {
    /// Interpret a buffered response.
    pub fn interpret(&self, status: u16, body: &str) -> Result<Value, ApiError> {
        let Some(data) = parse_body(body) else {
            if status != 200 {
                return Err(ApiError::Transport { status });
            }
            return Err(ApiError::Deserialization(format!(
                "response body is not a JSON envelope: {:?}",
                truncate(body)
            )));
        };
        match Envelope::decode(data) {
            Envelope::Failure(error) => Err(self.reject(error)),
            Envelope::Success {
                token,
                message,
                payload,
            } => {
                if let Some(token) = token {
                    info!("session token refreshed by server");
                    self.session.update_token(&token);
                    // Sending only fails when nobody subscribed.
                    let _ = self.events.send(ClientEvent::TokenRefreshed);
                }
                if let Some(message) = message {
                    self.notifier.notify(&message);
                }
                Ok(payload)
            }
        }
    }

    /// Gate a streaming response: a 200 with a body passes through, anything
    /// else is read as a buffered error envelope.
    pub async fn open(&self, response: StreamResponse) -> Result<ByteStream, ApiError> {
        let status = response.status;
        let body = match response.body {
            Some(body) if status == 200 => return Ok(body),
            body => body,
        };
        let text = StreamResponse { status, body }.text().await?;
        if let Some(Envelope::Failure(error)) = parse_body(&text).map(Envelope::decode) {
            return Err(self.reject(error));
        }
        Err(ApiError::Transport { status })
    }

    /// Turn an envelope error into `ApiError`, resetting the session first
    /// when the server rejected our credentials.
    pub fn reject(&self, error: ErrorBody) -> ApiError {
        let message = self.notifier.format_error(&error);
        if error.code == UNAUTHORIZED {
            warn!(reason = %message, "session rejected by server, resetting");
            self.session.reset();
            let _ = self.events.send(ClientEvent::SessionExpired);
        } else {
            warn!(code = error.code, reason = %message, "server returned an error envelope");
        }
        ApiError::Envelope {
            code: error.code,
            message,
        }
    }
}

fn truncate(body: &str) -> &str {
    match body.char_indices().nth(64) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
