//! Request dispatcher for the envelope API.
//!
//! # Design
//! `HttpClient` keeps the host-does-IO split: `build_request` produces a
//! plain `HttpRequest` and `parse_response` interprets a plain `HttpResponse`.
//! The async operations (`request`, `request_stream`, `rcache`) glue those
//! halves to a `Transport`. Session, storage and notification collaborators
//! are injected at construction, so the composition root decides what is
//! shared between clients.
//!
//! Within one call, headers and body are built before dispatch and the
//! envelope is interpreted before the call returns. Nothing orders separate
//! calls, nothing coalesces identical concurrent cache misses, and there is
//! no timeout: a hung transport blocks the calling task.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

use crate::cache::{CacheLayer, MemoryStorage, Storage};
use crate::config::ClientConfig;
use crate::envelope::Interpreter;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, RequestDescriptor};
use crate::notify::{LogNotifier, Notifier};
use crate::session::{ClientEvent, MemorySession, Session};
use crate::stream;
use crate::transport::{ReqwestTransport, Transport};

const EVENT_CAPACITY: usize = 16;

/// Authenticated client for an envelope-speaking backend.
pub struct HttpClient<T = ReqwestTransport> {
    config: ClientConfig,
    transport: T,
    session: Arc<dyn Session>,
    notifier: Arc<dyn Notifier>,
    cache: CacheLayer,
    events: broadcast::Sender<ClientEvent>,
}

impl<T: Transport> HttpClient<T> {
    /// Client with default collaborators: an empty in-memory session,
    /// in-memory cache storage and notices reported through `tracing`.
    pub fn new(config: ClientConfig, transport: T) -> Self {
        Self::builder(config, transport).build()
    }

    pub fn builder(config: ClientConfig, transport: T) -> HttpClientBuilder<T> {
        HttpClientBuilder {
            config,
            transport,
            session: None,
            storage: None,
            notifier: None,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<dyn Session> {
        &self.session
    }

    /// Receive session lifecycle events. `SessionExpired` is the host's cue
    /// to discard its state and log in again.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    /// Build the wire request for `descriptor`. Caller headers replace the
    /// defaults on a case-insensitive name match. The query, when present,
    /// is sent verbatim as the JSON body.
    pub fn build_request(&self, descriptor: &RequestDescriptor) -> Result<HttpRequest, ApiError> {
        let mut headers = vec![
            ("Accept".to_string(), "application/json".to_string()),
            (
                "Authorization".to_string(),
                format!("Bearer {}", self.session.token()),
            ),
            ("Content-Type".to_string(), "application/json".to_string()),
        ];
        for (name, value) in &descriptor.header {
            match headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
                Some(slot) => slot.1 = value.clone(),
                None => headers.push((name.clone(), value.clone())),
            }
        }
        let body = descriptor
            .query
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(HttpRequest {
            method: descriptor.method,
            path: self.config.endpoint(&descriptor.url),
            headers,
            body,
        })
    }

    /// Interpret a buffered response envelope, applying its side effects.
    pub fn parse_response(&self, response: HttpResponse) -> Result<Value, ApiError> {
        self.interpreter().interpret(response.status, &response.body)
    }

    /// Send `descriptor` and return the envelope payload.
    pub async fn request(&self, descriptor: RequestDescriptor) -> Result<Value, ApiError> {
        let request = self.build_request(&descriptor)?;
        debug!(method = %descriptor.method, url = %descriptor.url, "dispatching request");
        let response = self.transport.send(request).await?;
        self.parse_response(response)
    }

    /// Send `descriptor` and feed each streamed segment to `on_segment` until
    /// the server closes the body. Never yields a payload.
    pub async fn request_stream<F>(&self, descriptor: RequestDescriptor, on_segment: F) -> Result<(), ApiError>
    where
        F: FnMut(&str),
    {
        let request = self.build_request(&descriptor)?;
        debug!(method = %descriptor.method, url = %descriptor.url, "opening stream");
        let response = self.transport.open_stream(request).await?;
        let body = self.interpreter().open(response).await?;
        stream::drain(body, on_segment).await
    }

    /// Like `request`, but serve from the cache while an earlier result for
    /// the same method, url and query is younger than `expiry`. Errors are
    /// never cached.
    pub async fn rcache(&self, descriptor: RequestDescriptor, expiry: Duration) -> Result<Value, ApiError> {
        if let Some(hit) = self.cache.get(&descriptor).await? {
            debug!(url = %descriptor.url, "cache hit");
            return Ok(hit);
        }
        debug!(url = %descriptor.url, "cache miss");
        let payload = self.request(descriptor.clone()).await?;
        self.cache.set(&descriptor, payload.clone(), expiry).await?;
        Ok(payload)
    }

    pub async fn get(&self, url: &str, query: Option<Value>) -> Result<Value, ApiError> {
        self.request(descriptor(HttpMethod::Get, url, query)).await
    }

    pub async fn post(&self, url: &str, body: Value) -> Result<Value, ApiError> {
        self.request(descriptor(HttpMethod::Post, url, Some(body))).await
    }

    pub async fn patch(&self, url: &str, body: Value) -> Result<Value, ApiError> {
        self.request(descriptor(HttpMethod::Patch, url, Some(body))).await
    }

    pub async fn delete(&self, url: &str, query: Option<Value>) -> Result<Value, ApiError> {
        self.request(descriptor(HttpMethod::Delete, url, query)).await
    }

    fn interpreter(&self) -> Interpreter<'_> {
        Interpreter {
            session: self.session.as_ref(),
            notifier: self.notifier.as_ref(),
            events: &self.events,
        }
    }
}

fn descriptor(method: HttpMethod, url: &str, query: Option<Value>) -> RequestDescriptor {
    RequestDescriptor {
        query,
        ..RequestDescriptor::new(method, url)
    }
}

/// Wires collaborators into an `HttpClient`.
pub struct HttpClientBuilder<T> {
    config: ClientConfig,
    transport: T,
    session: Option<Arc<dyn Session>>,
    storage: Option<Arc<dyn Storage>>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl<T: Transport> HttpClientBuilder<T> {
    pub fn session(mut self, session: Arc<dyn Session>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn build(self) -> HttpClient<T> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        HttpClient {
            config: self.config,
            transport: self.transport,
            session: self
                .session
                .unwrap_or_else(|| Arc::new(MemorySession::default())),
            notifier: self.notifier.unwrap_or_else(|| Arc::new(LogNotifier)),
            cache: CacheLayer::new(
                self.storage
                    .unwrap_or_else(|| Arc::new(MemoryStorage::new())),
            ),
            events,
        }
    }
}
