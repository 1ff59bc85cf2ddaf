//! Network transport seam.
//!
//! # Design
//! `HttpClient` never talks to the network itself. A `Transport` executes the
//! plain-data `HttpRequest` it builds and returns either a buffered
//! `HttpResponse` or a `StreamResponse`. Status codes are returned as data,
//! never as errors, so envelope interpretation stays in one place.
//! `ReqwestTransport` is the production implementation; tests script their own.

use async_trait::async_trait;
use futures::StreamExt;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, StreamResponse};

#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute `request` and buffer the whole body.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;

    /// Execute `request` and hand back the body as it arrives.
    async fn open_stream(&self, request: HttpRequest) -> Result<StreamResponse, ApiError>;
}

/// `Transport` backed by a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn execute(&self, request: HttpRequest) -> Result<reqwest::Response, ApiError> {
        let mut builder = self.client.request(method(request.method), &request.path);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        builder.send().await.map_err(network)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let response = self.execute(request).await?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(network)?;
        Ok(HttpResponse { status, body })
    }

    async fn open_stream(&self, request: HttpRequest) -> Result<StreamResponse, ApiError> {
        let response = self.execute(request).await?;
        let status = response.status().as_u16();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(network))
            .boxed();
        Ok(StreamResponse {
            status,
            body: Some(body),
        })
    }
}

fn method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Delete => reqwest::Method::DELETE,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Patch => reqwest::Method::PATCH,
    }
}

fn network(err: reqwest::Error) -> ApiError {
    ApiError::Network(err.to_string())
}
