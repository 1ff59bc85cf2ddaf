//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! Requests and responses are plain data. `HttpClient::build_request` turns a
//! caller's `RequestDescriptor` into an `HttpRequest`, a `Transport` executes
//! it, and the resulting `HttpResponse` (or `StreamResponse`) is handed back
//! for envelope interpretation. Keeping the wire types free of any HTTP
//! library lets tests drive the client with scripted responses.

use std::fmt;

use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

/// HTTP methods the backend accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Delete,
    Post,
    Patch,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the caller wants to send: method, API-relative url, an opaque query
/// value that becomes the JSON body, and extra headers.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub method: HttpMethod,
    pub url: String,
    pub query: Option<Value>,
    pub header: Vec<(String, String)>,
}

impl RequestDescriptor {
    pub fn new(method: HttpMethod, url: &str) -> Self {
        Self {
            method,
            url: url.to_string(),
            query: None,
            header: Vec::new(),
        }
    }

    pub fn get(url: &str) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn delete(url: &str) -> Self {
        Self::new(HttpMethod::Delete, url)
    }

    pub fn post(url: &str) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    pub fn patch(url: &str) -> Self {
        Self::new(HttpMethod::Patch, url)
    }

    pub fn with_query(mut self, query: Value) -> Self {
        self.query = Some(query);
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.header.push((name.to_string(), value.to_string()));
        self
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A fully buffered HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Incremental response body.
pub type ByteStream = BoxStream<'static, Result<Bytes, ApiError>>;

/// A response whose body is consumed as it arrives.
pub struct StreamResponse {
    pub status: u16,
    pub body: Option<ByteStream>,
}

impl StreamResponse {
    /// Read the remaining body to the end as lossy UTF-8. An absent body reads
    /// as the empty string.
    pub async fn text(self) -> Result<String, ApiError> {
        let Some(mut body) = self.body else {
            return Ok(String::new());
        };
        let mut buf = Vec::new();
        while let Some(chunk) = body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

impl fmt::Debug for StreamResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamResponse")
            .field("status", &self.status)
            .field("body", &self.body.as_ref().map(|_| "<stream>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn descriptor_builders_set_method_and_url() {
        let desc = RequestDescriptor::patch("/user/1")
            .with_query(json!({"Name": "x"}))
            .with_header("X-Trace", "abc");
        assert_eq!(desc.method, HttpMethod::Patch);
        assert_eq!(desc.url, "/user/1");
        assert_eq!(desc.query, Some(json!({"Name": "x"})));
        assert_eq!(desc.header, vec![("X-Trace".to_string(), "abc".to_string())]);
    }

    #[test]
    fn method_serializes_uppercase() {
        assert_eq!(serde_json::to_value(HttpMethod::Delete).unwrap(), json!("DELETE"));
        let method: HttpMethod = serde_json::from_value(json!("PATCH")).unwrap();
        assert_eq!(method, HttpMethod::Patch);
        assert_eq!(HttpMethod::Get.to_string(), "GET");
    }

    #[test]
    fn header_lookup_ignores_case() {
        let req = HttpRequest {
            method: HttpMethod::Get,
            path: "/api/x".to_string(),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: None,
        };
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.header("accept"), None);
    }

    #[tokio::test]
    async fn stream_response_text_collects_chunks() {
        let chunks: Vec<Result<Bytes, ApiError>> =
            vec![Ok(Bytes::from_static(b"{\"a\"")), Ok(Bytes::from_static(b":1}"))];
        let resp = StreamResponse {
            status: 500,
            body: Some(futures::stream::iter(chunks).boxed()),
        };
        assert_eq!(resp.text().await.unwrap(), "{\"a\":1}");
    }

    #[tokio::test]
    async fn stream_response_without_body_is_empty() {
        let resp = StreamResponse { status: 502, body: None };
        assert_eq!(resp.text().await.unwrap(), "");
    }
}
