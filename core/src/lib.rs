//! Async client core for a JSON/event-stream backend behind a bearer-token
//! session.
//!
//! # Overview
//! Every response arrives wrapped in an envelope that may carry an error, a
//! refreshed token, a user-facing notice and the actual payload. This crate
//! builds authenticated requests, interprets those envelopes, decodes
//! streamed responses segment by segment and caches payloads by request
//! fingerprint.
//!
//! # Design
//! - `HttpClient` splits each call into `build_request` (plain-data request)
//!   and `parse_response` (plain-data response), with a `Transport` doing the
//!   actual I/O in between.
//! - Session, cache storage and user notification are traits injected at
//!   construction; the crate ships in-memory and `tracing` defaults.
//! - An unauthorized envelope resets the session and publishes
//!   `ClientEvent::SessionExpired` instead of restarting anything itself.
//! - `encode_query` is a standalone utility. Request queries travel as JSON
//!   bodies, not query strings.

pub mod cache;
pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod http;
pub mod notify;
pub mod query;
pub mod session;
pub mod stream;
pub mod transport;

pub use cache::{CacheLayer, Fingerprint, MemoryStorage, Storage};
pub use client::{HttpClient, HttpClientBuilder};
pub use config::ClientConfig;
pub use envelope::{Envelope, ErrorBody};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, RequestDescriptor, StreamResponse};
pub use notify::{LogNotifier, Notifier};
pub use query::encode_query;
pub use session::{ClientEvent, MemorySession, Session};
pub use transport::{ReqwestTransport, Transport};
