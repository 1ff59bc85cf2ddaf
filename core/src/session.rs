//! Bearer-token session collaborator.
//!
//! # Design
//! The client never owns the token. It reads it through `Session` on every
//! request and writes back whatever the server hands out, so one session
//! shared behind an `Arc` keeps every client in the process in sync.

use std::sync::{PoisonError, RwLock};

/// Holder of the current bearer token.
pub trait Session: Send + Sync {
    /// The token sent as `Authorization: Bearer <token>`.
    fn token(&self) -> String;

    /// Replace the token with one refreshed by the server.
    fn update_token(&self, token: &str);

    /// Drop the token after the server rejected it.
    fn reset(&self);
}

/// Lifecycle signals published by `HttpClient`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientEvent {
    /// The server answered with an unauthorized envelope. The session has
    /// been reset and the host should start a fresh login.
    SessionExpired,
    /// The server rotated the bearer token.
    TokenRefreshed,
}

/// In-process session.
#[derive(Debug, Default)]
pub struct MemorySession {
    token: RwLock<String>,
}

impl MemorySession {
    pub fn new(token: &str) -> Self {
        Self {
            token: RwLock::new(token.to_string()),
        }
    }
}

impl Session for MemorySession {
    fn token(&self) -> String {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update_token(&self, token: &str) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token.to_string();
    }

    fn reset(&self) {
        self.token
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
