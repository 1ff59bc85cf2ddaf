//! Error types for the envelope client.
//!
//! # Design
//! The envelope protocol distinguishes two server-side failures: a non-200
//! response that carries no parseable envelope (`Transport`), and an
//! envelope whose `Error` field is set (`Envelope`). Everything else that can
//! go wrong on the client side (the network, serialization, cache storage)
//! gets its own variant so callers can tell a refused connection apart from
//! a rejected request.

use thiserror::Error;

/// Envelope error code that forces re-authentication.
pub const UNAUTHORIZED: i64 = 401;

/// Errors returned by `HttpClient` operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-200 status with no parseable envelope body.
    #[error("HTTP Error: {status}")]
    Transport { status: u16 },

    /// The envelope's `Error` field was set. `message` is already formatted
    /// for display.
    #[error("{message}")]
    Envelope { code: i64, message: String },

    /// The request never produced a response, or its body could not be read.
    #[error("network failure: {0}")]
    Network(String),

    /// The request body could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A 200 response whose body is not a JSON envelope.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The cache storage collaborator failed.
    #[error("cache storage failure: {0}")]
    Storage(String),

    /// Client configuration is missing or malformed.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ApiError {
    /// True for the envelope error that reset the session.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Envelope { code, .. } if *code == UNAUTHORIZED)
    }

    /// HTTP status carried by a `Transport` error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Transport { status } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_displays_status() {
        let err = ApiError::Transport { status: 500 };
        assert_eq!(err.to_string(), "HTTP Error: 500");
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn envelope_error_displays_formatted_message() {
        let err = ApiError::Envelope {
            code: 400,
            message: "bad input (400)".to_string(),
        };
        assert_eq!(err.to_string(), "bad input (400)");
        assert!(!err.is_unauthorized());
        assert_eq!(err.status(), None);
    }

    #[test]
    fn unauthorized_is_detected_by_code() {
        let err = ApiError::Envelope {
            code: UNAUTHORIZED,
            message: String::new(),
        };
        assert!(err.is_unauthorized());
        assert!(!ApiError::Transport { status: 401 }.is_unauthorized());
    }
}
