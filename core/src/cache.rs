//! Request-keyed payload cache.
//!
//! # Design
//! `CacheLayer` only derives keys; physical storage and expiry belong to the
//! `Storage` collaborator. The fingerprint covers method, url and query and
//! nothing else, so cached payloads are shared across sessions.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use tokio::time::Instant;

use crate::error::ApiError;
use crate::http::RequestDescriptor;

/// Cache key derived from a request's method, url and query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(descriptor: &RequestDescriptor) -> Self {
        let query = descriptor
            .query
            .as_ref()
            .map_or_else(|| "null".to_string(), Value::to_string);
        Self(format!("{} {} {}", descriptor.method, descriptor.url, query))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Backing store for cached payloads. Implementations own expiry and eviction.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn get(&self, key: &Fingerprint) -> Result<Option<Value>, ApiError>;

    async fn set(&self, key: &Fingerprint, value: Value, expiry: Duration) -> Result<(), ApiError>;
}

#[derive(Debug)]
struct CacheEntry {
    payload: Value,
    expires_at: Instant,
}

/// In-process storage with per-entry expiry. Expired entries are dropped
/// lazily on the next read of their key.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: DashMap<Fingerprint, CacheEntry>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries held, expired or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &Fingerprint) -> Result<Option<Value>, ApiError> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > now {
                return Ok(Some(entry.payload.clone()));
            }
        }
        self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        Ok(None)
    }

    async fn set(&self, key: &Fingerprint, value: Value, expiry: Duration) -> Result<(), ApiError> {
        let entry = CacheEntry {
            payload: value,
            expires_at: Instant::now() + expiry,
        };
        self.entries.insert(key.clone(), entry);
        Ok(())
    }
}

/// Looks up and stores payloads by request fingerprint.
#[derive(Clone)]
pub struct CacheLayer {
    storage: Arc<dyn Storage>,
}

impl CacheLayer {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn get(&self, descriptor: &RequestDescriptor) -> Result<Option<Value>, ApiError> {
        self.storage.get(&Fingerprint::of(descriptor)).await
    }

    pub async fn set(
        &self,
        descriptor: &RequestDescriptor,
        payload: Value,
        expiry: Duration,
    ) -> Result<(), ApiError> {
        self.storage
            .set(&Fingerprint::of(descriptor), payload, expiry)
            .await
    }
}

impl fmt::Debug for CacheLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheLayer").finish_non_exhaustive()
    }
}
