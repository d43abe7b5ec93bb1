//! Key-value store client seam.
//!
//! The cookie store only talks to its backing store through [`KvClient`], which
//! covers the handful of hash and keyspace commands it consumes. Connection
//! handling, authentication and retries belong to the implementation.
//!
//! Implementations:
//! - [`InMemoryKv`]: process-local store with glob matching and cursor paging.
//! - `RedisKv` (feature `redis-backend`): adapter over a multiplexed Redis connection.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;

mod glob;
mod in_memory;
#[cfg(feature = "redis-backend")]
mod redis;

pub use glob::glob_match;
pub use in_memory::{InMemoryKv, DEFAULT_CURSOR_LIMIT};
#[cfg(feature = "redis-backend")]
pub use self::redis::RedisKv;

/// Cursor value that both starts a scan and marks its completion.
pub const SCAN_START: u64 = 0;

/// One page returned by [`KvClient::scan`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    /// Cursor for the next request. [`SCAN_START`] when the traversal is complete.
    pub cursor: u64,
    /// Keys matching the pattern in this page. May be empty even when more pages follow.
    pub keys: Vec<String>,
}

/// Object-safe async client for a hash-capable key-value store.
#[async_trait]
pub trait KvClient: Send + Sync {
    /// Reads one field of a hash. Missing key or field yields `None`.
    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>>;

    /// Sets one field of a hash, creating the hash when needed.
    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<()>;

    /// Deletes one field of a hash. Absent fields are ignored.
    async fn hdel(&self, key: &str, field: &str) -> Result<()>;

    /// Returns every field of a hash. Missing keys yield an empty map.
    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>>;

    /// Deletes all given keys.
    async fn del(&self, keys: &[String]) -> Result<()>;

    /// Requests the next page of keys matching the glob `pattern`, starting at `cursor`.
    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<ScanPage>;
}
