//! Cookie store capability contract.
//!
//! A **cookie store** is the persistence layer a cookie jar delegates to. The jar
//! owns cookie parsing and matching; the store only has to answer point lookups,
//! domain/path aware enumeration, upserts and deletions.
//!
//! This module exports one implementation:
//! - [`KvCookieStore`]: keeps one hash per (domain, path) in a shared key-value
//!   store, so cookies survive restarts and can be shared between processes.
//!
//! ## Design notes
//! - Implementations must be `Send + Sync`; every method takes `&self`.
//! - Enumerating operations may end early (timeout, store failure). They return a
//!   [`Listing`] or [`ScanStatus`] that tells a complete answer from a partial one
//!   instead of failing the whole call.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use gosub_kv_cookies::cookies::{Cookie, CookieStore, KvCookieStore};
//! use gosub_kv_cookies::kv::InMemoryKv;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = KvCookieStore::new(Arc::new(InMemoryKv::new()));
//! store.put_cookie(&Cookie::new("sid", "abc", "example.com", "/")).await?;
//!
//! let found = store.find_cookies("www.example.com", "/account", false).await?;
//! assert!(found.is_complete());
//! assert_eq!(found.cookies.len(), 1);
//! # Ok(()) }
//! ```
mod kv;

use async_trait::async_trait;

use crate::cookies::Cookie;
use crate::errors::CookieStoreError;
use crate::scan::ScanStatus;

pub use kv::KvCookieStore;

/// Cookies returned by an enumerating operation and whether the enumeration finished.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    /// Matching cookies, ordered by ascending creation index.
    pub cookies: Vec<Cookie>,
    /// `Complete` when every scan behind this listing ran to the end.
    pub status: ScanStatus,
}

impl Listing {
    pub fn empty() -> Self {
        Self {
            cookies: Vec::new(),
            status: ScanStatus::Complete,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status.is_complete()
    }

    pub fn into_cookies(self) -> Vec<Cookie> {
        self.cookies
    }
}

/// Storage backend used by a cookie jar.
#[async_trait]
pub trait CookieStore: Send + Sync {
    /// Returns the cookie `name` stored for exactly `(domain, path)`, if any.
    async fn find_cookie(&self, domain: &str, path: &str, name: &str) -> Result<Option<Cookie>, CookieStoreError>;

    /// Returns every cookie that may match a request for `domain` and `path`.
    ///
    /// Parent domains down to the registrable domain and all parent paths are
    /// searched. `allow_special_use` admits special-use domains such as `localhost`.
    /// An empty `domain` yields an empty listing without touching the store.
    async fn find_cookies(&self, domain: &str, path: &str, allow_special_use: bool) -> Result<Listing, CookieStoreError>;

    /// Inserts or overwrites `cookie` in the bucket of its domain and path.
    async fn put_cookie(&self, cookie: &Cookie) -> Result<(), CookieStoreError>;

    /// Replaces `old` with `new`. Always writes `new`, even if nothing changed.
    async fn update_cookie(&self, old: &Cookie, new: &Cookie) -> Result<(), CookieStoreError>;

    /// Removes the cookie `name` from the `(domain, path)` bucket. Absent cookies are ignored.
    async fn remove_cookie(&self, domain: &str, path: &str, name: &str) -> Result<(), CookieStoreError>;

    /// Removes the `(domain, path)` bucket, or every bucket of `domain` when `path` is
    /// empty or `"*"`. A `domain` of `"*"` matches every domain.
    async fn remove_cookies(&self, domain: &str, path: &str) -> Result<ScanStatus, CookieStoreError>;

    /// Removes every cookie of this store.
    async fn remove_all_cookies(&self) -> Result<ScanStatus, CookieStoreError>;

    /// Returns every cookie of this store.
    async fn get_all_cookies(&self) -> Result<Listing, CookieStoreError>;
}
