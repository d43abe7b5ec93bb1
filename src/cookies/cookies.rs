//! Cookie record.
//!
//! [`Cookie`] is the unit the store persists: one cookie per hash field, keyed by
//! its name inside the bucket addressed by its domain and path.
//!
//! Every cookie carries a `creation_index` drawn from a process-wide counter when
//! it is created with [`Cookie::new`]. Listings are ordered by that index so that
//! output does not depend on the order the key-value store happens to return
//! buckets in. The index is serialized with the cookie and keeps its value when
//! read back.
//!
//! ```rust
//! use gosub_kv_cookies::cookies::Cookie;
//!
//! let first = Cookie::new("session", "abc123", "example.com", "/");
//! let second = Cookie::new("theme", "dark", "example.com", "/")
//!     .with_secure(true)
//!     .with_http_only(true);
//! assert!(first.creation_index < second.creation_index);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

static COOKIES_CREATED: AtomicU64 = AtomicU64::new(0);

fn next_creation_index() -> u64 {
    COOKIES_CREATED.fetch_add(1, Ordering::Relaxed)
}

/// A cookie as stored/serialized by the cookie store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    /// Cookie name (case-sensitive). Unique within a (domain, path) bucket.
    pub name: String,

    /// Raw cookie value (not URL-decoded).
    pub value: String,

    /// Domain the cookie is stored under, already canonicalized by the caller.
    pub domain: String,

    /// Path the cookie is stored under (e.g. `"/"`).
    pub path: String,

    /// Expiration timestamp, if any. Session cookies have `None`.
    ///
    /// Prefer **RFC 3339** (`YYYY-MM-DDThh:mm:ssZ`) for portability.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<String>,

    /// If `true`, cookie is sent only over HTTPS.
    #[serde(default)]
    pub secure: bool,

    /// If `true`, cookie is hidden from client-side scripts.
    #[serde(default)]
    pub http_only: bool,

    /// SameSite policy (`"Strict"`, `"Lax"`, or `"None"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,

    /// If `true`, the cookie only matches its exact domain, not subdomains.
    #[serde(default)]
    pub host_only: bool,

    /// Creation order within the process that created the cookie.
    #[serde(default)]
    pub creation_index: u64,
}

impl Cookie {
    /// Creates a cookie with a fresh creation index and no flags set.
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        domain: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: path.into(),
            expires: None,
            secure: false,
            http_only: false,
            same_site: None,
            host_only: false,
            creation_index: next_creation_index(),
        }
    }

    pub fn with_secure(mut self, on: bool) -> Self {
        self.secure = on;
        self
    }

    pub fn with_http_only(mut self, on: bool) -> Self {
        self.http_only = on;
        self
    }

    pub fn with_host_only(mut self, on: bool) -> Self {
        self.host_only = on;
        self
    }

    pub fn with_expires<S: Into<String>>(mut self, expires: S) -> Self {
        self.expires = Some(expires.into());
        self
    }

    pub fn with_same_site<S: Into<String>>(mut self, same_site: S) -> Self {
        self.same_site = Some(same_site.into());
        self
    }
}
