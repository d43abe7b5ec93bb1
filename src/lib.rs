//! Cookie persistence on top of a shared key-value store.
//!
//! Cookies are stored one hash per (domain, path) under a per-jar namespace, so
//! several processes (or several jars) can share one store instance. Lookups walk
//! the keyspace with cursor-based scans that are bounded in time and report
//! whether they ran to completion.
//!
//! - [`cookies`]: cookie record, codec, key naming, permutations and the store.
//! - [`scan`]: the paginated, time-bounded scanner.
//! - [`kv`]: the key-value client seam and its backends.
//! - [`config`]: store configuration.
//! - [`errors`]: error types.

pub mod config;
pub mod cookies;
pub mod errors;
pub mod kv;
pub mod scan;

pub use config::StoreConfig;
pub use cookies::{Cookie, CookieStore, KvCookieStore, Listing};
pub use errors::{ConfigError, CookieStoreError};
pub use scan::{ScanStatus, Truncation};
