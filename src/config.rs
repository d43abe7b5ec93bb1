//! Cookie store configuration.
//!
//! `StoreConfig` controls how a [`KvCookieStore`](crate::cookies::KvCookieStore)
//! addresses and scans the key-value store: which namespace it lives in, how many
//! keys a single scan page asks for, how long one scan may run and how many scans
//! a lookup may run side by side.
//!
//! `StoreConfig` provides defaults via [`Default`], a fluent
//! [`StoreConfig::builder()`] with validation, and can be deserialized from JSON.
//!
//! # Examples
//!
//! ## Use defaults
//! ```rust
//! use gosub_kv_cookies::config::StoreConfig;
//! let cfg = StoreConfig::default();
//! assert_eq!(cfg.store_id, "default");
//! assert_eq!(cfg.page_size, 100);
//! ```
//!
//! ## Customize with the builder
//! ```rust
//! use std::time::Duration;
//! use gosub_kv_cookies::config::StoreConfig;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = StoreConfig::builder()
//!     .store_id("crawler-1")
//!     .page_size(250)
//!     .scan_timeout(Duration::from_secs(3))
//!     .max_concurrent_scans(4)
//!     .build()?; // returns Result<StoreConfig, ConfigError>
//! # Ok(()) }
//! ```
//!
//! ## Load from JSON
//! ```rust
//! use gosub_kv_cookies::config::StoreConfig;
//! let cfg = StoreConfig::from_json(r#"{ "store_id": "shared", "scan_timeout_ms": 2500 }"#).unwrap();
//! assert_eq!(cfg.store_id, "shared");
//! assert_eq!(cfg.page_size, 100);
//! ```
//!
//! # Fields (summary)
//! - `store_id`: Namespace separating independent jars in one store (default: `"default"`).
//! - `page_size`: `COUNT` hint sent with every scan request (default: 100).
//! - `scan_timeout`: Wall-clock ceiling for a single scan (default: 10s).
//! - `max_concurrent_scans`: Upper bound of scans a single lookup runs at once (default: 16).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

pub const DEFAULT_STORE_ID: &str = "default";
pub const DEFAULT_PAGE_SIZE: usize = 100;
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_CONCURRENT_SCANS: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Namespace of this cookie jar inside the key-value store.
    pub store_id: String,
    /// Number of keys requested per scan page. The store treats it as a hint only.
    pub page_size: usize,
    /// A scan that runs longer than this stops and reports a partial result.
    #[serde(rename = "scan_timeout_ms", with = "duration_ms")]
    pub scan_timeout: Duration,
    /// Maximum number of scans run concurrently by one lookup.
    pub max_concurrent_scans: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_id: DEFAULT_STORE_ID.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            scan_timeout: DEFAULT_SCAN_TIMEOUT,
            max_concurrent_scans: DEFAULT_MAX_CONCURRENT_SCANS,
        }
    }
}

impl StoreConfig {
    pub fn builder() -> StoreConfigBuilder {
        StoreConfigBuilder::default()
    }

    /// Parses and validates a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let cfg: StoreConfig = serde_json::from_str(json)?;
        validate(&cfg)?;
        Ok(cfg)
    }
}

/// Builder for [`StoreConfig`].
#[derive(Debug, Clone, Default)]
pub struct StoreConfigBuilder {
    inner: StoreConfig,
}

impl StoreConfigBuilder {
    #[inline]
    fn map(mut self, f: impl FnOnce(&mut StoreConfig)) -> Self {
        f(&mut self.inner);
        self
    }

    pub fn store_id<S: Into<String>>(self, id: S) -> Self { self.map(|c| c.store_id = id.into()) }
    pub fn page_size(self, n: usize) -> Self { self.map(|c| c.page_size = n) }
    pub fn scan_timeout(self, timeout: Duration) -> Self { self.map(|c| c.scan_timeout = timeout) }
    pub fn max_concurrent_scans(self, n: usize) -> Self { self.map(|c| c.max_concurrent_scans = n) }

    /// Apply multiple changes in one go.
    pub fn with(self, f: impl FnOnce(&mut StoreConfig)) -> Self { self.map(f) }

    /// Validate and build the final config.
    pub fn build(self) -> Result<StoreConfig, ConfigError> {
        validate(&self.inner)?;
        Ok(self.inner)
    }
}

fn validate(c: &StoreConfig) -> Result<(), ConfigError> {
    if c.store_id.is_empty() {
        return Err(ConfigError::EmptyStoreId);
    }
    if c.store_id.contains([':', '*', '?', '[', ']', '\\']) {
        return Err(ConfigError::InvalidStoreId(c.store_id.clone()));
    }
    if c.page_size == 0 {
        return Err(ConfigError::ZeroPageSize);
    }
    if c.scan_timeout.is_zero() {
        return Err(ConfigError::ZeroScanTimeout);
    }
    if c.max_concurrent_scans == 0 {
        return Err(ConfigError::ZeroConcurrency);
    }
    Ok(())
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = StoreConfig::builder().build().unwrap();
        assert_eq!(cfg, StoreConfig::default());
        assert_eq!(cfg.scan_timeout, Duration::from_secs(10));
    }

    #[test]
    fn builder_rejects_invalid_values() {
        assert_eq!(StoreConfig::builder().store_id("").build(), Err(ConfigError::EmptyStoreId));
        assert_eq!(
            StoreConfig::builder().store_id("a:cookie:b").build(),
            Err(ConfigError::InvalidStoreId("a:cookie:b".into()))
        );
        assert_eq!(StoreConfig::builder().page_size(0).build(), Err(ConfigError::ZeroPageSize));
        assert_eq!(
            StoreConfig::builder().scan_timeout(Duration::ZERO).build(),
            Err(ConfigError::ZeroScanTimeout)
        );
        assert_eq!(
            StoreConfig::builder().max_concurrent_scans(0).build(),
            Err(ConfigError::ZeroConcurrency)
        );
    }

    #[test]
    fn with_applies_several_changes() {
        let cfg = StoreConfig::builder()
            .with(|c| {
                c.store_id = "jar-a".into();
                c.page_size = 10;
            })
            .build()
            .unwrap();
        assert_eq!(cfg.store_id, "jar-a");
        assert_eq!(cfg.page_size, 10);
    }

    #[test]
    fn json_roundtrip_uses_milliseconds() {
        let cfg = StoreConfig::builder()
            .scan_timeout(Duration::from_millis(1500))
            .build()
            .unwrap();
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains("\"scan_timeout_ms\":1500"));
        assert_eq!(StoreConfig::from_json(&json).unwrap(), cfg);
    }

    #[test]
    fn json_is_validated() {
        assert!(StoreConfig::from_json(r#"{ "page_size": 0 }"#).is_err());
        assert!(StoreConfig::from_json("not json").is_err());
    }
}
