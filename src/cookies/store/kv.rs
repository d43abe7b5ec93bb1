//! Key-value backed cookie store.
//!
//! `KvCookieStore` keeps every (domain, path) pair in its own hash ("bucket"),
//! keyed `cookie-store:<store_id>:cookie:<domain>:<path>`. Inside a bucket each
//! field is a cookie name and each value the JSON-encoded cookie.
//!
//! ## Lookups
//! - Point operations (`find_cookie`, `put_cookie`, `remove_cookie`) address one
//!   bucket field directly and report store failures as errors.
//! - `find_cookies` expands the requested domain and path into every bucket that
//!   could hold a matching cookie and runs one scan per bucket pattern, at most
//!   `max_concurrent_scans` at a time.
//! - `get_all_cookies` and wildcard removals scan the whole store namespace.
//!
//! Scans are best effort: a timeout or store failure ends the scan early, keeps
//! what was read so far and marks the result as partial. Decode failures are
//! always returned as errors.
//!
//! ## Consistency
//! Nothing is cached locally. Listings are not snapshots: cookies written or
//! removed while a scan runs may or may not show up. Wildcard removal deletes
//! bucket after bucket and is not atomic.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::config::StoreConfig;
use crate::cookies::codec;
use crate::cookies::keys::{escape_glob, key_name};
use crate::cookies::permute::{permute_domain, permute_path};
use crate::cookies::store::{CookieStore, Listing};
use crate::cookies::Cookie;
use crate::errors::CookieStoreError;
use crate::kv::KvClient;
use crate::scan::{ScanStatus, Scanned, Scanner};

/// Cookie store persisting into a shared key-value store.
pub struct KvCookieStore<C: ?Sized> {
    client: Arc<C>,
    config: StoreConfig,
    scanner: Scanner<C>,
}

impl<C: KvClient + ?Sized> KvCookieStore<C> {
    /// Creates a store with the default configuration (store id `"default"`).
    pub fn new(client: Arc<C>) -> Self {
        Self::with_config(client, StoreConfig::default())
    }

    pub fn with_config(client: Arc<C>, config: StoreConfig) -> Self {
        let scanner = Scanner::new(client.clone(), config.page_size, config.scan_timeout, CancellationToken::new());
        Self { client, config, scanner }
    }

    /// Lets `token` stop all running and future scans of this store.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.scanner = Scanner::new(self.client.clone(), self.config.page_size, self.config.scan_timeout, token);
        self
    }

    pub fn store_id(&self) -> &str {
        &self.config.store_id
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Bucket key for `(domain, path)` in this store, or the domain prefix without a path.
    pub fn key_name(&self, domain: &str, path: Option<&str>) -> String {
        key_name(&self.config.store_id, domain, path)
    }

    /// Scan patterns for every bucket a cookie matching `(domain, path)` may live in.
    fn lookup_patterns(&self, domain: &str, path: &str, allow_special_use: bool) -> Vec<String> {
        let domains = permute_domain(domain, allow_special_use).unwrap_or_else(|| vec![domain.to_string()]);
        let paths = permute_path(path);

        domains
            .iter()
            .flat_map(|d| {
                let prefix = self.key_name(&escape_glob(d), None);
                paths.iter().map(move |p| format!("{prefix}:{}", escape_glob(p)))
            })
            .collect()
    }

    async fn scan_buckets(&self, pattern: &str) -> Result<Scanned<Cookie>, CookieStoreError> {
        let client = self.client.as_ref();
        let mut seen = HashSet::new();
        self.scanner
            .scan(pattern, move |keys| read_buckets(client, first_visits(&mut seen, keys)))
            .await
    }

    async fn delete_buckets(&self, pattern: &str) -> Result<ScanStatus, CookieStoreError> {
        let client = self.client.as_ref();
        let mut seen = HashSet::new();
        let scanned = self
            .scanner
            .scan(pattern, move |keys| {
                let keys = first_visits(&mut seen, keys);
                async move {
                    if !keys.is_empty() {
                        client.del(&keys).await?;
                    }
                    Ok::<_, CookieStoreError>(keys)
                }
            })
            .await?;

        log::debug!("removed {} buckets matching {pattern}", scanned.items.len());
        Ok(scanned.status)
    }
}

/// Drops keys an earlier page of the same scan already returned. A store may
/// hand out a key more than once during one traversal.
fn first_visits(seen: &mut HashSet<String>, keys: Vec<String>) -> Vec<String> {
    keys.into_iter().filter(|key| seen.insert(key.clone())).collect()
}

/// Reads and decodes every field of every bucket in `keys`, one bucket at a time.
async fn read_buckets<C: KvClient + ?Sized>(client: &C, keys: Vec<String>) -> Result<Vec<Cookie>, CookieStoreError> {
    let mut cookies = Vec::new();
    for key in keys {
        let fields = client.hgetall(&key).await?;
        for raw in fields.values() {
            if let Some(cookie) = codec::decode(Some(raw))? {
                cookies.push(cookie);
            }
        }
    }
    Ok(cookies)
}

fn into_listing(scans: Vec<Scanned<Cookie>>) -> Listing {
    let mut listing = Listing::empty();
    for scanned in scans {
        listing.cookies.extend(scanned.items);
        listing.status = listing.status.merge(scanned.status);
    }
    // Stable: equal creation indexes keep the order they were read in.
    listing.cookies.sort_by_key(|c| c.creation_index);
    listing
}

#[async_trait]
impl<C: KvClient + ?Sized> CookieStore for KvCookieStore<C> {
    async fn find_cookie(&self, domain: &str, path: &str, name: &str) -> Result<Option<Cookie>, CookieStoreError> {
        let key = self.key_name(domain, Some(path));
        let raw = self.client.hget(&key, name).await?;
        codec::decode(raw.as_deref())
    }

    async fn find_cookies(&self, domain: &str, path: &str, allow_special_use: bool) -> Result<Listing, CookieStoreError> {
        if domain.is_empty() {
            return Ok(Listing::empty());
        }

        let patterns = self.lookup_patterns(domain, path, allow_special_use);
        log::debug!("find_cookies {domain} {path}: {} patterns", patterns.len());

        let mut scans = Vec::with_capacity(patterns.len());
        for pattern in &patterns {
            scans.push(self.scan_buckets(pattern));
        }

        let results: Vec<Result<Scanned<Cookie>, CookieStoreError>> = stream::iter(scans)
            .buffer_unordered(self.config.max_concurrent_scans)
            .collect()
            .await;

        Ok(into_listing(results.into_iter().collect::<Result<Vec<_>, _>>()?))
    }

    async fn put_cookie(&self, cookie: &Cookie) -> Result<(), CookieStoreError> {
        let key = self.key_name(&cookie.domain, Some(&cookie.path));
        let raw = codec::encode(cookie)?;
        self.client.hset(&key, &cookie.name, &raw).await?;
        Ok(())
    }

    async fn update_cookie(&self, _old: &Cookie, new: &Cookie) -> Result<(), CookieStoreError> {
        self.put_cookie(new).await
    }

    async fn remove_cookie(&self, domain: &str, path: &str, name: &str) -> Result<(), CookieStoreError> {
        let key = self.key_name(domain, Some(path));
        self.client.hdel(&key, name).await?;
        Ok(())
    }

    async fn remove_cookies(&self, domain: &str, path: &str) -> Result<ScanStatus, CookieStoreError> {
        if !path.is_empty() && path != "*" {
            self.client.del(&[self.key_name(domain, Some(path))]).await?;
            return Ok(ScanStatus::Complete);
        }

        let pattern = format!("{}:*", self.key_name(domain, None));
        self.delete_buckets(&pattern).await
    }

    async fn remove_all_cookies(&self) -> Result<ScanStatus, CookieStoreError> {
        // Whole namespace, so buckets stored without a path are removed as well.
        let pattern = self.key_name("*", None);
        self.delete_buckets(&pattern).await
    }

    async fn get_all_cookies(&self) -> Result<Listing, CookieStoreError> {
        let pattern = self.key_name("*", None);
        let scanned = self.scan_buckets(&pattern).await?;
        Ok(into_listing(vec![scanned]))
    }
}
