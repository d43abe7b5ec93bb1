use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use gosub_kv_cookies::kv::{InMemoryKv, KvClient, ScanPage, SCAN_START};
use gosub_kv_cookies::{Cookie, CookieStore, CookieStoreError, KvCookieStore, ScanStatus, StoreConfig, Truncation};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn memory_store() -> KvCookieStore<InMemoryKv> {
    init_logging();
    KvCookieStore::new(Arc::new(InMemoryKv::new()))
}

fn names(cookies: &[Cookie]) -> Vec<&str> {
    cookies.iter().map(|c| c.name.as_str()).collect()
}

/// Delegates to an in-memory store and delays every scan request.
struct SlowKv {
    inner: InMemoryKv,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl SlowKv {
    fn new(delay: Duration) -> Self {
        Self::over(InMemoryKv::new(), delay)
    }

    fn over(inner: InMemoryKv, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl KvClient for SlowKv {
    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        self.inner.hget(key, field).await
    }
    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<()> {
        self.inner.hset(key, field, value).await
    }
    async fn hdel(&self, key: &str, field: &str) -> Result<()> {
        self.inner.hdel(key, field).await
    }
    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>> {
        self.inner.hgetall(key).await
    }
    async fn del(&self, keys: &[String]) -> Result<()> {
        self.inner.del(keys).await
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<ScanPage> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.inner.scan(cursor, pattern, count).await
    }
}

/// A store that is unreachable.
struct DownKv;

#[async_trait]
impl KvClient for DownKv {
    async fn hget(&self, _: &str, _: &str) -> Result<Option<String>> {
        Err(anyhow!("connection refused"))
    }
    async fn hset(&self, _: &str, _: &str, _: &str) -> Result<()> {
        Err(anyhow!("connection refused"))
    }
    async fn hdel(&self, _: &str, _: &str) -> Result<()> {
        Err(anyhow!("connection refused"))
    }
    async fn hgetall(&self, _: &str) -> Result<HashMap<String, String>> {
        Err(anyhow!("connection refused"))
    }
    async fn del(&self, _: &[String]) -> Result<()> {
        Err(anyhow!("connection refused"))
    }
    async fn scan(&self, _: u64, _: &str, _: usize) -> Result<ScanPage> {
        Err(anyhow!("connection refused"))
    }
}

/// Answers every scan with all matching keys, twice: once on the first page and
/// again on the second.
struct RepeatingKv {
    inner: InMemoryKv,
}

#[async_trait]
impl KvClient for RepeatingKv {
    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        self.inner.hget(key, field).await
    }
    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<()> {
        self.inner.hset(key, field, value).await
    }
    async fn hdel(&self, key: &str, field: &str) -> Result<()> {
        self.inner.hdel(key, field).await
    }
    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>> {
        self.inner.hgetall(key).await
    }
    async fn del(&self, keys: &[String]) -> Result<()> {
        self.inner.del(keys).await
    }

    async fn scan(&self, cursor: u64, pattern: &str, _: usize) -> Result<ScanPage> {
        let page = self.inner.scan(SCAN_START, pattern, usize::MAX).await?;
        let next = if cursor == SCAN_START { 1 } else { SCAN_START };
        Ok(ScanPage { cursor: next, keys: page.keys })
    }
}

/// Deletes the first batch of keys and fails every later `DEL`.
struct FlakyDelKv {
    inner: InMemoryKv,
    deletes: AtomicUsize,
}

#[async_trait]
impl KvClient for FlakyDelKv {
    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        self.inner.hget(key, field).await
    }
    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<()> {
        self.inner.hset(key, field, value).await
    }
    async fn hdel(&self, key: &str, field: &str) -> Result<()> {
        self.inner.hdel(key, field).await
    }
    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>> {
        self.inner.hgetall(key).await
    }
    async fn del(&self, keys: &[String]) -> Result<()> {
        if self.deletes.fetch_add(1, Ordering::SeqCst) > 0 {
            return Err(anyhow!("connection reset"));
        }
        self.inner.del(keys).await
    }
    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<ScanPage> {
        self.inner.scan(cursor, pattern, count).await
    }
}

#[tokio::test]
async fn empty_store_has_no_cookies() {
    let store = memory_store();
    let all = store.get_all_cookies().await.unwrap();
    assert!(all.is_complete());
    assert!(all.cookies.is_empty());
}

#[tokio::test]
async fn put_then_find_returns_equal_cookie() {
    let store = memory_store();
    let cookie = Cookie::new("test-key", "test-value", "example.com", "/")
        .with_http_only(true)
        .with_same_site("Strict");
    store.put_cookie(&cookie).await.unwrap();

    let found = store.find_cookie("example.com", "/", "test-key").await.unwrap();
    assert_eq!(found, Some(cookie.clone()));

    let all = store.get_all_cookies().await.unwrap().into_cookies();
    assert_eq!(all, vec![cookie]);
}

#[tokio::test]
async fn missing_cookie_is_not_an_error() {
    let store = memory_store();
    assert!(store.find_cookie("example.com", "/", "nope").await.unwrap().is_none());
}

#[tokio::test]
async fn put_twice_is_idempotent() {
    let store = memory_store();
    let cookie = Cookie::new("sid", "1", "example.com", "/");
    store.put_cookie(&cookie).await.unwrap();
    let once = store.get_all_cookies().await.unwrap();

    store.put_cookie(&cookie).await.unwrap();
    let twice = store.get_all_cookies().await.unwrap();
    assert_eq!(once, twice);
    assert_eq!(twice.cookies.len(), 1);
}

#[tokio::test]
async fn same_name_overwrites_within_bucket() {
    let store = memory_store();
    store.put_cookie(&Cookie::new("sid", "old", "example.com", "/")).await.unwrap();
    store.put_cookie(&Cookie::new("sid", "new", "example.com", "/")).await.unwrap();

    let all = store.get_all_cookies().await.unwrap().into_cookies();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].value, "new");
}

#[tokio::test]
async fn enumeration_is_complete_across_pages() {
    init_logging();
    let cfg = StoreConfig::builder().page_size(3).build().unwrap();
    let store = KvCookieStore::with_config(Arc::new(InMemoryKv::new()), cfg);

    for i in 0..20 {
        let cookie = Cookie::new(format!("c{i}"), "v", format!("host{i}.example.com"), format!("/p{}", i % 4));
        store.put_cookie(&cookie).await.unwrap();
    }

    let all = store.get_all_cookies().await.unwrap();
    assert!(all.is_complete());
    assert_eq!(all.cookies.len(), 20);
}

#[tokio::test]
async fn listings_are_ordered_by_creation_index() {
    let store = memory_store();
    let cookies: Vec<Cookie> = (0..6)
        .map(|i| Cookie::new(format!("c{i}"), "v", format!("d{}.example.com", 5 - i), "/"))
        .collect();

    for cookie in cookies.iter().rev() {
        store.put_cookie(cookie).await.unwrap();
    }

    let all = store.get_all_cookies().await.unwrap().into_cookies();
    assert_eq!(names(&all), vec!["c0", "c1", "c2", "c3", "c4", "c5"]);

    // same ordering for a lookup spanning several buckets
    store.put_cookie(&Cookie::new("z", "v", "example.com", "/a")).await.unwrap();
    store.put_cookie(&Cookie::new("y", "v", "example.com", "/")).await.unwrap();
    let found = store.find_cookies("d3.example.com", "/a", false).await.unwrap().into_cookies();
    assert_eq!(names(&found), vec!["c2", "z", "y"]);
}

#[tokio::test]
async fn remove_all_then_get_all_is_empty() {
    let store = memory_store();
    for i in 0..5 {
        store.put_cookie(&Cookie::new(format!("k{i}"), "v", format!("d{i}.com"), "/")).await.unwrap();
    }
    store.put_cookie(&Cookie::new("no-path", "v", "example.com", "")).await.unwrap();

    let status = store.remove_all_cookies().await.unwrap();
    assert_eq!(status, ScanStatus::Complete);
    assert!(store.get_all_cookies().await.unwrap().cookies.is_empty());
}

#[tokio::test]
async fn domain_scoping_follows_permutations() {
    let store = memory_store();
    let cookie = Cookie::new("sid", "1", "a.example.com", "/");
    store.put_cookie(&cookie).await.unwrap();

    let exact = store.find_cookies("a.example.com", "/", false).await.unwrap();
    assert_eq!(exact.cookies, vec![cookie.clone()]);

    let child = store.find_cookies("x.a.example.com", "/deep/path", false).await.unwrap();
    assert_eq!(child.cookies, vec![cookie]);

    assert!(store.find_cookies("example.com", "/", false).await.unwrap().cookies.is_empty());
    assert!(store.find_cookies("b.example.com", "/", false).await.unwrap().cookies.is_empty());
    assert!(store.find_cookies("other.org", "/", false).await.unwrap().cookies.is_empty());
}

#[tokio::test]
async fn domains_are_looked_up_as_written() {
    let store = memory_store();
    let mixed = Cookie::new("sid", "1", "Example.com", "/");
    let dotted = Cookie::new("fq", "2", "example.com.", "/");
    store.put_cookie(&mixed).await.unwrap();
    store.put_cookie(&dotted).await.unwrap();

    assert_eq!(store.find_cookie("Example.com", "/", "sid").await.unwrap(), Some(mixed.clone()));
    assert_eq!(store.find_cookies("Example.com", "/", false).await.unwrap().cookies, vec![mixed.clone()]);
    assert_eq!(store.find_cookies("www.Example.com", "/a", false).await.unwrap().cookies, vec![mixed]);

    assert_eq!(store.find_cookies("example.com.", "/", false).await.unwrap().cookies, vec![dotted]);
}

#[tokio::test]
async fn keys_returned_twice_are_read_once() {
    init_logging();
    let kv = Arc::new(RepeatingKv { inner: InMemoryKv::new() });
    let store = KvCookieStore::new(kv.clone());
    let cookie = Cookie::new("sid", "1", "example.com", "/");
    store.put_cookie(&cookie).await.unwrap();

    let all = store.get_all_cookies().await.unwrap();
    assert!(all.is_complete());
    assert_eq!(all.cookies, vec![cookie.clone()]);

    let found = store.find_cookies("example.com", "/", false).await.unwrap();
    assert_eq!(found.cookies, vec![cookie]);

    assert!(store.remove_all_cookies().await.unwrap().is_complete());
    assert!(kv.inner.is_empty());
}

#[tokio::test]
async fn path_scoping_follows_permutations() {
    let store = memory_store();
    store.put_cookie(&Cookie::new("root", "v", "example.com", "/")).await.unwrap();
    store.put_cookie(&Cookie::new("docs", "v", "example.com", "/docs")).await.unwrap();
    store.put_cookie(&Cookie::new("blog", "v", "example.com", "/blog")).await.unwrap();

    let found = store.find_cookies("example.com", "/docs/api", false).await.unwrap().into_cookies();
    assert_eq!(names(&found), vec!["root", "docs"]);
}

#[tokio::test]
async fn special_use_domains_are_found_when_allowed() {
    let store = memory_store();
    store.put_cookie(&Cookie::new("dev", "v", "localhost", "/")).await.unwrap();

    let found = store.find_cookies("localhost", "/", true).await.unwrap();
    assert_eq!(found.cookies.len(), 1);

    // without the opt-in the literal domain is still searched
    let found = store.find_cookies("localhost", "/", false).await.unwrap();
    assert_eq!(found.cookies.len(), 1);
}

#[tokio::test]
async fn five_cookie_scenario() {
    let store = memory_store();
    for i in 0..5 {
        let cookie = Cookie::new(format!("test-key-{i}"), format!("test-value-{i}"), "example.com", "/")
            .with_http_only(true);
        store.put_cookie(&cookie).await.unwrap();
    }

    let found = store.find_cookies("example.com", "", true).await.unwrap();
    assert!(found.is_complete());
    assert_eq!(
        names(&found.cookies),
        vec!["test-key-0", "test-key-1", "test-key-2", "test-key-3", "test-key-4"]
    );

    store.remove_all_cookies().await.unwrap();
    assert_eq!(store.get_all_cookies().await.unwrap().cookies.len(), 0);
}

#[tokio::test]
async fn empty_domain_short_circuits() {
    init_logging();
    let store = KvCookieStore::new(Arc::new(DownKv));
    let found = store.find_cookies("", "/", true).await.unwrap();
    assert!(found.is_complete());
    assert!(found.cookies.is_empty());
}

#[tokio::test]
async fn store_identities_are_isolated() {
    init_logging();
    let kv = Arc::new(InMemoryKv::new());
    let a = KvCookieStore::with_config(kv.clone(), StoreConfig::builder().store_id("a").build().unwrap());
    let b = KvCookieStore::with_config(kv.clone(), StoreConfig::builder().store_id("b").build().unwrap());

    a.put_cookie(&Cookie::new("sid", "from-a", "example.com", "/")).await.unwrap();
    b.put_cookie(&Cookie::new("sid", "from-b", "example.com", "/")).await.unwrap();

    assert_eq!(a.get_all_cookies().await.unwrap().cookies[0].value, "from-a");
    assert_eq!(b.find_cookie("example.com", "/", "sid").await.unwrap().unwrap().value, "from-b");

    a.remove_all_cookies().await.unwrap();
    assert!(a.get_all_cookies().await.unwrap().cookies.is_empty());
    assert_eq!(b.get_all_cookies().await.unwrap().cookies.len(), 1);
    assert_eq!(kv.keys(), vec!["cookie-store:b:cookie:example.com:/"]);
}

#[tokio::test]
async fn point_operations_report_transport_errors() {
    init_logging();
    let store = KvCookieStore::new(Arc::new(DownKv));
    let cookie = Cookie::new("sid", "1", "example.com", "/");

    assert!(store.put_cookie(&cookie).await.unwrap_err().is_transport());
    assert!(store.update_cookie(&cookie, &cookie).await.unwrap_err().is_transport());
    assert!(store.find_cookie("example.com", "/", "sid").await.unwrap_err().is_transport());
    assert!(store.remove_cookie("example.com", "/", "sid").await.unwrap_err().is_transport());
    assert!(store.remove_cookies("example.com", "/").await.unwrap_err().is_transport());
}

#[tokio::test]
async fn scans_truncate_on_transport_errors() {
    init_logging();
    let store = KvCookieStore::new(Arc::new(DownKv));

    let all = store.get_all_cookies().await.unwrap();
    assert!(all.cookies.is_empty());
    assert!(matches!(all.status, ScanStatus::Partial(Truncation::StoreError(_))));

    let found = store.find_cookies("example.com", "/", false).await.unwrap();
    assert!(!found.is_complete());

    let removed = store.remove_all_cookies().await.unwrap();
    assert!(!removed.is_complete());
}

#[tokio::test]
async fn failed_delete_keeps_earlier_pages_removed() {
    init_logging();
    let kv = Arc::new(FlakyDelKv {
        inner: InMemoryKv::new(),
        deletes: AtomicUsize::new(0),
    });
    let cfg = StoreConfig::builder().page_size(2).build().unwrap();
    let store = KvCookieStore::with_config(kv.clone(), cfg);
    for domain in ["a.com", "b.com", "c.com", "d.com"] {
        store.put_cookie(&Cookie::new("sid", "v", domain, "/")).await.unwrap();
    }

    let status = store.remove_all_cookies().await.unwrap();
    assert!(matches!(status, ScanStatus::Partial(Truncation::StoreError(_))));

    // the first page went, the rest is still there
    assert_eq!(
        kv.inner.keys(),
        vec!["cookie-store:default:cookie:c.com:/", "cookie-store:default:cookie:d.com:/"]
    );
}

#[tokio::test]
async fn abandoned_scans_do_not_pile_up_cursors() {
    init_logging();
    let kv = Arc::new(SlowKv::over(InMemoryKv::with_cursor_limit(4), Duration::from_millis(15)));
    let cfg = StoreConfig::builder()
        .page_size(1)
        .scan_timeout(Duration::from_millis(20))
        .build()
        .unwrap();
    let store = KvCookieStore::with_config(kv.clone(), cfg);
    for i in 0..10 {
        store.put_cookie(&Cookie::new("c", "v", format!("d{i}.com"), "/")).await.unwrap();
    }

    for _ in 0..12 {
        let all = store.get_all_cookies().await.unwrap();
        assert_eq!(all.status, ScanStatus::Partial(Truncation::TimedOut));
    }
    assert!(kv.inner.open_cursors() <= 4);
}

#[tokio::test]
async fn slow_scans_stop_at_the_ceiling() {
    init_logging();
    let kv = Arc::new(SlowKv::new(Duration::from_millis(25)));
    let cfg = StoreConfig::builder()
        .page_size(1)
        .scan_timeout(Duration::from_millis(60))
        .build()
        .unwrap();
    let store = KvCookieStore::with_config(kv, cfg);

    for i in 0..10 {
        store.put_cookie(&Cookie::new("c", "v", format!("d{i}.com"), "/")).await.unwrap();
    }

    let all = store.get_all_cookies().await.unwrap();
    assert_eq!(all.status, ScanStatus::Partial(Truncation::TimedOut));
    assert!(all.cookies.len() < 10);
}

#[tokio::test]
async fn concurrent_scans_are_bounded() {
    init_logging();
    let kv = Arc::new(SlowKv::new(Duration::from_millis(10)));
    let cfg = StoreConfig::builder().max_concurrent_scans(2).build().unwrap();
    let store = KvCookieStore::with_config(kv.clone(), cfg);
    store.put_cookie(&Cookie::new("sid", "v", "example.com", "/")).await.unwrap();

    // 3 domains x 4 paths = 12 scans
    let found = store.find_cookies("a.b.example.com", "/x/y/z", false).await.unwrap();
    assert!(found.is_complete());
    assert_eq!(found.cookies.len(), 1);
    assert_eq!(kv.max_in_flight.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn decode_errors_are_not_masked() {
    init_logging();
    let kv = Arc::new(InMemoryKv::new());
    kv.insert_raw("cookie-store:default:cookie:example.com:/", "bad", "{not json");
    let store = KvCookieStore::new(kv);

    let err = store.find_cookies("example.com", "/", false).await.unwrap_err();
    assert!(matches!(err, CookieStoreError::Decode(_)));
}
