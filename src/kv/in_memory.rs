use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::kv::{glob_match, KvClient, ScanPage, SCAN_START};

/// In-memory hash store (no persistence). Used for tests and ephemeral jars.
///
/// Keys are kept ordered so a scan cursor can resume right after the last key it
/// visited. Keys that exist for the whole duration of a scan are therefore always
/// returned, even when other keys are deleted between pages.
///
/// A cursor is forgotten once it is resumed. Scans that are abandoned midway never
/// resume, so at most `cursor_limit` cursors are kept open and the oldest one is
/// dropped when a new one would exceed the limit. Resuming a dropped cursor fails
/// like any unknown cursor.
pub struct InMemoryKv {
    hashes: Mutex<BTreeMap<String, HashMap<String, String>>>,
    /// Open scan cursors: cursor id -> last key visited. Ids grow, so the first entry is the oldest.
    cursors: Mutex<BTreeMap<u64, String>>,
    next_cursor: AtomicU64,
    cursor_limit: usize,
}

/// Default number of scan cursors kept open at once.
pub const DEFAULT_CURSOR_LIMIT: usize = 1024;

impl Default for InMemoryKv {
    fn default() -> Self {
        Self::with_cursor_limit(DEFAULT_CURSOR_LIMIT)
    }
}

impl InMemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store keeping at most `limit` (minimum 1) scan cursors open.
    pub fn with_cursor_limit(limit: usize) -> Self {
        Self {
            hashes: Mutex::default(),
            cursors: Mutex::default(),
            next_cursor: AtomicU64::new(0),
            cursor_limit: limit.max(1),
        }
    }

    /// Number of scan cursors that can still be resumed.
    pub fn open_cursors(&self) -> usize {
        self.cursors.lock().unwrap().len()
    }

    /// Returns all keys currently stored, in order.
    pub fn keys(&self) -> Vec<String> {
        self.hashes.lock().unwrap().keys().cloned().collect()
    }

    /// Returns the number of keys (buckets), empty ones included.
    pub fn len(&self) -> usize {
        self.hashes.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stores a raw field value, bypassing any encoding done by callers.
    pub fn insert_raw(&self, key: &str, field: &str, value: &str) {
        self.hashes
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
    }

    fn open_cursor(&self, last_key: String) -> u64 {
        // Zero is reserved for the start/end sentinel.
        let id = self.next_cursor.fetch_add(1, Ordering::Relaxed) + 1;
        let mut cursors = self.cursors.lock().unwrap();
        while cursors.len() >= self.cursor_limit {
            if let Some((stale, _)) = cursors.pop_first() {
                log::debug!("dropping abandoned scan cursor {stale}");
            }
        }
        cursors.insert(id, last_key);
        id
    }
}

#[async_trait]
impl KvClient for InMemoryKv {
    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        let hashes = self.hashes.lock().map_err(|_| anyhow!("store lock poisoned"))?;
        Ok(hashes.get(key).and_then(|h| h.get(field)).cloned())
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<()> {
        self.insert_raw(key, field, value);
        Ok(())
    }

    async fn hdel(&self, key: &str, field: &str) -> Result<()> {
        if let Some(hash) = self.hashes.lock().unwrap().get_mut(key) {
            hash.remove(field);
        }
        Ok(())
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>> {
        Ok(self.hashes.lock().unwrap().get(key).cloned().unwrap_or_default())
    }

    async fn del(&self, keys: &[String]) -> Result<()> {
        let mut hashes = self.hashes.lock().unwrap();
        for key in keys {
            hashes.remove(key);
        }
        Ok(())
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<ScanPage> {
        let lower = if cursor == SCAN_START {
            Bound::Unbounded
        } else {
            match self.cursors.lock().unwrap().remove(&cursor) {
                Some(last) => Bound::Excluded(last),
                None => bail!("invalid cursor {cursor}"),
            }
        };

        let (visited, has_more) = {
            let hashes = self.hashes.lock().unwrap();
            let mut range = hashes.range::<String, _>((lower, Bound::Unbounded));
            let visited: Vec<String> = range.by_ref().take(count.max(1)).map(|(k, _)| k.clone()).collect();
            (visited, range.next().is_some())
        };

        let next = match visited.last() {
            Some(last) if has_more => self.open_cursor(last.clone()),
            _ => SCAN_START,
        };

        Ok(ScanPage {
            cursor: next,
            keys: visited.into_iter().filter(|k| glob_match(pattern, k)).collect(),
        })
    }
}
