//! Cursor-driven keyspace scanning.
//!
//! [`Scanner::scan`] walks all keys matching a glob pattern page by page. Each
//! non-empty page is handed to a handler, and the next page is only requested
//! once the handler has finished, so one scan never has more than one request in
//! flight.
//!
//! A scan ends when the store hands back the start cursor again (complete), or
//! earlier when:
//! - the wall-clock ceiling is reached,
//! - the cancellation token fires,
//! - the store or the handler reports a transport error.
//!
//! The early endings are not errors. The scan keeps everything collected so far
//! and reports a [`ScanStatus::Partial`] so the caller can decide whether to retry.
//! Only non-transport handler errors (decode failures) are returned as `Err`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::errors::CookieStoreError;
use crate::kv::{KvClient, SCAN_START};

/// Why a scan stopped before the store reported completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Truncation {
    /// The scan ran into its wall-clock ceiling.
    TimedOut,
    /// The store's cancellation token fired.
    Cancelled,
    /// The store failed a command; the message is kept for diagnostics.
    StoreError(String),
}

/// How a scan, or a listing built from several scans, ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanStatus {
    Complete,
    Partial(Truncation),
}

impl ScanStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, ScanStatus::Complete)
    }

    /// Combines the status of two scans: the first truncation wins.
    pub fn merge(self, other: ScanStatus) -> ScanStatus {
        match self {
            ScanStatus::Complete => other,
            partial => partial,
        }
    }
}

/// Items gathered by a scan together with how the scan ended.
#[derive(Debug)]
pub struct Scanned<T> {
    pub items: Vec<T>,
    pub status: ScanStatus,
}

/// Pages through a [`KvClient`] keyspace until done, out of time or cancelled.
pub struct Scanner<C: ?Sized> {
    client: Arc<C>,
    page_size: usize,
    timeout: Duration,
    cancel: CancellationToken,
}

impl<C: KvClient + ?Sized> Scanner<C> {
    pub fn new(client: Arc<C>, page_size: usize, timeout: Duration, cancel: CancellationToken) -> Self {
        Self {
            client,
            page_size,
            timeout,
            cancel,
        }
    }

    /// Scans all keys matching `pattern`, feeding each non-empty page to `on_page`.
    ///
    /// Whatever `on_page` returns is appended to the result in page order.
    pub async fn scan<T, F, Fut>(&self, pattern: &str, mut on_page: F) -> Result<Scanned<T>, CookieStoreError>
    where
        F: FnMut(Vec<String>) -> Fut,
        Fut: Future<Output = Result<Vec<T>, CookieStoreError>>,
    {
        let started = Instant::now();
        let mut cursor = SCAN_START;
        let mut items = Vec::new();
        let mut pages = 0usize;

        log::debug!("scan {pattern}: start");

        let status = 'scan: loop {
            if self.cancel.is_cancelled() {
                break 'scan ScanStatus::Partial(Truncation::Cancelled);
            }
            let remaining = self.timeout.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                break 'scan ScanStatus::Partial(Truncation::TimedOut);
            }

            let page = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break 'scan ScanStatus::Partial(Truncation::Cancelled),
                _ = tokio::time::sleep(remaining) => break 'scan ScanStatus::Partial(Truncation::TimedOut),
                page = self.client.scan(cursor, pattern, self.page_size) => page,
            };

            let page = match page {
                Ok(page) => page,
                Err(e) => {
                    log::warn!("scan {pattern}: store error after {pages} pages: {e}");
                    break 'scan ScanStatus::Partial(Truncation::StoreError(e.to_string()));
                }
            };
            pages += 1;

            if !page.keys.is_empty() {
                match on_page(page.keys).await {
                    Ok(mut batch) => items.append(&mut batch),
                    Err(e) if e.is_transport() => {
                        log::warn!("scan {pattern}: page handler failed after {pages} pages: {e}");
                        break 'scan ScanStatus::Partial(Truncation::StoreError(e.to_string()));
                    }
                    Err(e) => return Err(e),
                }
            }

            cursor = page.cursor;
            if cursor == SCAN_START {
                break 'scan ScanStatus::Complete;
            }
        };

        match &status {
            ScanStatus::Complete => {
                log::debug!("scan {pattern}: complete, {pages} pages in {:?}", started.elapsed());
            }
            ScanStatus::Partial(reason) => {
                log::warn!("scan {pattern}: stopped early ({reason:?}) after {pages} pages in {:?}", started.elapsed());
            }
        }

        Ok(Scanned { items, status })
    }
}
