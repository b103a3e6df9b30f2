//! Cursor-based pagination over a paged provider endpoint
//!
//! Drives repeated page fetches, advancing an opaque cursor taken from the
//! provider's own responses until the result set is drained. Each fetch is
//! expected to be a [`crate::executor::RequestExecutor`] call, so retry and
//! cooldown behavior is inherited; a page that ultimately fails ends the walk
//! with whatever was already collected.

use std::future::Future;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ProviderError;

/// Cursor state passed to each page fetch.
///
/// Created empty at the start of a walk, advanced only from provider response
/// fields, discarded when the walk ends. Walks are not restartable.
#[derive(Debug, Clone)]
pub struct PageCursor {
    /// Requested page size
    pub limit: u32,
    /// Last-seen item id/marker from the previous page, if any
    pub last_id: Option<Value>,
    /// Last-seen update timestamp from the previous page, if any
    pub updated_at: Option<String>,
}

impl PageCursor {
    fn start(limit: u32) -> Self {
        Self {
            limit,
            last_id: None,
            updated_at: None,
        }
    }
}

/// Cursor position reported by the provider alongside a page
#[derive(Debug, Clone)]
pub struct CursorPos {
    /// Id/marker of the last item in the page
    pub last_id: Value,
    /// Update timestamp of the last item in the page
    pub updated_at: String,
}

/// One fetched page
#[derive(Debug)]
pub struct Page<T> {
    /// Items in this page
    pub items: Vec<T>,
    /// Items the provider reports as remaining in the full set
    pub total: u64,
    /// Cursor to advance with, when the provider supplied one
    pub next: Option<CursorPos>,
}

/// Result of a page walk; `failure` is set when a page fetch exhausted its
/// retries mid-walk and the items are partial. The caller decides whether a
/// partial result is usable.
#[derive(Debug)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub failure: Option<ProviderError>,
}

impl<T> PagedResult<T> {
    /// Check whether the walk reached the end of the result set
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}

/// Drain a paged result set.
///
/// Stops when the provider reports zero remaining items, when a short page
/// (fewer items than `limit`) arrives, or when the provider stops supplying a
/// cursor to advance with.
pub async fn drain_pages<T, F, Fut>(limit: u32, mut fetch: F) -> PagedResult<T>
where
    F: FnMut(PageCursor) -> Fut,
    Fut: Future<Output = Result<Page<T>, ProviderError>>,
{
    let mut cursor = PageCursor::start(limit);
    let mut items = Vec::new();

    loop {
        let page = match fetch(cursor.clone()).await {
            Ok(page) => page,
            Err(e) => {
                warn!(collected = items.len(), error = %e, "drain_pages: page fetch failed, ending walk with partial result");
                return PagedResult { items, failure: Some(e) };
            }
        };

        if page.total == 0 {
            debug!(collected = items.len(), "drain_pages: provider reports zero remaining");
            break;
        }

        let page_size = page.items.len() as u32;
        items.extend(page.items);

        if page_size < limit {
            debug!(page_size, limit, collected = items.len(), "drain_pages: short page, walk complete");
            break;
        }

        match page.next {
            Some(next) => {
                cursor.last_id = Some(next.last_id);
                cursor.updated_at = Some(next.updated_at);
            }
            None => {
                debug!(collected = items.len(), "drain_pages: full page without a cursor, stopping");
                break;
            }
        }
    }

    PagedResult { items, failure: None }
}
