//! Rendered page cache

use crate::engine::RenderedPage;
use crate::viewer::orchestrator::DocumentId;
use crate::viewer::render_window::RenderKey;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// A render is only reusable for the same document, page, scale and pixel width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub document: DocumentId,
    pub render: RenderKey,
    pub width: u32,
}

struct CacheInner {
    lru: LruCache<CacheKey, Arc<RenderedPage>>,
    total_bytes: usize,
}

/// LRU of encoded pages with entry count and byte budget limits
pub struct RenderCache {
    inner: Mutex<CacheInner>,
    max_bytes: usize,
}

impl RenderCache {
    pub fn new(capacity: usize, max_bytes: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(CacheInner {
                lru: LruCache::new(capacity),
                total_bytes: 0,
            }),
            max_bytes,
        }
    }

    /// Store a page, evicting least recently used pages until the byte budget
    /// holds. Pages larger than the whole budget are not cached.
    pub fn put(&self, key: CacheKey, page: Arc<RenderedPage>) {
        let new_size = page.png.len();
        if new_size > self.max_bytes {
            tracing::debug!(page = key.render.page, bytes = new_size, "render exceeds cache budget");
            return;
        }

        let mut inner = self.inner.lock();

        if let Some(old) = inner.lru.pop(&key) {
            inner.total_bytes = inner.total_bytes.saturating_sub(old.png.len());
        }

        while inner.total_bytes + new_size > self.max_bytes {
            match inner.lru.pop_lru() {
                Some((_, evicted)) => {
                    inner.total_bytes = inner.total_bytes.saturating_sub(evicted.png.len());
                }
                None => break,
            }
        }

        // The key was popped above, so anything pushed out is a capacity eviction
        if let Some((_, evicted)) = inner.lru.push(key, page) {
            inner.total_bytes = inner.total_bytes.saturating_sub(evicted.png.len());
        }
        inner.total_bytes += new_size;
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<RenderedPage>> {
        self.inner.lock().lru.get(key).cloned()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.inner.lock().lru.contains(key)
    }

    /// Drop every page belonging to a document
    pub fn evict_document(&self, document: DocumentId) -> usize {
        let mut inner = self.inner.lock();
        let stale: Vec<CacheKey> = inner
            .lru
            .iter()
            .filter(|(k, _)| k.document == document)
            .map(|(k, _)| *k)
            .collect();

        for key in &stale {
            if let Some(page) = inner.lru.pop(key) {
                inner.total_bytes = inner.total_bytes.saturating_sub(page.png.len());
            }
        }
        stale.len()
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.lru.clear();
        inner.total_bytes = 0;
    }

    pub fn len(&self) -> usize {
        self.inner.lock().lru.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().lru.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.inner.lock().total_bytes
    }
}
