//! Rendering engine boundary
//!
//! Resolving page counts and rasterising pages is blocking work done by the
//! engine on tokio's blocking pool. Results come back tagged with the
//! [`DocumentId`] that asked for them so the viewer can drop stale ones.

pub mod cache;
pub mod pdfium;

pub use cache::{CacheKey, RenderCache};
pub use pdfium::PdfiumEngine;

use crate::config::RenderConfig;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::viewer::geometry::Size;
use crate::viewer::orchestrator::DocumentId;
use crate::viewer::render_window::RenderKey;
use std::sync::Arc;

/// What the viewer needs to know before laying out pages
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentInfo {
    pub page_count: u32,
    /// Intrinsic page sizes in points, in page order
    pub page_sizes: Vec<Size>,
}

/// One rasterised page, PNG encoded
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPage {
    pub key: RenderKey,
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

impl RenderedPage {
    /// Pixel size; its aspect ratio is what the viewer's initial zoom needs
    pub fn size(&self) -> Size {
        Size::new(f64::from(self.width), f64::from(self.height))
    }
}

/// Synchronous PDF backend; called from blocking tasks only
pub trait RenderEngine: Send + Sync + 'static {
    fn inspect(&self, data: &[u8]) -> Result<DocumentInfo>;

    fn render_page(&self, data: &[u8], key: RenderKey, target_width: u32)
        -> Result<RenderedPage>;
}

/// Async front for a [`RenderEngine`] with a shared page cache
pub struct PageRenderer<E: RenderEngine> {
    engine: Arc<E>,
    cache: Arc<RenderCache>,
}

impl<E: RenderEngine> Clone for PageRenderer<E> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<E: RenderEngine> PageRenderer<E> {
    pub fn new(engine: E, config: &RenderConfig) -> Self {
        Self {
            engine: Arc::new(engine),
            cache: Arc::new(RenderCache::new(
                config.cache_max_entries,
                config.cache_max_bytes,
            )),
        }
    }

    pub fn cache(&self) -> &RenderCache {
        &self.cache
    }

    /// Page count and sizes for a freshly loaded document
    pub async fn resolve_metadata(
        &self,
        id: DocumentId,
        document: &Document,
    ) -> (DocumentId, Result<DocumentInfo>) {
        let engine = Arc::clone(&self.engine);
        let data = document.shared_data();

        let result = tokio::task::spawn_blocking(move || engine.inspect(&data))
            .await
            .map_err(|e| Error::Task {
                reason: format!("Task join error: {}", e),
            })
            .and_then(|r| r);

        if let Err(e) = &result {
            tracing::warn!(%id, error = %e, "failed to resolve document metadata");
        }
        (id, result)
    }

    /// Render one page at `scaled_width` pixels wide, from cache when possible
    pub async fn render(
        &self,
        id: DocumentId,
        document: &Document,
        key: RenderKey,
        scaled_width: f64,
    ) -> Result<Arc<RenderedPage>> {
        let width = scaled_width.round().max(1.0) as u32;
        let cache_key = CacheKey {
            document: id,
            render: key,
            width,
        };

        if let Some(page) = self.cache.get(&cache_key) {
            tracing::trace!(page = key.page, "render cache hit");
            return Ok(page);
        }

        let engine = Arc::clone(&self.engine);
        let data = document.shared_data();
        let rendered = tokio::task::spawn_blocking(move || engine.render_page(&data, key, width))
            .await
            .map_err(|e| Error::Task {
                reason: format!("Task join error: {}", e),
            })??;

        tracing::debug!(
            page = key.page,
            scale = key.scale(),
            width = rendered.width,
            height = rendered.height,
            "page rendered"
        );

        let page = Arc::new(rendered);
        self.cache.put(cache_key, Arc::clone(&page));
        Ok(page)
    }

    /// Render a batch of keys, skipping failures
    pub async fn render_all(
        &self,
        id: DocumentId,
        document: &Document,
        keys: &[RenderKey],
        scaled_width: f64,
    ) -> Vec<Arc<RenderedPage>> {
        let mut pages = Vec::with_capacity(keys.len());
        for &key in keys {
            match self.render(id, document, key, scaled_width).await {
                Ok(page) => pages.push(page),
                Err(e) => tracing::warn!(page = key.page, error = %e, "failed to render page"),
            }
        }
        pages
    }

    /// Forget cached renders of a document that was replaced
    pub fn release(&self, id: DocumentId) {
        let evicted = self.cache.evict_document(id);
        tracing::debug!(%id, evicted, "released document renders");
    }
}
