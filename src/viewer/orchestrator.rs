//! Viewer state machine
//!
//! Owns the loaded document handle, zoom state, overlay visibility and the
//! viewport tracker, and turns shell events (metadata resolved, page
//! rendered, container resized, toolbar actions, new query result) into
//! state changes plus render requests.
//!
//! ```text
//! NoDocument --load_document--> DocumentLoading --on_document_metadata--> DocumentReady
//!      ^                              ^                                        |
//!      +------close_document----------+-------------load_document--------------+
//! ```

use crate::config::ViewerConfig;
use crate::document::Document;
use crate::error::Error;
use crate::query::LocatorResult;
use crate::versioned::Versioned;
use crate::viewer::geometry::{
    self, clamp_zoom, fit_width_scale, fit_window_scale, step_zoom, Size, BASELINE_SCALE,
    ZOOM_STEP,
};
use crate::viewer::overlay::{compute_overlay, OverlayBox};
use crate::viewer::render_window::{PageSlot, RenderKey, RenderWindow};
use crate::viewer::tracker::{ScrollHost, ViewportTracker};
use std::collections::BTreeSet;
use std::fmt;
use tokio::time::Instant;

/// Identifies one `load_document` call; events carrying an older id are stale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(pub u64);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerPhase {
    NoDocument,
    DocumentLoading,
    DocumentReady { page_count: u32 },
}

struct LoadedDocument {
    id: DocumentId,
    document: Document,
    page_count: Option<u32>,
}

pub struct ViewerOrchestrator<H: ScrollHost> {
    config: ViewerConfig,
    tracker: ViewportTracker<H>,
    render_window: RenderWindow,
    document: Option<LoadedDocument>,
    next_id: u64,
    scale: f64,
    /// Intrinsic size of page 1, captured once per document
    page_size: Option<Size>,
    /// Client size of the scroll container, before padding
    container: Option<Size>,
    overlay_visible: bool,
    active_result: Option<LocatorResult>,
    seen_result_version: Option<u64>,
    render_requests: BTreeSet<RenderKey>,
}

impl<H: ScrollHost> ViewerOrchestrator<H> {
    pub fn new(host: H, config: ViewerConfig) -> Self {
        let tracker = ViewportTracker::new(host, config.settle_delay, config.observer.clone());
        let render_window = RenderWindow::new(config.window_radius, config.placeholder_aspect);

        Self {
            config,
            tracker,
            render_window,
            document: None,
            next_id: 1,
            scale: BASELINE_SCALE,
            page_size: None,
            container: None,
            overlay_visible: true,
            active_result: None,
            seen_result_version: None,
            render_requests: BTreeSet::new(),
        }
    }

    pub fn phase(&self) -> ViewerPhase {
        match &self.document {
            None => ViewerPhase::NoDocument,
            Some(LoadedDocument {
                page_count: None, ..
            }) => ViewerPhase::DocumentLoading,
            Some(LoadedDocument {
                page_count: Some(page_count),
                ..
            }) => ViewerPhase::DocumentReady {
                page_count: *page_count,
            },
        }
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref().map(|d| &d.document)
    }

    pub fn document_id(&self) -> Option<DocumentId> {
        self.document.as_ref().map(|d| d.id)
    }

    pub fn page_count(&self) -> Option<u32> {
        self.document.as_ref().and_then(|d| d.page_count)
    }

    pub fn current_page(&self) -> u32 {
        self.tracker.current_page()
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn page_size(&self) -> Option<Size> {
        self.page_size
    }

    pub fn overlay_visible(&self) -> bool {
        self.overlay_visible
    }

    pub fn active_result(&self) -> Option<&LocatorResult> {
        self.active_result.as_ref()
    }

    pub fn tracker(&self) -> &ViewportTracker<H> {
        &self.tracker
    }

    pub fn host_mut(&mut self) -> &mut H {
        self.tracker.host_mut()
    }

    /// Replace the document. Zoom, page-size cache, current page and overlay
    /// visibility all start over.
    pub fn load_document(&mut self, document: Document) -> DocumentId {
        let id = DocumentId(self.next_id);
        self.next_id += 1;

        tracing::info!(%id, name = %document.name, bytes = document.len(), "loading document");

        self.document = Some(LoadedDocument {
            id,
            document,
            page_count: None,
        });
        self.scale = BASELINE_SCALE;
        self.page_size = None;
        self.overlay_visible = true;
        self.tracker.reset();
        self.render_requests.clear();

        id
    }

    pub fn close_document(&mut self) {
        if let Some(doc) = self.document.take() {
            tracing::info!(id = %doc.id, "document closed");
        }
        self.scale = BASELINE_SCALE;
        self.page_size = None;
        self.tracker.reset();
        self.render_requests.clear();
    }

    fn is_current(&self, id: DocumentId) -> bool {
        let current = self.document_id() == Some(id);
        if !current {
            tracing::debug!(%id, "ignoring event for a replaced document");
        }
        current
    }

    /// Page count resolved; the viewer starts on page 1. Returns false for
    /// stale ids.
    pub fn on_document_metadata(&mut self, id: DocumentId, page_count: u32) -> bool {
        if !self.is_current(id) {
            return false;
        }
        let Some(doc) = self.document.as_mut() else {
            return false;
        };

        doc.page_count = Some(page_count);
        self.tracker.set_current_page(1);
        tracing::info!(%id, page_count, "document ready");
        self.queue_window();
        true
    }

    /// Metadata resolution failed; the viewer stays in its loading state
    pub fn on_document_failed(&mut self, id: DocumentId, error: &Error) {
        if self.is_current(id) {
            tracing::warn!(%id, error = %error, "failed to load document");
        }
    }

    /// A page finished rendering with its intrinsic size.
    ///
    /// Whichever page reports first once the document is ready sets the
    /// initial zoom: landscape pages fit the window, portrait pages fit the
    /// width. Later reports are ignored until the next document.
    pub fn on_page_loaded(&mut self, id: DocumentId, page: u32, size: Size) {
        if !self.is_current(id) || self.page_count().is_none() || self.page_size.is_some() {
            return;
        }

        self.page_size = Some(size);
        let scale = if size.is_landscape() {
            self.fit_window_for(size)
        } else {
            fit_width_scale()
        };

        tracing::debug!(
            width = size.width,
            height = size.height,
            page,
            scale,
            "initial zoom from first loaded page"
        );
        self.set_scale(scale);
    }

    /// Resize observation for the scroll container
    pub fn set_container_size(&mut self, client: Size) {
        self.container = Some(client);
    }

    /// Container size minus padding
    pub fn content_size(&self) -> Size {
        match self.container {
            Some(client) => geometry::content_size(client, self.config.container_padding),
            None => Size::new(self.config.initial_content_width, 0.0),
        }
    }

    /// Width every page slot is drawn at
    pub fn scaled_width(&self) -> f64 {
        self.content_size().width * self.scale
    }

    fn fit_window_for(&self, page: Size) -> f64 {
        if self.container.is_none() {
            return fit_width_scale();
        }
        let content = self.content_size();
        clamp_zoom(fit_window_scale(
            page.width,
            page.height,
            content.width,
            content.height,
        ))
    }

    fn set_scale(&mut self, scale: f64) {
        let scale = clamp_zoom(scale);
        if scale == self.scale {
            return;
        }
        self.scale = scale;
        self.queue_window();
    }

    pub fn zoom_in(&mut self) {
        self.set_scale(step_zoom(self.scale, ZOOM_STEP));
    }

    pub fn zoom_out(&mut self) {
        self.set_scale(step_zoom(self.scale, -ZOOM_STEP));
    }

    /// Fit the whole first page; 1.0 when its size is not known yet
    pub fn fit_to_window(&mut self) {
        let scale = match self.page_size {
            Some(size) => self.fit_window_for(size),
            None => BASELINE_SCALE,
        };
        self.set_scale(scale);
    }

    pub fn fit_to_width(&mut self) {
        self.set_scale(fit_width_scale());
    }

    /// Move `offset` pages from the current one, clamped to the document
    pub fn change_page(&mut self, offset: i32) -> bool {
        self.change_page_at(offset, Instant::now())
    }

    pub fn change_page_at(&mut self, offset: i32, now: Instant) -> bool {
        let last = self.page_count().unwrap_or(1).max(1);
        let target = (i64::from(self.current_page()) + i64::from(offset)).clamp(1, i64::from(last));
        self.scroll_to_page_at(target as u32, now)
    }

    pub fn scroll_to_page(&mut self, page: u32) -> bool {
        self.scroll_to_page_at(page, Instant::now())
    }

    pub fn scroll_to_page_at(&mut self, page: u32, now: Instant) -> bool {
        let moved = self.tracker.scroll_to_page_at(page, now);
        if moved {
            self.queue_window();
        }
        moved
    }

    pub fn toggle_overlay(&mut self) -> bool {
        self.overlay_visible = !self.overlay_visible;
        self.overlay_visible
    }

    pub fn register_page_anchor(&mut self, page: u32, anchor: Option<H::Anchor>) {
        self.tracker.register_page_anchor(page, anchor);
    }

    /// Follow the session's active result.
    ///
    /// Acts only when the version moved: a located result scrolls to its page
    /// and forces the overlay on, even if it equals the previous result.
    pub fn sync_active_result(&mut self, result: &Versioned<Option<LocatorResult>>) -> bool {
        self.sync_active_result_at(result, Instant::now())
    }

    pub fn sync_active_result_at(
        &mut self,
        result: &Versioned<Option<LocatorResult>>,
        now: Instant,
    ) -> bool {
        if self.seen_result_version == Some(result.version()) {
            return false;
        }
        self.seen_result_version = Some(result.version());
        self.active_result = result.get().clone();

        let Some(page) = self.active_result.as_ref().and_then(|r| r.page_number()) else {
            return false;
        };

        self.overlay_visible = true;
        self.scroll_to_page_at(page, now)
    }

    pub fn overlay_for(&self, page: u32) -> Option<OverlayBox> {
        compute_overlay(self.active_result.as_ref(), page, self.overlay_visible)
    }

    /// One slot per page at the current scale; empty until metadata arrives
    pub fn page_slots(&self) -> Vec<PageSlot> {
        let Some(page_count) = self.page_count() else {
            return Vec::new();
        };
        self.render_window
            .plan(page_count, self.current_page(), self.scaled_width(), self.scale)
    }

    pub fn observe(&mut self) -> Option<u32> {
        self.observe_at(Instant::now())
    }

    /// Organic scroll update from the host viewport
    pub fn observe_at(&mut self, now: Instant) -> Option<u32> {
        let changed = self.tracker.observe_at(now);
        if changed.is_some() {
            self.queue_window();
        }
        changed
    }

    pub fn tick(&mut self, now: Instant) -> bool {
        self.tracker.tick(now)
    }

    /// Renders needed since the last drain, in page order
    pub fn drain_render_requests(&mut self) -> Vec<RenderKey> {
        std::mem::take(&mut self.render_requests).into_iter().collect()
    }

    fn queue_window(&mut self) {
        let Some(page_count) = self.page_count() else {
            return;
        };
        let keys = self
            .render_window
            .rerender_keys(page_count, self.current_page(), self.scale);
        self.render_requests.extend(keys);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Location;
    use crate::viewer::geometry::Box2d;
    use crate::viewer::intersection::Rect;
    use crate::viewer::tracker::tests::RecordingHost;
    use crate::viewer::tracker::ScrollState;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn pdf(name: &str) -> Document {
        Document::from_bytes(name, b"%PDF-1.7".to_vec()).unwrap()
    }

    fn page_rect(page: u32) -> Rect {
        Rect::new(0.0, (page - 1) as f64 * 1024.0, 800.0, 1000.0)
    }

    fn viewer() -> ViewerOrchestrator<RecordingHost> {
        let host = RecordingHost {
            viewport: Rect::new(0.0, 0.0, 864.0, 664.0),
            ..Default::default()
        };
        ViewerOrchestrator::new(host, ViewerConfig::default())
    }

    fn ready(viewer: &mut ViewerOrchestrator<RecordingHost>, pages: u32) -> DocumentId {
        let id = viewer.load_document(pdf("doc.pdf"));
        viewer.on_document_metadata(id, pages);
        for page in 1..=pages {
            viewer.register_page_anchor(page, Some(page_rect(page)));
        }
        id
    }

    fn result_on(page: u32) -> LocatorResult {
        LocatorResult::located(
            "在这里",
            Location {
                page_number: page,
                box2d: Box2d::from([100.0, 100.0, 200.0, 200.0]),
                snippet: String::new(),
            },
        )
    }

    #[test]
    fn test_phases() {
        let mut viewer = viewer();
        assert_eq!(viewer.phase(), ViewerPhase::NoDocument);

        let id = viewer.load_document(pdf("a.pdf"));
        assert_eq!(viewer.phase(), ViewerPhase::DocumentLoading);
        assert!(viewer.page_slots().is_empty());

        viewer.on_document_metadata(id, 4);
        assert_eq!(viewer.phase(), ViewerPhase::DocumentReady { page_count: 4 });

        viewer.close_document();
        assert_eq!(viewer.phase(), ViewerPhase::NoDocument);
    }

    #[test]
    fn test_stale_metadata_is_ignored() {
        let mut viewer = viewer();
        let old = viewer.load_document(pdf("old.pdf"));
        let new = viewer.load_document(pdf("new.pdf"));
        assert_ne!(old, new);

        assert!(!viewer.on_document_metadata(old, 99));
        assert_eq!(viewer.phase(), ViewerPhase::DocumentLoading);
        assert!(viewer.on_document_metadata(new, 3));
        assert_eq!(viewer.page_count(), Some(3));
    }

    #[test]
    fn test_failed_metadata_keeps_loading() {
        let mut viewer = viewer();
        let id = viewer.load_document(pdf("broken.pdf"));
        viewer.on_document_failed(
            id,
            &Error::Pdfium {
                reason: "bad xref".to_string(),
            },
        );
        assert_eq!(viewer.phase(), ViewerPhase::DocumentLoading);
    }

    #[test]
    fn test_portrait_first_page_fits_width() {
        let mut viewer = viewer();
        viewer.set_container_size(Size::new(864.0, 664.0));
        let id = ready(&mut viewer, 3);

        viewer.zoom_in();
        viewer.on_page_loaded(id, 1, Size::new(595.0, 842.0));
        assert_eq!(viewer.scale(), 1.0);
    }

    #[test]
    fn test_landscape_first_page_fits_window_once() {
        let mut viewer = viewer();
        viewer.set_container_size(Size::new(1064.0, 564.0));
        let id = ready(&mut viewer, 3);

        viewer.on_page_loaded(id, 1, Size::new(1600.0, 900.0));
        let expected = (500.0 / 1000.0) * (1600.0 / 900.0);
        assert!((viewer.scale() - expected).abs() < 1e-9);

        // Only the first report counts
        viewer.zoom_in();
        let zoomed = viewer.scale();
        viewer.on_page_loaded(id, 1, Size::new(1600.0, 900.0));
        assert_eq!(viewer.scale(), zoomed);
    }

    #[test]
    fn test_first_loaded_page_sets_initial_zoom() {
        let mut viewer = viewer();
        viewer.set_container_size(Size::new(1064.0, 564.0));
        let id = ready(&mut viewer, 20);

        viewer.on_page_loaded(id, 2, Size::new(1600.0, 900.0));
        assert_eq!(viewer.page_size(), Some(Size::new(1600.0, 900.0)));
        assert!(viewer.scale() < 1.0);

        // Later pages, page 1 included, no longer change the zoom
        let scale = viewer.scale();
        viewer.on_page_loaded(id, 1, Size::new(600.0, 800.0));
        assert_eq!(viewer.page_size(), Some(Size::new(1600.0, 900.0)));
        assert_eq!(viewer.scale(), scale);
    }

    #[test]
    fn test_page_loaded_before_metadata_is_ignored() {
        let mut viewer = viewer();
        viewer.set_container_size(Size::new(1064.0, 564.0));
        let id = viewer.load_document(pdf("doc.pdf"));

        viewer.on_page_loaded(id, 1, Size::new(1600.0, 900.0));
        assert_eq!(viewer.page_size(), None);
        assert_eq!(viewer.scale(), 1.0);

        viewer.on_document_metadata(id, 3);
        viewer.on_page_loaded(id, 1, Size::new(1600.0, 900.0));
        assert_eq!(viewer.page_size(), Some(Size::new(1600.0, 900.0)));
    }

    #[test]
    fn test_metadata_starts_on_first_page() {
        let mut viewer = viewer();
        let id = viewer.load_document(pdf("doc.pdf"));
        viewer.register_page_anchor(3, Some(page_rect(3)));
        assert!(viewer.scroll_to_page(3));
        assert_eq!(viewer.current_page(), 3);

        assert!(viewer.on_document_metadata(id, 10));
        assert_eq!(viewer.current_page(), 1);
        assert_eq!(viewer.tracker().scroll_state(), ScrollState::Idle);
    }

    #[test]
    fn test_new_document_resets_zoom_and_page_size() {
        let mut viewer = viewer();
        viewer.set_container_size(Size::new(1064.0, 564.0));
        let id = ready(&mut viewer, 5);
        viewer.on_page_loaded(id, 1, Size::new(1600.0, 900.0));
        viewer.zoom_in();
        viewer.toggle_overlay();
        viewer.scroll_to_page(4);

        viewer.load_document(pdf("next.pdf"));
        assert_eq!(viewer.scale(), 1.0);
        assert_eq!(viewer.page_size(), None);
        assert_eq!(viewer.current_page(), 1);
        assert!(viewer.overlay_visible());
        assert_eq!(viewer.tracker().anchor_count(), 0);
    }

    #[test]
    fn test_zoom_controls_stay_in_range() {
        let mut viewer = viewer();
        ready(&mut viewer, 2);

        for _ in 0..30 {
            viewer.zoom_in();
        }
        assert_eq!(viewer.scale(), 2.5);
        for _ in 0..40 {
            viewer.zoom_out();
        }
        assert_eq!(viewer.scale(), 0.1);

        viewer.fit_to_width();
        assert_eq!(viewer.scale(), 1.0);
    }

    #[test]
    fn test_fit_to_window_without_page_size_is_baseline() {
        let mut viewer = viewer();
        ready(&mut viewer, 2);
        viewer.zoom_in();
        viewer.fit_to_window();
        assert_eq!(viewer.scale(), 1.0);
    }

    #[test]
    fn test_change_page_clamps_to_document() {
        let mut viewer = viewer();
        ready(&mut viewer, 3);
        let now = Instant::now();

        assert!(viewer.change_page_at(-1, now));
        assert_eq!(viewer.current_page(), 1);

        viewer.change_page_at(5, now);
        assert_eq!(viewer.current_page(), 3);
    }

    #[test]
    fn test_scale_change_requests_window_only() {
        let mut viewer = viewer();
        ready(&mut viewer, 20);
        viewer.scroll_to_page(10);
        viewer.drain_render_requests();

        viewer.zoom_in();
        let keys = viewer.drain_render_requests();
        let pages: Vec<u32> = keys.iter().map(|k| k.page).collect();
        assert_eq!(pages, vec![8, 9, 10, 11, 12]);
        assert!(keys.iter().all(|k| k.scale_millis == 1100));
        assert!(viewer.drain_render_requests().is_empty());
    }

    #[test]
    fn test_identical_result_retriggers_scroll() {
        let mut viewer = viewer();
        ready(&mut viewer, 10);
        let start = Instant::now();
        let mut active = Versioned::new(None);

        active.set(Some(result_on(7)));
        assert!(viewer.sync_active_result_at(&active, start));
        assert_eq!(viewer.current_page(), 7);

        // User scrolls away after the settle window
        let later = start + Duration::from_secs(2);
        viewer.host_mut().viewport = page_rect(2);
        viewer.observe_at(later);
        assert_eq!(viewer.current_page(), 2);
        viewer.toggle_overlay();

        // Same value again is still a new event
        active.set(Some(result_on(7)));
        assert!(viewer.sync_active_result_at(&active, later));
        assert_eq!(viewer.current_page(), 7);
        assert!(viewer.overlay_visible());

        // Unchanged version does nothing
        assert!(!viewer.sync_active_result_at(&active, later));
    }

    #[test]
    fn test_answer_only_result_clears_overlay_without_scrolling() {
        let mut viewer = viewer();
        ready(&mut viewer, 5);
        let mut active = Versioned::new(Some(result_on(3)));
        viewer.sync_active_result(&active);
        assert!(viewer.overlay_for(3).is_some());

        active.set(Some(LocatorResult::answer_only("没有位置")));
        assert!(!viewer.sync_active_result(&active));
        assert_eq!(viewer.current_page(), 3);
        assert_eq!(viewer.overlay_for(3), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_result_scroll_suspends_observation() {
        let mut viewer = viewer();
        ready(&mut viewer, 10);

        viewer.sync_active_result(&Versioned::new(Some(result_on(6))));
        assert_eq!(viewer.current_page(), 6);

        // The smooth scroll passes page 3 on its way down
        viewer.host_mut().viewport = page_rect(3);
        tokio::time::advance(Duration::from_millis(300)).await;
        assert_eq!(viewer.observe(), None);
        assert_eq!(viewer.current_page(), 6);

        tokio::time::advance(Duration::from_millis(600)).await;
        assert!(!matches!(
            viewer.tracker().scroll_state(),
            ScrollState::Idle
        ));
        viewer.host_mut().viewport = page_rect(6);
        viewer.observe();
        assert_eq!(viewer.tracker().scroll_state(), ScrollState::Idle);
        assert_eq!(viewer.current_page(), 6);
    }
}
