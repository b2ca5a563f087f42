//! Current-page tracking over a scroll container
//!
//! Two paths move the current page: organic observation of what is visible,
//! and programmatic `scroll_to_page`. While a programmatic scroll settles the
//! tracker sits in [`ScrollState::ProgrammaticScroll`] and observation is
//! ignored. The settle deadline is an upper bound on the smooth-scroll
//! animation, not a completion signal; it expires lazily on the next
//! observation or [`ViewportTracker::tick`].

use crate::viewer::intersection::{
    IntersectionEntry, IntersectionObserver, ObserverOptions, Rect,
};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBehavior {
    Smooth,
    Instant,
}

/// Host-side element a page is drawn into
pub trait PageAnchor {
    /// Bounds in scroll-content coordinates
    fn bounds(&self) -> Rect;
}

impl PageAnchor for Rect {
    fn bounds(&self) -> Rect {
        *self
    }
}

/// The scrollable container the pages live in
pub trait ScrollHost {
    type Anchor: PageAnchor;

    /// Currently visible part of the content, in scroll-content coordinates
    fn viewport(&self) -> Rect;

    /// Bring the anchor's top edge into view
    fn scroll_into_view(&mut self, anchor: &Self::Anchor, behavior: ScrollBehavior);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollState {
    Idle,
    ProgrammaticScroll { target: u32, expires_at: Instant },
}

pub struct ViewportTracker<H: ScrollHost> {
    host: H,
    current_page: u32,
    scroll: ScrollState,
    anchors: BTreeMap<u32, H::Anchor>,
    observer: IntersectionObserver,
    settle_delay: Duration,
}

impl<H: ScrollHost> ViewportTracker<H> {
    pub fn new(host: H, settle_delay: Duration, options: ObserverOptions) -> Self {
        Self {
            host,
            current_page: 1,
            scroll: ScrollState::Idle,
            anchors: BTreeMap::new(),
            observer: IntersectionObserver::new(options),
            settle_delay,
        }
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn scroll_state(&self) -> ScrollState {
        self.scroll
    }

    /// Whether organic observation is currently ignored
    pub fn is_suspended(&self, now: Instant) -> bool {
        matches!(self.scroll, ScrollState::ProgrammaticScroll { expires_at, .. } if now < expires_at)
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn is_registered(&self, page: u32) -> bool {
        self.anchors.contains_key(&page)
    }

    pub fn anchor_count(&self) -> usize {
        self.anchors.len()
    }

    /// Add, replace or remove (`None`) the anchor for a page
    pub fn register_page_anchor(&mut self, page: u32, anchor: Option<H::Anchor>) {
        match anchor {
            Some(anchor) => {
                self.anchors.insert(page, anchor);
            }
            None => {
                self.anchors.remove(&page);
            }
        }
    }

    pub fn scroll_to_page(&mut self, target: u32) -> bool {
        self.scroll_to_page_at(target, Instant::now())
    }

    /// Jump to `target` if its anchor is mounted.
    ///
    /// The current page changes immediately; observation is suspended until
    /// `now + settle_delay`. Unmounted targets are a silent no-op.
    pub fn scroll_to_page_at(&mut self, target: u32, now: Instant) -> bool {
        let Some(anchor) = self.anchors.get(&target) else {
            tracing::debug!(page = target, "scroll target not mounted yet, ignoring");
            return false;
        };

        self.current_page = target;
        self.scroll = ScrollState::ProgrammaticScroll {
            target,
            expires_at: now + self.settle_delay,
        };
        self.host.scroll_into_view(anchor, ScrollBehavior::Smooth);

        tracing::debug!(page = target, "programmatic scroll started");
        true
    }

    /// Expire a settled programmatic scroll. Returns true if it just ended.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.scroll {
            ScrollState::ProgrammaticScroll { target, expires_at } if now >= expires_at => {
                self.scroll = ScrollState::Idle;
                tracing::debug!(page = target, "programmatic scroll settled");
                true
            }
            _ => false,
        }
    }

    pub fn observe(&mut self) -> Option<u32> {
        self.observe_at(Instant::now())
    }

    /// Evaluate every mounted anchor against the host viewport and apply the
    /// resulting entries. Returns the new current page if it changed.
    pub fn observe_at(&mut self, now: Instant) -> Option<u32> {
        let viewport = self.host.viewport();
        let targets = self
            .anchors
            .iter()
            .map(|(page, anchor)| (*page, anchor.bounds()));
        let entries = self.observer.evaluate(viewport, targets);

        self.apply_entries(&entries, now)
    }

    /// Organic path: pick the most visible intersecting page.
    ///
    /// Ties go to the later entry. Ignored while a programmatic scroll is
    /// settling.
    pub fn apply_entries(&mut self, entries: &[IntersectionEntry], now: Instant) -> Option<u32> {
        self.tick(now);

        if self.is_suspended(now) {
            if !entries.is_empty() {
                tracing::trace!(count = entries.len(), "observation suspended, dropping entries");
            }
            return None;
        }

        let best = entries
            .iter()
            .filter(|e| e.is_intersecting && e.ratio > 0.0)
            .max_by(|a, b| {
                a.ratio
                    .partial_cmp(&b.ratio)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })?;

        if best.page == self.current_page {
            return None;
        }

        self.current_page = best.page;
        Some(best.page)
    }

    /// Jump the current page without scrolling; ends any programmatic scroll
    pub fn set_current_page(&mut self, page: u32) {
        self.current_page = page.max(1);
        self.scroll = ScrollState::Idle;
    }

    /// Back to page 1 with nothing mounted, for a freshly loaded document
    pub fn reset(&mut self) {
        self.current_page = 1;
        self.scroll = ScrollState::Idle;
        self.anchors.clear();
        self.observer.disconnect();
    }

    /// Stop observing; anchors stay registered
    pub fn disconnect(&mut self) {
        self.observer.disconnect();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Scroll container stand-in that records scroll requests
    #[derive(Debug, Default)]
    pub(crate) struct RecordingHost {
        pub viewport: Rect,
        pub scrolled_to: Vec<Rect>,
    }

    impl ScrollHost for RecordingHost {
        type Anchor = Rect;

        fn viewport(&self) -> Rect {
            self.viewport
        }

        fn scroll_into_view(&mut self, anchor: &Rect, _behavior: ScrollBehavior) {
            self.scrolled_to.push(*anchor);
        }
    }

    fn page_rect(page: u32) -> Rect {
        Rect::new(0.0, (page - 1) as f64 * 1024.0, 800.0, 1000.0)
    }

    fn tracker_with_pages(count: u32) -> ViewportTracker<RecordingHost> {
        let host = RecordingHost {
            viewport: Rect::new(0.0, 0.0, 800.0, 1000.0),
            ..Default::default()
        };
        let mut tracker =
            ViewportTracker::new(host, Duration::from_millis(800), ObserverOptions::default());
        for page in 1..=count {
            tracker.register_page_anchor(page, Some(page_rect(page)));
        }
        tracker
    }

    fn entry(page: u32, ratio: f64) -> IntersectionEntry {
        IntersectionEntry {
            page,
            ratio,
            is_intersecting: ratio > 0.0,
        }
    }

    #[test]
    fn test_scroll_to_page_is_synchronous_and_suspends() {
        let mut tracker = tracker_with_pages(10);
        let now = Instant::now();

        assert!(tracker.scroll_to_page_at(5, now));
        assert_eq!(tracker.current_page(), 5);
        assert!(tracker.is_suspended(now));
        assert_eq!(tracker.host().scrolled_to, vec![page_rect(5)]);
    }

    #[test]
    fn test_observation_ignored_during_settle_window() {
        let mut tracker = tracker_with_pages(10);
        let now = Instant::now();
        tracker.scroll_to_page_at(5, now);

        let changed = tracker.apply_entries(&[entry(3, 0.9)], now + Duration::from_millis(400));
        assert_eq!(changed, None);
        assert_eq!(tracker.current_page(), 5);
    }

    #[test]
    fn test_observation_resumes_after_settle_delay() {
        let mut tracker = tracker_with_pages(10);
        let now = Instant::now();
        tracker.scroll_to_page_at(5, now);

        let later = now + Duration::from_millis(800);
        let changed = tracker.apply_entries(&[entry(3, 0.9)], later);
        assert_eq!(changed, Some(3));
        assert_eq!(tracker.scroll_state(), ScrollState::Idle);
    }

    #[test]
    fn test_scroll_to_unmounted_page_is_noop() {
        let mut tracker = tracker_with_pages(3);
        let now = Instant::now();

        assert!(!tracker.scroll_to_page_at(7, now));
        assert_eq!(tracker.current_page(), 1);
        assert!(!tracker.is_suspended(now));
        assert!(tracker.host().scrolled_to.is_empty());
    }

    #[test]
    fn test_highest_ratio_wins() {
        let mut tracker = tracker_with_pages(5);
        let changed = tracker.apply_entries(
            &[entry(2, 0.3), entry(3, 0.7), entry(4, 0.5)],
            Instant::now(),
        );
        assert_eq!(changed, Some(3));
    }

    #[test]
    fn test_non_intersecting_entries_are_ignored() {
        let mut tracker = tracker_with_pages(5);
        let entries = [
            IntersectionEntry {
                page: 4,
                ratio: 0.0,
                is_intersecting: false,
            },
            entry(1, 0.2),
        ];
        assert_eq!(tracker.apply_entries(&entries, Instant::now()), None);
        assert_eq!(tracker.current_page(), 1);
    }

    #[test]
    fn test_observe_follows_host_viewport() {
        let mut tracker = tracker_with_pages(5);
        let now = Instant::now();
        tracker.observe_at(now);

        tracker.host_mut().viewport = Rect::new(0.0, 2048.0, 800.0, 1000.0);
        assert_eq!(tracker.observe_at(now), Some(3));
        assert_eq!(tracker.current_page(), 3);
    }

    #[test]
    fn test_unregistered_anchor_stops_being_observed() {
        let mut tracker = tracker_with_pages(5);
        tracker.register_page_anchor(3, None);
        assert!(!tracker.is_registered(3));

        tracker.host_mut().viewport = Rect::new(0.0, 2048.0, 800.0, 1000.0);
        assert_eq!(tracker.observe_at(Instant::now()), None);
        assert_eq!(tracker.current_page(), 1);
    }

    #[test]
    fn test_reset_clears_suspension_and_anchors() {
        let mut tracker = tracker_with_pages(5);
        let now = Instant::now();
        tracker.scroll_to_page_at(4, now);

        tracker.reset();
        assert_eq!(tracker.current_page(), 1);
        assert_eq!(tracker.scroll_state(), ScrollState::Idle);
        assert_eq!(tracker.anchor_count(), 0);
    }
}
