//! Page visibility computation
//!
//! Mirrors how a browser `IntersectionObserver` reports: an entry is emitted
//! for a target only when its intersection ratio crosses one of the configured
//! thresholds or its intersecting state flips. The first evaluation of a
//! target always reports it.

use std::collections::HashMap;

/// Axis-aligned rectangle in scroll-content coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Overlap of two rectangles; `None` when they don't touch
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if right < left || bottom < top {
            return None;
        }

        Some(Rect::new(left, top, right - left, bottom - top))
    }
}

/// Grow (positive) or shrink (negative) the root box, as fractions of its size
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RootMargin {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl RootMargin {
    /// `-10% 0px -50% 0px`: only the upper part of the viewport counts
    pub const UPPER_HALF: RootMargin = RootMargin {
        top: -0.10,
        right: 0.0,
        bottom: -0.50,
        left: 0.0,
    };

    pub fn apply(&self, root: Rect) -> Rect {
        let top = root.height * self.top;
        let bottom = root.height * self.bottom;
        let left = root.width * self.left;
        let right = root.width * self.right;

        Rect::new(
            root.x - left,
            root.y - top,
            (root.width + left + right).max(0.0),
            (root.height + top + bottom).max(0.0),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObserverOptions {
    /// Ascending intersection ratios at which entries are reported
    pub thresholds: Vec<f64>,
    pub root_margin: RootMargin,
}

impl Default for ObserverOptions {
    fn default() -> Self {
        Self {
            thresholds: vec![0.1, 0.5, 0.8],
            root_margin: RootMargin::UPPER_HALF,
        }
    }
}

/// Visibility change reported for one page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionEntry {
    pub page: u32,
    pub ratio: f64,
    pub is_intersecting: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Observed {
    threshold_index: usize,
    is_intersecting: bool,
}

/// Stateful evaluator; remembers the last reported state per page
#[derive(Debug, Clone, Default)]
pub struct IntersectionObserver {
    options: ObserverOptions,
    last: HashMap<u32, Observed>,
}

impl IntersectionObserver {
    pub fn new(mut options: ObserverOptions) -> Self {
        options.thresholds.retain(|t| t.is_finite());
        options
            .thresholds
            .sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        Self {
            options,
            last: HashMap::new(),
        }
    }

    pub fn options(&self) -> &ObserverOptions {
        &self.options
    }

    /// Evaluate targets against the visible part of the container.
    ///
    /// Targets that were seen before but are missing now are forgotten
    /// without producing an entry.
    pub fn evaluate<I>(&mut self, viewport: Rect, targets: I) -> Vec<IntersectionEntry>
    where
        I: IntoIterator<Item = (u32, Rect)>,
    {
        let root = self.options.root_margin.apply(viewport);
        let mut entries = Vec::new();
        let mut seen = Vec::new();

        for (page, bounds) in targets {
            seen.push(page);

            let overlap = bounds.intersection(&root);
            let is_intersecting = overlap.is_some();
            let ratio = match overlap {
                Some(o) if bounds.area() > 0.0 => (o.area() / bounds.area()).min(1.0),
                Some(_) => 1.0,
                None => 0.0,
            };

            let observed = Observed {
                threshold_index: self.threshold_index(ratio, is_intersecting),
                is_intersecting,
            };

            if self.last.insert(page, observed) != Some(observed) {
                entries.push(IntersectionEntry {
                    page,
                    ratio,
                    is_intersecting,
                });
            }
        }

        self.last.retain(|page, _| seen.contains(page));
        entries
    }

    /// Forget every target, as when the observer is disconnected
    pub fn disconnect(&mut self) {
        self.last.clear();
    }

    fn threshold_index(&self, ratio: f64, is_intersecting: bool) -> usize {
        if !is_intersecting {
            return 0;
        }
        self.options
            .thresholds
            .iter()
            .take_while(|&&t| ratio >= t)
            .count()
            + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pages(count: u32, height: f64, gap: f64) -> Vec<(u32, Rect)> {
        (1..=count)
            .map(|p| (p, Rect::new(0.0, (p - 1) as f64 * (height + gap), 800.0, height)))
            .collect()
    }

    #[test]
    fn test_rect_intersection() {
        let a = Rect::new(0.0, 0.0, 100.0, 100.0);
        let b = Rect::new(50.0, 80.0, 100.0, 100.0);
        assert_eq!(a.intersection(&b), Some(Rect::new(50.0, 80.0, 50.0, 20.0)));

        let far = Rect::new(0.0, 500.0, 10.0, 10.0);
        assert_eq!(a.intersection(&far), None);
    }

    #[test]
    fn test_upper_half_margin() {
        let root = Rect::new(0.0, 1000.0, 800.0, 600.0);
        let shrunk = RootMargin::UPPER_HALF.apply(root);
        assert_eq!(shrunk.y, 1060.0);
        assert!((shrunk.height - 240.0).abs() < 1e-9);
        assert_eq!(shrunk.width, 800.0);
    }

    #[test]
    fn test_first_evaluation_reports_every_target() {
        let mut observer = IntersectionObserver::new(ObserverOptions::default());
        let entries = observer.evaluate(Rect::new(0.0, 0.0, 800.0, 1000.0), pages(3, 1000.0, 24.0));

        assert_eq!(entries.len(), 3);
        assert!(entries[0].is_intersecting);
        assert!(!entries[1].is_intersecting);
        assert!(!entries[2].is_intersecting);
    }

    #[test]
    fn test_unchanged_bucket_is_not_reported_again() {
        let mut observer = IntersectionObserver::new(ObserverOptions::default());
        let targets = pages(3, 1000.0, 24.0);

        observer.evaluate(Rect::new(0.0, 0.0, 800.0, 1000.0), targets.clone());
        // Small scroll: page 1 ratio stays in the same threshold bucket
        let entries = observer.evaluate(Rect::new(0.0, 5.0, 800.0, 1000.0), targets);
        assert!(entries.is_empty());
    }

    #[test]
    fn test_scrolling_to_next_page_reports_changes() {
        let mut observer = IntersectionObserver::new(ObserverOptions::default());
        let targets = pages(3, 1000.0, 24.0);

        observer.evaluate(Rect::new(0.0, 0.0, 800.0, 1000.0), targets.clone());
        let entries = observer.evaluate(Rect::new(0.0, 1024.0, 800.0, 1000.0), targets);

        let page1 = entries.iter().find(|e| e.page == 1).unwrap();
        let page2 = entries.iter().find(|e| e.page == 2).unwrap();
        assert!(!page1.is_intersecting);
        assert!(page2.is_intersecting);
    }

    #[test]
    fn test_ratio_is_relative_to_target_area() {
        let mut observer = IntersectionObserver::new(ObserverOptions {
            thresholds: vec![0.5],
            root_margin: RootMargin::default(),
        });
        let entries = observer.evaluate(
            Rect::new(0.0, 0.0, 100.0, 100.0),
            vec![(1, Rect::new(0.0, 50.0, 100.0, 200.0))],
        );
        assert_eq!(entries.len(), 1);
        assert!((entries[0].ratio - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_removed_target_is_forgotten() {
        let mut observer = IntersectionObserver::new(ObserverOptions::default());
        let viewport = Rect::new(0.0, 0.0, 800.0, 1000.0);

        observer.evaluate(viewport, pages(2, 1000.0, 24.0));
        let entries = observer.evaluate(viewport, pages(1, 1000.0, 24.0));
        assert!(entries.is_empty());

        // Re-registered page 2 is reported afresh
        let entries = observer.evaluate(viewport, pages(2, 1000.0, 24.0));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].page, 2);
    }

    #[test]
    fn test_disconnect_resets_reporting() {
        let mut observer = IntersectionObserver::new(ObserverOptions::default());
        let viewport = Rect::new(0.0, 0.0, 800.0, 1000.0);

        observer.evaluate(viewport, pages(2, 1000.0, 24.0));
        observer.disconnect();
        assert_eq!(observer.evaluate(viewport, pages(2, 1000.0, 24.0)).len(), 2);
    }
}
