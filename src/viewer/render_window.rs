//! Render windowing
//!
//! Only pages within `radius` of the current page get real renders. Every
//! other page is a placeholder with the same outer footprint so the total
//! scroll height never changes as pages enter or leave the window.

use std::ops::RangeInclusive;

pub const DEFAULT_WINDOW_RADIUS: u32 = 2;

/// Height/width ratio assumed for every page slot (roughly A4/Letter)
pub const PLACEHOLDER_ASPECT: f64 = 1.294;

pub fn should_render_full(page: u32, current_page: u32, radius: u32) -> bool {
    page.abs_diff(current_page) <= radius
}

/// Identity of one rendered bitmap: a page at a scale.
///
/// Scale is stored in thousandths so keys hash and compare exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderKey {
    pub page: u32,
    pub scale_millis: u32,
}

impl RenderKey {
    pub fn new(page: u32, scale: f64) -> Self {
        Self {
            page,
            scale_millis: (scale * 1000.0).round().max(0.0) as u32,
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale_millis as f64 / 1000.0
    }
}

/// Outer size of a page slot in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Footprint {
    pub width: f64,
    pub min_height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PageContent {
    Full(RenderKey),
    Placeholder,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSlot {
    pub page: u32,
    pub footprint: Footprint,
    pub content: PageContent,
}

impl PageSlot {
    pub fn is_full(&self) -> bool {
        matches!(self.content, PageContent::Full(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderWindow {
    radius: u32,
    placeholder_aspect: f64,
}

impl Default for RenderWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_RADIUS, PLACEHOLDER_ASPECT)
    }
}

impl RenderWindow {
    pub fn new(radius: u32, placeholder_aspect: f64) -> Self {
        Self {
            radius,
            placeholder_aspect,
        }
    }

    pub fn radius(&self) -> u32 {
        self.radius
    }

    pub fn contains(&self, page: u32, current_page: u32) -> bool {
        should_render_full(page, current_page, self.radius)
    }

    /// Fully rendered pages, clipped to the document
    pub fn range(&self, current_page: u32, page_count: u32) -> RangeInclusive<u32> {
        if page_count == 0 {
            return 1..=0;
        }
        let current = current_page.clamp(1, page_count);
        let start = current.saturating_sub(self.radius).max(1);
        let end = current.saturating_add(self.radius).min(page_count);
        start..=end
    }

    pub fn footprint(&self, scaled_width: f64) -> Footprint {
        let width = scaled_width.max(0.0);
        Footprint {
            width,
            min_height: width * self.placeholder_aspect,
        }
    }

    /// One slot per page, in page order
    pub fn plan(
        &self,
        page_count: u32,
        current_page: u32,
        scaled_width: f64,
        scale: f64,
    ) -> Vec<PageSlot> {
        let footprint = self.footprint(scaled_width);

        (1..=page_count)
            .map(|page| PageSlot {
                page,
                footprint,
                content: if self.contains(page, current_page) {
                    PageContent::Full(RenderKey::new(page, scale))
                } else {
                    PageContent::Placeholder
                },
            })
            .collect()
    }

    /// Pages that must re-render after a scale change: the window only
    pub fn rerender_keys(&self, page_count: u32, current_page: u32, scale: f64) -> Vec<RenderKey> {
        self.range(current_page, page_count)
            .map(|page| RenderKey::new(page, scale))
            .collect()
    }
}
