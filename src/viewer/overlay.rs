//! Overlay projection of a located answer onto its page

use crate::query::LocatorResult;
use crate::viewer::geometry::{normalized_box_to_percent, BoxPercent};
use serde::Serialize;

/// Text shown next to the marker arrow
pub const MARKER_LABEL: &str = "位于此处";

/// Arrow drawn just above the highlight's top edge, horizontally centred
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    /// Percent of page width
    pub left: f64,
    /// Percent of page height
    pub top: f64,
    pub label: &'static str,
}

/// Everything the shell needs to draw the overlay on one page.
/// Positions are percentages, so they hold at any zoom level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayBox {
    pub page: u32,
    pub highlight: BoxPercent,
    pub marker: Marker,
}

/// Overlay for `page`, if the active result points at it and overlays are shown
pub fn compute_overlay(
    active: Option<&LocatorResult>,
    page: u32,
    visible: bool,
) -> Option<OverlayBox> {
    if !visible {
        return None;
    }

    let location = active?.location.as_ref()?;
    if location.page_number != page {
        return None;
    }

    let highlight = normalized_box_to_percent(location.box2d);
    Some(OverlayBox {
        page,
        highlight,
        marker: Marker {
            left: highlight.left + highlight.width / 2.0,
            top: highlight.top,
            label: MARKER_LABEL,
        },
    })
}
