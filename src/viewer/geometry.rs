//! Zoom and coordinate math
//!
//! Scale 1.0 means the rendered page is exactly as wide as the container's
//! content box. Everything here is a pure function of its inputs.

use serde::{Deserialize, Serialize};

pub const MIN_SCALE: f64 = 0.1;
pub const MAX_SCALE: f64 = 2.5;
pub const BASELINE_SCALE: f64 = 1.0;
pub const ZOOM_STEP: f64 = 0.1;

/// Width and height in pixels (or points, for intrinsic page sizes)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_landscape(&self) -> bool {
        self.width > self.height
    }
}

/// Bounding box on the model's 0-1000 grid, serialized as `[ymin, xmin, ymax, xmax]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct Box2d {
    pub ymin: f64,
    pub xmin: f64,
    pub ymax: f64,
    pub xmax: f64,
}

impl From<[f64; 4]> for Box2d {
    fn from([ymin, xmin, ymax, xmax]: [f64; 4]) -> Self {
        Self {
            ymin,
            xmin,
            ymax,
            xmax,
        }
    }
}

impl From<Box2d> for [f64; 4] {
    fn from(b: Box2d) -> Self {
        [b.ymin, b.xmin, b.ymax, b.xmax]
    }
}

/// Box position as percentages of the page's rendered size
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoxPercent {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

pub fn fit_width_scale() -> f64 {
    BASELINE_SCALE
}

/// Scale at which the whole page fits inside the content box.
///
/// Never larger than fit-width: portrait pages that already fit by height
/// stay at 1.0. Degenerate inputs fall back to 1.0.
pub fn fit_window_scale(
    page_width: f64,
    page_height: f64,
    content_width: f64,
    content_height: f64,
) -> f64 {
    let usable = |v: f64| v.is_finite() && v > 0.0;
    if !usable(content_width)
        || !usable(content_height)
        || !usable(page_width)
        || !usable(page_height)
    {
        return BASELINE_SCALE;
    }

    let aspect = page_width / page_height;
    let height_fit = (content_height / content_width) * aspect;

    fit_width_scale().min(height_fit)
}

pub fn normalized_box_to_percent(b: Box2d) -> BoxPercent {
    BoxPercent {
        top: b.ymin / 10.0,
        left: b.xmin / 10.0,
        width: (b.xmax - b.xmin) / 10.0,
        height: (b.ymax - b.ymin) / 10.0,
    }
}

pub fn clamp_zoom(scale: f64) -> f64 {
    if scale.is_nan() {
        return BASELINE_SCALE;
    }
    scale.clamp(MIN_SCALE, MAX_SCALE)
}

/// Apply a zoom delta, rounding to one decimal so repeated steps don't drift
pub fn step_zoom(scale: f64, delta: f64) -> f64 {
    clamp_zoom(((scale + delta) * 10.0).round() / 10.0)
}

/// Content box of a container after padding, never negative
pub fn content_size(client: Size, padding: f64) -> Size {
    Size {
        width: (client.width - padding).max(0.0),
        height: (client.height - padding).max(0.0),
    }
}
