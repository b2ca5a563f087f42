//! Continuous-scroll PDF viewer core
//!
//! Leaf-first: `geometry` (pure zoom and coordinate math), `intersection` and
//! `tracker` (current page), `render_window` (which pages get real renders),
//! `overlay` (answer highlight), and `orchestrator` tying them together.

pub mod geometry;
pub mod intersection;
pub mod orchestrator;
pub mod overlay;
pub mod render_window;
pub mod tracker;

pub use geometry::{Box2d, BoxPercent, Size};
pub use intersection::{IntersectionEntry, ObserverOptions, Rect, RootMargin};
pub use orchestrator::{DocumentId, ViewerOrchestrator, ViewerPhase};
pub use overlay::{compute_overlay, Marker, OverlayBox, MARKER_LABEL};
pub use render_window::{PageContent, PageSlot, RenderKey, RenderWindow};
pub use tracker::{PageAnchor, ScrollBehavior, ScrollHost, ScrollState, ViewportTracker};
