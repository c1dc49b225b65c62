//! Zoom and scroll state for a timeline surface
//!
//! `scroll_position` is a normalized fraction of the scrollable range, not a time.
//! Both values are clamped on every construction: continuous input devices routinely
//! overshoot the bounds, so out-of-range requests are corrected silently rather than
//! rejected.

use serde::{Deserialize, Serialize};

use crate::mapping::{offset_to_time, VisibleWindow};
use crate::track::TimelineExtent;

/// Whole track visible
pub const MIN_ZOOM: f64 = 1.0;

/// One hundredth of the track visible
pub const MAX_ZOOM: f64 = 100.0;

/// Largest valid scroll position for a zoom level
///
/// At zoom 1 the whole track is visible and there is nothing to scroll.
pub fn max_scroll(zoom_level: f64) -> f64 {
    if zoom_level > MIN_ZOOM {
        1.0
    } else {
        0.0
    }
}

/// Clamp a requested zoom level into `[MIN_ZOOM, MAX_ZOOM]`
pub fn clamp_zoom(zoom_level: f64) -> f64 {
    if zoom_level.is_nan() {
        return MIN_ZOOM;
    }
    zoom_level.clamp(MIN_ZOOM, MAX_ZOOM)
}

/// Clamp a requested scroll position into `[0, max_scroll(zoom_level)]`
pub fn clamp_scroll(scroll_position: f64, zoom_level: f64) -> f64 {
    if scroll_position.is_nan() {
        return 0.0;
    }
    scroll_position.clamp(0.0, max_scroll(zoom_level))
}

/// Canonical `(zoom_level, scroll_position)` pair for one surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawZoomScroll")]
pub struct ZoomScrollState {
    zoom_level: f64,
    scroll_position: f64,
}

/// Unchecked wire form; deserialized states go through [`ZoomScrollState::new`]
#[derive(Deserialize)]
struct RawZoomScroll {
    zoom_level: f64,
    scroll_position: f64,
}

impl From<RawZoomScroll> for ZoomScrollState {
    fn from(raw: RawZoomScroll) -> Self {
        Self::new(raw.zoom_level, raw.scroll_position)
    }
}

impl Default for ZoomScrollState {
    fn default() -> Self {
        Self {
            zoom_level: MIN_ZOOM,
            scroll_position: 0.0,
        }
    }
}

impl ZoomScrollState {
    /// Create a clamped state
    pub fn new(zoom_level: f64, scroll_position: f64) -> Self {
        let zoom_level = clamp_zoom(zoom_level);
        let scroll_position = clamp_scroll(scroll_position, zoom_level);
        Self {
            zoom_level,
            scroll_position,
        }
    }

    pub fn zoom_level(&self) -> f64 {
        self.zoom_level
    }

    pub fn scroll_position(&self) -> f64 {
        self.scroll_position
    }

    /// Same scroll position at a different zoom (re-clamped)
    pub fn with_zoom(self, zoom_level: f64) -> Self {
        Self::new(zoom_level, self.scroll_position)
    }

    /// Same zoom at a different scroll position (re-clamped)
    pub fn with_scroll(self, scroll_position: f64) -> Self {
        Self::new(self.zoom_level, scroll_position)
    }

    /// Zoom to `zoom_level` keeping the time under `pointer_offset` fixed
    ///
    /// Solves for the scroll position whose visible window places the anchor time at
    /// the same pixel. When the solution falls outside the scrollable range it is
    /// clamped, which keeps the anchor as close to the pointer as the bounds allow.
    pub fn zoom_at(self, zoom_level: f64, pointer_offset: f64, width: f64, extent: TimelineExtent) -> Self {
        let zoom_level = clamp_zoom(zoom_level);
        let duration = extent.duration();
        if duration <= 0.0 || width <= 0.0 {
            return self.with_zoom(zoom_level);
        }

        let anchor_time = offset_to_time(pointer_offset, extent, self, width);
        let new_span = duration / zoom_level;
        let scrollable = duration - new_span;
        if scrollable <= 0.0 {
            return Self::new(zoom_level, 0.0);
        }

        let new_start = anchor_time - (pointer_offset / width) * new_span;
        Self::new(zoom_level, new_start / scrollable)
    }

    /// Multiply the zoom level by `factor` around the pointer
    pub fn zoom_by(self, factor: f64, pointer_offset: f64, width: f64, extent: TimelineExtent) -> Self {
        if !(factor > 0.0) || !factor.is_finite() {
            return self;
        }
        self.zoom_at(self.zoom_level * factor, pointer_offset, width, extent)
    }

    /// Move the visible window by a pixel distance
    ///
    /// Positive `delta_pixels` moves the window later in time (content slides left).
    pub fn scroll_by_pixels(self, delta_pixels: f64, width: f64, extent: TimelineExtent) -> Self {
        let window = VisibleWindow::compute(extent, self);
        let scrollable = extent.duration() - window.span;
        if window.is_empty() || width <= 0.0 || scrollable <= 0.0 {
            return self;
        }

        let new_start = window.start + delta_pixels / width * window.span;
        self.with_scroll(new_start / scrollable)
    }

    /// Scroll so that `time` sits at the left edge (or as close as the range allows)
    pub fn scroll_to_time(self, time: f64, extent: TimelineExtent) -> Self {
        let window = VisibleWindow::compute(extent, self);
        let scrollable = extent.duration() - window.span;
        if window.is_empty() || scrollable <= 0.0 {
            return self;
        }
        self.with_scroll(time / scrollable)
    }
}
