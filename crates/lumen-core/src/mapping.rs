//! Time ↔ pixel coordinate mapping
//!
//! Pure arithmetic shared by every surface. Given the track duration, the surface's
//! [`ZoomScrollState`] and its width in pixels:
//!
//! ```text
//! visible_span  = duration / zoom_level
//! visible_start = scroll_position × (duration − visible_span)
//! offset        = (t − visible_start) / visible_span × width
//! ```
//!
//! Both directions return 0 when there is no track (duration 0) or the surface has no
//! width, instead of dividing by zero.

use crate::track::TimelineExtent;
use crate::zoom::ZoomScrollState;

/// The slice of the timeline currently visible on a surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleWindow {
    /// First visible time in seconds
    pub start: f64,
    /// Visible duration in seconds
    pub span: f64,
}

impl VisibleWindow {
    pub const EMPTY: VisibleWindow = VisibleWindow { start: 0.0, span: 0.0 };

    pub fn compute(extent: TimelineExtent, view: ZoomScrollState) -> Self {
        let duration = extent.duration();
        if duration <= 0.0 {
            return Self::EMPTY;
        }

        let span = duration / view.zoom_level();
        let start = view.scroll_position() * (duration - span);
        Self { start, span }
    }

    pub fn end(&self) -> f64 {
        self.start + self.span
    }

    pub fn is_empty(&self) -> bool {
        self.span <= 0.0
    }

    /// Whether any part of `[from, to)` is visible
    pub fn overlaps(&self, from: f64, to: f64) -> bool {
        to > self.start && from < self.end()
    }
}

/// Convert a time in seconds to a pixel offset from the surface's left edge
///
/// Times outside the visible window map to offsets outside `[0, width]`.
pub fn time_to_offset(time: f64, extent: TimelineExtent, view: ZoomScrollState, width: f64) -> f64 {
    let window = VisibleWindow::compute(extent, view);
    if window.is_empty() || width <= 0.0 {
        return 0.0;
    }
    (time - window.start) / window.span * width
}

/// Convert a pixel offset back to a time in seconds (inverse of [`time_to_offset`])
pub fn offset_to_time(offset: f64, extent: TimelineExtent, view: ZoomScrollState, width: f64) -> f64 {
    let window = VisibleWindow::compute(extent, view);
    if window.is_empty() || width <= 0.0 {
        return 0.0;
    }
    window.start + offset / width * window.span
}

/// Pixel width of a duration at the current zoom
///
/// Equal to `time_to_offset(duration) − time_to_offset(0)`.
pub fn duration_to_width(duration: f64, extent: TimelineExtent, view: ZoomScrollState, width: f64) -> f64 {
    let window = VisibleWindow::compute(extent, view);
    if window.is_empty() || width <= 0.0 {
        return 0.0;
    }
    duration / window.span * width
}

/// Time delta corresponding to a pixel delta at the current zoom
pub fn pixels_to_duration(pixels: f64, extent: TimelineExtent, view: ZoomScrollState, width: f64) -> f64 {
    let window = VisibleWindow::compute(extent, view);
    if window.is_empty() || width <= 0.0 {
        return 0.0;
    }
    pixels / width * window.span
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn extent() -> TimelineExtent {
        TimelineExtent::new(120.0)
    }

    #[test]
    fn test_full_view_maps_linearly() {
        let view = ZoomScrollState::default();
        assert!((time_to_offset(60.0, extent(), view, 1000.0) - 500.0).abs() < EPS);
        assert!((time_to_offset(0.0, extent(), view, 1000.0)).abs() < EPS);
        assert!((offset_to_time(1000.0, extent(), view, 1000.0) - 120.0).abs() < EPS);
    }

    #[test]
    fn test_round_trip_across_views() {
        let views = [
            ZoomScrollState::new(1.0, 0.0),
            ZoomScrollState::new(2.0, 0.5),
            ZoomScrollState::new(7.3, 0.91),
            ZoomScrollState::new(100.0, 1.0),
            ZoomScrollState::new(42.0, 0.0),
        ];
        for view in views {
            let mut t = 0.0;
            while t < 120.0 {
                let offset = time_to_offset(t, extent(), view, 1337.0);
                let back = offset_to_time(offset, extent(), view, 1337.0);
                assert!((back - t).abs() < 1e-6, "t={} view={:?} back={}", t, view, back);
                t += 0.37;
            }
        }
    }

    #[test]
    fn test_zero_duration_degrades_to_zero() {
        let view = ZoomScrollState::new(4.0, 0.5);
        assert_eq!(time_to_offset(10.0, TimelineExtent::EMPTY, view, 800.0), 0.0);
        assert_eq!(offset_to_time(400.0, TimelineExtent::EMPTY, view, 800.0), 0.0);
        assert_eq!(duration_to_width(1.0, TimelineExtent::EMPTY, view, 800.0), 0.0);
    }

    #[test]
    fn test_zero_width_degrades_to_zero() {
        let view = ZoomScrollState::default();
        assert_eq!(time_to_offset(10.0, extent(), view, 0.0), 0.0);
        assert_eq!(offset_to_time(10.0, extent(), view, 0.0), 0.0);
    }

    #[test]
    fn test_visible_window_at_end_of_scroll() {
        let window = VisibleWindow::compute(extent(), ZoomScrollState::new(4.0, 1.0));
        assert!((window.span - 30.0).abs() < EPS);
        assert!((window.start - 90.0).abs() < EPS);
        assert!((window.end() - 120.0).abs() < EPS);
        assert!(window.overlaps(100.0, 101.0));
        assert!(!window.overlaps(80.0, 90.0));
    }

    #[test]
    fn test_duration_width_matches_offset_difference() {
        let view = ZoomScrollState::new(3.0, 0.25);
        let w = duration_to_width(2.0, extent(), view, 900.0);
        let diff = time_to_offset(2.0, extent(), view, 900.0) - time_to_offset(0.0, extent(), view, 900.0);
        assert!((w - diff).abs() < EPS);
        assert!((pixels_to_duration(w, extent(), view, 900.0) - 2.0).abs() < EPS);
    }
}
