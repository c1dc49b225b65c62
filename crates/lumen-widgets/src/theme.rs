//! Colors and sizes shared by the waveform and timeline surfaces

use iced::Color;
use lumen_core::sequence::{EventKind, EventPayload, Rgbw};

pub const BACKGROUND: Color = Color::from_rgb(0.1, 0.1, 0.12);

/// Alternating timeline row background
pub const ROW_STRIPE: Color = Color::from_rgb(0.13, 0.13, 0.16);

pub const ROW_DIVIDER: Color = Color::from_rgba(1.0, 1.0, 1.0, 0.06);

/// Plain amplitude envelope
pub const AMPLITUDE_COLOR: Color = Color::from_rgb(0.45, 0.65, 0.9);

/// Low, mid, high band envelopes (drawn back to front, semi-transparent)
pub const BAND_COLORS: [Color; 3] = [
    Color::from_rgba(0.8, 0.2, 0.2, 0.75),  // Low - Red
    Color::from_rgba(0.2, 0.8, 0.4, 0.75),  // Mid - Green
    Color::from_rgba(0.3, 0.55, 1.0, 0.75), // High - Blue
];

pub const PLAYHEAD_COLOR: Color = Color::from_rgb(1.0, 0.85, 0.3);

pub const PLAYHEAD_WIDTH: f32 = 2.0;

pub const GRID_BAR_COLOR: Color = Color::from_rgba(1.0, 1.0, 1.0, 0.35);

pub const GRID_BEAT_COLOR: Color = Color::from_rgba(1.0, 1.0, 1.0, 0.12);

pub const SELECTION_COLOR: Color = Color::WHITE;

/// Outline left at the original position while dragging
pub const DRAG_GHOST_COLOR: Color = Color::from_rgba(1.0, 1.0, 1.0, 0.4);

pub const LABEL_COLOR: Color = Color::from_rgb(0.85, 0.85, 0.9);

/// Blocks narrower than this are widened so they stay clickable
pub const MIN_BLOCK_WIDTH: f32 = 3.0;

/// Block fill per event kind
pub fn event_kind_color(kind: EventKind) -> Color {
    match kind {
        EventKind::Dimmer => Color::from_rgb(0.9, 0.75, 0.3),
        EventKind::Color => Color::from_rgb(0.75, 0.35, 0.85),
        EventKind::Position => Color::from_rgb(0.3, 0.7, 0.85),
        EventKind::Strobe => Color::from_rgb(0.95, 0.95, 0.95),
    }
}

/// Block fill for an event; color events show their own color
pub fn event_color(payload: &EventPayload) -> Color {
    match payload {
        EventPayload::Color {
            color: Rgbw { r, g, b, .. },
        } if (*r as u16 + *g as u16 + *b as u16) > 0 => {
            Color::from_rgb8(*r, *g, *b)
        }
        other => event_kind_color(other.kind()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_events_use_their_color() {
        let payload = EventPayload::Color {
            color: Rgbw { r: 255, g: 0, b: 0, w: 0 },
        };
        assert_eq!(event_color(&payload), Color::from_rgb8(255, 0, 0));
    }

    #[test]
    fn test_black_color_event_falls_back_to_kind_color() {
        let payload = EventPayload::Color { color: Rgbw::default() };
        assert_eq!(event_color(&payload), event_kind_color(EventKind::Color));
    }
}
