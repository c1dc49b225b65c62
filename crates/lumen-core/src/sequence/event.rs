//! Lighting event records
//!
//! The serialized shape matches what the lighting server consumes in its
//! `play-sequence` request: `{"id", "time", "duration", "device_id", "type", ...payload}`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique event identifier, assigned by the [`Sequence`](super::Sequence)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub u64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event#{}", self.0)
    }
}

/// Patched device identifier (owned by the patching collaborator)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub u32);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "device#{}", self.0)
    }
}

/// Event type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Dimmer,
    Color,
    Position,
    Strobe,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::Dimmer,
        EventKind::Color,
        EventKind::Position,
        EventKind::Strobe,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            EventKind::Dimmer => "Dimmer",
            EventKind::Color => "Color",
            EventKind::Position => "Position",
            EventKind::Strobe => "Strobe",
        }
    }
}

/// RGBW color value (0-255 per channel)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgbw {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    #[serde(default)]
    pub w: u8,
}

/// Kind-specific event value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EventPayload {
    /// Intensity in percent (0-100)
    Dimmer { value: f32 },
    Color { color: Rgbw },
    /// Pan/tilt in DMX units
    Position { pan: u8, tilt: u8 },
    /// Strobe rate in DMX units
    Strobe { rate: u8 },
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::Dimmer { .. } => EventKind::Dimmer,
            EventPayload::Color { .. } => EventKind::Color,
            EventPayload::Position { .. } => EventKind::Position,
            EventPayload::Strobe { .. } => EventKind::Strobe,
        }
    }

    /// Neutral payload for a kind (used by quick-add)
    pub fn default_for(kind: EventKind) -> Self {
        match kind {
            EventKind::Dimmer => EventPayload::Dimmer { value: 100.0 },
            EventKind::Color => EventPayload::Color {
                color: Rgbw { r: 255, g: 255, b: 255, w: 0 },
            },
            EventKind::Position => EventPayload::Position { pan: 128, tilt: 128 },
            EventKind::Strobe => EventPayload::Strobe { rate: 128 },
        }
    }
}

/// A lighting event placed on the timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceEvent {
    pub id: EventId,
    /// Start time in seconds (≥ 0)
    pub time: f64,
    /// Active window length in seconds (> 0)
    #[serde(rename = "duration")]
    pub duration_seconds: f64,
    pub device_id: DeviceId,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl SequenceEvent {
    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    /// Exclusive end of the active window
    pub fn end(&self) -> f64 {
        self.time + self.duration_seconds
    }

    /// Whether `position` lies in `[time, time + duration)`
    pub fn is_active_at(&self, position: f64) -> bool {
        position >= self.time && position < self.end()
    }
}

/// How an event was created; decides the default duration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationPath {
    /// Submitted from the event dialog after clicking the timeline
    Dialog,
    /// Dropped at the playhead with default values
    QuickAdd,
}

impl CreationPath {
    pub fn default_duration(&self) -> f64 {
        match self {
            CreationPath::Dialog => 2.0,
            CreationPath::QuickAdd => 0.5,
        }
    }
}

/// An event record before it is committed (no id yet)
///
/// This is what the dialog collaborator produces and what stored sequences
/// deserialize into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDraft {
    pub time: f64,
    #[serde(default, rename = "duration", skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    pub device_id: DeviceId,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl EventDraft {
    pub fn new(time: f64, device_id: DeviceId, payload: EventPayload) -> Self {
        Self {
            time,
            duration_seconds: None,
            device_id,
            payload,
        }
    }

    pub fn with_duration(mut self, duration_seconds: f64) -> Self {
        self.duration_seconds = Some(duration_seconds);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_in_server_shape() {
        let event = SequenceEvent {
            id: EventId(7),
            time: 1.5,
            duration_seconds: 2.0,
            device_id: DeviceId(3),
            payload: EventPayload::Color {
                color: Rgbw { r: 255, g: 0, b: 10, w: 0 },
            },
        };

        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "color");
        assert_eq!(json["device_id"], 3);
        assert_eq!(json["duration"], 2.0);
        assert_eq!(json["color"]["b"], 10);
    }

    #[test]
    fn test_draft_from_stored_dimmer_event() {
        let draft: EventDraft =
            serde_json::from_str(r#"{"time": 4.0, "device_id": 1, "type": "dimmer", "value": 80}"#).unwrap();

        assert_eq!(draft.duration_seconds, None);
        assert_eq!(draft.payload, EventPayload::Dimmer { value: 80.0 });
    }

    #[test]
    fn test_window_is_half_open() {
        let event = SequenceEvent {
            id: EventId(1),
            time: 10.0,
            duration_seconds: 2.0,
            device_id: DeviceId(1),
            payload: EventPayload::Dimmer { value: 50.0 },
        };
        assert!(!event.is_active_at(9.999));
        assert!(event.is_active_at(10.0));
        assert!(event.is_active_at(11.999));
        assert!(!event.is_active_at(12.0));
    }
}
