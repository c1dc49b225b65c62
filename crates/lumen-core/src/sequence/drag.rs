//! Drag retiming
//!
//! A drag only previews: the stored event is untouched until release, when the
//! preview is committed through [`Sequence::retime`]. Cancelling (or a failed
//! commit) discards the session and the event keeps its original time.

use super::error::SequenceResult;
use super::event::EventId;
use super::store::Sequence;
use crate::mapping::pixels_to_duration;
use crate::track::TimelineExtent;
use crate::zoom::ZoomScrollState;

/// In-flight drag of one event block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragSession {
    id: EventId,
    original_time: f64,
    anchor_offset: f64,
    preview_time: f64,
}

impl DragSession {
    /// Start dragging `id`, grabbed at `pointer_offset`
    pub fn begin(id: EventId, original_time: f64, pointer_offset: f64) -> Self {
        Self {
            id,
            original_time,
            anchor_offset: pointer_offset,
            preview_time: original_time,
        }
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn original_time(&self) -> f64 {
        self.original_time
    }

    pub fn preview_time(&self) -> f64 {
        self.preview_time
    }

    /// Whether the preview differs from where the event started
    pub fn has_moved(&self) -> bool {
        self.preview_time != self.original_time
    }

    /// Update the preview from the current pointer position
    ///
    /// The pixel delta from the grab point is converted to a time delta at the
    /// current zoom; the preview is clamped to ≥ 0.
    pub fn update(&mut self, pointer_offset: f64, extent: TimelineExtent, view: ZoomScrollState, width: f64) -> f64 {
        let delta = pixels_to_duration(pointer_offset - self.anchor_offset, extent, view, width);
        self.preview_time = (self.original_time + delta).max(0.0);
        self.preview_time
    }

    /// Commit the preview; on error the sequence is left as it was
    pub fn commit(self, sequence: &mut Sequence) -> SequenceResult<f64> {
        if !self.has_moved() {
            return Ok(self.original_time);
        }
        sequence.retime(self.id, self.preview_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::event::{DeviceId, EventDraft, EventPayload};
    use crate::sequence::CreationPath;
    use crate::sequence::SequenceError;

    fn sequence_with_event_at(time: f64) -> (Sequence, EventId) {
        let mut sequence = Sequence::new();
        let id = sequence.insert(
            EventDraft::new(time, DeviceId(1), EventPayload::Dimmer { value: 100.0 }),
            CreationPath::Dialog,
        );
        (sequence, id)
    }

    #[test]
    fn test_cancelled_drag_restores_time() {
        let (sequence, id) = sequence_with_event_at(20.0);
        let extent = TimelineExtent::new(120.0);
        let view = ZoomScrollState::default();

        let mut drag = DragSession::begin(id, 20.0, 200.0);
        drag.update(450.0, extent, view, 1200.0);
        assert!(drag.has_moved());

        // Cancel: the session is discarded without commit
        assert_eq!(sequence.get(id).unwrap().time, 20.0);
    }

    #[test]
    fn test_failed_commit_leaves_time() {
        let (mut sequence, id) = sequence_with_event_at(20.0);
        let other = sequence.insert(
            EventDraft::new(5.0, DeviceId(2), EventPayload::Strobe { rate: 10 }),
            CreationPath::Dialog,
        );
        let mut drag = DragSession::begin(other, 5.0, 0.0);
        drag.update(100.0, TimelineExtent::new(120.0), ZoomScrollState::default(), 1200.0);
        sequence.remove(other).unwrap();

        assert_eq!(drag.commit(&mut sequence), Err(SequenceError::NotFound(other)));
        assert_eq!(sequence.get(id).unwrap().time, 20.0);
    }

    #[test]
    fn test_drag_commits_pixel_delta_at_zoom() {
        let (mut sequence, id) = sequence_with_event_at(20.0);
        // 120s at zoom 2 over 600px: 60s visible, 10 px per second
        let view = ZoomScrollState::new(2.0, 0.0);
        let mut drag = DragSession::begin(id, 20.0, 200.0);

        let preview = drag.update(250.0, TimelineExtent::new(120.0), view, 600.0);

        assert!((preview - 25.0).abs() < 1e-9);
        assert_eq!(sequence.get(id).unwrap().time, 20.0);
        drag.commit(&mut sequence).unwrap();
        assert!((sequence.get(id).unwrap().time - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_drag_left_of_zero_clamps() {
        let (mut sequence, id) = sequence_with_event_at(1.0);
        let mut drag = DragSession::begin(id, 1.0, 500.0);
        drag.update(0.0, TimelineExtent::new(120.0), ZoomScrollState::default(), 1200.0);

        assert_eq!(drag.preview_time(), 0.0);
        assert_eq!(drag.commit(&mut sequence).unwrap(), 0.0);
    }
}
