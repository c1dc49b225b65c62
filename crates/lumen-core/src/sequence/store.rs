//! Ordered event store
//!
//! Events are kept sorted ascending by start time, ties broken by insertion order.
//! Every successful mutation bumps [`Sequence::revision`]; renderers compare
//! revisions to decide whether their cached layout is stale.

use super::error::{SequenceError, SequenceResult};
use super::event::{CreationPath, EventDraft, EventId, EventPayload, SequenceEvent};

#[derive(Debug, Clone)]
struct Entry {
    /// Insertion counter used as the tie-breaker for equal times
    seq: u64,
    event: SequenceEvent,
}

/// The sequence being edited
#[derive(Debug, Clone, Default)]
pub struct Sequence {
    entries: Vec<Entry>,
    next_id: u64,
    next_seq: u64,
    revision: u64,
}

fn sanitize_time(time: f64) -> f64 {
    if time.is_finite() {
        time.max(0.0)
    } else {
        0.0
    }
}

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a sequence from stored drafts (track reload)
    pub fn from_drafts(drafts: impl IntoIterator<Item = EventDraft>, path: CreationPath) -> Self {
        let mut sequence = Self::new();
        sequence.replace_all(drafts, path);
        sequence
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Monotonic mutation counter
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Events in time order
    pub fn iter(&self) -> impl Iterator<Item = &SequenceEvent> + Clone + '_ {
        self.entries.iter().map(|entry| &entry.event)
    }

    /// Snapshot of the events in time order
    pub fn events(&self) -> Vec<SequenceEvent> {
        self.iter().cloned().collect()
    }

    pub fn get(&self, id: EventId) -> Option<&SequenceEvent> {
        self.position_of(id).map(|index| &self.entries[index].event)
    }

    pub fn contains(&self, id: EventId) -> bool {
        self.position_of(id).is_some()
    }

    /// Latest end time over all events
    pub fn end_time(&self) -> f64 {
        self.iter().map(SequenceEvent::end).fold(0.0, f64::max)
    }

    // ========================================================================
    // Mutation API
    // ========================================================================

    /// Commit a draft; negative times are clamped to 0 and a missing or
    /// non-positive duration falls back to the creation path default
    pub fn insert(&mut self, draft: EventDraft, path: CreationPath) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;

        let duration_seconds = draft
            .duration_seconds
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or_else(|| path.default_duration());

        let event = SequenceEvent {
            id,
            time: sanitize_time(draft.time),
            duration_seconds,
            device_id: draft.device_id,
            payload: draft.payload,
        };

        log::debug!("Sequence: inserted {} at {:.3}s", id, event.time);

        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(Entry { seq, event });
        self.resort();
        self.revision += 1;
        id
    }

    pub fn remove(&mut self, id: EventId) -> SequenceResult<SequenceEvent> {
        let index = self.position_of(id).ok_or(SequenceError::NotFound(id))?;
        let entry = self.entries.remove(index);
        self.revision += 1;
        Ok(entry.event)
    }

    /// Move an event to a new start time (clamped to ≥ 0)
    ///
    /// Returns the time actually applied. A retimed event keeps its insertion
    /// order for tie-breaking.
    pub fn retime(&mut self, id: EventId, time: f64) -> SequenceResult<f64> {
        if time.is_nan() {
            return Err(SequenceError::InvalidTime { id, time });
        }
        let index = self.position_of(id).ok_or(SequenceError::NotFound(id))?;
        let applied = sanitize_time(time);
        self.entries[index].event.time = applied;
        self.resort();
        self.revision += 1;
        Ok(applied)
    }

    /// Shift an event by a time delta (clamped at 0)
    pub fn nudge(&mut self, id: EventId, delta_seconds: f64) -> SequenceResult<f64> {
        let current = self.get(id).ok_or(SequenceError::NotFound(id))?.time;
        self.retime(id, current + delta_seconds)
    }

    pub fn set_duration(&mut self, id: EventId, duration: f64) -> SequenceResult<()> {
        if !(duration.is_finite() && duration > 0.0) {
            return Err(SequenceError::InvalidDuration { id, duration });
        }
        let index = self.position_of(id).ok_or(SequenceError::NotFound(id))?;
        self.entries[index].event.duration_seconds = duration;
        self.revision += 1;
        Ok(())
    }

    pub fn set_payload(&mut self, id: EventId, payload: EventPayload) -> SequenceResult<()> {
        let index = self.position_of(id).ok_or(SequenceError::NotFound(id))?;
        self.entries[index].event.payload = payload;
        self.revision += 1;
        Ok(())
    }

    /// Replace every event (new ids are assigned)
    pub fn replace_all(&mut self, drafts: impl IntoIterator<Item = EventDraft>, path: CreationPath) {
        self.entries.clear();
        for draft in drafts {
            self.insert(draft, path);
        }
        self.revision += 1;
        log::info!("Sequence: loaded {} events", self.entries.len());
    }

    pub fn clear(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        self.entries.clear();
        self.revision += 1;
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn position_of(&self, id: EventId) -> Option<usize> {
        self.entries.iter().position(|entry| entry.event.id == id)
    }

    fn resort(&mut self) {
        // Stable sort on (time, seq) keeps equal-time events in insertion order
        self.entries
            .sort_by(|a, b| a.event.time.total_cmp(&b.event.time).then(a.seq.cmp(&b.seq)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::event::DeviceId;

    fn dimmer(time: f64) -> EventDraft {
        EventDraft::new(time, DeviceId(1), EventPayload::Dimmer { value: 100.0 })
    }

    fn times(sequence: &Sequence) -> Vec<f64> {
        sequence.iter().map(|e| e.time).collect()
    }

    #[test]
    fn test_events_sorted_with_insertion_tiebreak() {
        let mut sequence = Sequence::new();
        let late = sequence.insert(dimmer(5.0), CreationPath::Dialog);
        let first_tie = sequence.insert(dimmer(2.0), CreationPath::Dialog);
        let second_tie = sequence.insert(dimmer(2.0), CreationPath::Dialog);

        let ids: Vec<EventId> = sequence.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![first_tie, second_tie, late]);
    }

    #[test]
    fn test_default_duration_by_creation_path() {
        let mut sequence = Sequence::new();
        let dialog = sequence.insert(dimmer(0.0), CreationPath::Dialog);
        let quick = sequence.insert(dimmer(0.0), CreationPath::QuickAdd);
        let explicit = sequence.insert(dimmer(0.0).with_duration(3.0), CreationPath::QuickAdd);

        assert_eq!(sequence.get(dialog).unwrap().duration_seconds, 2.0);
        assert_eq!(sequence.get(quick).unwrap().duration_seconds, 0.5);
        assert_eq!(sequence.get(explicit).unwrap().duration_seconds, 3.0);
    }

    #[test]
    fn test_negative_retime_clamps_to_zero() {
        let mut sequence = Sequence::new();
        let id = sequence.insert(dimmer(3.0), CreationPath::Dialog);

        assert_eq!(sequence.retime(id, -4.0).unwrap(), 0.0);
        assert_eq!(sequence.get(id).unwrap().time, 0.0);
    }

    #[test]
    fn test_retime_resorts() {
        let mut sequence = Sequence::new();
        let a = sequence.insert(dimmer(1.0), CreationPath::Dialog);
        sequence.insert(dimmer(2.0), CreationPath::Dialog);

        sequence.retime(a, 10.0).unwrap();

        assert_eq!(times(&sequence), vec![2.0, 10.0]);
    }

    #[test]
    fn test_mutations_bump_revision() {
        let mut sequence = Sequence::new();
        let r0 = sequence.revision();
        let id = sequence.insert(dimmer(1.0), CreationPath::Dialog);
        let r1 = sequence.revision();
        sequence.nudge(id, 0.5).unwrap();
        let r2 = sequence.revision();
        sequence.remove(id).unwrap();

        assert!(r0 < r1 && r1 < r2 && r2 < sequence.revision());
    }

    #[test]
    fn test_unknown_id_is_not_found() {
        let mut sequence = Sequence::new();
        let missing = EventId(99);
        assert_eq!(sequence.remove(missing), Err(SequenceError::NotFound(missing)));
        assert_eq!(sequence.retime(missing, 1.0), Err(SequenceError::NotFound(missing)));
    }

    #[test]
    fn test_invalid_duration_rejected() {
        let mut sequence = Sequence::new();
        let id = sequence.insert(dimmer(1.0), CreationPath::Dialog);
        assert!(sequence.set_duration(id, 0.0).is_err());
        assert!(sequence.set_duration(id, -1.0).is_err());
        assert_eq!(sequence.get(id).unwrap().duration_seconds, 2.0);
    }

    #[test]
    fn test_replace_all_assigns_fresh_ids() {
        let mut sequence = Sequence::new();
        let old = sequence.insert(dimmer(1.0), CreationPath::Dialog);

        sequence.replace_all(vec![dimmer(4.0), dimmer(3.0)], CreationPath::Dialog);

        assert!(!sequence.contains(old));
        assert_eq!(times(&sequence), vec![3.0, 4.0]);
        assert_eq!(sequence.end_time(), 6.0);
    }
}
