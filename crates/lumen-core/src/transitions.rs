//! Event transition detection
//!
//! Tracks which sequence events are active (their `[time, time + duration)` window
//! contains the playhead) and reports each boundary crossing exactly once.
//!
//! Entering is bookkeeping only. Exiting invokes the caller's reset callback
//! synchronously with the event record as it was when it entered, so the caller can
//! neutralize whatever that event drove. Events removed from the sequence while
//! active count as exited.
//!
//! Only sampled positions are compared: an event whose whole window falls between
//! two consecutive samples is neither entered nor exited.

use std::collections::BTreeMap;

use crate::sequence::{EventId, SequenceEvent};

/// One reported boundary crossing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Enter(EventId),
    Exit(EventId),
}

/// Incremental active-event set
#[derive(Debug, Default)]
pub struct TransitionDetector {
    /// Snapshot of each active event taken when it entered
    active: BTreeMap<EventId, SequenceEvent>,
    last_position: Option<f64>,
}

impl TransitionDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self, id: EventId) -> bool {
        self.active.contains_key(&id)
    }

    /// Active ids in ascending order
    pub fn active_ids(&self) -> Vec<EventId> {
        self.active.keys().copied().collect()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn last_position(&self) -> Option<f64> {
        self.last_position
    }

    /// Reconcile the active set with `position`
    ///
    /// Exits are reported (and `on_exit` invoked) before enters so a device handed
    /// from one event to the next is reset before the new event takes over.
    pub fn update<'a, I, F>(&mut self, position: f64, events: I, mut on_exit: F) -> Vec<Transition>
    where
        I: IntoIterator<Item = &'a SequenceEvent>,
        F: FnMut(&SequenceEvent),
    {
        self.last_position = Some(position);

        let now_active: BTreeMap<EventId, &SequenceEvent> = events
            .into_iter()
            .filter(|event| event.is_active_at(position))
            .map(|event| (event.id, event))
            .collect();

        let mut transitions = Vec::new();

        let exited: Vec<EventId> = self
            .active
            .keys()
            .filter(|id| !now_active.contains_key(id))
            .copied()
            .collect();
        for id in exited {
            if let Some(event) = self.active.remove(&id) {
                log::debug!("TransitionDetector: exit {} at {:.3}s", id, position);
                on_exit(&event);
                transitions.push(Transition::Exit(id));
            }
        }

        for (id, event) in now_active {
            if !self.active.contains_key(&id) {
                log::debug!("TransitionDetector: enter {} at {:.3}s", id, position);
                self.active.insert(id, event.clone());
                transitions.push(Transition::Enter(id));
            }
        }

        transitions
    }

    /// Exit every active event, then clear the set
    pub fn stop<F>(&mut self, mut on_exit: F) -> Vec<Transition>
    where
        F: FnMut(&SequenceEvent),
    {
        let active = std::mem::take(&mut self.active);
        self.last_position = None;

        if !active.is_empty() {
            log::info!("TransitionDetector: stop, resetting {} active event(s)", active.len());
        }

        active
            .into_values()
            .map(|event| {
                on_exit(&event);
                Transition::Exit(event.id)
            })
            .collect()
    }

    /// Forget the active set without firing exits (sequence reload after stop)
    pub fn reset(&mut self) {
        self.active.clear();
        self.last_position = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::{DeviceId, EventPayload};

    fn event(id: u64, time: f64, duration: f64) -> SequenceEvent {
        SequenceEvent {
            id: EventId(id),
            time,
            duration_seconds: duration,
            device_id: DeviceId(1),
            payload: EventPayload::Dimmer { value: 100.0 },
        }
    }

    #[test]
    fn test_each_crossing_reported_once() {
        let events = vec![event(1, 10.0, 2.0)];
        let mut detector = TransitionDetector::new();
        let mut exits = Vec::new();
        let mut all = Vec::new();

        for position in [9.0, 9.5, 10.0, 10.5, 11.5, 12.0, 9.0] {
            all.extend(detector.update(position, &events, |e| exits.push(e.id)));
        }

        assert_eq!(all, vec![Transition::Enter(EventId(1)), Transition::Exit(EventId(1))]);
        assert_eq!(exits, vec![EventId(1)]);
        assert_eq!(detector.active_count(), 0);

        // Re-entry after leaving is a new crossing
        let again = detector.update(10.5, &events, |e| exits.push(e.id));
        assert_eq!(again, vec![Transition::Enter(EventId(1))]);
        assert_eq!(exits.len(), 1);
    }

    #[test]
    fn test_repeated_position_is_idempotent() {
        let events = vec![event(1, 0.0, 5.0)];
        let mut detector = TransitionDetector::new();

        assert_eq!(detector.update(1.0, &events, |_| {}).len(), 1);
        for _ in 0..5 {
            assert!(detector.update(1.0, &events, |_| panic!("no exit expected")).is_empty());
        }
    }

    #[test]
    fn test_stop_exits_every_active_event_once() {
        let events = vec![event(1, 0.0, 10.0), event(2, 1.0, 10.0), event(3, 50.0, 1.0)];
        let mut detector = TransitionDetector::new();
        detector.update(2.0, &events, |_| {});
        assert_eq!(detector.active_ids(), vec![EventId(1), EventId(2)]);

        let mut exits = Vec::new();
        let transitions = detector.stop(|e| exits.push(e.id));

        assert_eq!(exits, vec![EventId(1), EventId(2)]);
        assert_eq!(transitions.len(), 2);
        assert_eq!(detector.active_count(), 0);
        assert!(detector.stop(|_| panic!("already stopped")).is_empty());
    }

    #[test]
    fn test_removed_active_event_exits() {
        let mut events = vec![event(1, 0.0, 10.0), event(2, 0.0, 10.0)];
        let mut detector = TransitionDetector::new();
        detector.update(5.0, &events, |_| {});

        events.retain(|e| e.id != EventId(2));
        let mut exits = Vec::new();
        detector.update(5.1, &events, |e| exits.push(e.id));

        assert_eq!(exits, vec![EventId(2)]);
        assert!(detector.is_active(EventId(1)));
    }

    #[test]
    fn test_exit_callback_receives_entered_record() {
        let mut events = vec![event(1, 0.0, 10.0)];
        let mut detector = TransitionDetector::new();
        detector.update(1.0, &events, |_| {});

        events[0].payload = EventPayload::Strobe { rate: 5 };
        events[0].time = 20.0;
        let mut seen = None;
        detector.update(1.5, &events, |e| seen = Some(e.payload));

        assert_eq!(seen, Some(EventPayload::Dimmer { value: 100.0 }));
    }

    #[test]
    fn test_skipped_short_event_fires_nothing() {
        let events = vec![event(1, 10.0, 0.01)];
        let mut detector = TransitionDetector::new();

        let mut all = detector.update(9.99, &events, |_| {});
        all.extend(detector.update(10.02, &events, |_| {}));

        assert!(all.is_empty());
    }

    #[test]
    fn test_exits_reported_before_enters() {
        let events = vec![event(1, 0.0, 1.0), event(2, 1.0, 1.0)];
        let mut detector = TransitionDetector::new();
        detector.update(0.5, &events, |_| {});

        let transitions = detector.update(1.5, &events, |_| {});

        assert_eq!(transitions, vec![Transition::Exit(EventId(1)), Transition::Enter(EventId(2))]);
    }
}
