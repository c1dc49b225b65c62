//! A surface's zoom/scroll state bound to the sync bus

use super::bus::{SurfaceId, SyncEndpoint, SyncMessage};
use crate::zoom::ZoomScrollState;

/// What changed after applying remote messages
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RemoteUpdate {
    /// Zoom or scroll differs from before the drain
    pub view_changed: bool,
    /// Latest playhead position received, if any
    pub position: Option<f64>,
    /// Latest event list revision received, if any
    pub event_revision: Option<u64>,
}

impl RemoteUpdate {
    pub fn is_empty(&self) -> bool {
        !self.view_changed && self.position.is_none() && self.event_revision.is_none()
    }
}

/// Zoom/scroll state owned by one surface
///
/// Local gestures go through [`apply_local`](Self::apply_local), which broadcasts.
/// Remote changes go through [`apply_remote`](Self::apply_remote), which never does.
#[derive(Debug)]
pub struct SyncedView {
    state: ZoomScrollState,
    endpoint: SyncEndpoint,
}

impl SyncedView {
    pub fn new(endpoint: SyncEndpoint) -> Self {
        Self {
            state: ZoomScrollState::default(),
            endpoint,
        }
    }

    pub fn id(&self) -> SurfaceId {
        self.endpoint.id()
    }

    pub fn state(&self) -> ZoomScrollState {
        self.state
    }

    pub fn endpoint(&self) -> &SyncEndpoint {
        &self.endpoint
    }

    /// Apply a state produced by a local gesture and broadcast it once
    ///
    /// Returns false (and broadcasts nothing) when the state did not change.
    pub fn apply_local(&mut self, next: ZoomScrollState) -> bool {
        let next = ZoomScrollState::new(next.zoom_level(), next.scroll_position());
        if next == self.state {
            return false;
        }

        let message = if next.zoom_level() != self.state.zoom_level() {
            SyncMessage::ZoomChanged {
                zoom_level: next.zoom_level(),
                scroll_position: next.scroll_position(),
            }
        } else {
            SyncMessage::ScrollChanged {
                scroll_position: next.scroll_position(),
            }
        };

        self.state = next;
        self.endpoint.broadcast(message);
        true
    }

    /// Drain the mailbox and apply every message without re-broadcasting
    pub fn apply_remote(&mut self) -> RemoteUpdate {
        let before = self.state;
        let mut update = RemoteUpdate::default();

        for message in self.endpoint.drain() {
            match message {
                SyncMessage::ZoomChanged {
                    zoom_level,
                    scroll_position,
                } => {
                    self.state = ZoomScrollState::new(zoom_level, scroll_position);
                }
                SyncMessage::ScrollChanged { scroll_position } => {
                    self.state = self.state.with_scroll(scroll_position);
                }
                SyncMessage::PositionChanged { position } => {
                    update.position = Some(position);
                }
                SyncMessage::EventListChanged { revision } => {
                    update.event_revision = Some(revision);
                }
            }
        }

        update.view_changed = self.state != before;
        update
    }

    /// Replace the state without broadcasting (track reload on every surface)
    pub fn reset(&mut self, state: ZoomScrollState) {
        self.state = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::SyncBus;

    #[test]
    fn test_remote_apply_does_not_echo() {
        let bus = SyncBus::new();
        let mut a = SyncedView::new(bus.subscribe("waveform"));
        let mut b = SyncedView::new(bus.subscribe("timeline"));

        assert!(a.apply_local(ZoomScrollState::new(4.0, 0.25)));
        let update = b.apply_remote();

        assert!(update.view_changed);
        assert_eq!(b.state(), a.state());
        // B applied without broadcasting: nothing comes back to A
        assert_eq!(a.endpoint().pending(), 0);
        assert!(a.apply_remote().is_empty());
    }

    #[test]
    fn test_unchanged_local_state_is_not_broadcast() {
        let bus = SyncBus::new();
        let mut a = SyncedView::new(bus.subscribe("a"));
        let b = SyncedView::new(bus.subscribe("b"));

        assert!(!a.apply_local(ZoomScrollState::default()));
        assert_eq!(b.endpoint().pending(), 0);
    }

    #[test]
    fn test_scroll_only_change_sends_scroll_message() {
        let bus = SyncBus::new();
        let mut a = SyncedView::new(bus.subscribe("a"));
        let b = SyncedView::new(bus.subscribe("b"));
        a.apply_local(ZoomScrollState::new(2.0, 0.0));
        b.endpoint().drain();

        a.apply_local(ZoomScrollState::new(2.0, 0.6));

        assert_eq!(
            b.endpoint().drain(),
            vec![SyncMessage::ScrollChanged { scroll_position: 0.6 }]
        );
    }

    #[test]
    fn test_both_orders_of_view_and_position_converge() {
        let bus = SyncBus::new();
        let producer = bus.subscribe("transport");
        let mut a = SyncedView::new(bus.subscribe("a"));
        let mut b = SyncedView::new(bus.subscribe("b"));

        producer.broadcast(SyncMessage::PositionChanged { position: 3.0 });
        a.apply_local(ZoomScrollState::new(5.0, 0.5));
        let first = b.apply_remote();

        a.apply_local(ZoomScrollState::new(6.0, 0.5));
        producer.broadcast(SyncMessage::PositionChanged { position: 4.0 });
        let second = b.apply_remote();

        assert_eq!(first.position, Some(3.0));
        assert_eq!(second.position, Some(4.0));
        assert_eq!(b.state(), a.state());
    }

    #[test]
    fn test_remote_values_are_clamped() {
        let bus = SyncBus::new();
        let producer = bus.subscribe("rogue");
        let mut view = SyncedView::new(bus.subscribe("view"));

        producer.broadcast(SyncMessage::ZoomChanged {
            zoom_level: 1000.0,
            scroll_position: 3.0,
        });
        view.apply_remote();

        assert_eq!(view.state().zoom_level(), crate::MAX_ZOOM);
        assert_eq!(view.state().scroll_position(), 1.0);
    }
}
