//! Typed publish/subscribe bus
//!
//! One mailbox (crossbeam channel) per subscriber. Publishing is non-blocking and
//! delivery is queued: a handler that reacts to a message runs after `publish` has
//! returned, so there is no re-entrancy to guard against.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crossbeam::channel::{unbounded, Receiver, Sender};

/// Identity of a bus endpoint (one per surface or producer)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u32);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface#{}", self.0)
    }
}

/// Closed set of synchronization messages
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SyncMessage {
    /// Zoom changed; carries the resulting scroll because zoom-at-pointer moves both
    ZoomChanged { zoom_level: f64, scroll_position: f64 },
    /// Scroll changed at an unchanged zoom
    ScrollChanged { scroll_position: f64 },
    /// Playhead moved (predicted transport position in seconds)
    PositionChanged { position: f64 },
    /// The event list was mutated; `revision` increases monotonically
    EventListChanged { revision: u64 },
}

#[derive(Debug, Clone, Copy)]
struct Envelope {
    origin: SurfaceId,
    message: SyncMessage,
}

struct Subscriber {
    id: SurfaceId,
    label: &'static str,
    sender: Sender<Envelope>,
}

#[derive(Default)]
struct BusInner {
    next_id: u32,
    subscribers: Vec<Subscriber>,
}

/// Shared bus handle; cloning shares the same subscriber registry
#[derive(Clone, Default)]
pub struct SyncBus {
    inner: Rc<RefCell<BusInner>>,
}

impl fmt::Debug for SyncBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        let labels: Vec<&str> = inner.subscribers.iter().map(|s| s.label).collect();
        f.debug_struct("SyncBus").field("subscribers", &labels).finish()
    }
}

impl SyncBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new endpoint
    pub fn subscribe(&self, label: &'static str) -> SyncEndpoint {
        let (sender, receiver) = unbounded();
        let mut inner = self.inner.borrow_mut();
        let id = SurfaceId(inner.next_id);
        inner.next_id += 1;
        inner.subscribers.push(Subscriber { id, label, sender });

        log::debug!("SyncBus: subscribed {} as {}", label, id);

        SyncEndpoint {
            id,
            label,
            bus: self.clone(),
            receiver,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    /// Deliver to every subscriber except `origin`; returns the number of recipients
    fn publish(&self, origin: SurfaceId, message: SyncMessage) -> usize {
        let inner = self.inner.borrow();
        let mut delivered = 0;
        for subscriber in inner.subscribers.iter().filter(|s| s.id != origin) {
            if subscriber.sender.send(Envelope { origin, message }).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    fn unsubscribe(&self, id: SurfaceId) {
        self.inner.borrow_mut().subscribers.retain(|s| s.id != id);
    }
}

/// A subscriber's handle: broadcast from it, drain its mailbox
pub struct SyncEndpoint {
    id: SurfaceId,
    label: &'static str,
    bus: SyncBus,
    receiver: Receiver<Envelope>,
}

impl fmt::Debug for SyncEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncEndpoint")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("pending", &self.receiver.len())
            .finish()
    }
}

impl SyncEndpoint {
    pub fn id(&self) -> SurfaceId {
        self.id
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Send to every other endpoint on the bus
    pub fn broadcast(&self, message: SyncMessage) -> usize {
        let delivered = self.bus.publish(self.id, message);
        log::trace!("{} broadcast {:?} to {} endpoint(s)", self.label, message, delivered);
        delivered
    }

    /// Number of messages waiting in the mailbox
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Take every pending message, oldest first
    pub fn drain(&self) -> Vec<SyncMessage> {
        self.receiver
            .try_iter()
            .filter(|envelope| envelope.origin != self.id)
            .map(|envelope| envelope.message)
            .collect()
    }
}

impl Drop for SyncEndpoint {
    fn drop(&mut self) {
        self.bus.unsubscribe(self.id);
    }
}
