//! Cross-surface synchronization
//!
//! The waveform and the sequence timeline are zoomed and scrolled independently but
//! must show the same slice of time. Each surface owns a [`SyncedView`] connected to a
//! shared [`SyncBus`]:
//!
//! 1. A local gesture computes a clamped [`ZoomScrollState`](crate::ZoomScrollState),
//!    applies it, and broadcasts it once.
//! 2. Every *other* endpoint receives the message in its mailbox.
//! 3. A receiving surface applies the values directly and never re-broadcasts
//!    (apply-without-echo), so propagation depth is bounded to 1.
//!
//! Messages carry absolute values, never deltas, so zoom/scroll updates and playhead
//! updates commute.

mod bus;
mod view;

pub use bus::{SurfaceId, SyncBus, SyncEndpoint, SyncMessage};
pub use view::{RemoteUpdate, SyncedView};
