//! Lighting event sequence: the event model, the ordered store and drag retiming

mod drag;
mod error;
mod event;
mod store;

pub use drag::DragSession;
pub use error::{SequenceError, SequenceResult};
pub use event::{
    CreationPath, DeviceId, EventDraft, EventId, EventKind, EventPayload, Rgbw, SequenceEvent,
};
pub use store::Sequence;
