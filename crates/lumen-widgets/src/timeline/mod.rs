//! Sequence timeline surface: block layout and the timeline engine

mod engine;
pub mod layout;

pub use engine::{CreateRequest, PointerOutcome, SequenceTimelineEngine};
pub use layout::{BlockRect, DeviceRows, LayoutMode};
