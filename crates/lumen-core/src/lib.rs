//! Lumen Core - timeline synchronization and playback tracking for the lighting sequencer
//!
//! The core is UI-agnostic. Renderers (see `lumen-widgets`) consume it through:
//!
//! - [`mapping`]: time ↔ pixel conversion for a zoomed/scrolled surface
//! - [`zoom`]: the clamped `(zoom, scroll)` pair each surface owns
//! - [`sync`]: the typed bus that keeps surfaces numerically identical
//! - [`playback`]: transport commands, the position predictor and its tick scheduler
//! - [`transitions`]: exactly-once enter/exit detection for sequence events
//!
//! Everything here runs on a single logical thread. The only suspension points are
//! transport requests, which are modelled as values the host executes and then reports
//! back via [`playback::PlaybackTracker::complete`].

pub mod compensation;
pub mod config;
pub mod mapping;
pub mod playback;
pub mod sequence;
pub mod sync;
pub mod track;
pub mod transitions;
pub mod zoom;

pub use mapping::{offset_to_time, time_to_offset, VisibleWindow};
pub use track::{LoadedTrack, SampleSeries, TimelineExtent};
pub use zoom::{ZoomScrollState, MAX_ZOOM, MIN_ZOOM};
