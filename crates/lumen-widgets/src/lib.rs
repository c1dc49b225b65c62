//! Render engines and iced canvases for the lumen sequence editor
//!
//! ## Architecture (iced 0.14 patterns)
//!
//! - **Engines**: `WaveformEngine` and `SequenceTimelineEngine` own their state, their
//!   zoom/scroll view (bound to the sync bus) and a retained `RenderSurface`
//! - **Canvas Programs**: Translate iced input into `SurfaceInput`s and replay the
//!   engines' display lists
//! - **View functions**: Take an engine + input callback, return `Element<Message>`
//! - **Session**: `EditorSession` wires both engines to the playback tracker and the
//!   transition detector
//!
//! ## View Functions
//!
//! - `waveform_view`: Waveform with wheel zoom, shift-wheel pan and click-to-seek
//! - `timeline_view`: Event blocks with select, drag-to-retime and right-click create

pub mod canvas;
pub mod session;
pub mod surface;
pub mod theme;
pub mod timeline;
pub mod waveform;

pub use canvas::{timeline_view, waveform_view, SurfaceGesture, SurfaceInput, SurfaceInteraction};
pub use session::EditorSession;
pub use surface::{DrawCommand, RenderSurface};
pub use timeline::{CreateRequest, LayoutMode, PointerOutcome, SequenceTimelineEngine};
pub use waveform::{WaveLayer, WaveformEngine};
