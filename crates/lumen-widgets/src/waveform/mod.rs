//! Waveform surface: peak extraction and the render engine

mod engine;
pub mod peaks;

pub use engine::WaveformEngine;
pub use peaks::{LayerPeaks, WaveLayer};
