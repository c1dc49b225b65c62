//! Per-column peak extraction for the visible window
//!
//! Samples are spread evenly over the track duration. Each pixel column covers a
//! sample range; its value is the largest absolute sample in that range. Columns that
//! cover more than `stride_threshold` samples are scanned with a stride, always
//! including the first and last sample of the column.

use std::ops::Range;

use lumen_core::track::LoadedTrack;
use lumen_core::VisibleWindow;

/// Waveform layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaveLayer {
    Amplitude,
    Low,
    Mid,
    High,
}

/// Normalized (0..=1) peak per column for one layer
#[derive(Debug, Clone, PartialEq)]
pub struct LayerPeaks {
    pub layer: WaveLayer,
    pub values: Vec<f32>,
}

/// Sample indices covered by `column`, or `None` past the end of the track
pub fn column_range(
    column: usize,
    columns: usize,
    window: VisibleWindow,
    duration: f64,
    sample_count: usize,
) -> Option<Range<usize>> {
    if columns == 0 || sample_count == 0 || duration <= 0.0 || window.is_empty() {
        return None;
    }

    let column_span = window.span / columns as f64;
    let t0 = window.start + column as f64 * column_span;
    let t1 = t0 + column_span;
    if t0 >= duration {
        return None;
    }

    let per_second = sample_count as f64 / duration;
    let start = ((t0 * per_second).floor().max(0.0) as usize).min(sample_count - 1);
    let end = ((t1 * per_second).ceil() as usize).min(sample_count);
    Some(start..end.max(start + 1))
}

/// Largest absolute sample in `range`
pub fn column_peak(samples: &[f32], range: Range<usize>, stride_threshold: usize) -> f32 {
    let range = range.start.min(samples.len())..range.end.min(samples.len());
    if range.is_empty() {
        return 0.0;
    }

    let count = range.len();
    if stride_threshold == 0 || count <= stride_threshold {
        return samples[range].iter().fold(0.0f32, |peak, s| peak.max(s.abs()));
    }

    let stride = count.div_ceil(stride_threshold);
    let last = samples[range.end - 1].abs();
    range
        .step_by(stride)
        .map(|i| samples[i].abs())
        .fold(last, f32::max)
}

/// Raw (unnormalized) peaks for every column of the window
pub fn visible_peaks(
    samples: &[f32],
    duration: f64,
    window: VisibleWindow,
    columns: usize,
    stride_threshold: usize,
) -> Vec<f32> {
    (0..columns)
        .map(|column| {
            column_range(column, columns, window, duration, samples.len())
                .map(|range| column_peak(samples, range, stride_threshold))
                .unwrap_or(0.0)
        })
        .collect()
}

/// Scale so the largest visible value is 1
pub fn normalize(values: &mut [f32]) {
    let max = values.iter().copied().fold(0.0f32, f32::max);
    if max > 0.0 && max.is_finite() {
        for value in values.iter_mut() {
            *value /= max;
        }
    }
}

/// Layers to draw for the window
///
/// Valid bands give low/mid/high layers; anything else (absent, mismatched, or
/// bands switched off) gives the plain amplitude layer.
pub fn compute_layers(
    track: &LoadedTrack,
    window: VisibleWindow,
    columns: usize,
    stride_threshold: usize,
    show_bands: bool,
) -> Vec<LayerPeaks> {
    let duration = track.extent.duration();
    let series: Vec<(WaveLayer, &[f32])> = match track.bands() {
        Some(bands) if show_bands => vec![
            (WaveLayer::Low, bands.low),
            (WaveLayer::Mid, bands.mid),
            (WaveLayer::High, bands.high),
        ],
        _ => vec![(WaveLayer::Amplitude, track.samples.amplitude.as_slice())],
    };

    series
        .into_iter()
        .map(|(layer, samples)| {
            let mut values = visible_peaks(samples, duration, window, columns, stride_threshold);
            normalize(&mut values);
            LayerPeaks { layer, values }
        })
        .collect()
}
