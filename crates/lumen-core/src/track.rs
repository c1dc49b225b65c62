//! Loaded track data: duration, amplitude samples and beat grid
//!
//! A track is always replaced wholesale. Nothing in here is mutated after
//! [`LoadedTrack::load`] returns, so renderers can hold onto it freely.

use serde::{Deserialize, Serialize};

// =============================================================================
// Timeline Extent
// =============================================================================

/// Length of the loaded track in seconds
///
/// Until a track is loaded the extent is [`TimelineExtent::EMPTY`] and every mapping
/// function degrades to offset/time 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TimelineExtent {
    duration_seconds: f64,
}

impl TimelineExtent {
    /// No track loaded
    pub const EMPTY: TimelineExtent = TimelineExtent { duration_seconds: 0.0 };

    /// Create an extent; negative and non-finite durations collapse to 0
    pub fn new(duration_seconds: f64) -> Self {
        let duration_seconds = if duration_seconds.is_finite() {
            duration_seconds.max(0.0)
        } else {
            0.0
        };
        Self { duration_seconds }
    }

    pub fn duration(&self) -> f64 {
        self.duration_seconds
    }

    pub fn is_empty(&self) -> bool {
        self.duration_seconds <= 0.0
    }

    /// Clamp a time into `[0, duration]`
    pub fn clamp_time(&self, time: f64) -> f64 {
        if !time.is_finite() {
            return 0.0;
        }
        time.clamp(0.0, self.duration_seconds)
    }
}

// =============================================================================
// Sample Series
// =============================================================================

/// Amplitude samples plus optional low/mid/high frequency band series
///
/// Produced by the analysis collaborator. The field names match the
/// `waveform_data` object the lighting server stores per song.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleSeries {
    pub amplitude: Vec<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mid: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<Vec<f32>>,
}

/// Outcome of validating the band series against the amplitude series
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BandStatus {
    /// No band data was supplied
    #[default]
    Absent,
    /// All three bands present with matching lengths
    Valid,
    /// Bands present but incomplete or of the wrong length
    Mismatched,
}

/// Borrowed view of validated frequency bands
#[derive(Debug, Clone, Copy)]
pub struct FrequencyBands<'a> {
    pub low: &'a [f32],
    pub mid: &'a [f32],
    pub high: &'a [f32],
}

impl SampleSeries {
    pub fn amplitude_only(amplitude: Vec<f32>) -> Self {
        Self {
            amplitude,
            ..Self::default()
        }
    }

    pub fn with_bands(amplitude: Vec<f32>, low: Vec<f32>, mid: Vec<f32>, high: Vec<f32>) -> Self {
        Self {
            amplitude,
            low: Some(low),
            mid: Some(mid),
            high: Some(high),
        }
    }

    pub fn len(&self) -> usize {
        self.amplitude.len()
    }

    pub fn is_empty(&self) -> bool {
        self.amplitude.is_empty()
    }

    /// Check the band invariant: all three or none, each as long as `amplitude`
    pub fn band_status(&self) -> BandStatus {
        match (&self.low, &self.mid, &self.high) {
            (None, None, None) => BandStatus::Absent,
            (Some(low), Some(mid), Some(high)) => {
                let n = self.amplitude.len();
                if low.len() == n && mid.len() == n && high.len() == n {
                    BandStatus::Valid
                } else {
                    BandStatus::Mismatched
                }
            }
            _ => BandStatus::Mismatched,
        }
    }

    /// Bands, only if they satisfy the band invariant
    pub fn bands(&self) -> Option<FrequencyBands<'_>> {
        if self.band_status() != BandStatus::Valid {
            return None;
        }
        match (&self.low, &self.mid, &self.high) {
            (Some(low), Some(mid), Some(high)) => Some(FrequencyBands { low, mid, high }),
            _ => None,
        }
    }
}

// =============================================================================
// Beat Grid
// =============================================================================

/// Grid marker type (first beat of a bar, or any other beat)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridMarkerKind {
    Bar,
    Beat,
}

/// Beat grid marker at an absolute time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridMarker {
    pub time: f64,
    #[serde(rename = "type")]
    pub kind: GridMarkerKind,
}

/// Beats per bar assumed when deriving a grid from a tempo (4/4)
pub const BEATS_PER_BAR: usize = 4;

/// Fastest tempo accepted for a derived grid
pub const MAX_BPM: f64 = 999.0;

/// Upper bound on derived markers (about 100 minutes at `MAX_BPM`)
pub const MAX_GRID_MARKERS: usize = 100_000;

/// Derive a 4/4 grid from a tempo, starting at t=0
///
/// Returns an empty grid for tempos outside `(0, MAX_BPM]` or non-positive
/// durations. Grids longer than `MAX_GRID_MARKERS` are truncated.
pub fn grid_from_bpm(bpm: f64, duration_seconds: f64) -> Vec<GridMarker> {
    if !(bpm > 0.0 && bpm <= MAX_BPM) || !(duration_seconds > 0.0) {
        if bpm > MAX_BPM {
            log::warn!("Ignoring beat grid for implausible tempo {} bpm", bpm);
        }
        return Vec::new();
    }

    let beat_length = 60.0 / bpm;
    let beat_count = (duration_seconds / beat_length).ceil().min(MAX_GRID_MARKERS as f64) as usize;

    (0..beat_count)
        .map(|i| GridMarker {
            time: i as f64 * beat_length,
            kind: if i % BEATS_PER_BAR == 0 {
                GridMarkerKind::Bar
            } else {
                GridMarkerKind::Beat
            },
        })
        .filter(|marker| marker.time < duration_seconds)
        .collect()
}

// =============================================================================
// Loaded Track
// =============================================================================

/// Everything the renderers need about the current track
#[derive(Debug, Clone, Default)]
pub struct LoadedTrack {
    pub extent: TimelineExtent,
    pub samples: SampleSeries,
    pub grid: Vec<GridMarker>,
    band_status: BandStatus,
}

impl LoadedTrack {
    /// Load a track from the analysis collaborator's output
    ///
    /// Band validation happens once here. A mismatch disables band rendering for this
    /// load only; it is never an error.
    pub fn load(samples: SampleSeries, duration_seconds: f64) -> Self {
        let extent = TimelineExtent::new(duration_seconds);
        let band_status = samples.band_status();

        if band_status == BandStatus::Mismatched {
            log::warn!(
                "Frequency band lengths do not match {} amplitude samples, rendering amplitude only",
                samples.len()
            );
        }

        log::info!(
            "Loaded track: {:.2}s, {} samples, bands {:?}",
            extent.duration(),
            samples.len(),
            band_status
        );

        Self {
            extent,
            samples,
            grid: Vec::new(),
            band_status,
        }
    }

    /// Attach beat grid markers (sorted by time)
    pub fn with_grid(mut self, mut grid: Vec<GridMarker>) -> Self {
        grid.retain(|m| m.time.is_finite() && m.time >= 0.0);
        grid.sort_by(|a, b| a.time.total_cmp(&b.time));
        self.grid = grid;
        self
    }

    pub fn band_status(&self) -> BandStatus {
        self.band_status
    }

    /// Validated bands, `None` when absent or mismatched for this load
    pub fn bands(&self) -> Option<FrequencyBands<'_>> {
        if self.band_status == BandStatus::Valid {
            self.samples.bands()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extent_rejects_negative_and_nan() {
        assert_eq!(TimelineExtent::new(-3.0).duration(), 0.0);
        assert_eq!(TimelineExtent::new(f64::NAN).duration(), 0.0);
        assert!(TimelineExtent::EMPTY.is_empty());
        assert_eq!(TimelineExtent::new(12.5).duration(), 12.5);
    }

    #[test]
    fn test_band_status_valid() {
        let series = SampleSeries::with_bands(vec![0.1; 8], vec![0.2; 8], vec![0.3; 8], vec![0.4; 8]);
        assert_eq!(series.band_status(), BandStatus::Valid);
        assert!(series.bands().is_some());
    }

    #[test]
    fn test_band_status_short_band_is_mismatch() {
        let series = SampleSeries::with_bands(vec![0.1; 8], vec![0.2; 7], vec![0.3; 8], vec![0.4; 8]);
        assert_eq!(series.band_status(), BandStatus::Mismatched);
        assert!(series.bands().is_none());
    }

    #[test]
    fn test_band_status_partial_bands_is_mismatch() {
        let series = SampleSeries {
            amplitude: vec![0.5; 4],
            low: Some(vec![0.5; 4]),
            mid: None,
            high: None,
        };
        assert_eq!(series.band_status(), BandStatus::Mismatched);

        let track = LoadedTrack::load(series, 4.0);
        assert!(track.bands().is_none());
    }

    #[test]
    fn test_waveform_data_json_without_bands() {
        let series: SampleSeries = serde_json::from_str(r#"{"amplitude":[0.1,0.2]}"#).unwrap();
        assert_eq!(series.band_status(), BandStatus::Absent);
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn test_grid_from_bpm_marks_bars() {
        let grid = grid_from_bpm(120.0, 4.0);
        // 0.5s per beat, 8 beats in 4 seconds
        assert_eq!(grid.len(), 8);
        assert_eq!(grid[0].kind, GridMarkerKind::Bar);
        assert_eq!(grid[1].kind, GridMarkerKind::Beat);
        assert_eq!(grid[4].kind, GridMarkerKind::Bar);
        assert!((grid[3].time - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_grid_from_invalid_bpm_is_empty() {
        assert!(grid_from_bpm(0.0, 10.0).is_empty());
        assert!(grid_from_bpm(f64::NAN, 10.0).is_empty());
        assert!(grid_from_bpm(1e12, 10.0).is_empty());
        assert!(grid_from_bpm(f64::INFINITY, 10.0).is_empty());
    }

    #[test]
    fn test_grid_is_bounded() {
        assert_eq!(grid_from_bpm(960.0, 1.0).len(), 16);
        assert_eq!(grid_from_bpm(960.0, 1e9).len(), MAX_GRID_MARKERS);
    }

    #[test]
    fn test_with_grid_sorts_and_drops_negative() {
        let track = LoadedTrack::load(SampleSeries::default(), 10.0).with_grid(vec![
            GridMarker { time: 2.0, kind: GridMarkerKind::Beat },
            GridMarker { time: -1.0, kind: GridMarkerKind::Bar },
            GridMarker { time: 1.0, kind: GridMarkerKind::Bar },
        ]);
        let times: Vec<f64> = track.grid.iter().map(|m| m.time).collect();
        assert_eq!(times, vec![1.0, 2.0]);
    }
}
