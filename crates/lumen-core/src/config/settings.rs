//! Editor configuration
//!
//! Stored as YAML at `~/.config/lumen/config.yaml`. Every section is
//! `#[serde(default)]`, so a partial file only overrides what it names.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::io::Validate;
use crate::compensation::{ChannelRole, FixtureLayout, LAST_ADDRESS};
use crate::playback::TickIntervals;
use crate::sequence::DeviceId;
use crate::zoom::MAX_ZOOM;

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LumenConfig {
    pub transport: TransportConfig,
    pub refresh: RefreshConfig,
    pub waveform: WaveformConfig,
    pub timeline: TimelineConfig,
    pub zoom: ZoomConfig,
    /// Patched fixtures, used to plan compensating channel resets
    pub fixtures: Vec<FixtureConfig>,
}

impl Validate for LumenConfig {
    fn validate(&mut self) {
        self.transport.validate();
        self.refresh.validate();
        self.waveform.validate();
        self.timeline.validate();
        self.zoom.validate();
        self.fixtures
            .retain(|f| (1..=LAST_ADDRESS).contains(&f.start_address));
    }
}

impl LumenConfig {
    /// Fixture patch keyed by device, for [`compensating_channels`](crate::compensation::compensating_channels)
    pub fn fixture_patch(&self) -> HashMap<DeviceId, FixtureLayout> {
        self.fixtures
            .iter()
            .map(|f| {
                (
                    f.device_id,
                    FixtureLayout {
                        start_address: f.start_address,
                        channels: f.channels.clone(),
                    },
                )
            })
            .collect()
    }
}

/// Lighting server connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub song_id: u64,
    /// Sequence opened at start-up
    pub sequence_id: Option<u64>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: String::from("http://127.0.0.1:5000"),
            timeout_ms: 2000,
            song_id: 1,
            sequence_id: None,
        }
    }
}

impl TransportConfig {
    pub fn validate(&mut self) {
        self.timeout_ms = self.timeout_ms.clamp(100, 30_000);
        if self.base_url.trim().is_empty() {
            self.base_url = Self::default().base_url;
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Refresh cadences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// High-rate playhead refresh
    pub playhead_interval_ms: u64,
    /// Timeline re-layout while playing
    pub layout_interval_ms: u64,
    /// Drift correction against the server clock
    pub resync_interval_ms: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            playhead_interval_ms: 16,
            layout_interval_ms: 100,
            resync_interval_ms: 2000,
        }
    }
}

impl RefreshConfig {
    pub fn validate(&mut self) {
        self.playhead_interval_ms = self.playhead_interval_ms.clamp(4, 250);
        self.layout_interval_ms = self.layout_interval_ms.clamp(self.playhead_interval_ms, 2000);
        self.resync_interval_ms = self.resync_interval_ms.clamp(250, 60_000);
    }

    pub fn intervals(&self) -> TickIntervals {
        TickIntervals {
            playhead: Duration::from_millis(self.playhead_interval_ms),
            layout: Duration::from_millis(self.layout_interval_ms),
            resync: Duration::from_millis(self.resync_interval_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveformConfig {
    /// Samples per pixel above which columns are scanned with a stride
    pub coarse_stride_threshold: usize,
    /// Draw low/mid/high layers when the track has valid bands
    pub show_bands: bool,
    pub height: f32,
}

impl Default for WaveformConfig {
    fn default() -> Self {
        Self {
            coarse_stride_threshold: 2048,
            show_bands: true,
            height: 120.0,
        }
    }
}

impl WaveformConfig {
    pub fn validate(&mut self) {
        self.coarse_stride_threshold = self.coarse_stride_threshold.max(16);
        self.height = self.height.clamp(40.0, 600.0);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    pub row_height: f32,
    /// Duration given to dialog-created events without one
    pub default_event_duration: f64,
    /// One row per device instead of a single shared row
    pub grouped_by_device: bool,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            row_height: 28.0,
            default_event_duration: 2.0,
            grouped_by_device: true,
        }
    }
}

impl TimelineConfig {
    pub fn validate(&mut self) {
        self.row_height = self.row_height.clamp(12.0, 120.0);
        if !(self.default_event_duration.is_finite() && self.default_event_duration > 0.0) {
            self.default_event_duration = Self::default().default_event_duration;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomConfig {
    /// Zoom multiplier per wheel notch
    pub wheel_step: f64,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self { wheel_step: 1.2 }
    }
}

impl ZoomConfig {
    pub fn validate(&mut self) {
        if !self.wheel_step.is_finite() {
            self.wheel_step = Self::default().wheel_step;
        }
        self.wheel_step = self.wheel_step.clamp(1.01, MAX_ZOOM);
    }
}

/// One patched fixture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureConfig {
    pub device_id: DeviceId,
    pub start_address: u16,
    pub channels: Vec<ChannelRole>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{load_config, save_config};

    #[test]
    fn test_defaults() {
        let config = LumenConfig::default();
        assert_eq!(config.refresh.playhead_interval_ms, 16);
        assert_eq!(config.refresh.layout_interval_ms, 100);
        assert_eq!(config.waveform.coarse_stride_threshold, 2048);
        assert_eq!(config.zoom.wheel_step, 1.2);
        assert!(config.fixtures.is_empty());
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let config: LumenConfig = serde_yaml::from_str("refresh:\n  resync_interval_ms: 500\n").unwrap();
        assert_eq!(config.refresh.resync_interval_ms, 500);
        assert_eq!(config.refresh.playhead_interval_ms, 16);
        assert_eq!(config.transport, TransportConfig::default());
    }

    #[test]
    fn test_validation_clamps() {
        let mut config = LumenConfig::default();
        config.refresh.playhead_interval_ms = 0;
        config.refresh.layout_interval_ms = 1;
        config.zoom.wheel_step = 0.5;
        config.timeline.default_event_duration = -3.0;
        config.fixtures.push(FixtureConfig {
            device_id: DeviceId(1),
            start_address: 0,
            channels: vec![ChannelRole::Dimmer],
        });

        config.validate();

        assert_eq!(config.refresh.playhead_interval_ms, 4);
        assert_eq!(config.refresh.layout_interval_ms, 4);
        assert!(config.zoom.wheel_step > 1.0);
        assert_eq!(config.timeline.default_event_duration, 2.0);
        assert!(config.fixtures.is_empty());
    }

    #[test]
    fn test_fixture_patch_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let mut config = LumenConfig::default();
        config.fixtures.push(FixtureConfig {
            device_id: DeviceId(7),
            start_address: 33,
            channels: vec![ChannelRole::Dimmer, ChannelRole::Red, ChannelRole::Green, ChannelRole::Blue],
        });

        save_config(&config, &path).unwrap();
        let loaded: LumenConfig = load_config(&path);

        assert_eq!(loaded, config);
        let patch = loaded.fixture_patch();
        assert_eq!(patch[&DeviceId(7)].start_address, 33);
    }

    #[test]
    fn test_intervals() {
        let intervals = RefreshConfig::default().intervals();
        assert_eq!(intervals, TickIntervals::default());
    }
}
