//! Waveform render engine
//!
//! Owns the waveform surface, its zoom/scroll view (bound to the sync bus) and a
//! separate playhead overlay. Never touches playback or event state.

use std::rc::Rc;

use lumen_core::config::WaveformConfig;
use lumen_core::mapping::{offset_to_time, time_to_offset};
use lumen_core::sync::{RemoteUpdate, SyncEndpoint, SyncedView};
use lumen_core::track::{GridMarkerKind, LoadedTrack};
use lumen_core::{TimelineExtent, VisibleWindow, ZoomScrollState};

use super::peaks::{compute_layers, LayerPeaks, WaveLayer};
use crate::surface::{DrawCommand, RenderSurface};
use crate::theme;

pub struct WaveformEngine {
    view: SyncedView,
    track: Rc<LoadedTrack>,
    surface: RenderSurface,
    overlay: RenderSurface,
    config: WaveformConfig,
    wheel_step: f64,
    playhead: f64,
    layers: Vec<WaveLayer>,
    dirty: bool,
}

impl WaveformEngine {
    pub fn new(endpoint: SyncEndpoint, config: WaveformConfig, wheel_step: f64, width: f32) -> Self {
        let height = config.height;
        Self {
            view: SyncedView::new(endpoint),
            track: Rc::new(LoadedTrack::default()),
            surface: RenderSurface::new(width, height),
            overlay: RenderSurface::new(width, height),
            config,
            wheel_step,
            playhead: 0.0,
            layers: Vec::new(),
            dirty: true,
        }
    }

    // ------------------------------------------------------------------------
    // State
    // ------------------------------------------------------------------------

    /// Replace the track; the view resets to the whole track without broadcasting
    pub fn load_track(&mut self, track: Rc<LoadedTrack>) {
        self.track = track;
        self.view.reset(ZoomScrollState::default());
        self.playhead = 0.0;
        self.dirty = true;
        self.render_playhead();
    }

    pub fn track(&self) -> &LoadedTrack {
        &self.track
    }

    pub fn extent(&self) -> TimelineExtent {
        self.track.extent
    }

    pub fn view_state(&self) -> ZoomScrollState {
        self.view.state()
    }

    pub fn window(&self) -> VisibleWindow {
        VisibleWindow::compute(self.extent(), self.view.state())
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn playhead(&self) -> f64 {
        self.playhead
    }

    /// Layers drawn by the last render
    pub fn last_layers(&self) -> &[WaveLayer] {
        &self.layers
    }

    pub fn surface(&self) -> &RenderSurface {
        &self.surface
    }

    pub fn overlay(&self) -> &RenderSurface {
        &self.overlay
    }

    fn width(&self) -> f64 {
        self.surface.width() as f64
    }

    // ------------------------------------------------------------------------
    // Gestures
    // ------------------------------------------------------------------------

    /// Zoom by wheel notches around the pointer (positive zooms in)
    pub fn wheel_zoom(&mut self, notches: f64, pointer_x: f32) -> bool {
        let factor = self.wheel_step.powf(notches);
        let next = self
            .view
            .state()
            .zoom_by(factor, pointer_x as f64, self.width(), self.extent());
        self.apply_local(next)
    }

    /// Pan by a pixel distance (positive moves later in time)
    pub fn pan(&mut self, delta_pixels: f32) -> bool {
        let next = self
            .view
            .state()
            .scroll_by_pixels(delta_pixels as f64, self.width(), self.extent());
        self.apply_local(next)
    }

    /// Time under a pointer position (click to seek)
    pub fn time_at(&self, pointer_x: f32) -> f64 {
        let time = offset_to_time(pointer_x as f64, self.extent(), self.view.state(), self.width());
        self.extent().clamp_time(time)
    }

    fn apply_local(&mut self, next: ZoomScrollState) -> bool {
        let changed = self.view.apply_local(next);
        if changed {
            self.dirty = true;
            self.render_playhead();
        }
        changed
    }

    /// Apply messages from the other surfaces (never re-broadcasts)
    pub fn sync(&mut self) -> RemoteUpdate {
        let update = self.view.apply_remote();
        if update.view_changed {
            self.dirty = true;
        }
        match update.position {
            Some(position) => self.set_playhead(position),
            None if update.view_changed => self.render_playhead(),
            None => {}
        }
        update
    }

    pub fn set_playhead(&mut self, position: f64) {
        self.playhead = position;
        self.render_playhead();
    }

    // ------------------------------------------------------------------------
    // Surface lifecycle
    // ------------------------------------------------------------------------

    pub fn resize(&mut self, width: f32, height: f32) {
        if self.surface.resize(width, height) {
            self.overlay.resize(width, height);
            self.dirty = true;
            self.render_playhead();
            log::debug!("WaveformEngine: resized to {}x{}", width, height);
        }
    }

    pub fn dispose(&mut self) {
        self.surface.dispose();
        self.overlay.dispose();
        self.layers.clear();
    }

    // ------------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------------

    /// Redraw the main layer for the current window
    pub fn render(&mut self) {
        if !self.surface.begin_frame() {
            return;
        }
        self.dirty = false;

        let (width, height) = (self.surface.width(), self.surface.height());
        self.surface.fill_rect(0.0, 0.0, width, height, theme::BACKGROUND);

        let window = self.window();
        if window.is_empty() || width < 1.0 {
            self.layers.clear();
            return;
        }

        self.render_grid(window);

        let columns = width.floor() as usize;
        let peaks = compute_layers(
            &self.track,
            window,
            columns,
            self.config.coarse_stride_threshold,
            self.config.show_bands,
        );
        self.layers = peaks.iter().map(|p| p.layer).collect();

        for layer in &peaks {
            let color = layer_color(layer.layer);
            if let Some(points) = envelope(layer, height) {
                self.surface.push(DrawCommand::Polygon { points, color });
            }
        }

        log::trace!(
            "WaveformEngine: rendered {} layer(s) over {:.2}s..{:.2}s",
            peaks.len(),
            window.start,
            window.end()
        );
    }

    fn render_grid(&mut self, window: VisibleWindow) {
        let extent = self.extent();
        let view = self.view.state();
        let width = self.width();
        let height = self.surface.height();

        let visible: Vec<(f32, GridMarkerKind)> = self
            .track
            .grid
            .iter()
            .filter(|marker| marker.time >= window.start && marker.time <= window.end())
            .map(|marker| (time_to_offset(marker.time, extent, view, width) as f32, marker.kind))
            .collect();

        for (x, kind) in visible {
            let (color, line_width) = match kind {
                GridMarkerKind::Bar => (theme::GRID_BAR_COLOR, 1.5),
                GridMarkerKind::Beat => (theme::GRID_BEAT_COLOR, 1.0),
            };
            self.surface.line((x, 0.0), (x, height), line_width, color);
        }
    }

    /// Redraw only the playhead overlay
    pub fn render_playhead(&mut self) {
        if !self.overlay.begin_frame() {
            return;
        }
        let window = self.window();
        if window.is_empty() || self.playhead < window.start || self.playhead > window.end() {
            return;
        }
        let x = time_to_offset(self.playhead, self.extent(), self.view.state(), self.width()) as f32;
        let height = self.overlay.height();
        self.overlay
            .line((x, 0.0), (x, height), theme::PLAYHEAD_WIDTH, theme::PLAYHEAD_COLOR);
    }
}

fn layer_color(layer: WaveLayer) -> iced::Color {
    match layer {
        WaveLayer::Amplitude => theme::AMPLITUDE_COLOR,
        WaveLayer::Low => theme::BAND_COLORS[0],
        WaveLayer::Mid => theme::BAND_COLORS[1],
        WaveLayer::High => theme::BAND_COLORS[2],
    }
}

/// Mirrored envelope polygon around the vertical center
fn envelope(layer: &LayerPeaks, height: f32) -> Option<Vec<(f32, f32)>> {
    if layer.values.is_empty() {
        return None;
    }
    let center = height / 2.0;
    let scale = center * 0.95;

    let upper = layer
        .values
        .iter()
        .enumerate()
        .map(|(x, v)| (x as f32 + 0.5, center - v * scale));
    let lower = layer
        .values
        .iter()
        .enumerate()
        .rev()
        .map(|(x, v)| (x as f32 + 0.5, center + v * scale));

    Some(upper.chain(lower).collect())
}
