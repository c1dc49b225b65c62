//! Sequence timeline engine
//!
//! Owns the event sequence and renders it as blocks on device rows. All mutations go
//! through this engine so the revision it publishes (`EventListChanged`) is the single
//! source of truth for "the event list changed".
//!
//! Pointer flow:
//!
//! - press on a block: select it and start a drag session
//! - press on the background: clear the selection
//! - move while dragging: update the preview only
//! - release: commit the preview through [`Sequence::retime`]
//! - cancel (or a failed commit): the event keeps its original time

use lumen_core::config::TimelineConfig;
use lumen_core::mapping::{offset_to_time, time_to_offset};
use lumen_core::sequence::{
    CreationPath, DeviceId, DragSession, EventDraft, EventId, EventKind, EventPayload, Sequence,
    SequenceEvent, SequenceResult,
};
use lumen_core::sync::{RemoteUpdate, SyncEndpoint, SyncMessage, SyncedView};
use lumen_core::{TimelineExtent, VisibleWindow, ZoomScrollState};

use super::layout::{hit_test, layout_blocks, BlockRect, DeviceRows, LayoutContext, LayoutMode};
use crate::surface::{DrawCommand, RenderSurface};
use crate::theme;

/// Result of a pointer press
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerOutcome {
    /// A block was hit, selected, and is now being dragged
    Selected(EventId),
    /// Background hit; the previous selection was cleared
    Deselected,
    /// Background hit with nothing selected
    Background,
}

/// Ask the event dialog collaborator for a new event at `time`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CreateRequest {
    pub time: f64,
    /// Device of the row that was clicked, when grouped by device
    pub device: Option<DeviceId>,
}

pub struct SequenceTimelineEngine {
    view: SyncedView,
    extent: TimelineExtent,
    sequence: Sequence,
    selected: Option<EventId>,
    drag: Option<DragSession>,
    mode: LayoutMode,
    row_height: f32,
    default_duration: f64,
    wheel_step: f64,
    surface: RenderSurface,
    overlay: RenderSurface,
    rows: DeviceRows,
    blocks: Vec<BlockRect>,
    playhead: f64,
    dirty: bool,
}

impl SequenceTimelineEngine {
    pub fn new(endpoint: SyncEndpoint, config: &TimelineConfig, wheel_step: f64, width: f32, height: f32) -> Self {
        let mode = if config.grouped_by_device {
            LayoutMode::Grouped
        } else {
            LayoutMode::Single
        };
        Self {
            view: SyncedView::new(endpoint),
            extent: TimelineExtent::EMPTY,
            sequence: Sequence::new(),
            selected: None,
            drag: None,
            mode,
            row_height: config.row_height,
            default_duration: config.default_event_duration,
            wheel_step,
            surface: RenderSurface::new(width, height),
            overlay: RenderSurface::new(width, height),
            rows: DeviceRows::default(),
            blocks: Vec::new(),
            playhead: 0.0,
            dirty: true,
        }
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    /// Snapshot of the events in time order
    pub fn events(&self) -> Vec<SequenceEvent> {
        self.sequence.events()
    }

    pub fn selected(&self) -> Option<EventId> {
        self.selected
    }

    pub fn drag(&self) -> Option<&DragSession> {
        self.drag.as_ref()
    }

    pub fn layout_mode(&self) -> LayoutMode {
        self.mode
    }

    pub fn view_state(&self) -> ZoomScrollState {
        self.view.state()
    }

    pub fn extent(&self) -> TimelineExtent {
        self.extent
    }

    pub fn window(&self) -> VisibleWindow {
        VisibleWindow::compute(self.extent, self.view.state())
    }

    pub fn rows(&self) -> &DeviceRows {
        &self.rows
    }

    /// Blocks from the last render
    pub fn blocks(&self) -> &[BlockRect] {
        &self.blocks
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
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

    pub fn time_at(&self, pointer_x: f32) -> f64 {
        offset_to_time(pointer_x as f64, self.extent, self.view.state(), self.width())
    }

    // ------------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------------

    /// Replace track extent and events; view resets without broadcasting
    pub fn load(&mut self, extent: TimelineExtent, drafts: Vec<EventDraft>) {
        self.extent = extent;
        self.view.reset(ZoomScrollState::default());
        self.selected = None;
        self.drag = None;
        self.playhead = 0.0;
        self.sequence.replace_all(drafts, CreationPath::Dialog);
        self.changed();
        self.render_playhead();
    }

    // ------------------------------------------------------------------------
    // Mutation API
    // ------------------------------------------------------------------------

    /// Commit a record produced by the event dialog
    pub fn on_event_submitted(&mut self, mut draft: EventDraft) -> EventId {
        if draft.duration_seconds.is_none() {
            draft.duration_seconds = Some(self.default_duration);
        }
        let id = self.sequence.insert(draft, CreationPath::Dialog);
        self.selected = Some(id);
        self.changed();
        id
    }

    /// Drop a default event of `kind` at `time`
    pub fn quick_add(&mut self, device: DeviceId, kind: EventKind, time: f64) -> EventId {
        let draft = EventDraft::new(time, device, EventPayload::default_for(kind));
        let id = self.sequence.insert(draft, CreationPath::QuickAdd);
        self.changed();
        id
    }

    pub fn remove(&mut self, id: EventId) -> SequenceResult<SequenceEvent> {
        let removed = self.sequence.remove(id)?;
        if self.selected == Some(id) {
            self.selected = None;
        }
        if self.drag.is_some_and(|d| d.id() == id) {
            self.drag = None;
        }
        self.changed();
        Ok(removed)
    }

    pub fn remove_selected(&mut self) -> Option<SequenceEvent> {
        let id = self.selected?;
        self.remove(id).ok()
    }

    pub fn retime(&mut self, id: EventId, time: f64) -> SequenceResult<f64> {
        let applied = self.sequence.retime(id, time)?;
        self.changed();
        Ok(applied)
    }

    pub fn set_duration(&mut self, id: EventId, duration: f64) -> SequenceResult<()> {
        self.sequence.set_duration(id, duration)?;
        self.changed();
        Ok(())
    }

    pub fn set_payload(&mut self, id: EventId, payload: EventPayload) -> SequenceResult<()> {
        self.sequence.set_payload(id, payload)?;
        self.changed();
        Ok(())
    }

    /// Shift the selected event by a time delta
    pub fn nudge_selected(&mut self, delta_seconds: f64) -> Option<f64> {
        let id = self.selected?;
        let applied = self.sequence.nudge(id, delta_seconds).ok()?;
        self.changed();
        Some(applied)
    }

    pub fn clear(&mut self) {
        self.sequence.clear();
        self.selected = None;
        self.drag = None;
        self.changed();
    }

    fn changed(&mut self) {
        self.dirty = true;
        self.view.endpoint().broadcast(SyncMessage::EventListChanged {
            revision: self.sequence.revision(),
        });
    }

    // ------------------------------------------------------------------------
    // Pointer
    // ------------------------------------------------------------------------

    pub fn pointer_pressed(&mut self, x: f32, y: f32) -> PointerOutcome {
        match hit_test(&self.blocks, x, y) {
            Some(id) => {
                let Some(event) = self.sequence.get(id) else {
                    return PointerOutcome::Background;
                };
                self.drag = Some(DragSession::begin(id, event.time, x as f64));
                self.selected = Some(id);
                self.dirty = true;
                PointerOutcome::Selected(id)
            }
            None => {
                self.drag = None;
                if self.selected.take().is_some() {
                    self.dirty = true;
                    PointerOutcome::Deselected
                } else {
                    PointerOutcome::Background
                }
            }
        }
    }

    /// Where a new event would go for a click at `(x, y)`
    pub fn request_create_at(&self, x: f32, y: f32) -> Option<CreateRequest> {
        if self.extent.is_empty() {
            return None;
        }
        let time = self.extent.clamp_time(self.time_at(x));
        let device = match self.mode {
            LayoutMode::Grouped if self.row_height > 0.0 => {
                let row = (y / self.row_height).floor().max(0.0) as usize;
                self.rows.devices().get(row).copied()
            }
            _ => None,
        };
        Some(CreateRequest { time, device })
    }

    /// Update the drag preview; returns the preview time
    pub fn pointer_moved(&mut self, x: f32) -> Option<f64> {
        let extent = self.extent;
        let view = self.view.state();
        let width = self.width();
        let drag = self.drag.as_mut()?;
        let preview = drag.update(x as f64, extent, view, width);
        self.dirty = true;
        Some(preview)
    }

    /// Commit the drag, if any
    ///
    /// A failed commit leaves the event at its original time.
    pub fn pointer_released(&mut self, x: f32) -> Option<SequenceResult<f64>> {
        self.pointer_moved(x);
        let drag = self.drag.take()?;
        self.dirty = true;

        let moved = drag.has_moved();
        let result = drag.commit(&mut self.sequence);
        match &result {
            Ok(time) if moved => {
                log::debug!("SequenceTimelineEngine: {} retimed to {:.3}s", drag.id(), time);
                self.changed();
            }
            Ok(_) => {}
            Err(e) => log::warn!("SequenceTimelineEngine: drag commit failed: {}", e),
        }
        Some(result)
    }

    /// Abandon the drag; the event keeps its stored time
    pub fn cancel_drag(&mut self) -> bool {
        if self.drag.take().is_some() {
            self.dirty = true;
            true
        } else {
            false
        }
    }

    // ------------------------------------------------------------------------
    // View
    // ------------------------------------------------------------------------

    pub fn wheel_zoom(&mut self, notches: f64, pointer_x: f32) -> bool {
        let factor = self.wheel_step.powf(notches);
        let next = self
            .view
            .state()
            .zoom_by(factor, pointer_x as f64, self.width(), self.extent);
        self.apply_local(next)
    }

    pub fn pan(&mut self, delta_pixels: f32) -> bool {
        let next = self
            .view
            .state()
            .scroll_by_pixels(delta_pixels as f64, self.width(), self.extent);
        self.apply_local(next)
    }

    fn apply_local(&mut self, next: ZoomScrollState) -> bool {
        let changed = self.view.apply_local(next);
        if changed {
            self.dirty = true;
            self.render_playhead();
        }
        changed
    }

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

    pub fn set_layout_mode(&mut self, mode: LayoutMode) {
        if self.mode != mode {
            self.mode = mode;
            self.dirty = true;
        }
    }

    pub fn toggle_layout_mode(&mut self) -> LayoutMode {
        self.set_layout_mode(self.mode.toggled());
        self.mode
    }

    pub fn set_playhead(&mut self, position: f64) {
        self.playhead = position;
        self.render_playhead();
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        if self.surface.resize(width, height) {
            self.overlay.resize(width, height);
            self.dirty = true;
            self.render_playhead();
        }
    }

    pub fn dispose(&mut self) {
        self.surface.dispose();
        self.overlay.dispose();
        self.blocks.clear();
        self.drag = None;
    }

    // ------------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------------

    pub fn render(&mut self) {
        if !self.surface.begin_frame() {
            return;
        }
        self.dirty = false;

        let ctx = LayoutContext {
            extent: self.extent,
            view: self.view.state(),
            width: self.surface.width(),
            row_height: self.row_height,
            mode: self.mode,
        };
        let (rows, blocks) = layout_blocks(self.sequence.iter(), &ctx, self.selected, self.drag.as_ref());
        self.rows = rows;
        self.blocks = blocks;

        let (width, height) = (self.surface.width(), self.surface.height());
        self.surface.fill_rect(0.0, 0.0, width, height, theme::BACKGROUND);

        let row_count = self.rows.len().max(1);
        for row in 0..row_count {
            let y = row as f32 * self.row_height;
            if row % 2 == 1 {
                self.surface.fill_rect(0.0, y, width, self.row_height, theme::ROW_STRIPE);
            }
            self.surface
                .line((0.0, y + self.row_height), (width, y + self.row_height), 1.0, theme::ROW_DIVIDER);
        }

        if self.mode == LayoutMode::Grouped {
            let labels: Vec<DrawCommand> = self
                .rows
                .devices()
                .iter()
                .enumerate()
                .map(|(row, device)| DrawCommand::Label {
                    x: 4.0,
                    y: row as f32 * self.row_height + 2.0,
                    text: device.to_string(),
                    size: 11.0,
                    color: theme::LABEL_COLOR,
                })
                .collect();
            for label in labels {
                self.surface.push(label);
            }
        }

        if let Some(drag) = self.drag {
            if drag.has_moved() {
                self.render_drag_ghost(&drag);
            }
        }

        for block in &self.blocks {
            self.surface.push(DrawCommand::FillRect {
                x: block.x,
                y: block.y,
                width: block.width,
                height: block.height,
                color: theme::event_color(&block.payload),
            });
            if block.selected {
                self.surface.push(DrawCommand::StrokeRect {
                    x: block.x,
                    y: block.y,
                    width: block.width,
                    height: block.height,
                    line_width: 2.0,
                    color: theme::SELECTION_COLOR,
                });
            }
        }

        log::trace!("SequenceTimelineEngine: rendered {} block(s)", self.blocks.len());
    }

    fn render_drag_ghost(&mut self, drag: &DragSession) {
        let Some(event) = self.sequence.get(drag.id()) else {
            return;
        };
        let Some(block) = self.blocks.iter().find(|b| b.id == drag.id()) else {
            return;
        };
        let x = time_to_offset(drag.original_time(), self.extent, self.view.state(), self.width()) as f32;
        let command = DrawCommand::StrokeRect {
            x,
            y: block.y,
            width: block.width,
            height: block.height,
            line_width: 1.0,
            color: theme::DRAG_GHOST_COLOR,
        };
        log::trace!("SequenceTimelineEngine: ghost for {} at {:.3}s", event.id, drag.original_time());
        self.surface.push(command);
    }

    pub fn render_playhead(&mut self) {
        if !self.overlay.begin_frame() {
            return;
        }
        let window = self.window();
        if window.is_empty() || self.playhead < window.start || self.playhead > window.end() {
            return;
        }
        let x = time_to_offset(self.playhead, self.extent, self.view.state(), self.width()) as f32;
        let height = self.overlay.height();
        self.overlay
            .line((x, 0.0), (x, height), theme::PLAYHEAD_WIDTH, theme::PLAYHEAD_COLOR);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::sequence::SequenceError;
    use lumen_core::sync::SyncBus;

    fn timeline(bus: &SyncBus) -> SequenceTimelineEngine {
        let mut engine = SequenceTimelineEngine::new(
            bus.subscribe("timeline"),
            &TimelineConfig::default(),
            1.2,
            1200.0,
            200.0,
        );
        engine.load(TimelineExtent::new(120.0), Vec::new());
        engine
    }

    fn dimmer_at(time: f64, device: u32) -> EventDraft {
        EventDraft::new(time, DeviceId(device), EventPayload::Dimmer { value: 100.0 })
    }

    /// Pixel center of an event's block
    fn block_center(engine: &SequenceTimelineEngine, id: EventId) -> (f32, f32) {
        let block = engine.blocks().iter().find(|b| b.id == id).unwrap();
        (block.x + block.width / 2.0, block.y + block.height / 2.0)
    }

    #[test]
    fn test_dialog_event_gets_default_duration_and_selection() {
        let bus = SyncBus::new();
        let mut engine = timeline(&bus);

        let id = engine.on_event_submitted(dimmer_at(4.0, 1));

        assert_eq!(engine.sequence().get(id).unwrap().duration_seconds, 2.0);
        assert_eq!(engine.selected(), Some(id));
    }

    #[test]
    fn test_quick_add_uses_short_duration() {
        let bus = SyncBus::new();
        let mut engine = timeline(&bus);
        let id = engine.quick_add(DeviceId(1), EventKind::Strobe, 3.0);
        assert_eq!(engine.sequence().get(id).unwrap().duration_seconds, 0.5);
    }

    #[test]
    fn test_mutations_publish_event_list_changed() {
        let bus = SyncBus::new();
        let mut engine = timeline(&bus);
        let listener = bus.subscribe("listener");

        let id = engine.on_event_submitted(dimmer_at(4.0, 1));
        engine.retime(id, 8.0).unwrap();

        let revisions: Vec<u64> = listener
            .drain()
            .into_iter()
            .filter_map(|m| match m {
                SyncMessage::EventListChanged { revision } => Some(revision),
                _ => None,
            })
            .collect();
        assert_eq!(revisions.len(), 2);
        assert!(revisions[0] < revisions[1]);
    }

    #[test]
    fn test_click_selects_and_background_deselects() {
        let bus = SyncBus::new();
        let mut engine = timeline(&bus);
        let id = engine.on_event_submitted(dimmer_at(10.0, 1));
        engine.render();
        let (x, y) = block_center(&engine, id);

        assert_eq!(engine.pointer_pressed(x, y), PointerOutcome::Selected(id));
        engine.cancel_drag();
        assert_eq!(engine.pointer_pressed(1100.0, 150.0), PointerOutcome::Deselected);
        assert_eq!(engine.selected(), None);
        assert_eq!(engine.pointer_pressed(1100.0, 150.0), PointerOutcome::Background);
    }

    #[test]
    fn test_drag_commits_on_release() {
        let bus = SyncBus::new();
        let mut engine = timeline(&bus);
        let id = engine.on_event_submitted(dimmer_at(20.0, 1));
        engine.render();
        let (x, y) = block_center(&engine, id);

        engine.pointer_pressed(x, y);
        // 1200px over 120s: 10px per second
        let preview = engine.pointer_moved(x + 50.0).unwrap();
        assert!((preview - 25.0).abs() < 1e-6);
        assert_eq!(engine.sequence().get(id).unwrap().time, 20.0);

        let committed = engine.pointer_released(x + 50.0).unwrap().unwrap();
        assert!((committed - 25.0).abs() < 1e-6);
        assert!((engine.sequence().get(id).unwrap().time - 25.0).abs() < 1e-6);
    }

    #[test]
    fn test_cancelled_drag_reverts() {
        let bus = SyncBus::new();
        let mut engine = timeline(&bus);
        let id = engine.on_event_submitted(dimmer_at(20.0, 1));
        engine.render();
        let (x, y) = block_center(&engine, id);

        engine.pointer_pressed(x, y);
        engine.pointer_moved(x + 300.0);
        engine.render();
        assert!(engine.blocks()[0].previewing);

        assert!(engine.cancel_drag());
        engine.render();

        assert_eq!(engine.sequence().get(id).unwrap().time, 20.0);
        assert!(engine.pointer_released(x + 300.0).is_none());
        assert!(!engine.blocks()[0].previewing);
    }

    #[test]
    fn test_drag_of_removed_event_fails_cleanly() {
        let bus = SyncBus::new();
        let mut engine = timeline(&bus);
        let keep = engine.on_event_submitted(dimmer_at(20.0, 1));
        let doomed = engine.on_event_submitted(dimmer_at(60.0, 2));
        engine.render();
        let (x, y) = block_center(&engine, doomed);
        engine.pointer_pressed(x, y);
        engine.pointer_moved(x + 100.0);

        // Removing the dragged event ends the drag
        engine.remove(doomed).unwrap();
        assert!(engine.pointer_released(x + 100.0).is_none());
        assert_eq!(engine.sequence().get(keep).unwrap().time, 20.0);
        assert_eq!(engine.remove(doomed), Err(SequenceError::NotFound(doomed)));
    }

    #[test]
    fn test_drag_left_past_zero_clamps() {
        let bus = SyncBus::new();
        let mut engine = timeline(&bus);
        let id = engine.on_event_submitted(dimmer_at(2.0, 1));
        engine.render();
        let (x, y) = block_center(&engine, id);

        engine.pointer_pressed(x, y);
        let committed = engine.pointer_released(x - 500.0).unwrap().unwrap();

        assert_eq!(committed, 0.0);
    }

    #[test]
    fn test_create_request_uses_clicked_time_and_row() {
        let bus = SyncBus::new();
        let mut engine = timeline(&bus);
        engine.on_event_submitted(dimmer_at(0.0, 4));
        engine.on_event_submitted(dimmer_at(1.0, 9));
        engine.render();

        let request = engine.request_create_at(300.0, 28.0 * 1.5).unwrap();

        assert!((request.time - 30.0).abs() < 1e-6);
        assert_eq!(request.device, Some(DeviceId(9)));
    }

    #[test]
    fn test_nudge_and_remove_selected() {
        let bus = SyncBus::new();
        let mut engine = timeline(&bus);
        let id = engine.on_event_submitted(dimmer_at(5.0, 1));

        assert_eq!(engine.nudge_selected(-10.0), Some(0.0));
        let removed = engine.remove_selected().unwrap();

        assert_eq!(removed.id, id);
        assert!(engine.sequence().is_empty());
        assert_eq!(engine.nudge_selected(1.0), None);
    }

    fn playhead_x(engine: &SequenceTimelineEngine) -> Option<f32> {
        engine.overlay().commands().iter().find_map(|c| match c {
            DrawCommand::Line { from, .. } => Some(from.0),
            _ => None,
        })
    }

    #[test]
    fn test_view_changes_move_playhead_while_stopped() {
        let bus = SyncBus::new();
        let mut engine = timeline(&bus);
        engine.set_playhead(60.0);
        assert_eq!(playhead_x(&engine), Some(600.0));

        engine.wheel_zoom(1.0, 0.0);
        assert!((playhead_x(&engine).unwrap() - 720.0).abs() < 1e-3);

        engine.resize(600.0, 200.0);
        assert!((playhead_x(&engine).unwrap() - 360.0).abs() < 1e-3);

        engine.wheel_zoom(7.0, 0.0);
        assert_eq!(playhead_x(&engine), None);
    }

    #[test]
    fn test_layout_toggle_marks_dirty() {
        let bus = SyncBus::new();
        let mut engine = timeline(&bus);
        engine.render();

        assert_eq!(engine.toggle_layout_mode(), LayoutMode::Single);
        assert!(engine.is_dirty());
    }

    #[test]
    fn test_zoom_reaches_other_surface_once() {
        let bus = SyncBus::new();
        let mut engine = timeline(&bus);
        let mut waveform_side = SyncedView::new(bus.subscribe("waveform"));

        engine.wheel_zoom(2.0, 600.0);
        let update = waveform_side.apply_remote();
        let echo = engine.sync();

        assert!(update.view_changed);
        assert_eq!(waveform_side.state(), engine.view_state());
        assert!(echo.is_empty());
    }
}
