//! Block layout for the sequence timeline
//!
//! A pure function of the event list, the view and the surface size. In grouped mode
//! each device gets its own row, assigned in first-seen order while walking the
//! (time-sorted) events.

use lumen_core::mapping::{duration_to_width, time_to_offset};
use lumen_core::sequence::{DeviceId, DragSession, EventId, EventPayload, SequenceEvent};
use lumen_core::{TimelineExtent, VisibleWindow, ZoomScrollState};

use crate::theme::MIN_BLOCK_WIDTH;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LayoutMode {
    /// One row per device
    #[default]
    Grouped,
    /// Every event on a single row
    Single,
}

impl LayoutMode {
    pub fn toggled(self) -> Self {
        match self {
            LayoutMode::Grouped => LayoutMode::Single,
            LayoutMode::Single => LayoutMode::Grouped,
        }
    }
}

/// Device → row assignment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceRows {
    rows: Vec<DeviceId>,
}

impl DeviceRows {
    /// Assign rows in first-seen order
    pub fn assign<'a>(events: impl IntoIterator<Item = &'a SequenceEvent>) -> Self {
        let mut rows = Vec::new();
        for event in events {
            if !rows.contains(&event.device_id) {
                rows.push(event.device_id);
            }
        }
        Self { rows }
    }

    pub fn row_of(&self, device: DeviceId) -> Option<usize> {
        self.rows.iter().position(|d| *d == device)
    }

    pub fn devices(&self) -> &[DeviceId] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A laid-out event block in surface pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockRect {
    pub id: EventId,
    pub row: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub payload: EventPayload,
    pub selected: bool,
    /// Drawn at a drag preview time rather than the stored time
    pub previewing: bool,
}

impl BlockRect {
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }
}

/// Surface geometry and view used for one layout pass
#[derive(Debug, Clone, Copy)]
pub struct LayoutContext {
    pub extent: TimelineExtent,
    pub view: ZoomScrollState,
    pub width: f32,
    pub row_height: f32,
    pub mode: LayoutMode,
}

/// Lay out every visible event
///
/// The dragged event (if any) is placed at its preview time. Blocks are returned in
/// event order so later blocks draw over earlier ones.
pub fn layout_blocks<'a>(
    events: impl IntoIterator<Item = &'a SequenceEvent> + Clone,
    ctx: &LayoutContext,
    selected: Option<EventId>,
    drag: Option<&DragSession>,
) -> (DeviceRows, Vec<BlockRect>) {
    let rows = match ctx.mode {
        LayoutMode::Grouped => DeviceRows::assign(events.clone()),
        LayoutMode::Single => DeviceRows::default(),
    };

    let window = VisibleWindow::compute(ctx.extent, ctx.view);
    if window.is_empty() || ctx.width <= 0.0 {
        return (rows, Vec::new());
    }

    let width = ctx.width as f64;
    let padding = (ctx.row_height * 0.1).max(1.0);

    let blocks = events
        .into_iter()
        .filter_map(|event| {
            let previewing = drag.is_some_and(|d| d.id() == event.id);
            let time = match drag {
                Some(d) if previewing => d.preview_time(),
                _ => event.time,
            };
            if !window.overlaps(time, time + event.duration_seconds) {
                return None;
            }

            let row = match ctx.mode {
                LayoutMode::Grouped => rows.row_of(event.device_id).unwrap_or(0),
                LayoutMode::Single => 0,
            };
            let x = time_to_offset(time, ctx.extent, ctx.view, width) as f32;
            let block_width = duration_to_width(event.duration_seconds, ctx.extent, ctx.view, width) as f32;

            Some(BlockRect {
                id: event.id,
                row,
                x,
                y: row as f32 * ctx.row_height + padding,
                width: block_width.max(MIN_BLOCK_WIDTH),
                height: ctx.row_height - 2.0 * padding,
                payload: event.payload,
                selected: selected == Some(event.id),
                previewing,
            })
        })
        .collect();

    (rows, blocks)
}

/// Topmost block under a point
pub fn hit_test(blocks: &[BlockRect], x: f32, y: f32) -> Option<EventId> {
    blocks.iter().rev().find(|b| b.contains(x, y)).map(|b| b.id)
}
