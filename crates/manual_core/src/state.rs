use shared::domain::{BufferSnapshot, MediaSet, NamedHeight, PenHeight, PenMode, PenState};

use crate::{selection::Selection, tools::ToolSelection};

/// Everything the manual-mode controls reflect. Device reports are
/// mirrored wholesale; nothing here writes back to the device.
#[derive(Debug, Clone, Default)]
pub struct ManualState {
    pen: Option<PenState>,
    buffer: Option<BufferSnapshot>,
    pub tools: ToolSelection,
    pub selection: Selection,
    pub media_set: MediaSet,
    pub pen_mode: PenMode,
    pub(crate) render_in_flight: bool,
    pub(crate) action_layer_ready: bool,
}

impl ManualState {
    pub fn new(media_set: MediaSet, pen_mode: PenMode) -> Self {
        Self {
            media_set,
            pen_mode,
            ..Self::default()
        }
    }

    pub fn pen(&self) -> Option<&PenState> {
        self.pen.as_ref()
    }

    pub fn buffer(&self) -> Option<&BufferSnapshot> {
        self.buffer.as_ref()
    }

    pub fn apply_pen_update(&mut self, pen: PenState) {
        self.pen = Some(pen);
    }

    pub fn apply_buffer_update(&mut self, buffer: BufferSnapshot) {
        self.buffer = Some(buffer);
    }

    pub fn buffer_paused(&self) -> bool {
        self.buffer.is_some_and(|b| b.paused)
    }

    /// Unknown counts as empty; nothing has been reported as queued.
    pub fn buffer_has_work(&self) -> bool {
        self.buffer.is_some_and(|b| !b.is_empty())
    }

    pub fn pen_is_up(&self) -> bool {
        self.pen.as_ref().map_or(true, |p| p.state.is_up())
    }

    /// The toggle lowers only a pen reported fully up; anything else,
    /// including no report yet, is raised.
    pub fn pen_toggle_lowers(&self) -> bool {
        self.pen.as_ref().is_some_and(|p| match p.state {
            PenHeight::Named(NamedHeight::Up) => true,
            PenHeight::Position(position) => position == 0.0,
            _ => false,
        })
    }

    pub fn render_in_flight(&self) -> bool {
        self.render_in_flight
    }

    pub fn action_layer_ready(&self) -> bool {
        self.action_layer_ready
    }
}
