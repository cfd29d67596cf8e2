//! Seam to the external vector canvas and its stroke/fill renderers.

use shared::{
    domain::{Coord, PathId, ToolId},
    protocol::Command,
};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderKind {
    Stroke,
    Fill,
}

impl RenderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RenderKind::Stroke => "stroke",
            RenderKind::Fill => "fill",
        }
    }
}

/// Which layers are emphasized on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayerFocus {
    /// Main layer fully opaque; the editing view.
    #[default]
    Design,
    /// Main and temporary layers dimmed so rendered motion stands out.
    Action,
}

/// Completion notices produced by the renderer while it spools work on
/// frame ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanvasEvent {
    RenderComplete { path: PathId, kind: RenderKind },
    MotionPathsRendered,
}

#[derive(Debug, Error)]
pub enum CanvasError {
    #[error("failed to parse design: {0}")]
    Parse(String),
    #[error("design contains no drawable paths")]
    EmptyDesign,
}

pub trait PaintCanvas {
    /// Stops any spooling render, clears the temporary and action layers and
    /// restores the design focus.
    fn reset(&mut self);

    /// Replaces the main layer with the paths of `svg`, ungrouped so every
    /// path is individually selectable.
    fn load_design(&mut self, svg: &str) -> Result<(), CanvasError>;

    fn is_main_layer_item(&self, id: PathId) -> bool;

    fn action_layer_len(&self) -> usize;

    fn set_focus(&mut self, focus: LayerFocus);

    /// Queues a stroke or fill render of one main-layer path into the action
    /// layer. Completion arrives as [`CanvasEvent::RenderComplete`].
    fn render_path(&mut self, path: PathId, tool: Option<&ToolId>, kind: RenderKind);

    /// Queues stroke then fill renders of the whole main layer. Completion
    /// arrives as [`CanvasEvent::MotionPathsRendered`].
    fn render_motion_paths(&mut self);

    /// Turns the action layer into the motion commands for the buffer,
    /// bracketed by the auto-paint begin/complete callbacks.
    fn auto_paint(&mut self) -> Vec<Command>;

    fn move_draw_point(&mut self, to: Coord, duration_ms: u64);

    /// Advances spooled renders by one frame.
    fn on_frame(&mut self) -> Vec<CanvasEvent>;
}
