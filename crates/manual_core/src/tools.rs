//! Tool navigation: paint and water selection, brush wash, panel layout.

use shared::{
    domain::{MediaSet, PenMode, ToolGroup, ToolId, ToolVariant},
    protocol::{Command, DispatchRequest},
};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolSelection {
    current: Option<ToolId>,
}

impl ToolSelection {
    pub fn current(&self) -> Option<&ToolId> {
        self.current.as_ref()
    }

    /// Handles a click on a nav entry's full/dip sub-option and returns the
    /// request to forward, if the entry is known and visible in `pen_mode`.
    pub fn pick(
        &mut self,
        media: &MediaSet,
        pen_mode: PenMode,
        entry: &str,
        variant: ToolVariant,
    ) -> Option<DispatchRequest> {
        let Some(group) = media.group_of(entry) else {
            debug!(entry, "ignoring unknown tool entry");
            return None;
        };
        if !pen_mode.allows(group) {
            debug!(entry, ?pen_mode, "ignoring tool hidden by pen mode");
            return None;
        }

        match group {
            ToolGroup::Wash => {
                self.current = None;
                Some(DispatchRequest::append([Command::Wash, Command::Park]))
            }
            ToolGroup::Color | ToolGroup::Water => {
                let tool = ToolId::new(entry, variant);
                self.current = Some(tool.clone());
                Some(DispatchRequest::single(Command::Media(tool)))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolPanelLayout {
    pub colors_visible: bool,
    pub waters_visible: bool,
    /// Nav entry matching the media the pen reports holding.
    pub highlighted: Option<String>,
    pub scale: f32,
}

impl ToolPanelLayout {
    pub fn new(pen_mode: PenMode, highlighted: Option<&str>, scale: f32) -> Self {
        Self {
            colors_visible: pen_mode.colors_visible(),
            waters_visible: pen_mode.waters_visible(),
            highlighted: highlighted.map(str::to_string),
            scale,
        }
    }
}

/// Scale that makes a tool panel of `tools_height` match the on-screen
/// height of the canvas.
pub fn tool_panel_scale(canvas_height: f32, canvas_scale: f32, tools_height: f32) -> f32 {
    if tools_height <= 0.0 {
        return 1.0;
    }
    canvas_height * canvas_scale / tools_height
}
