//! Control affordances derived from the run state and the UI state.
//!
//! Nothing here is stored: the presentation layer asks for a fresh
//! [`ControlPanel`] whenever it draws, so labels and enabled flags can never
//! drift from the state they describe.

use crate::{
    run::{PaintRun, RunState},
    state::ManualState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlLabel {
    Start,
    Pause,
    Resume,
    PleaseWait,
    Cancel,
    Stroke,
    Fill,
    AutoPaint,
    Reset,
    Park,
    LowerBrush,
    RaiseBrush,
    Calibrate,
    DisableMotors,
    Zero,
}

impl ControlLabel {
    pub fn text(self) -> &'static str {
        match self {
            ControlLabel::Start => "Start",
            ControlLabel::Pause => "Pause",
            ControlLabel::Resume => "Resume",
            ControlLabel::PleaseWait => "Please wait...",
            ControlLabel::Cancel => "Cancel",
            ControlLabel::Stroke => "Draw",
            ControlLabel::Fill => "Fill",
            ControlLabel::AutoPaint => "Auto paint",
            ControlLabel::Reset => "Reset",
            ControlLabel::Park => "Park",
            ControlLabel::LowerBrush => "Lower brush",
            ControlLabel::RaiseBrush => "Raise brush",
            ControlLabel::Calibrate => "Calibrate",
            ControlLabel::DisableMotors => "Unlock motors",
            ControlLabel::Zero => "Set zero",
        }
    }
}

/// Visual class of the primary control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryStyle {
    Ready,
    Normal,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlState {
    pub enabled: bool,
    pub label: ControlLabel,
    pub hint: ControlLabel,
}

impl ControlState {
    fn new(enabled: bool, label: ControlLabel) -> Self {
        Self {
            enabled,
            label,
            hint: label,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlPanel {
    pub primary: ControlState,
    pub primary_style: PrimaryStyle,
    pub cancel: ControlState,
    pub stroke: ControlState,
    pub fill: ControlState,
    pub auto_paint: ControlState,
    pub reset: ControlState,
    pub park: ControlState,
    pub pen: ControlState,
    pub calibrate: ControlState,
    pub disable_motors: ControlState,
    pub zero: ControlState,
    pub tools: bool,
}

impl ControlPanel {
    pub fn derive(state: &ManualState, run: &PaintRun) -> Self {
        let run_state = run.state();
        let idle = run_state == RunState::Idle;
        let idle_controls = run_state.allows_idle_controls();
        let editable = idle && !state.render_in_flight();
        let path_actions = editable && state.selection.has_selection();

        let (primary, primary_style) = match run_state {
            RunState::Idle | RunState::Cancelled => (
                ControlState::new(
                    editable && state.action_layer_ready(),
                    ControlLabel::Start,
                ),
                PrimaryStyle::Ready,
            ),
            RunState::Running => (
                ControlState::new(run.has_begun(), ControlLabel::Pause),
                PrimaryStyle::Normal,
            ),
            RunState::Pausing => (
                ControlState {
                    enabled: false,
                    label: ControlLabel::Pause,
                    hint: ControlLabel::PleaseWait,
                },
                PrimaryStyle::Normal,
            ),
            RunState::Paused => (
                ControlState::new(true, ControlLabel::Resume),
                PrimaryStyle::Active,
            ),
            RunState::Resuming => (
                ControlState {
                    enabled: false,
                    label: ControlLabel::Resume,
                    hint: ControlLabel::PleaseWait,
                },
                PrimaryStyle::Active,
            ),
        };

        let pen_label = if state.pen_is_up() {
            ControlLabel::LowerBrush
        } else {
            ControlLabel::RaiseBrush
        };

        Self {
            primary,
            primary_style,
            cancel: ControlState::new(!idle, ControlLabel::Cancel),
            stroke: ControlState::new(path_actions, ControlLabel::Stroke),
            fill: ControlState::new(path_actions, ControlLabel::Fill),
            auto_paint: ControlState::new(editable, ControlLabel::AutoPaint),
            reset: ControlState::new(idle_controls, ControlLabel::Reset),
            park: ControlState::new(true, ControlLabel::Park),
            pen: ControlState::new(true, pen_label),
            calibrate: ControlState::new(idle_controls, ControlLabel::Calibrate),
            disable_motors: ControlState::new(idle_controls, ControlLabel::DisableMotors),
            zero: ControlState::new(idle_controls, ControlLabel::Zero),
            tools: idle_controls,
        }
    }
}
