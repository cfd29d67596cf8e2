//! Manual painting mode controller: binds control actions to canvas and
//! dispatcher calls and folds device notifications back into state.

use shared::{
    domain::{Coord, MediaSet, PathId, PenMode, ToolVariant},
    protocol::{CallbackEvent, Command, DeviceEvent, DispatchRequest, HostMessage, StatusMessage},
};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{
    canvas::{CanvasEvent, LayerFocus, PaintCanvas, RenderKind},
    controls::ControlPanel,
    dispatcher::CommandDispatcher,
    error::ManualError,
    run::{forceful_cancel, PaintRun, RunError, RunState, RunTransition, RunTrigger},
    state::ManualState,
    tools::ToolPanelLayout,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseDecision {
    Close,
    Stay,
}

pub struct ManualController<C: PaintCanvas, D: CommandDispatcher> {
    canvas: C,
    dispatcher: D,
    state: ManualState,
    run: PaintRun,
    auto_paint_pending: bool,
}

impl<C: PaintCanvas, D: CommandDispatcher> ManualController<C, D> {
    pub fn new(canvas: C, dispatcher: D, media_set: MediaSet, pen_mode: PenMode) -> Self {
        Self {
            canvas,
            dispatcher,
            state: ManualState::new(media_set, pen_mode),
            run: PaintRun::new(),
            auto_paint_pending: false,
        }
    }

    pub fn state(&self) -> &ManualState {
        &self.state
    }

    pub fn run_state(&self) -> RunState {
        self.run.state()
    }

    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut C {
        &mut self.canvas
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    pub fn subscribe_run(&self) -> broadcast::Receiver<RunTransition> {
        self.run.subscribe()
    }

    pub fn controls(&self) -> ControlPanel {
        ControlPanel::derive(&self.state, &self.run)
    }

    pub fn tool_panel(&self, scale: f32) -> ToolPanelLayout {
        let highlighted = self.state.pen().and_then(|pen| pen.media_entry());
        ToolPanelLayout::new(self.state.pen_mode, highlighted, scale)
    }

    /// Called once the canvas is up. Loads the stored design, if any, then
    /// sends a single pen-up so the device reports pen and buffer state.
    pub fn canvas_ready(&mut self, design: Option<&str>) -> Result<(), ManualError> {
        let loaded = match design {
            Some(svg) => self.load_design(svg),
            None => {
                self.refresh_action_layer();
                Ok(())
            }
        };
        self.dispatch(DispatchRequest::single(Command::Up))?;
        loaded
    }

    /// Start, pause or resume depending on where the run is.
    pub fn primary_action(&mut self) -> Result<(), ManualError> {
        match self.run.state() {
            RunState::Idle | RunState::Cancelled => self.start(),
            RunState::Running => self.pause(),
            RunState::Paused => self.resume(),
            state @ RunState::Pausing => Err(RunError::InvalidTransition {
                state,
                trigger: RunTrigger::Pause,
            }
            .into()),
            state @ RunState::Resuming => Err(RunError::InvalidTransition {
                state,
                trigger: RunTrigger::Resume,
            }
            .into()),
        }
    }

    /// Paints the action layer as rendered so far.
    pub fn start(&mut self) -> Result<(), ManualError> {
        if self.state.render_in_flight {
            return Err(ManualError::RenderInFlight);
        }
        self.run.start(self.state.buffer())?;
        let commands = self.canvas.auto_paint();
        self.dispatch(DispatchRequest::append(commands))
    }

    /// Renders stroke and fill motion for the whole design into the action
    /// layer, then paints it once the renderer reports completion.
    pub fn auto_paint(&mut self) -> Result<(), ManualError> {
        if self.state.render_in_flight {
            return Err(ManualError::RenderInFlight);
        }
        self.run.start(self.state.buffer())?;
        self.state.render_in_flight = true;
        self.auto_paint_pending = true;
        self.canvas.set_focus(LayerFocus::Action);
        self.canvas.render_motion_paths();
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), ManualError> {
        let request = self.run.pause()?;
        self.dispatch(request)
    }

    pub fn resume(&mut self) -> Result<(), ManualError> {
        let request = self.run.resume()?;
        self.dispatch(request)
    }

    /// `confirmed` is the operator's answer to the cancel prompt; a declined
    /// prompt changes nothing.
    pub fn cancel(&mut self, confirmed: bool) -> Result<(), ManualError> {
        if !confirmed {
            debug!("cancel declined");
            return Ok(());
        }
        let request = self.run.cancel();
        self.auto_paint_pending = false;
        self.handle_callback(CallbackEvent::AutoPaintComplete);
        self.dispatch(request)
    }

    pub fn close_requires_confirmation(&self) -> bool {
        self.state.buffer_has_work()
    }

    pub fn close(&mut self, confirmed: bool) -> Result<CloseDecision, ManualError> {
        if !self.close_requires_confirmation() {
            return Ok(CloseDecision::Close);
        }
        if !confirmed {
            return Ok(CloseDecision::Stay);
        }
        self.dispatch(forceful_cancel())?;
        Ok(CloseDecision::Close)
    }

    pub fn reset(&mut self) {
        self.canvas.reset();
        self.state.render_in_flight = false;
        self.auto_paint_pending = false;
        self.refresh_action_layer();
    }

    pub fn stroke_selected(&mut self) -> Result<(), ManualError> {
        self.render_selected(RenderKind::Stroke)
    }

    pub fn fill_selected(&mut self) -> Result<(), ManualError> {
        self.render_selected(RenderKind::Fill)
    }

    fn render_selected(&mut self, kind: RenderKind) -> Result<(), ManualError> {
        let Some(path) = self.state.selection.selected() else {
            return Err(ManualError::NothingSelected);
        };
        if self.state.render_in_flight {
            return Err(ManualError::RenderInFlight);
        }
        self.state.render_in_flight = true;
        self.canvas.set_focus(LayerFocus::Action);
        self.canvas
            .render_path(path, self.state.tools.current(), kind);
        debug!(path = path.0, kind = kind.as_str(), "render requested");
        Ok(())
    }

    /// Park runs ahead of the queue while the buffer is paused.
    pub fn park(&mut self) -> Result<(), ManualError> {
        let now = self.state.buffer_paused();
        self.dispatch(DispatchRequest::placed(
            [
                Command::Status(StatusMessage::Parking),
                Command::Park,
                Command::Status(StatusMessage::Parked),
            ],
            now,
        ))
    }

    pub fn toggle_pen(&mut self) -> Result<(), ManualError> {
        let next = if self.state.pen_toggle_lowers() {
            Command::Down
        } else {
            Command::Up
        };
        let now = self.state.buffer_paused();
        self.dispatch(DispatchRequest::placed([next], now))
    }

    pub fn calibrate(&mut self) -> Result<(), ManualError> {
        self.dispatch(DispatchRequest::single(Command::Move(Coord::ORIGIN)))
    }

    /// Lifts the pen and zeroes before releasing the motors.
    pub fn disable_motors(&mut self) -> Result<(), ManualError> {
        self.dispatch(DispatchRequest::append([
            Command::Status(StatusMessage::Unlocking),
            Command::Up,
            Command::Zero,
            Command::Unlock,
            Command::Status(StatusMessage::Unlocked),
        ]))
    }

    pub fn zero(&mut self) -> Result<(), ManualError> {
        self.dispatch(DispatchRequest::append([
            Command::Status(StatusMessage::Zero),
            Command::Zero,
        ]))
    }

    pub fn select_tool(&mut self, entry: &str, variant: ToolVariant) -> Result<(), ManualError> {
        let request =
            self.state
                .tools
                .pick(&self.state.media_set, self.state.pen_mode, entry, variant);
        match request {
            Some(request) => self.dispatch(request),
            None => Ok(()),
        }
    }

    /// `hit` is the topmost canvas item under the pointer, on any layer.
    pub fn mouse_down(&mut self, hit: Option<PathId>) {
        let eligible = hit.filter(|id| self.canvas.is_main_layer_item(*id));
        if self.state.selection.select(eligible) {
            debug!(selected = ?eligible.map(|id| id.0), "selection changed");
        }
    }

    pub fn mouse_move(&mut self, hit: Option<PathId>) {
        let eligible = hit.filter(|id| self.canvas.is_main_layer_item(*id));
        self.state.selection.hover(eligible);
    }

    pub fn on_frame(&mut self) -> Result<(), ManualError> {
        for event in self.canvas.on_frame() {
            self.handle_canvas_event(event)?;
        }
        Ok(())
    }

    pub fn handle_canvas_event(&mut self, event: CanvasEvent) -> Result<(), ManualError> {
        match event {
            CanvasEvent::RenderComplete { path, kind } => {
                self.state.render_in_flight = false;
                self.refresh_action_layer();
                debug!(path = path.0, kind = kind.as_str(), "render complete");
                Ok(())
            }
            CanvasEvent::MotionPathsRendered => {
                self.state.render_in_flight = false;
                self.refresh_action_layer();
                let pending = std::mem::take(&mut self.auto_paint_pending);
                if pending && self.run.state() == RunState::Running {
                    let commands = self.canvas.auto_paint();
                    self.dispatch(DispatchRequest::append(commands))?;
                }
                Ok(())
            }
        }
    }

    pub fn handle_device_event(&mut self, event: DeviceEvent) -> Result<(), ManualError> {
        match event {
            DeviceEvent::PenUpdate(pen) => {
                self.canvas.move_draw_point(pen.abs_coord, pen.last_duration);
                self.state.apply_pen_update(pen);
            }
            DeviceEvent::BufferUpdate(buffer) => self.state.apply_buffer_update(buffer),
            DeviceEvent::FullyPaused => {
                if let Some(request) = self.run.fully_paused() {
                    self.dispatch(request)?;
                }
            }
            DeviceEvent::FullyResumed => {
                if let Some(request) = self.run.fully_resumed() {
                    self.dispatch(request)?;
                }
            }
            DeviceEvent::Callback(callback) => self.handle_callback(callback),
            DeviceEvent::Status(_) => {}
        }
        Ok(())
    }

    pub fn handle_host_message(&mut self, message: HostMessage) -> Result<(), ManualError> {
        debug!(channel = %message.channel(), "host message");
        match message {
            HostMessage::LoadDesign(svg) => {
                self.reset();
                self.dispatch(DispatchRequest::single(Command::Status(StatusMessage::Clear)))?;
                self.load_design(&svg)
            }
            HostMessage::UpdateMediaSet(media_set) => {
                info!(name = %media_set.name, "media set updated");
                self.state.media_set = media_set;
                Ok(())
            }
            HostMessage::UpdatePenMode(pen_mode) => {
                self.state.pen_mode = pen_mode;
                Ok(())
            }
        }
    }

    fn handle_callback(&mut self, callback: CallbackEvent) {
        match callback {
            CallbackEvent::AutoPaintBegin => self.run.auto_paint_begin(),
            CallbackEvent::AutoPaintComplete => {
                self.run.auto_paint_complete();
                self.refresh_action_layer();
            }
        }
    }

    fn load_design(&mut self, svg: &str) -> Result<(), ManualError> {
        let loaded = self.canvas.load_design(svg);
        self.state.selection.clear();
        self.refresh_action_layer();
        match loaded {
            Ok(()) => {
                info!(bytes = svg.len(), "design loaded");
                Ok(())
            }
            Err(err) => {
                warn!(%err, "design load failed");
                Err(err.into())
            }
        }
    }

    fn refresh_action_layer(&mut self) {
        self.state.action_layer_ready = self.canvas.action_layer_len() > 0;
    }

    fn dispatch(&self, request: DispatchRequest) -> Result<(), ManualError> {
        let commands = request.command_names();
        let immediate = request.is_immediate();
        match self.dispatcher.run(request) {
            Ok(()) => {
                debug!(?commands, immediate, "dispatched commands");
                Ok(())
            }
            Err(err) => {
                warn!(?commands, immediate, %err, "command dispatch failed");
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
