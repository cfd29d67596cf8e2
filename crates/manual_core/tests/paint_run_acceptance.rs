//! Drives the controller against the simulated command buffer end to end.

use std::{cell::RefCell, collections::VecDeque};

use cnc_sim::SimulatedPlotter;
use manual_core::{
    CanvasError, CanvasEvent, CommandDispatcher, ControlLabel, LayerFocus, ManualController,
    PaintCanvas, RenderKind, RunState,
};
use shared::{
    domain::{Coord, MediaSet, PathId, PenMode, ToolId},
    error::DispatchError,
    protocol::{CallbackEvent, Command, DeviceEvent, DispatchRequest},
};

/// Dispatcher that feeds a simulated plotter and keeps the device events it
/// produces for the test to deliver back.
#[derive(Default)]
struct SimDispatcher {
    plotter: RefCell<SimulatedPlotter>,
    outbox: RefCell<VecDeque<DeviceEvent>>,
}

impl SimDispatcher {
    fn step(&self) {
        let events = self.plotter.borrow_mut().step();
        self.outbox.borrow_mut().extend(events);
    }

    fn next_event(&self) -> Option<DeviceEvent> {
        self.outbox.borrow_mut().pop_front()
    }
}

impl CommandDispatcher for SimDispatcher {
    fn run(&self, request: DispatchRequest) -> Result<(), DispatchError> {
        let events = self.plotter.borrow_mut().submit(request);
        self.outbox.borrow_mut().extend(events);
        Ok(())
    }
}

/// One path, and every render emits a short line into the action layer.
#[derive(Default)]
struct LineCanvas {
    loaded: bool,
    action: Vec<(Coord, Coord)>,
    pending: Vec<CanvasEvent>,
}

impl PaintCanvas for LineCanvas {
    fn reset(&mut self) {
        self.action.clear();
        self.pending.clear();
    }

    fn load_design(&mut self, _svg: &str) -> Result<(), CanvasError> {
        self.loaded = true;
        Ok(())
    }

    fn is_main_layer_item(&self, id: PathId) -> bool {
        self.loaded && id == PathId(1)
    }

    fn action_layer_len(&self) -> usize {
        self.action.len()
    }

    fn set_focus(&mut self, _focus: LayerFocus) {}

    fn render_path(&mut self, path: PathId, _tool: Option<&ToolId>, kind: RenderKind) {
        for i in 0..4 {
            let y = i as f64 * 10.0;
            self.action.push((Coord::new(0.0, y), Coord::new(50.0, y)));
        }
        self.pending.push(CanvasEvent::RenderComplete { path, kind });
    }

    fn render_motion_paths(&mut self) {
        self.pending.push(CanvasEvent::MotionPathsRendered);
    }

    fn auto_paint(&mut self) -> Vec<Command> {
        let mut commands = vec![Command::Callback(CallbackEvent::AutoPaintBegin)];
        for (from, to) in &self.action {
            commands.extend([Command::Up, Command::Move(*from), Command::Down, Command::Move(*to)]);
        }
        commands.extend([
            Command::Up,
            Command::Park,
            Command::Callback(CallbackEvent::AutoPaintComplete),
        ]);
        commands
    }

    fn move_draw_point(&mut self, _to: Coord, _duration_ms: u64) {}

    fn on_frame(&mut self) -> Vec<CanvasEvent> {
        std::mem::take(&mut self.pending)
    }
}

type SimController = ManualController<LineCanvas, SimDispatcher>;

fn deliver(controller: &mut SimController) {
    while let Some(event) = controller.dispatcher().next_event() {
        controller.handle_device_event(event).expect("device event");
    }
}

fn tick(controller: &mut SimController, steps: usize) {
    for _ in 0..steps {
        controller.dispatcher().step();
        deliver(controller);
    }
}

fn ready_controller() -> SimController {
    let mut controller = ManualController::new(
        LineCanvas::default(),
        SimDispatcher::default(),
        MediaSet::default(),
        PenMode::Full,
    );
    controller.canvas_ready(Some("<svg/>")).expect("ready");
    tick(&mut controller, 2);

    controller.mouse_down(Some(PathId(1)));
    controller.stroke_selected().expect("stroke");
    controller.on_frame().expect("frame");
    controller
}

#[test]
fn pause_preempts_queued_drawing_and_resume_finishes_the_run() {
    let mut controller = ready_controller();
    assert!(controller.controls().primary.enabled);

    controller.primary_action().expect("start");
    tick(&mut controller, 3);
    assert_eq!(controller.run_state(), RunState::Running);
    let queued_before_pause = controller.state().buffer().expect("buffer").length;
    assert!(queued_before_pause > 4);

    controller.primary_action().expect("pause");
    deliver(&mut controller);
    tick(&mut controller, 2);
    assert_eq!(controller.run_state(), RunState::Paused);
    assert_eq!(controller.controls().primary.label, ControlLabel::Resume);

    let buffer = controller.state().buffer().copied().expect("buffer");
    assert!(buffer.paused);
    assert_eq!(buffer.length, queued_before_pause + 1, "drawing untouched, status queued");

    tick(&mut controller, 5);
    assert_eq!(controller.state().buffer().expect("buffer").length, buffer.length);

    controller.primary_action().expect("resume");
    tick(&mut controller, 2);
    assert_eq!(controller.run_state(), RunState::Running);

    tick(&mut controller, 64);
    assert_eq!(controller.run_state(), RunState::Idle);
    assert_eq!(controller.controls().primary.label, ControlLabel::Start);
    assert!(controller.state().buffer().expect("buffer").is_empty());
}

#[test]
fn confirmed_cancel_empties_buffer_and_parks() {
    let mut controller = ready_controller();
    controller.primary_action().expect("start");
    tick(&mut controller, 6);

    controller.cancel(true).expect("cancel");
    tick(&mut controller, 8);

    assert_eq!(controller.run_state(), RunState::Idle);
    assert!(controller.state().buffer().expect("buffer").is_empty());
    assert_eq!(
        controller.state().pen().expect("pen").abs_coord,
        Coord::ORIGIN
    );
    assert!(!controller.controls().cancel.enabled);
}

#[test]
fn second_start_is_refused_while_buffer_drains() {
    let mut controller = ready_controller();
    controller.primary_action().expect("start");
    deliver(&mut controller);
    controller.cancel(true).expect("cancel");
    deliver(&mut controller);

    // Buffer still reports the cancel sequence until the plotter catches up.
    assert!(controller.primary_action().is_err());
    tick(&mut controller, 8);
    controller.primary_action().expect("start again");
}

#[test]
fn cancel_while_paused_lets_the_next_run_finish() {
    let mut controller = ready_controller();
    controller.primary_action().expect("start");
    tick(&mut controller, 3);
    controller.primary_action().expect("pause");
    tick(&mut controller, 2);
    assert_eq!(controller.run_state(), RunState::Paused);

    controller.cancel(true).expect("cancel");
    tick(&mut controller, 8);
    let buffer = controller.state().buffer().copied().expect("buffer");
    assert!(buffer.is_empty());
    assert!(!buffer.paused);

    controller.primary_action().expect("start again");
    tick(&mut controller, 2);
    assert_eq!(controller.controls().primary.label, ControlLabel::Pause);
    assert!(controller.controls().primary.enabled);

    tick(&mut controller, 64);
    assert_eq!(controller.run_state(), RunState::Idle);
    assert!(controller.state().buffer().expect("buffer").is_empty());
}

#[test]
fn begin_delivered_after_cancel_does_not_revive_the_run() {
    let mut controller = ready_controller();
    controller.primary_action().expect("start");
    // The plotter reaches the begin callback before the cancel is seen.
    controller.dispatcher().step();
    controller.cancel(true).expect("cancel");
    deliver(&mut controller);
    tick(&mut controller, 8);

    assert_eq!(controller.run_state(), RunState::Idle);
    assert!(controller.state().buffer().expect("buffer").is_empty());
    assert!(!controller.controls().cancel.enabled);
    controller.primary_action().expect("start again");
}
