//! In-process stand-in for the plotter's command buffer.
//!
//! Honors the dispatcher contract the manual mode depends on: a FIFO where
//! immediate requests land at the head in order, a pause that holds queued
//! work while still servicing immediate commands, pause/resume
//! acknowledgements, and callbacks echoed back when they reach the head.

use std::collections::VecDeque;

use shared::{
    domain::{BufferSnapshot, Coord, PenHeight, PenState},
    protocol::{Command, DeviceEvent, DispatchRequest, Placement},
};
use tracing::{debug, trace};

/// Travel speed used to fake move durations, in canvas units per millisecond.
const TRAVEL_PER_MS: f64 = 0.5;
const WASH_MEDIA: &str = "water0";

#[derive(Debug, Clone)]
struct Queued {
    command: Command,
    immediate: bool,
}

#[derive(Debug, Default)]
pub struct SimulatedPlotter {
    queue: VecDeque<Queued>,
    paused: bool,
    pen: PenState,
}

impl SimulatedPlotter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> BufferSnapshot {
        BufferSnapshot {
            length: self.queue.len(),
            paused: self.paused,
        }
    }

    pub fn pen(&self) -> &PenState {
        &self.pen
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn queued(&self) -> impl Iterator<Item = &Command> {
        self.queue.iter().map(|q| &q.command)
    }

    pub fn submit(&mut self, request: DispatchRequest) -> Vec<DeviceEvent> {
        debug!(
            commands = ?request.command_names(),
            placement = ?request.placement,
            "buffer submit"
        );
        match request.placement {
            Placement::Append => self.queue.extend(request.commands.into_iter().map(|command| {
                Queued {
                    command,
                    immediate: false,
                }
            })),
            Placement::Immediate => {
                for command in request.commands.into_iter().rev() {
                    self.queue.push_front(Queued {
                        command,
                        immediate: true,
                    });
                }
            }
        }
        vec![DeviceEvent::BufferUpdate(self.snapshot())]
    }

    /// Executes the head command, if the buffer may advance. A paused buffer
    /// only services immediate commands.
    pub fn step(&mut self) -> Vec<DeviceEvent> {
        let can_advance = match self.queue.front() {
            None => false,
            Some(head) => !self.paused || head.immediate,
        };
        if !can_advance {
            return Vec::new();
        }
        let Some(Queued { command, .. }) = self.queue.pop_front() else {
            return Vec::new();
        };

        trace!(command = command.name(), "buffer execute");
        let mut events = self.execute(command);
        events.push(DeviceEvent::BufferUpdate(self.snapshot()));
        events
    }

    /// Steps until the buffer empties or stalls on a pause.
    pub fn run_until_stalled(&mut self, max_steps: usize) -> Vec<DeviceEvent> {
        let mut events = Vec::new();
        for _ in 0..max_steps {
            let step = self.step();
            if step.is_empty() {
                break;
            }
            events.extend(step);
        }
        events
    }

    fn execute(&mut self, command: Command) -> Vec<DeviceEvent> {
        match command {
            Command::Status(message) => vec![DeviceEvent::Status(message)],
            Command::Pause => {
                self.paused = true;
                vec![DeviceEvent::FullyPaused]
            }
            Command::Resume => {
                self.paused = false;
                vec![DeviceEvent::FullyResumed]
            }
            Command::Clear => {
                // Drop queued work; the rest of an immediate sequence survives.
                self.queue.retain(|q| q.immediate);
                self.paused = false;
                Vec::new()
            }
            Command::ClearLocal | Command::Unlock => Vec::new(),
            Command::Park => {
                self.pen.state = PenHeight::UP;
                self.travel_to(Coord::ORIGIN)
            }
            Command::Up => self.set_height(PenHeight::UP),
            Command::Down => self.set_height(PenHeight::DOWN),
            Command::Zero => {
                self.pen.abs_coord = Coord::ORIGIN;
                self.pen.last_duration = 0;
                vec![DeviceEvent::PenUpdate(self.pen.clone())]
            }
            Command::Wash => {
                self.pen.media = WASH_MEDIA.to_string();
                vec![DeviceEvent::PenUpdate(self.pen.clone())]
            }
            Command::Media(tool) => {
                self.pen.media = tool.as_str().to_string();
                vec![DeviceEvent::PenUpdate(self.pen.clone())]
            }
            Command::Move(to) => self.travel_to(to),
            Command::Callback(callback) => vec![DeviceEvent::Callback(callback)],
        }
    }

    fn set_height(&mut self, height: PenHeight) -> Vec<DeviceEvent> {
        self.pen.state = height;
        self.pen.last_duration = 0;
        vec![DeviceEvent::PenUpdate(self.pen.clone())]
    }

    fn travel_to(&mut self, to: Coord) -> Vec<DeviceEvent> {
        let distance = self.pen.abs_coord.distance_to(&to);
        self.pen.abs_coord = to;
        self.pen.last_duration = (distance / TRAVEL_PER_MS).round() as u64;
        vec![DeviceEvent::PenUpdate(self.pen.clone())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::protocol::{CallbackEvent, StatusMessage};

    fn drawing(moves: usize) -> DispatchRequest {
        DispatchRequest::append((0..moves).map(|i| Command::Move(Coord::new(i as f64, 0.0))))
    }

    #[test]
    fn immediate_requests_jump_the_queue_in_order() {
        let mut plotter = SimulatedPlotter::new();
        plotter.submit(drawing(3));
        plotter.submit(DispatchRequest::immediate([
            Command::Status(StatusMessage::Pausing),
            Command::Pause,
        ]));

        let names: Vec<_> = plotter.queued().map(Command::name).collect();
        assert_eq!(names, vec!["status", "pause", "move", "move", "move"]);
    }

    #[test]
    fn paused_buffer_holds_drawing_but_services_immediates() {
        let mut plotter = SimulatedPlotter::new();
        plotter.submit(drawing(2));
        plotter.submit(DispatchRequest::immediate([Command::Pause]));

        let events = plotter.run_until_stalled(10);
        assert!(events.contains(&DeviceEvent::FullyPaused));
        assert_eq!(plotter.snapshot(), BufferSnapshot { length: 2, paused: true });

        plotter.submit(DispatchRequest::immediate([Command::Up]));
        let events = plotter.step();
        assert!(matches!(events.first(), Some(DeviceEvent::PenUpdate(_))));
        assert!(plotter.step().is_empty(), "queued drawing must wait");

        plotter.submit(DispatchRequest::immediate([Command::Resume]));
        let events = plotter.run_until_stalled(10);
        assert_eq!(events.first(), Some(&DeviceEvent::FullyResumed));
        assert_eq!(plotter.snapshot(), BufferSnapshot { length: 0, paused: false });
    }

    #[test]
    fn clear_drops_queued_callbacks() {
        let mut plotter = SimulatedPlotter::new();
        plotter.submit(DispatchRequest::append([
            Command::Callback(CallbackEvent::AutoPaintBegin),
            Command::Move(Coord::new(5.0, 5.0)),
            Command::Callback(CallbackEvent::AutoPaintComplete),
        ]));
        assert_eq!(
            plotter.step().first(),
            Some(&DeviceEvent::Callback(CallbackEvent::AutoPaintBegin))
        );

        plotter.submit(DispatchRequest::immediate([
            Command::Clear,
            Command::Park,
            Command::ClearLocal,
        ]));
        let events = plotter.run_until_stalled(10);
        assert!(!events.contains(&DeviceEvent::Callback(CallbackEvent::AutoPaintComplete)));
        assert!(plotter.snapshot().is_empty());
        assert_eq!(plotter.pen().abs_coord, Coord::ORIGIN);
    }

    #[test]
    fn clear_releases_a_paused_buffer() {
        let mut plotter = SimulatedPlotter::new();
        plotter.submit(drawing(4));
        plotter.submit(DispatchRequest::immediate([Command::Pause]));
        plotter.run_until_stalled(10);
        assert!(plotter.snapshot().paused);

        plotter.submit(DispatchRequest::immediate([
            Command::Clear,
            Command::Park,
            Command::ClearLocal,
        ]));
        plotter.run_until_stalled(10);
        assert_eq!(plotter.snapshot(), BufferSnapshot { length: 0, paused: false });

        plotter.submit(drawing(2));
        plotter.run_until_stalled(10);
        assert!(plotter.snapshot().is_empty());
    }

    #[test]
    fn moves_report_duration_from_distance() {
        let mut plotter = SimulatedPlotter::new();
        plotter.submit(DispatchRequest::single(Command::Move(Coord::new(30.0, 40.0))));
        let events = plotter.step();
        let Some(DeviceEvent::PenUpdate(pen)) = events.first() else {
            panic!("expected pen update, got {events:?}");
        };
        assert_eq!(pen.last_duration, 100);
    }
}
