//! Buffer worker thread: executes the simulated plotter on a fixed tick and
//! forwards every device notification to the UI queue.

use std::{
    thread::{self, JoinHandle},
    time::Duration,
};

use cnc_sim::SimulatedPlotter;
use crossbeam_channel::{select, tick, Receiver, Sender};
use shared::protocol::DeviceEvent;

use crate::backend_bridge::commands::BridgeCommand;
use crate::controller::events::UiEvent;

pub fn launch(
    cmd_rx: Receiver<BridgeCommand>,
    ui_tx: Sender<UiEvent>,
    step_every: Duration,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let _ = ui_tx.try_send(UiEvent::Info("Simulated plotter online".to_string()));
        run_worker(cmd_rx, ui_tx, step_every);
        tracing::info!("buffer worker stopped");
    })
}

fn run_worker(cmd_rx: Receiver<BridgeCommand>, ui_tx: Sender<UiEvent>, step_every: Duration) {
    let mut plotter = SimulatedPlotter::new();
    let ticker = tick(step_every);

    loop {
        let events = select! {
            recv(cmd_rx) -> cmd => match cmd {
                Ok(BridgeCommand::Dispatch(request)) => plotter.submit(request),
                Ok(BridgeCommand::Shutdown) | Err(_) => return,
            },
            recv(ticker) -> _ => plotter.step(),
        };
        if !forward(&ui_tx, events) {
            tracing::debug!("ui queue closed");
            return;
        }
    }
}

/// Device events must not be dropped, so this blocks while the UI catches up.
fn forward(ui_tx: &Sender<UiEvent>, events: Vec<DeviceEvent>) -> bool {
    events
        .into_iter()
        .all(|event| ui_tx.send(UiEvent::Device(event)).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;
    use shared::{
        domain::BufferSnapshot,
        protocol::{Command, DispatchRequest},
    };

    fn next_device(ui_rx: &Receiver<UiEvent>) -> DeviceEvent {
        loop {
            match ui_rx.recv_timeout(Duration::from_secs(2)).expect("ui event") {
                UiEvent::Device(event) => return event,
                UiEvent::Info(_) | UiEvent::Error(_) => continue,
            }
        }
    }

    #[test]
    fn worker_executes_requests_and_reports_buffer_state() {
        let (cmd_tx, cmd_rx) = bounded(8);
        let (ui_tx, ui_rx) = bounded(64);
        let handle = launch(cmd_rx, ui_tx, Duration::from_millis(1));

        cmd_tx
            .send(BridgeCommand::Dispatch(DispatchRequest::single(Command::Up)))
            .expect("send");

        assert_eq!(
            next_device(&ui_rx),
            DeviceEvent::BufferUpdate(BufferSnapshot {
                length: 1,
                paused: false
            })
        );
        assert!(matches!(next_device(&ui_rx), DeviceEvent::PenUpdate(_)));
        assert_eq!(
            next_device(&ui_rx),
            DeviceEvent::BufferUpdate(BufferSnapshot::default())
        );

        cmd_tx.send(BridgeCommand::Shutdown).expect("shutdown");
        handle.join().expect("worker join");
    }

    #[test]
    fn worker_stops_when_ui_side_hangs_up() {
        let (cmd_tx, cmd_rx) = bounded::<BridgeCommand>(8);
        let (ui_tx, ui_rx) = bounded(64);
        let handle = launch(cmd_rx, ui_tx, Duration::from_millis(1));
        drop(cmd_tx);
        handle.join().expect("worker join");
        drop(ui_rx);
    }
}
