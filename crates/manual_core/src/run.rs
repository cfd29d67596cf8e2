//! Paint-run state machine layered over the external command buffer.
//!
//! `PaintRun` never talks to the dispatcher itself: control operations
//! return the [`DispatchRequest`] the caller must issue, and every state
//! change is published to subscribers of [`PaintRun::subscribe`].

use std::fmt;

use shared::{
    domain::BufferSnapshot,
    protocol::{Command, DispatchRequest, StatusMessage},
};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info};

const TRANSITION_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    Idle,
    Running,
    Pausing,
    Paused,
    Resuming,
    Cancelled,
}

impl RunState {
    pub fn as_str(self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Running => "running",
            RunState::Pausing => "pausing",
            RunState::Paused => "paused",
            RunState::Resuming => "resuming",
            RunState::Cancelled => "cancelled",
        }
    }

    /// States in which controls reserved for an idle machine are usable.
    pub fn allows_idle_controls(self) -> bool {
        matches!(self, RunState::Idle | RunState::Paused)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunTrigger {
    Start,
    Pause,
    FullyPaused,
    Resume,
    FullyResumed,
    Cancel,
    AutoPaintComplete,
}

impl fmt::Display for RunTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunTrigger::Start => "start",
            RunTrigger::Pause => "pause",
            RunTrigger::FullyPaused => "acknowledge pause",
            RunTrigger::Resume => "resume",
            RunTrigger::FullyResumed => "acknowledge resume",
            RunTrigger::Cancel => "cancel",
            RunTrigger::AutoPaintComplete => "complete auto-paint",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunTransition {
    pub from: RunState,
    pub to: RunState,
    pub trigger: RunTrigger,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    #[error("cannot {trigger} while {state}")]
    InvalidTransition { state: RunState, trigger: RunTrigger },
    #[error("command buffer still holds {length} item(s)")]
    BufferBusy { length: usize },
    #[error("command buffer state has not been reported yet")]
    BufferUnknown,
}

pub struct PaintRun {
    state: RunState,
    begun: bool,
    events: broadcast::Sender<RunTransition>,
}

impl Default for PaintRun {
    fn default() -> Self {
        Self::new()
    }
}

impl PaintRun {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(TRANSITION_CHANNEL_CAPACITY);
        Self {
            state: RunState::Idle,
            begun: false,
            events,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Whether the auto-paint routine has reported that work started.
    pub fn has_begun(&self) -> bool {
        self.begun
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunTransition> {
        self.events.subscribe()
    }

    /// Idle -> Running. Only valid once the buffer is known to be empty,
    /// which keeps a second run from being queued behind the first.
    pub fn start(&mut self, buffer: Option<&BufferSnapshot>) -> Result<(), RunError> {
        self.expect(RunState::Idle, RunTrigger::Start)?;
        match buffer {
            None => return Err(RunError::BufferUnknown),
            Some(snapshot) if !snapshot.is_empty() => {
                return Err(RunError::BufferBusy {
                    length: snapshot.length,
                })
            }
            Some(_) => {}
        }
        self.begun = false;
        self.transition(RunState::Running, RunTrigger::Start);
        Ok(())
    }

    /// Only a run this machine started can begin; a begin that lands
    /// after a cancel is stale.
    pub fn auto_paint_begin(&mut self) {
        match self.state {
            RunState::Running => self.begun = true,
            state => debug!(%state, "ignoring auto-paint begin"),
        }
    }

    /// Running -> Pausing. The returned request must be inserted at the
    /// head of the buffer.
    pub fn pause(&mut self) -> Result<DispatchRequest, RunError> {
        self.expect(RunState::Running, RunTrigger::Pause)?;
        self.transition(RunState::Pausing, RunTrigger::Pause);
        Ok(DispatchRequest::immediate([
            Command::Status(StatusMessage::Pausing),
            Command::Pause,
        ]))
    }

    /// Pausing -> Paused. Returns the status follow-up, or `None` for an
    /// acknowledgement nobody asked for.
    pub fn fully_paused(&mut self) -> Option<DispatchRequest> {
        if self.state != RunState::Pausing {
            debug!(state = %self.state, "ignoring unsolicited pause acknowledgement");
            return None;
        }
        self.transition(RunState::Paused, RunTrigger::FullyPaused);
        Some(DispatchRequest::single(Command::Status(StatusMessage::Paused)))
    }

    pub fn resume(&mut self) -> Result<DispatchRequest, RunError> {
        self.expect(RunState::Paused, RunTrigger::Resume)?;
        self.transition(RunState::Resuming, RunTrigger::Resume);
        Ok(DispatchRequest::immediate([
            Command::Status(StatusMessage::Resuming),
            Command::Resume,
        ]))
    }

    pub fn fully_resumed(&mut self) -> Option<DispatchRequest> {
        if self.state != RunState::Resuming {
            debug!(state = %self.state, "ignoring unsolicited resume acknowledgement");
            return None;
        }
        self.transition(RunState::Running, RunTrigger::FullyResumed);
        Some(DispatchRequest::single(Command::Status(StatusMessage::Resumed)))
    }

    /// Any state -> Cancelled -> Idle. Callers gate this on an explicit
    /// user confirmation.
    pub fn cancel(&mut self) -> DispatchRequest {
        self.transition(RunState::Cancelled, RunTrigger::Cancel);
        self.begun = false;
        self.transition(RunState::Idle, RunTrigger::Cancel);
        forceful_cancel()
    }

    pub fn auto_paint_complete(&mut self) {
        self.begun = false;
        if self.state != RunState::Idle {
            self.transition(RunState::Idle, RunTrigger::AutoPaintComplete);
        }
    }

    fn expect(&self, state: RunState, trigger: RunTrigger) -> Result<(), RunError> {
        if self.state == state {
            Ok(())
        } else {
            Err(RunError::InvalidTransition {
                state: self.state,
                trigger,
            })
        }
    }

    fn transition(&mut self, to: RunState, trigger: RunTrigger) {
        let from = self.state;
        self.state = to;
        info!(%from, %to, %trigger, "paint run transition");
        let _ = self.events.send(RunTransition { from, to, trigger });
    }
}

/// Drops everything queued, parks, and clears local spooling. Always
/// placed at the buffer head.
pub fn forceful_cancel() -> DispatchRequest {
    DispatchRequest::immediate([Command::Clear, Command::Park, Command::ClearLocal])
}

#[cfg(test)]
#[path = "tests/run_tests.rs"]
mod tests;
