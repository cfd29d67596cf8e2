//! Dispatcher that hands command requests to the buffer worker queue.

use crossbeam_channel::{Sender, TrySendError};
use manual_core::CommandDispatcher;
use shared::{error::DispatchError, protocol::DispatchRequest};

use crate::backend_bridge::commands::BridgeCommand;

pub struct ChannelDispatcher {
    cmd_tx: Sender<BridgeCommand>,
}

impl ChannelDispatcher {
    pub fn new(cmd_tx: Sender<BridgeCommand>) -> Self {
        Self { cmd_tx }
    }

    /// Asks the worker to stop; a worker that is already gone is fine.
    pub fn shutdown(&self) {
        let _ = self.cmd_tx.try_send(BridgeCommand::Shutdown);
    }
}

impl CommandDispatcher for ChannelDispatcher {
    fn run(&self, request: DispatchRequest) -> Result<(), DispatchError> {
        let cmd = BridgeCommand::Dispatch(request);
        let cmd_name = cmd.name();
        match self.cmd_tx.try_send(cmd) {
            Ok(()) => {
                tracing::trace!(command = cmd_name, "queued ui->worker command");
                Ok(())
            }
            Err(TrySendError::Full(_)) => Err(DispatchError::QueueFull),
            Err(TrySendError::Disconnected(_)) => Err(DispatchError::Disconnected),
        }
    }
}
