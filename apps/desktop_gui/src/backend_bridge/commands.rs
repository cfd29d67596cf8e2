//! Requests the UI thread sends to the buffer worker.

use shared::protocol::DispatchRequest;

#[derive(Debug, Clone, PartialEq)]
pub enum BridgeCommand {
    Dispatch(DispatchRequest),
    Shutdown,
}

impl BridgeCommand {
    pub fn name(&self) -> &'static str {
        match self {
            BridgeCommand::Dispatch(request) if request.is_immediate() => "dispatch_immediate",
            BridgeCommand::Dispatch(_) => "dispatch",
            BridgeCommand::Shutdown => "shutdown",
        }
    }
}
