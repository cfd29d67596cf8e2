//! Seam to the external command buffer.

use shared::{error::DispatchError, protocol::DispatchRequest};

pub trait CommandDispatcher {
    fn run(&self, request: DispatchRequest) -> Result<(), DispatchError>;
}

/// Stand-in used before a device bridge is attached.
pub struct MissingDispatcher;

impl CommandDispatcher for MissingDispatcher {
    fn run(&self, _request: DispatchRequest) -> Result<(), DispatchError> {
        Err(DispatchError::Disconnected)
    }
}

impl<T: CommandDispatcher + ?Sized> CommandDispatcher for &T {
    fn run(&self, request: DispatchRequest) -> Result<(), DispatchError> {
        (**self).run(request)
    }
}

impl<T: CommandDispatcher + ?Sized> CommandDispatcher for Box<T> {
    fn run(&self, request: DispatchRequest) -> Result<(), DispatchError> {
        (**self).run(request)
    }
}
