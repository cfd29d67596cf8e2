use shared::error::DispatchError;
use thiserror::Error;

use crate::{canvas::CanvasError, run::RunError};

#[derive(Debug, Error)]
pub enum ManualError {
    #[error(transparent)]
    Run(#[from] RunError),
    #[error("dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Canvas(#[from] CanvasError),
    #[error("no path is selected")]
    NothingSelected,
    #[error("a render is already in progress")]
    RenderInFlight,
}

impl ManualError {
    /// Refusals that leave every piece of state untouched.
    pub fn is_refusal(&self) -> bool {
        matches!(
            self,
            ManualError::Run(_) | ManualError::NothingSelected | ManualError::RenderInFlight
        )
    }
}
