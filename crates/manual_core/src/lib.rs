//! Manual painting mode: the paint-run protocol, canvas selection, tool
//! selection and the controller tying them to an external command buffer.

pub mod canvas;
pub mod config;
pub mod controller;
pub mod controls;
pub mod dispatcher;
pub mod error;
pub mod run;
pub mod selection;
pub mod state;
pub mod tools;

pub use canvas::{CanvasError, CanvasEvent, LayerFocus, PaintCanvas, RenderKind};
pub use controller::{CloseDecision, ManualController};
pub use controls::{ControlLabel, ControlPanel, ControlState, PrimaryStyle};
pub use dispatcher::{CommandDispatcher, MissingDispatcher};
pub use error::ManualError;
pub use run::{PaintRun, RunError, RunState, RunTransition, RunTrigger};
pub use state::ManualState;
