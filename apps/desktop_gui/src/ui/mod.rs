//! UI layer for the manual-mode window.

pub mod app;

pub use app::{ManualModeApp, StartupConfig};
