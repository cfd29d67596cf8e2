//! Worker-side bridge: the simulated command buffer and its request queue.

pub mod commands;
pub mod runtime;
