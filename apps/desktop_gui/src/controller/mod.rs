//! Controller layer: UI events, error modeling and the channel-backed
//! command dispatcher.

pub mod events;
pub mod orchestration;
