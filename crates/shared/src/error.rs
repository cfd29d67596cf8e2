use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("command dispatcher disconnected")]
    Disconnected,
    #[error("command queue is full")]
    QueueFull,
    #[error("command rejected: {0}")]
    Rejected(String),
}
