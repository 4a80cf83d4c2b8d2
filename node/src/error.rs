use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("engine error: {0}")]
    Engine(#[from] gravity_engine::BridgeError),

    #[error("store error: {0}")]
    Store(#[from] gravity_store::StoreError),

    #[error("config error: {0}")]
    Config(String),

    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl NodeError {
    /// Whether the command may succeed if resubmitted later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Engine(e) if e.is_retryable())
    }
}
