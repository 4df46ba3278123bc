use thiserror::Error;

/// Lifecycle misuse and construction errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ObserverError {
    #[error("observer has already been opened")]
    AlreadyOpened,
    #[error("cannot add paths or observers once started")]
    AlreadyStarted,
    #[error("can only reset while open")]
    ResetWhileNotOpen,
    #[error("can only finish a reset after starting one")]
    NotResetting,
    #[error("expected an array, found {0}")]
    NotAnArray(&'static str),
    #[error("expected an object or array, found {0}")]
    NotAnObject(&'static str),
}

/// Failure reported by an observer callback.
///
/// Callback failures never propagate out of a checkpoint; they are logged and
/// counted on the owning [`Engine`](crate::Engine).
#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("{0}")]
    Message(String),
    #[error("{0}")]
    Other(Box<dyn std::error::Error>),
    #[error("callback panicked: {0}")]
    Panicked(String),
}

impl CallbackError {
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    pub fn other(err: impl Into<Box<dyn std::error::Error>>) -> Self {
        Self::Other(err.into())
    }
}

impl From<&str> for CallbackError {
    fn from(message: &str) -> Self {
        Self::msg(message)
    }
}

impl From<String> for CallbackError {
    fn from(message: String) -> Self {
        Self::Message(message)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid engine config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("max_dirty_check_cycles must be at least 1")]
    ZeroCycles,
}
