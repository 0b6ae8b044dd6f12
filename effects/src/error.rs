use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

/// The default error type carried by an [`Effect`](crate::Effect).
///
/// Effects may use any error type; this one exists for callers that do not
/// need their own.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Internal(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl From<&str> for Error {
    fn from(value: &str) -> Self {
        Self::Message(value.to_string())
    }
}

impl From<String> for Error {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
