use thiserror::Error;

/// Failures surfaced by [`crate::QChat`].
#[derive(Debug, Error)]
pub enum QError {
    #[error("invalid Q config: {0}")]
    Config(String),

    #[error("submit failed: {0}")]
    Submit(String),

    #[error("poll failed: {0}")]
    Poll(String),

    /// The service settled the job as `fail`, `timeout` or `cancelled`.
    #[error("{code}: {message}")]
    Job { code: String, message: String },

    #[error("Malformed response: {0}")]
    Malformed(String),

    /// The client-side deadline passed before the job settled.
    #[error("Q timeout")]
    Timeout,

    #[error("runtime unavailable: {0}")]
    Runtime(String),
}

pub type QResult<T> = Result<T, QError>;
