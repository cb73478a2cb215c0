//! Crate-wide error types.

use thiserror::Error;

use std::path::PathBuf;

pub type CollectResult<T> = Result<T, CollectError>;

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("missing artifact: {}", path.display())]
    MissingArtifact { path: PathBuf },

    #[error("malformed snapshot {} (line {line}): {reason}", path.display())]
    MalformedSnapshot {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("malformed results line {line}: {content:?}")]
    MalformedResultLine { line: usize, content: String },

    #[error("malformed log line in {} (line {line}): {reason}", path.display())]
    MalformedLogLine {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("division by zero: {0}")]
    DivisionByZero(String),

    #[error("incomplete aggregate: {0}")]
    IncompleteAggregate(String),
}

impl CollectError {
    /// True for errors the operator caused through arguments or config.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}
