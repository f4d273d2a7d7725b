//! Error types for planner construction and action execution.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::types::ErrorKind;

/// Invalid configuration, reported when an executor, planner or settings
/// file is built. Never produced at call time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("malformed duration '{input}': expected <number>[.<fraction>](s|m|h)")]
    Malformed { input: String },

    #[error("duration must be non-negative and finite, got {seconds}s")]
    Negative { seconds: f64 },

    #[error("failed to load settings '{path}': {reason}")]
    Settings { path: PathBuf, reason: String },
}

impl ConfigError {
    pub fn malformed(input: impl Into<String>) -> Self {
        Self::Malformed { input: input.into() }
    }

    pub fn settings(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Settings {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Failure observed by a caller of `execute` or `ResultHandle::get`.
///
/// The action's own error is kept behind an `Arc` so every reader of a
/// shared handle receives the same cause.
#[derive(Debug, Error)]
pub enum ExecutionError<E> {
    #[error("action failed: {cause}")]
    Failed { cause: Arc<E> },

    #[error("no outcome within {waited:?}")]
    Timeout { waited: Duration },

    #[error("action panicked: {message}")]
    Panicked { message: String },

    #[error("failed to spawn worker thread: {message}")]
    Spawn { message: String },
}

impl<E> ExecutionError<E> {
    pub fn failed(cause: E) -> Self {
        Self::Failed { cause: Arc::new(cause) }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Failed { .. } => ErrorKind::Failed,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Panicked { .. } => ErrorKind::Panicked,
            Self::Spawn { .. } => ErrorKind::Spawn,
        }
    }

    /// The action's own error, if that is what this failure carries.
    pub fn cause(&self) -> Option<&E> {
        match self {
            Self::Failed { cause } => Some(cause.as_ref()),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

// Manual impl: the derive would demand `E: Clone`.
impl<E> Clone for ExecutionError<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Failed { cause } => Self::Failed { cause: Arc::clone(cause) },
            Self::Timeout { waited } => Self::Timeout { waited: *waited },
            Self::Panicked { message } => Self::Panicked { message: message.clone() },
            Self::Spawn { message } => Self::Spawn { message: message.clone() },
        }
    }
}
