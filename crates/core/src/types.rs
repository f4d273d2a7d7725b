use serde::{Deserialize, Serialize};

/// Coarse classification of an `ExecutionError`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The action returned its own error
    Failed,
    /// The caller's wait ran out before an outcome was recorded
    Timeout,
    /// The action panicked on its worker thread
    Panicked,
    /// No worker thread could be started
    Spawn,
}

/// Log verbosity, ordered from most to least chatty
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}
