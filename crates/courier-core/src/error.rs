//! Error types for Courier core.

use std::fmt;

/// Timer-specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerError {
    /// A runtime-backed timer was created outside of a tokio runtime.
    NoRuntime,
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRuntime => write!(f, "No tokio runtime available to drive the timer"),
        }
    }
}

impl std::error::Error for TimerError {}

/// A specialized Result type for Courier core operations.
pub type Result<T> = std::result::Result<T, TimerError>;
