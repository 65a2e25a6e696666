//! CLI error types.

use meetslot_engine::EngineError;
use thiserror::Error;

/// An error surfaced to the CLI user.
#[derive(Debug, Error)]
pub enum CliError {
    /// An engine operation failed.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The authorization flow failed outside the engine (listener setup,
    /// malformed callback).
    #[error("authorization flow failed: {0}")]
    Auth(String),

    /// Tracing could not be initialized.
    #[error(transparent)]
    Tracing(#[from] meetslot_core::TracingError),

    /// Local I/O failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;
