use std::path::PathBuf;
use thiserror::Error;

/// Errors declared by the command framework itself.
///
/// The [`Dispatcher`](crate::Dispatcher) intercepts these when a handler returns one,
/// prints the message and turns it into [`WRONG_PROCESS`](crate::command::WRONG_PROCESS).
/// Everything else (OS errors, handler bugs) passes through untouched.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("NOT_FOUND_FILE_IN_DIR_PATH:{} HINT:{hint}", base.display())]
    NotFound { base: PathBuf, hint: String },
    #[error("invalid pattern `{pattern}`: {reason}")]
    Pattern { pattern: String, reason: String },
    #[error("invalid argument: {0}")]
    Argument(String),
    #[error("{0}")]
    Failed(String),
}

/// Raised while registering commands, before anything is dispatched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("command `{command}` declares parameter `{parameter}` missing from its options table")]
    MissingOption { command: String, parameter: String },
    #[error("command `{0}` is already registered")]
    DuplicateCommand(String),
    #[error("option `{parameter}` of command `{command}` is invalid: {reason}")]
    InvalidOption {
        command: String,
        parameter: String,
        reason: String,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
