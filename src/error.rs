use std::io;
use thiserror::Error;

/// Errors that can occur during git operations
#[derive(Debug, Error)]
pub enum GitError {
    #[error("Not a git repository")]
    NotARepository,

    #[error("Git reported an error: {0}")]
    OutputError(String),

    #[error("Failed to build a file URL for '{0}'")]
    FailedToDecodeUrl(String),

    #[error("Command '{command}' failed with exit code {exit_code}: {output}")]
    ExecutionError {
        command: String,
        exit_code: i32,
        output: String,
    },

    #[error("Command rejected: {0}")]
    UnsafeCommand(String),

    #[error("Source control is disabled in the configuration")]
    SourceControlDisabled,

    #[error("Failed to parse git output: {0}")]
    ParseError(String),

    #[error("Git version {0} is too old. Minimum required: 2.20")]
    GitVersionTooOld(String),

    #[error("Failed to detect git version: {0}")]
    GitVersionDetectionFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl GitError {
    /// Build an execution error for a process that could not be started
    pub(crate) fn spawn_failed(command: &str, err: &io::Error) -> Self {
        GitError::ExecutionError {
            command: command.to_string(),
            exit_code: -1,
            output: format!("Failed to spawn process: {}", err),
        }
    }
}

/// Errors raised while loading, validating or saving configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Config directory not found")]
    DirectoryNotFound,

    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}

/// Top-level application error that wraps all module-specific errors
///
/// All module errors convert to AppError via the `From` trait, so
/// application code can use `?` across module boundaries.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Git error: {0}")]
    Git(#[from] GitError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Account error: {0}")]
    Account(#[from] crate::accounts::AccountError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for git operations
pub type GitResult<T> = std::result::Result<T, GitError>;

/// Result type for application-level operations
pub type AppResult<T> = std::result::Result<T, AppError>;
