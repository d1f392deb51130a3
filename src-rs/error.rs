use thiserror::Error;

use crate::task::TaskId;

#[derive(Debug, Error)]
pub enum GridError {
    #[error("Please enter at least one prompt.")]
    EmptyPrompts,

    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("a generation run is already in progress")]
    Busy,

    #[error("task board has shut down")]
    BoardClosed,

    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("none of the {0} finished images could be fetched")]
    NothingFetched(usize),

    #[error("failed to write archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("failed to write archive: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{provider} provider selected but no {env} found")]
    MissingKeys { provider: String, env: String },

    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },

    #[error("failed to initialise logging: {0}")]
    Logging(String),
}
