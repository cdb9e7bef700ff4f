// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid queue spec: {0}")]
    InvalidQueueSpec(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Invalid arguments for command {command}: {reason}")]
    InvalidCommandArgs { command: String, reason: String },
}

pub type Result<T> = std::result::Result<T, DomainError>;
