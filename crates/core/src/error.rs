// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Process error: {0}")]
    Process(#[from] crate::port::ProcessError),

    #[error("Manager connection error: {0}")]
    ManagerConnection(#[from] crate::port::LinkError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration does not support reloading")]
    ReloadUnsupported,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// Failures that break supervision guarantees and must end the master
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::Process(_) | AppError::Internal(_))
    }
}
