// Central Error Type for the Application

use thiserror::Error;

pub use crate::application::error::{GdasError, LaunchError, SocaError, StagingError, TaskError};
pub use crate::application::fileio::FileIoError;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Launch error: {0}")]
    Launch(#[from] LaunchError),

    #[error("Staging error: {0}")]
    Staging(#[from] StagingError),

    #[error("Task error: {0}")]
    Task(#[from] TaskError),

    #[error("GDAS error: {0}")]
    Gdas(#[from] GdasError),

    #[error("SOCA error: {0}")]
    Soca(#[from] SocaError),

    #[error("File error: {0}")]
    File(#[from] FileIoError),

    #[error("Object store error: {0}")]
    ObjectStore(#[from] crate::port::ObjectStoreError),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
