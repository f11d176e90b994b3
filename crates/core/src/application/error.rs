// Application error types, one per workflow component

use std::path::PathBuf;

use thiserror::Error;

use super::fileio::FileIoError;
use crate::domain::DomainError;
use crate::port::ObjectStoreError;

/// Errors raised while launching an experiment cycle
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("The options do not contain the mandatory attribute {0}")]
    MissingOption(String),

    #[error("The YAML-formatted configuration file {} does not exist", .0.display())]
    MissingConfig(PathBuf),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    File(#[from] FileIoError),
}

/// Errors raised by the staging (fetch, concatenate, checksum) applications
#[derive(Error, Debug)]
pub enum StagingError {
    #[error("The options do not contain the mandatory attribute {0}")]
    MissingOption(String),

    #[error("The YAML-formatted configuration file {} does not exist", .0.display())]
    MissingConfig(PathBuf),

    #[error(
        "The fetch attribute could not be determined from configuration file {}",
        .0.display()
    )]
    MissingFetchBlock(PathBuf),

    #[error("A method for collecting files from the {0} platform is not supported")]
    UnsupportedPlatform(String),

    #[error("No object store has been registered for platform {0}")]
    NoStoreForPlatform(String),

    #[error("The fetch type {fetch_type} has not been specified for platform {platform}")]
    UnknownFetchType { platform: String, fetch_type: String },

    #[error("The file identifier {0} has not been specified in the fetch configuration")]
    UnknownFileId(String),

    #[error("Invalid attributes for file identifier {fileid}: {reason}")]
    InvalidFileId { fileid: String, reason: String },

    #[error("Fetching {source_path} failed: {error}")]
    Fetch {
        source_path: String,
        #[source]
        error: ObjectStoreError,
    },

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    File(#[from] FileIoError),
}

/// Errors raised by the task base
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("The YAML-formatted experiment configuration file {} does not exist", .0.display())]
    MissingConfig(PathBuf),

    #[error("The mandatory key {0} could not be determined from the runtime environment")]
    MissingRuntimeVariable(String),

    #[error("Validating the format for runtime variable {name} failed: {source}")]
    InvalidRuntimeVariable {
        name: String,
        #[source]
        source: DomainError,
    },

    #[error("Cycling experiments must specify cycling_interval_seconds in {}", .0.display())]
    MissingCyclingInterval(PathBuf),

    #[error("The experiment configuration in {} is not a YAML mapping", .0.display())]
    NotAMapping(PathBuf),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    File(#[from] FileIoError),
}

/// Errors raised by the GDAS application dispatcher
#[derive(Error, Debug)]
pub enum GdasError {
    #[error("The GDAS application {app} is not valid; valid options are {valid:?}")]
    UnsupportedApp { app: String, valid: Vec<String> },

    #[error("The {app} application type {app_type} is not supported; valid types are {valid:?}")]
    UnsupportedAppType {
        app: String,
        app_type: String,
        valid: Vec<String>,
    },

    #[error("The options do not contain the mandatory attribute {0}")]
    MissingOption(String),
}

/// Errors raised by the SOCA applications
#[derive(Error, Debug)]
pub enum SocaError {
    #[error("The SOCA configuration gdas.soca.{0} is absent from the experiment configuration")]
    MissingConfig(String),

    #[error("Invalid SOCA configuration: {0}")]
    InvalidConfig(String),

    #[error("The SOCA configuration attribute {0} cannot be null")]
    MissingAttribute(String),

    #[error("The fixed file {} does not exist", .0.display())]
    MissingFixedFile(PathBuf),

    #[error("The background file {} does not exist", .0.display())]
    MissingBackground(PathBuf),

    #[error("Rendering the SOCA configuration {} failed: {reason}", .path.display())]
    Render { path: PathBuf, reason: String },

    #[error(transparent)]
    Launch(#[from] LaunchError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    File(#[from] FileIoError),
}
