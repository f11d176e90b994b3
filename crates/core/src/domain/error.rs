// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Timestamp {value} does not match format {format}")]
    InvalidTimestamp { value: String, format: String },

    #[error("Invalid template {template}: {reason}")]
    InvalidTemplate { template: String, reason: String },

    #[error("Environment variable {name} referenced in {template} is not defined")]
    UndefinedVariable { name: String, template: String },

    #[error("Offset of {seconds} seconds from cycle {cycle} is out of range")]
    OffsetOutOfRange { cycle: String, seconds: i64 },

    #[error("Invalid offset schedule: {0}")]
    InvalidSchedule(String),

    #[error("Mandatory attribute {0} has not been provided")]
    MissingAttribute(String),

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Unsupported hash level: {0}")]
    UnsupportedHashLevel(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
