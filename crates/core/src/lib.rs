// UFS DA Core - Domain Logic, Ports & Staging Use Cases
// NO object-store SDKs or subprocess handling here (adapters live in infra-* crates)

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use error::{AppError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
