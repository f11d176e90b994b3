// Application Layer - Workflow applications

pub mod error;
pub mod fileio;
pub mod gdas;
pub mod launch;
pub mod staging;
pub mod task;

// Re-exports
pub use gdas::soca::SocaOutcome;
pub use gdas::{Gdas, GdasApp};
pub use launch::Launch;
pub use staging::{Fetch, FetchSummary, PlannedTransfer, Staging};
pub use task::{Task, WorkflowTask};
