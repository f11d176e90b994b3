// Domain Layer - Cycles, templates, schedules and configuration attributes

pub mod cycle;
pub mod environment;
pub mod error;
pub mod fileid;
pub mod options;
pub mod platform;
pub mod template;
pub mod timestamps;

// Re-exports
pub use cycle::{check_format, Cycle, GLOBAL_FORMAT, ISO_FORMAT};
pub use environment::Environment;
pub use error::DomainError;
pub use fileid::FileId;
pub use options::Options;
pub use platform::Platform;
pub use timestamps::{build_timestamps, OffsetSchedule, StreamWindow};
