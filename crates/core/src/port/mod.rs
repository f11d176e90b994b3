// Port Layer - Interfaces for external dependencies

pub mod env_source; // PDY / cyc from the workflow manager
pub mod object_store;
pub mod time_provider;

// Re-exports
pub use env_source::{EnvSource, ProcessEnvSource};
pub use object_store::{FetchRequest, ObjectStore, ObjectStoreError};
pub use time_provider::{SystemTimeProvider, TimeProvider};
