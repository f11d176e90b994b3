// UFS DA Infrastructure - AWS s3 Adapter
// Implements: ObjectStore for the aws_s3 platform

mod client;
mod object_store;

pub use client::{create_client, S3Settings};
pub use object_store::S3ObjectStore;

// Note: SdkError conversion is handled by map_get_object_error
// due to Rust's orphan rules (cannot implement From<SdkError> for ObjectStoreError here)
