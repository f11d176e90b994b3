// Object Store Port
// Abstraction over remote stores (AWS s3, NOAA HPSS) that files are fetched from

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

use crate::domain::Platform;

/// A single remote object to copy to the local file system
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// s3 bucket (or HPSS base directory)
    pub bucket: Option<String>,
    /// Rendered remote path
    pub object_path: String,
    /// Rendered local destination; the parent directory already exists
    pub local_path: PathBuf,
    /// Credential profile
    pub profile_name: Option<String>,
}

impl FetchRequest {
    /// Human-readable source, e.g. `s3://bucket/key`
    pub fn source(&self, platform: Platform) -> String {
        match (platform, &self.bucket) {
            (Platform::AwsS3, Some(bucket)) => format!("s3://{}/{}", bucket, self.object_path),
            (Platform::NoaaHpss, Some(base)) => {
                format!("hpss:{}/{}", base.trim_end_matches('/'), self.object_path)
            }
            (Platform::AwsS3, None) => format!("s3://{}", self.object_path),
            (Platform::NoaaHpss, None) => format!("hpss:{}", self.object_path),
        }
    }
}

/// Object store errors
#[derive(Error, Debug)]
pub enum ObjectStoreError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    Access(String),

    #[error("Client error: {0}")]
    Client(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Transfer timeout after {0}s")]
    Timeout(u64),
}

/// Object Store trait
///
/// Implementations:
/// - S3ObjectStore: AWS SDK for s3 (ufsda-infra-s3)
/// - HpssObjectStore: `hsi get` subprocess (ufsda-infra-system)
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Platform this store serves
    fn platform(&self) -> Platform;

    /// Copy one object to `request.local_path`, returning the bytes written
    ///
    /// # Errors
    /// - ObjectStoreError::NotFound if the object does not exist
    /// - ObjectStoreError::Io if the local file cannot be written
    async fn fetch(&self, request: &FetchRequest) -> Result<u64, ObjectStoreError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory object store keyed by (bucket, object path)
    pub struct MockObjectStore {
        platform: Platform,
        objects: Mutex<HashMap<(Option<String>, String), Vec<u8>>>,
        requests: Mutex<Vec<FetchRequest>>,
    }

    impl MockObjectStore {
        pub fn new(platform: Platform) -> Self {
            Self {
                platform,
                objects: Mutex::new(HashMap::new()),
                requests: Mutex::new(Vec::new()),
            }
        }

        /// Store an object (like `put_object`)
        pub fn put(&self, bucket: Option<&str>, object_path: &str, body: impl Into<Vec<u8>>) {
            self.objects.lock().unwrap().insert(
                (bucket.map(str::to_string), object_path.to_string()),
                body.into(),
            );
        }

        pub fn requests(&self) -> Vec<FetchRequest> {
            self.requests.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ObjectStore for MockObjectStore {
        fn platform(&self) -> Platform {
            self.platform
        }

        async fn fetch(&self, request: &FetchRequest) -> Result<u64, ObjectStoreError> {
            self.requests.lock().unwrap().push(request.clone());

            let body = self
                .objects
                .lock()
                .unwrap()
                .get(&(request.bucket.clone(), request.object_path.clone()))
                .cloned()
                .ok_or_else(|| ObjectStoreError::NotFound(request.source(self.platform)))?;

            tokio::fs::write(&request.local_path, &body)
                .await
                .map_err(|e| ObjectStoreError::Io(e.to_string()))?;

            Ok(body.len() as u64)
        }
    }
}
