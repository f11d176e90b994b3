// AWS s3 ObjectStore Implementation

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use ufsda_core::domain::Platform;
use ufsda_core::port::{FetchRequest, ObjectStore, ObjectStoreError};

use crate::client::{create_client, S3Settings};

// Helper to convert the SDK error into ObjectStoreError with the s3 source path
fn map_get_object_error(err: SdkError<GetObjectError>, source: &str) -> ObjectStoreError {
    match &err {
        SdkError::ServiceError(service) => {
            let status = service.raw().status().as_u16();
            match service.err() {
                GetObjectError::NoSuchKey(_) => ObjectStoreError::NotFound(source.to_string()),
                _ if status == 404 => ObjectStoreError::NotFound(source.to_string()),
                _ if status == 403 => ObjectStoreError::Access(source.to_string()),
                _ => {
                    ObjectStoreError::Client(format!("{source}: {}", DisplayErrorContext(&err)))
                }
            }
        }
        SdkError::TimeoutError(_) => {
            ObjectStoreError::Client(format!("{source}: request timed out"))
        }
        _ => ObjectStoreError::Client(format!("{source}: {}", DisplayErrorContext(&err))),
    }
}

// Stream the object body into `file`
async fn copy_body(
    body: &mut ByteStream,
    file: &mut File,
    source: &str,
    local_path: &Path,
) -> Result<u64, ObjectStoreError> {
    let io_error = |e: std::io::Error| {
        ObjectStoreError::Io(format!("{}: {e}", local_path.display()))
    };

    let mut written = 0u64;
    while let Some(chunk) = body
        .try_next()
        .await
        .map_err(|e| ObjectStoreError::Client(format!("{source}: {e}")))?
    {
        file.write_all(&chunk).await.map_err(io_error)?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(io_error)?;
    Ok(written)
}

// Remove a partially written download, keeping the original error
async fn discard_partial(local_path: &Path, err: ObjectStoreError) -> ObjectStoreError {
    match tokio::fs::remove_file(local_path).await {
        Ok(()) => warn!(path = %local_path.display(), "Removed partial s3 download"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(
            path = %local_path.display(),
            error = %e,
            "Failed to remove partial s3 download"
        ),
    }
    err
}

/// s3 object store; one client per credential profile
pub struct S3ObjectStore {
    settings: S3Settings,
    clients: Mutex<HashMap<Option<String>, Client>>,
}

impl S3ObjectStore {
    pub fn new(settings: S3Settings) -> Self {
        Self {
            settings,
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &S3Settings {
        &self.settings
    }

    async fn client(&self, profile_name: Option<&str>) -> Client {
        let mut clients = self.clients.lock().await;
        let key = profile_name.map(str::to_string);
        if let Some(client) = clients.get(&key) {
            return client.clone();
        }

        debug!(profile_name = ?profile_name, "Creating s3 client");
        let client = create_client(&self.settings, profile_name).await;
        clients.insert(key, client.clone());
        client
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn platform(&self) -> Platform {
        Platform::AwsS3
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<u64, ObjectStoreError> {
        let source = request.source(Platform::AwsS3);
        let bucket = request
            .bucket
            .as_deref()
            .ok_or_else(|| ObjectStoreError::Client(format!("{source}: no bucket specified")))?;

        let client = self.client(request.profile_name.as_deref()).await;
        let mut output = client
            .get_object()
            .bucket(bucket)
            .key(&request.object_path)
            .send()
            .await
            .map_err(|e| map_get_object_error(e, &source))?;

        let local_path = request.local_path.as_path();
        let mut file = File::create(local_path).await.map_err(|e| {
            ObjectStoreError::Io(format!("{}: {e}", local_path.display()))
        })?;

        let written = match copy_body(&mut output.body, &mut file, &source, local_path).await {
            Ok(written) => written,
            Err(err) => {
                drop(file);
                return Err(discard_partial(local_path, err).await);
            }
        };

        debug!(source = %source, bytes = written, "Downloaded s3 object");
        Ok(written)
    }
}
