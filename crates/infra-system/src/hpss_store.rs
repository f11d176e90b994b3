// HPSS ObjectStore implementation
// reason: tokio::process for the `hsi` transfer with a timeout and an env allowlist
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{info, warn};

use ufsda_core::domain::Platform;
use ufsda_core::port::{FetchRequest, ObjectStore, ObjectStoreError, TimeProvider};

/// Messages `hsi` prints when the archive path does not exist
const NOT_FOUND_MARKERS: [&str; 2] = ["No such file", "HPSS_ENOENT"];

/// HPSS transfer settings (`hpss:` section of the CLI settings)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HpssSettings {
    /// Transfer client executable
    pub command: String,
    pub timeout_secs: u64,
    /// Process environment variables passed through to the client
    pub env_allowlist: Vec<String>,
}

impl Default for HpssSettings {
    fn default() -> Self {
        Self {
            command: "hsi".to_string(),
            timeout_secs: 3600,
            env_allowlist: [
                "PATH",
                "HOME",
                "USER",
                "LOGNAME",
                "KRB5CCNAME",
                "HPSS_PRIMARY_AUTHN_MECH",
            ]
            .iter()
            .map(|name| name.to_string())
            .collect(),
        }
    }
}

/// HPSS object store
/// Spawns `<command> get <local> : <remote>` per request with environment allowlisting
pub struct HpssObjectStore {
    settings: HpssSettings,
    time_provider: Arc<dyn TimeProvider>,
}

impl HpssObjectStore {
    /// Create a new HPSS object store
    ///
    /// # Arguments
    /// * `settings` - Transfer client, timeout and allowed environment variables
    /// * `time_provider` - Time provider for duration tracking
    pub fn new(settings: HpssSettings, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            settings,
            time_provider,
        }
    }

    /// Filter environment variables to allowlist only
    fn filter_env(
        &self,
        env: impl IntoIterator<Item = (String, String)>,
    ) -> HashMap<String, String> {
        env.into_iter()
            .filter(|(k, _)| self.settings.env_allowlist.contains(k))
            .collect()
    }

    /// Archive path of the request (`bucket` is the base directory)
    fn remote_path(request: &FetchRequest) -> String {
        match &request.bucket {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), request.object_path),
            None => request.object_path.clone(),
        }
    }

    fn build_args(request: &FetchRequest) -> Vec<String> {
        vec![
            "get".to_string(),
            request.local_path.display().to_string(),
            ":".to_string(),
            Self::remote_path(request),
        ]
    }

    /// Spawn the transfer client and wait for output
    async fn spawn_and_wait(
        &self,
        args: &[String],
    ) -> Result<std::process::Output, ObjectStoreError> {
        let child = Command::new(&self.settings.command)
            .args(args)
            .env_clear()
            .envs(self.filter_env(std::env::vars()))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ObjectStoreError::Client(format!("spawning {} failed: {e}", self.settings.command))
            })?;

        match timeout(
            Duration::from_secs(self.settings.timeout_secs),
            child.wait_with_output(),
        )
        .await
        {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(ObjectStoreError::Io(e.to_string())),
            Err(_) => Err(ObjectStoreError::Timeout(self.settings.timeout_secs)),
        }
    }
}

#[async_trait]
impl ObjectStore for HpssObjectStore {
    fn platform(&self) -> Platform {
        Platform::NoaaHpss
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<u64, ObjectStoreError> {
        let source = request.source(Platform::NoaaHpss);
        let args = Self::build_args(request);
        let start_time = self.time_provider.now_millis();

        info!(
            command = %self.settings.command,
            args = ?args,
            timeout_secs = self.settings.timeout_secs,
            "Starting HPSS transfer"
        );

        let output = self.spawn_and_wait(&args).await?;
        let duration_ms = self.time_provider.now_millis() - start_time;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            warn!(
                source = %source,
                exit_code = ?output.status.code(),
                duration_ms,
                "HPSS transfer failed"
            );
            if NOT_FOUND_MARKERS.iter().any(|marker| stderr.contains(marker)) {
                return Err(ObjectStoreError::NotFound(source));
            }
            return Err(ObjectStoreError::Client(format!(
                "{source}: exit code {:?}: {}",
                output.status.code(),
                stderr.trim()
            )));
        }

        let bytes = tokio::fs::metadata(&request.local_path)
            .await
            .map_err(|e| ObjectStoreError::Io(format!("{}: {e}", request.local_path.display())))?
            .len();

        info!(source = %source, bytes, duration_ms, "HPSS transfer completed");
        Ok(bytes)
    }
}
