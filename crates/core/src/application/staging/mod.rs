// Staging - fetch, concatenate and checksum input files for a cycle

pub mod checksum;
pub mod fetch;

pub use checksum::HashLevel;
pub use fetch::{Fetch, FetchSummary, PlannedTransfer};

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::application::error::StagingError;
use crate::application::fileio;
use crate::domain::{build_timestamps, template, Cycle, Environment, FileId, Options};
use crate::port::{FetchRequest, ObjectStore, ObjectStoreError};

/// Where (and how) to record checksum hash indices of fetched files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumTarget {
    pub filepath: PathBuf,
    pub level: HashLevel,
}

/// Result of fetching every timestamp of one file identifier
#[derive(Debug, Clone, Default)]
pub struct FileIdOutcome {
    /// Local paths in timestamp order
    pub fetched: Vec<PathBuf>,
    pub skipped: usize,
    pub bytes: u64,
}

/// Staging base: validated cycle plus the parsed experiment configuration
#[derive(Debug, Clone)]
pub struct Staging {
    pub cycle: Cycle,
    pub yaml_file: PathBuf,
    pub yaml: serde_yaml::Value,
    /// Template context (`CYCLE`)
    pub env: Environment,
}

impl Staging {
    const MANDATORY_OPTIONS: [&'static str; 2] = ["cycle", "yaml_file"];

    /// Validate the options and read the experiment configuration
    ///
    /// # Errors
    /// - StagingError::MissingOption if `cycle` or `yaml_file` is absent
    /// - StagingError::Domain if the cycle is not `%Y%m%d%H%M%S`
    /// - StagingError::MissingConfig if the YAML file does not exist
    pub fn new(options: &Options) -> Result<Self, StagingError> {
        for name in Self::MANDATORY_OPTIONS {
            options
                .require(name)
                .map_err(|_| StagingError::MissingOption(name.to_string()))?;
        }

        let cycle = Cycle::parse(&options.require("cycle")?)?;
        let yaml_file = PathBuf::from(options.require("yaml_file")?);
        if !yaml_file.is_file() {
            return Err(StagingError::MissingConfig(yaml_file));
        }

        let yaml = fileio::read_yaml(&yaml_file)?;

        let mut env = Environment::new();
        env.set("CYCLE", cycle.to_string());

        Ok(Self {
            cycle,
            yaml_file,
            yaml,
            env,
        })
    }

    /// Times to stage for `fileid`
    pub fn timestamps_for(&self, fileid: &FileId) -> Result<Vec<Cycle>, StagingError> {
        build_timestamps(&self.cycle, &fileid.schedule, &fileid.window).map_err(|e| {
            StagingError::InvalidFileId {
                fileid: fileid.name.clone(),
                reason: e.to_string(),
            }
        })
    }

    /// Render the remote and local paths of `fileid` at `at`
    pub fn render_request(
        &self,
        fileid: &FileId,
        at: &Cycle,
    ) -> Result<FetchRequest, StagingError> {
        Ok(FetchRequest {
            bucket: fileid.bucket.clone(),
            object_path: template::render(&fileid.object_path, at, &self.env)?,
            local_path: PathBuf::from(template::render(&fileid.local_path, at, &self.env)?),
            profile_name: fileid.profile_name.clone(),
        })
    }

    /// Fetch every timestamp of `fileid` from `store`.
    ///
    /// Missing objects abort the run unless the file identifier sets
    /// `ignore_missing`. When `checksum` is given the hash index of each
    /// fetched file is logged and appended to the checksum file.
    pub async fn fetch_fileid(
        &self,
        store: &dyn ObjectStore,
        fileid: &FileId,
        checksum: Option<&ChecksumTarget>,
    ) -> Result<FileIdOutcome, StagingError> {
        let timestamps = self.timestamps_for(fileid)?;
        if timestamps.is_empty() {
            warn!(
                fileid = %fileid.name,
                "No valid timestamps for file identifier; nothing to fetch"
            );
        }

        let mut outcome = FileIdOutcome::default();
        for at in &timestamps {
            let request = self.render_request(fileid, at)?;
            if let Some(parent) = request.local_path.parent() {
                fileio::build_dirpath_tree(parent)?;
            }

            let source = request.source(store.platform());
            match store.fetch(&request).await {
                Ok(bytes) => {
                    info!(
                        fileid = %fileid.name,
                        source = %source,
                        local_path = %request.local_path.display(),
                        bytes,
                        "Fetched file"
                    );
                    outcome.bytes += bytes;
                }
                Err(ObjectStoreError::NotFound(_)) if fileid.ignore_missing => {
                    warn!(
                        fileid = %fileid.name,
                        source = %source,
                        "Remote file does not exist; skipping"
                    );
                    outcome.skipped += 1;
                    continue;
                }
                Err(error) => {
                    return Err(StagingError::Fetch {
                        source_path: source,
                        error,
                    })
                }
            }

            if let Some(target) = checksum {
                let hash_index = checksum::hash_file(&request.local_path, target.level)?;
                info!(
                    local_path = %request.local_path.display(),
                    hash_index = %hash_index,
                    "Computed hash index"
                );
                checksum::write_fetch_checksum(&target.filepath, &request.local_path, &hash_index)?;
            }

            outcome.fetched.push(request.local_path);
        }

        Ok(outcome)
    }

    /// Concatenate the fetched files of `fileid` when it names a `concat_path`
    pub fn concat_filepath(
        &self,
        fileid: &FileId,
        fetched: &[PathBuf],
    ) -> Result<Option<PathBuf>, StagingError> {
        let Some(concat_template) = &fileid.concat_path else {
            return Ok(None);
        };

        let output = PathBuf::from(template::render(concat_template, &self.cycle, &self.env)?);
        if fetched.is_empty() {
            warn!(
                fileid = %fileid.name,
                output = %output.display(),
                "No files were fetched; skipping concatenation"
            );
            return Ok(None);
        }

        fileio::concatenate(fetched, &output)?;
        Ok(Some(output))
    }

    pub fn yaml_file(&self) -> &Path {
        &self.yaml_file
    }
}
