// Fetch Use Case
// Collects the files listed under the `fetch:` block of the experiment configuration

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use tracing::{info, warn};

use super::{ChecksumTarget, HashLevel, Staging};
use crate::application::error::StagingError;
use crate::application::task::WorkflowTask;
use crate::domain::{template, FileId, Options, Platform};
use crate::error::Result;
use crate::port::{ObjectStore, TimeProvider};

/// Key of the optional checksum block inside `fetch:`
const CHECKSUM_KEY: &str = "checksum";

/// `fetch_type -> fileid -> attributes` for one platform
pub type FetchTypes = BTreeMap<String, BTreeMap<String, FileId>>;

/// One transfer that `collect` would perform
#[derive(Debug, Clone, Serialize)]
pub struct PlannedTransfer {
    pub platform: Platform,
    pub fetch_type: String,
    pub fileid: String,
    pub timestamp: String,
    pub source: String,
    pub local_path: PathBuf,
}

/// Totals reported after a collection
#[derive(Debug, Clone, Default, Serialize)]
pub struct FetchSummary {
    pub fetched: usize,
    pub skipped: usize,
    pub concatenated: usize,
    pub bytes: u64,
    pub elapsed_ms: i64,
}

/// Fetch application
pub struct Fetch {
    staging: Staging,
    stores: HashMap<Platform, Arc<dyn ObjectStore>>,
    time_provider: Arc<dyn TimeProvider>,
    platform_opt: Option<String>,
    fetch_type_opt: Option<String>,
    fileid_opt: Option<String>,
    checksum: Mapping,
    fetch_dict: BTreeMap<Platform, FetchTypes>,
}

impl Fetch {
    /// Create a new fetch application
    ///
    /// # Arguments
    /// * `options` - Command-line options (`cycle`, `yaml_file` mandatory;
    ///   `platform`, `fetch_type`, `fileid` filter the collection)
    /// * `stores` - Object stores, one per platform
    /// * `time_provider` - Clock used for the elapsed time of the collection
    pub fn new(
        options: &Options,
        stores: Vec<Arc<dyn ObjectStore>>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> std::result::Result<Self, StagingError> {
        let staging = Staging::new(options)?;
        let stores = stores
            .into_iter()
            .map(|store| (store.platform(), store))
            .collect();

        Ok(Self {
            staging,
            stores,
            time_provider,
            platform_opt: options.platform.clone(),
            fetch_type_opt: options.fetch_type.clone(),
            fileid_opt: options.fileid.clone(),
            checksum: Mapping::new(),
            fetch_dict: BTreeMap::new(),
        })
    }

    pub fn staging(&self) -> &Staging {
        &self.staging
    }

    /// Parse the `fetch:` block and apply the platform / fetch type / file
    /// identifier filters.
    ///
    /// # Errors
    /// - StagingError::MissingFetchBlock if `fetch:` is absent
    /// - StagingError::UnsupportedPlatform for an unknown platform key, or a platform
    ///   filter naming a platform absent from `fetch:`
    /// - StagingError::UnknownFetchType / UnknownFileId if a filter matches nothing
    pub fn build_fetch_dict(&mut self) -> std::result::Result<(), StagingError> {
        let config = self
            .staging
            .yaml
            .get("fetch")
            .and_then(Value::as_mapping)
            .ok_or_else(|| StagingError::MissingFetchBlock(self.staging.yaml_file.clone()))?;

        let mut checksum = Mapping::new();
        let mut fetch_dict = BTreeMap::new();
        for (key, value) in config {
            let key = yaml_key(key);
            if key == CHECKSUM_KEY {
                checksum = value.as_mapping().cloned().unwrap_or_default();
                continue;
            }

            let platform: Platform = key
                .parse()
                .map_err(|_| StagingError::UnsupportedPlatform(key.clone()))?;
            fetch_dict.insert(platform, parse_fetch_types(&key, value)?);
        }

        self.fetch_dict = self.filter(fetch_dict)?;
        self.checksum = checksum;
        Ok(())
    }

    fn filter(
        &self,
        mut fetch_dict: BTreeMap<Platform, FetchTypes>,
    ) -> std::result::Result<BTreeMap<Platform, FetchTypes>, StagingError> {
        if let Some(platform_opt) = &self.platform_opt {
            let platform: Platform = platform_opt
                .parse()
                .map_err(|_| StagingError::UnsupportedPlatform(platform_opt.clone()))?;
            let fetch_types = fetch_dict
                .remove(&platform)
                .ok_or_else(|| StagingError::UnsupportedPlatform(platform.to_string()))?;
            fetch_dict = BTreeMap::from([(platform, fetch_types)]);
        }

        if let Some(fetch_type_opt) = &self.fetch_type_opt {
            warn!(fetch_type = %fetch_type_opt, "Collecting files for fetch type");
            for fetch_types in fetch_dict.values_mut() {
                fetch_types.retain(|name, _| name.eq_ignore_ascii_case(fetch_type_opt));
            }
            fetch_dict.retain(|_, fetch_types| !fetch_types.is_empty());

            if fetch_dict.is_empty() {
                return Err(StagingError::UnknownFetchType {
                    platform: self.platform_opt.clone().unwrap_or_else(|| "any".to_string()),
                    fetch_type: fetch_type_opt.clone(),
                });
            }
        }

        if let Some(fileid_opt) = &self.fileid_opt {
            for fetch_types in fetch_dict.values_mut() {
                for fileids in fetch_types.values_mut() {
                    fileids.retain(|name, _| name == fileid_opt);
                }
                fetch_types.retain(|_, fileids| !fileids.is_empty());
            }
            fetch_dict.retain(|_, fetch_types| !fetch_types.is_empty());

            if fetch_dict.is_empty() {
                return Err(StagingError::UnknownFileId(fileid_opt.clone()));
            }
        }

        Ok(fetch_dict)
    }

    /// Checksum settings for `platform` (`<platform>_filepath`, `<platform>_hash`)
    pub fn checksum_for(
        &self,
        platform: Platform,
    ) -> std::result::Result<Option<ChecksumTarget>, StagingError> {
        let filepath_key = format!("{platform}_filepath");
        let Some(filepath) = self.checksum.get(filepath_key.as_str()).and_then(Value::as_str) else {
            return Ok(None);
        };

        let hash_key = format!("{platform}_hash");
        let level = match self.checksum.get(hash_key.as_str()).and_then(Value::as_str) {
            Some(level) => level.parse::<HashLevel>()?,
            None => HashLevel::default(),
        };

        let filepath = template::render(filepath, &self.staging.cycle, &self.staging.env)?;
        Ok(Some(ChecksumTarget {
            filepath: PathBuf::from(filepath),
            level,
        }))
    }

    /// Every transfer the collection would perform, without fetching
    pub fn build_plan(&self) -> std::result::Result<Vec<PlannedTransfer>, StagingError> {
        let mut plan = Vec::new();
        for (platform, fetch_types) in &self.fetch_dict {
            for (fetch_type, fileids) in fetch_types {
                for (name, fileid) in fileids {
                    for at in self.staging.timestamps_for(fileid)? {
                        let request = self.staging.render_request(fileid, &at)?;
                        plan.push(PlannedTransfer {
                            platform: *platform,
                            fetch_type: fetch_type.clone(),
                            fileid: name.clone(),
                            timestamp: at.to_string(),
                            source: request.source(*platform),
                            local_path: request.local_path,
                        });
                    }
                }
            }
        }
        Ok(plan)
    }

    /// Collect every selected file identifier from its platform's store
    pub async fn collect(&self) -> std::result::Result<FetchSummary, StagingError> {
        let start_ms = self.time_provider.now_millis();
        let mut summary = FetchSummary::default();

        for (platform, fetch_types) in &self.fetch_dict {
            let store = self
                .stores
                .get(platform)
                .ok_or_else(|| StagingError::NoStoreForPlatform(platform.to_string()))?;
            let checksum = self.checksum_for(*platform)?;

            for (fetch_type, fileids) in fetch_types {
                info!(platform = %platform, fetch_type = %fetch_type, "Collecting fetch type");

                for fileid in fileids.values() {
                    let outcome = self
                        .staging
                        .fetch_fileid(store.as_ref(), fileid, checksum.as_ref())
                        .await?;

                    if self.staging.concat_filepath(fileid, &outcome.fetched)?.is_some() {
                        summary.concatenated += 1;
                    }

                    summary.fetched += outcome.fetched.len();
                    summary.skipped += outcome.skipped;
                    summary.bytes += outcome.bytes;
                }
            }
        }

        summary.elapsed_ms = self.time_provider.now_millis() - start_ms;
        info!(
            fetched = summary.fetched,
            skipped = summary.skipped,
            concatenated = summary.concatenated,
            bytes = summary.bytes,
            elapsed_ms = summary.elapsed_ms,
            "Fetch collection completed"
        );
        Ok(summary)
    }
}

#[async_trait]
impl WorkflowTask for Fetch {
    type Output = FetchSummary;

    async fn initialize(&mut self) -> Result<()> {
        self.build_fetch_dict()?;
        Ok(())
    }

    async fn execute(&mut self) -> Result<FetchSummary> {
        Ok(self.collect().await?)
    }
}

fn yaml_key(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

fn parse_fetch_types(
    platform: &str,
    value: &Value,
) -> std::result::Result<FetchTypes, StagingError> {
    let Some(mapping) = value.as_mapping() else {
        return Err(StagingError::InvalidFileId {
            fileid: platform.to_string(),
            reason: "platform block must map fetch types to file identifiers".to_string(),
        });
    };

    let mut fetch_types = FetchTypes::new();
    for (fetch_type, fileids) in mapping {
        let fetch_type = yaml_key(fetch_type);
        let Some(fileids) = fileids.as_mapping() else {
            return Err(StagingError::InvalidFileId {
                fileid: fetch_type,
                reason: "fetch type block must map file identifiers to attributes".to_string(),
            });
        };

        let mut parsed = BTreeMap::new();
        for (name, attrs) in fileids {
            let name = yaml_key(name);
            let fileid: FileId = serde_yaml::from_value(attrs.clone()).map_err(|e| {
                StagingError::InvalidFileId {
                    fileid: name.clone(),
                    reason: e.to_string(),
                }
            })?;
            parsed.insert(name.clone(), fileid.with_name(name));
        }
        fetch_types.insert(fetch_type, parsed);
    }

    Ok(fetch_types)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::object_store::mocks::MockObjectStore;
    use crate::port::time_provider::mocks::SteppingTimeProvider;
    use std::path::Path;
    use tempfile::{tempdir, TempDir};

    fn experiment(dir: &Path) -> PathBuf {
        let d = dir.display();
        let yaml_file = dir.join("expt.yaml");
        std::fs::write(
            &yaml_file,
            format!(
                "\
fetch:
  checksum:
    aws_s3_filepath: {d}/checksum.${{CYCLE}}.txt
    aws_s3_hash: sha256
  aws_s3:
    observations:
      sst:
        bucket: obs-bucket
        object_path: sst/%Y%m%d/sst.%H.nc
        local_path: {d}/obs/sst.%Y%m%d%H.nc
        offset_seconds: [-21600, 0]
        concat_path: {d}/obs/sst.cat.%Y%m%d%H.nc
      adt:
        bucket: obs-bucket
        object_path: adt/adt.%Y%m%d%H.nc
        local_path: {d}/obs/adt.%Y%m%d%H.nc
        ignore_missing: true
    backgrounds:
      ocn:
        bucket: bkg-bucket
        object_path: ocn/ocn.%Y%m%d%H.nc
        local_path: {d}/bkg/ocn.%Y%m%d%H.nc
        offset_start_seconds: 0
        offset_stop_seconds: 21600
        offset_interval_seconds: 10800
        valid_stop: '20000101030000'
  noaa_hpss:
    archives:
      gdas:
        bucket: /NCEPPROD/hpssprod
        object_path: gdas.%Y%m%d_%H.tar
        local_path: {d}/hpss/gdas.tar
"
            ),
        )
        .unwrap();
        yaml_file
    }

    fn options(dir: &TempDir) -> Options {
        Options {
            cycle: Some("20000101000000".to_string()),
            yaml_file: Some(experiment(dir.path())),
            ..Options::default()
        }
    }

    fn fetch(options: &Options, stores: Vec<Arc<dyn ObjectStore>>) -> Fetch {
        Fetch::new(options, stores, Arc::new(SteppingTimeProvider::new(0, 250))).unwrap()
    }

    #[test]
    fn test_build_plan_covers_every_platform() {
        let dir = tempdir().unwrap();
        let mut app = fetch(&options(&dir), Vec::new());
        app.build_fetch_dict().unwrap();

        let plan = app.build_plan().unwrap();
        let sources: Vec<&str> = plan.iter().map(|t| t.source.as_str()).collect();
        assert_eq!(
            sources,
            vec![
                "s3://bkg-bucket/ocn/ocn.2000010100.nc",
                "s3://bkg-bucket/ocn/ocn.2000010103.nc",
                "s3://obs-bucket/adt/adt.2000010100.nc",
                "s3://obs-bucket/sst/19991231/sst.18.nc",
                "s3://obs-bucket/sst/20000101/sst.00.nc",
                "hpss:/NCEPPROD/hpssprod/gdas.20000101_00.tar",
            ]
        );
    }

    #[test]
    fn test_platform_filter_is_case_insensitive() {
        let dir = tempdir().unwrap();
        let mut options = options(&dir);
        options.platform = Some("NOAA_HPSS".to_string());
        let mut app = fetch(&options, Vec::new());
        app.build_fetch_dict().unwrap();

        let plan = app.build_plan().unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].platform, Platform::NoaaHpss);
    }

    #[test]
    fn test_unknown_fetch_type() {
        let dir = tempdir().unwrap();
        let mut options = options(&dir);
        options.platform = Some("aws_s3".to_string());
        options.fetch_type = Some("archives".to_string());
        let mut app = fetch(&options, Vec::new());

        match app.build_fetch_dict() {
            Err(StagingError::UnknownFetchType { platform, fetch_type }) => {
                assert_eq!(platform, "aws_s3");
                assert_eq!(fetch_type, "archives");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_fileid_filter() {
        let dir = tempdir().unwrap();
        let mut options = options(&dir);
        options.fileid = Some("sst".to_string());
        let mut app = fetch(&options, Vec::new());
        app.build_fetch_dict().unwrap();
        assert_eq!(app.build_plan().unwrap().len(), 2);

        options.fileid = Some("ssh".to_string());
        let mut app = fetch(&options, Vec::new());
        assert!(matches!(
            app.build_fetch_dict(),
            Err(StagingError::UnknownFileId(name)) if name == "ssh"
        ));
    }

    #[test]
    fn test_unsupported_platform_key() {
        let dir = tempdir().unwrap();
        let yaml_file = dir.path().join("expt.yaml");
        std::fs::write(&yaml_file, "fetch:\n  gcs:\n    obs: {}\n").unwrap();
        let options = Options {
            cycle: Some("20000101000000".to_string()),
            yaml_file: Some(yaml_file),
            ..Options::default()
        };
        let mut app = fetch(&options, Vec::new());
        assert!(matches!(
            app.build_fetch_dict(),
            Err(StagingError::UnsupportedPlatform(key)) if key == "gcs"
        ));
    }

    #[test]
    fn test_platform_filter_without_fetch_block_entry() {
        let dir = tempdir().unwrap();
        let yaml_file = dir.path().join("expt.yaml");
        std::fs::write(
            &yaml_file,
            "fetch:\n  aws_s3:\n    obs:\n      sst:\n        \
             object_path: a.nc\n        local_path: /tmp/a.nc\n",
        )
        .unwrap();
        let options = Options {
            cycle: Some("20000101000000".to_string()),
            yaml_file: Some(yaml_file),
            platform: Some("noaa_hpss".to_string()),
            ..Options::default()
        };
        let mut app = fetch(&options, Vec::new());
        assert!(matches!(
            app.build_fetch_dict(),
            Err(StagingError::UnsupportedPlatform(name)) if name == "noaa_hpss"
        ));
    }

    #[test]
    fn test_missing_fetch_block() {
        let dir = tempdir().unwrap();
        let yaml_file = dir.path().join("expt.yaml");
        std::fs::write(&yaml_file, "cycling: false\n").unwrap();
        let options = Options {
            cycle: Some("20000101000000".to_string()),
            yaml_file: Some(yaml_file),
            ..Options::default()
        };
        let mut app = fetch(&options, Vec::new());
        assert!(matches!(
            app.build_fetch_dict(),
            Err(StagingError::MissingFetchBlock(_))
        ));
    }

    #[test]
    fn test_checksum_for_platform() {
        let dir = tempdir().unwrap();
        let mut app = fetch(&options(&dir), Vec::new());
        app.build_fetch_dict().unwrap();

        let target = app.checksum_for(Platform::AwsS3).unwrap().unwrap();
        assert_eq!(target.level, HashLevel::Sha256);
        assert!(target.filepath.ends_with("checksum.20000101000000.txt"));
        assert!(app.checksum_for(Platform::NoaaHpss).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_run_collects_from_stores() {
        let dir = tempdir().unwrap();
        let mut options = options(&dir);
        options.platform = Some("aws_s3".to_string());

        let s3 = Arc::new(MockObjectStore::new(Platform::AwsS3));
        s3.put(Some("obs-bucket"), "sst/19991231/sst.18.nc", "a\n");
        s3.put(Some("obs-bucket"), "sst/20000101/sst.00.nc", "b\n");
        s3.put(Some("bkg-bucket"), "ocn/ocn.2000010100.nc", "ocn0");
        s3.put(Some("bkg-bucket"), "ocn/ocn.2000010103.nc", "ocn3");

        let mut app = fetch(&options, vec![s3.clone() as Arc<dyn ObjectStore>]);
        let summary = app.run().await.unwrap();

        assert_eq!(summary.fetched, 4);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.concatenated, 1);
        assert_eq!(summary.bytes, 12);
        assert_eq!(summary.elapsed_ms, 250);
        assert_eq!(s3.call_count(), 5);

        let concat = dir.path().join("obs/sst.cat.2000010100.nc");
        assert_eq!(std::fs::read_to_string(concat).unwrap(), "a\nb\n");

        let checksums =
            std::fs::read_to_string(dir.path().join("checksum.20000101000000.txt")).unwrap();
        assert_eq!(checksums.lines().count(), 4);
    }

    #[tokio::test]
    async fn test_missing_store_for_platform() {
        let dir = tempdir().unwrap();
        let mut options = options(&dir);
        options.platform = Some("noaa_hpss".to_string());

        let s3: Arc<dyn ObjectStore> = Arc::new(MockObjectStore::new(Platform::AwsS3));
        let mut app = fetch(&options, vec![s3]);
        app.build_fetch_dict().unwrap();

        assert!(matches!(
            app.collect().await,
            Err(StagingError::NoStoreForPlatform(_))
        ));
    }
}
