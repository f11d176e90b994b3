//! Fetch integration tests
//!
//! In-memory s3 store plus the HPSS adapter driving a stand-in `hsi`.

mod common;

use std::path::Path;
use std::sync::Arc;

use ufsda_core::application::{Fetch, WorkflowTask};
use ufsda_core::domain::Platform;
use ufsda_core::error::{AppError, StagingError};
use ufsda_core::port::object_store::mocks::MockObjectStore;
use ufsda_core::port::{ObjectStore, SystemTimeProvider, TimeProvider};

fn fetch_config(root: &Path) -> String {
    let r = root.display();
    format!(
        "\
fetch:
  checksum:
    aws_s3_filepath: {r}/stage/checksums.${{CYCLE}}.md5
  aws_s3:
    atmosphere:
      gfs_sfc:
        bucket: noaa-gfs-bdp-pds
        object_path: gfs.%Y%m%d/%H/atmos/gfs.t%Hz.sfcanl.nc
        local_path: {r}/stage/gfs.%Y%m%d%H.sfcanl.nc
    ocean:
      sst:
        bucket: noaa-obs
        object_path: sst/%Y/%m/%d/sst.%Y%m%d%H.txt
        local_path: {r}/stage/sst/sst.%Y%m%d%H.txt
        offset_start_seconds: -21600
        offset_stop_seconds: 0
        offset_interval_seconds: 10800
        concat_path: {r}/stage/sst.cat.%Y%m%d%H.txt
      adt:
        bucket: noaa-obs
        object_path: adt/adt.%Y%m%d%H.nc
        local_path: {r}/stage/adt.%Y%m%d%H.nc
        ignore_missing: true
        valid_start: '20220101000000'
  noaa_hpss:
    archives:
      gdas:
        bucket: {r}/hpss
        object_path: gdas.%Y%m%d_%H.tar
        local_path: {r}/stage/gdas.tar
"
    )
}

fn time_provider() -> Arc<dyn TimeProvider> {
    Arc::new(SystemTimeProvider)
}

fn s3_store() -> Arc<MockObjectStore> {
    let store = Arc::new(MockObjectStore::new(Platform::AwsS3));
    store.put(
        Some("noaa-gfs-bdp-pds"),
        "gfs.20230101/00/atmos/gfs.t00z.sfcanl.nc",
        "surface analysis",
    );
    store.put(Some("noaa-obs"), "sst/2022/12/31/sst.2022123118.txt", "18z\n");
    store.put(Some("noaa-obs"), "sst/2022/12/31/sst.2022123121.txt", "21z\n");
    store.put(Some("noaa-obs"), "sst/2023/01/01/sst.2023010100.txt", "00z\n");
    store
}

#[tokio::test]
async fn test_fetch_aws_s3_object_body() {
    let dir = tempfile::tempdir().unwrap();
    let yaml_file = common::experiment(dir.path(), &fetch_config(dir.path()));
    let mut options = common::options(dir.path(), yaml_file);
    options.platform = Some("aws_s3".to_string());

    let store = s3_store();
    let mut fetch = Fetch::new(
        &options,
        vec![store.clone() as Arc<dyn ObjectStore>],
        time_provider(),
    )
    .unwrap();

    let summary = fetch.run().await.unwrap();

    assert_eq!(summary.fetched, 4);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.concatenated, 1);

    let stage = dir.path().join("stage");
    assert_eq!(
        std::fs::read_to_string(stage.join("gfs.2023010100.sfcanl.nc")).unwrap(),
        "surface analysis"
    );
    assert_eq!(
        std::fs::read_to_string(stage.join("sst.cat.2023010100.txt")).unwrap(),
        "18z\n21z\n00z\n"
    );

    let checksums = std::fs::read_to_string(stage.join("checksums.20230101000000.md5")).unwrap();
    let first = checksums.lines().next().unwrap();
    let (hash, path) = first.split_once("  ").unwrap();
    assert_eq!(hash.len(), 32);
    assert!(path.ends_with("gfs.2023010100.sfcanl.nc"));
}

#[tokio::test]
async fn test_fetch_type_filter_limits_requests() {
    let dir = tempfile::tempdir().unwrap();
    let yaml_file = common::experiment(dir.path(), &fetch_config(dir.path()));
    let mut options = common::options(dir.path(), yaml_file);
    options.platform = Some("AWS_S3".to_string());
    options.fetch_type = Some("Atmosphere".to_string());

    let store = s3_store();
    let mut fetch = Fetch::new(
        &options,
        vec![store.clone() as Arc<dyn ObjectStore>],
        time_provider(),
    )
    .unwrap();

    let summary = fetch.run().await.unwrap();
    assert_eq!(summary.fetched, 1);
    assert_eq!(store.call_count(), 1);
    assert_eq!(
        store.requests()[0].object_path,
        "gfs.20230101/00/atmos/gfs.t00z.sfcanl.nc"
    );
}

#[tokio::test]
async fn test_missing_required_object_fails() {
    let dir = tempfile::tempdir().unwrap();
    let yaml_file = common::experiment(dir.path(), &fetch_config(dir.path()));
    let mut options = common::options(dir.path(), yaml_file);
    options.platform = Some("aws_s3".to_string());
    options.fileid = Some("gfs_sfc".to_string());

    let empty: Arc<dyn ObjectStore> = Arc::new(MockObjectStore::new(Platform::AwsS3));
    let mut fetch = Fetch::new(&options, vec![empty], time_provider()).unwrap();

    match fetch.run().await {
        Err(AppError::Staging(StagingError::Fetch { source_path, .. })) => {
            assert_eq!(
                source_path,
                "s3://noaa-gfs-bdp-pds/gfs.20230101/00/atmos/gfs.t00z.sfcanl.nc"
            );
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[cfg(unix)]
#[tokio::test]
async fn test_fetch_noaa_hpss_with_transfer_client() {
    use std::os::unix::fs::PermissionsExt;
    use ufsda_infra_system::{HpssObjectStore, HpssSettings};

    let dir = tempfile::tempdir().unwrap();
    let yaml_file = common::experiment(dir.path(), &fetch_config(dir.path()));
    common::write(&dir.path().join("hpss/gdas.20230101_00.tar"), "tarball");

    let hsi = dir.path().join("bin/hsi");
    common::write(&hsi, "#!/bin/sh\ncp \"$4\" \"$2\"\n");
    std::fs::set_permissions(&hsi, std::fs::Permissions::from_mode(0o755)).unwrap();

    let hpss: Arc<dyn ObjectStore> = Arc::new(HpssObjectStore::new(
        HpssSettings {
            command: hsi.display().to_string(),
            timeout_secs: 30,
            ..HpssSettings::default()
        },
        time_provider(),
    ));

    let mut options = common::options(dir.path(), yaml_file);
    options.platform = Some("noaa_hpss".to_string());
    let mut fetch = Fetch::new(&options, vec![hpss], time_provider()).unwrap();

    let summary = fetch.run().await.unwrap();
    assert_eq!(summary.fetched, 1);
    assert_eq!(summary.bytes, 7);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("stage/gdas.tar")).unwrap(),
        "tarball"
    );
}
