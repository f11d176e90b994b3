//! Shared helpers for the workflow integration tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use ufsda_core::domain::Options;

pub const CYCLE: &str = "20230101000000";

pub fn write(path: &Path, text: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

pub fn touch(path: &Path) {
    write(path, "data\n");
}

/// Experiment configuration under `root` with the given body
pub fn experiment(root: &Path, body: &str) -> PathBuf {
    let path = root.join("expt.yaml");
    write(&path, body);
    path
}

/// Options for an application run under `root/work`
pub fn options(root: &Path, yaml_file: PathBuf) -> Options {
    Options {
        yaml_file: Some(yaml_file),
        cycle: Some(CYCLE.to_string()),
        expt_name: Some("ufsda_it".to_string()),
        work_path: Some(root.join("work")),
        ..Options::default()
    }
}

/// Ocean model inputs for a 6-hour SOCA window around [`CYCLE`]
pub fn soca_inputs(root: &Path) -> String {
    for stamp in ["2022123121", "2023010100", "2023010103"] {
        touch(&root.join(format!("com/ocn.{stamp}.nc")));
    }
    for member in ["001", "002", "003"] {
        touch(&root.join(format!("com/enkf/mem{member}/ocn.2023010100.nc")));
        touch(&root.join(format!("com/enkf/mem{member}/ice.2023010100.nc")));
    }
    touch(&root.join("fix/soca_gridspec.nc"));
    touch(&root.join("obs/adt.2023010100.nc4"));
    touch(&root.join("obs/sst.2023010100.nc4"));

    let r = root.display();
    write(
        &root.join("fixed.yaml"),
        &format!("static/soca_gridspec.nc: {r}/fix/soca_gridspec.nc\n"),
    );
    write(
        &root.join("obs.yaml"),
        &format!(
            "\
adt:
  obs_path: {r}/obs/adt.%Y%m%d%H.nc4
  simulated_variables: [absoluteDynamicTopography]
icec:
  obs_path: {r}/obs/icec.%Y%m%d%H.nc4
  simulated_variables: [seaIceFraction]
sst:
  obs_path: {r}/obs/sst.%Y%m%d%H.nc4
  simulated_variables: [seaSurfaceTemperature]
"
        ),
    );
    write(
        &root.join("var3d.yaml"),
        "\
cost function:
  window begin: '${ATM_WINDOW_BEGIN}'
  window length: ${ATM_WINDOW_LENGTH}
  background error: ${SOCA_BERROR_YAML}
  observations: ${SOCA_OBSERVATIONS_YAML}
minimizer:
  ninner: ${NINNER}
",
    );
    write(
        &root.join("letkf.yaml"),
        "\
window begin: '${ATM_WINDOW_BEGIN}'
members: ${SOCA_ENSEMBLE_YAML}
ensemble size: ${ENSEMBLE_SIZE}
observations: ${SOCA_OBSERVATIONS_YAML}
",
    );

    format!(
        "\
cycling: true
cycling_interval_seconds: 21600
gdas:
  soca:
    global_3dvar:
      analysis_interval_seconds: 21600
      analysis_variables: [tocn, socn, ssh]
      state_variables: [tocn, socn, ssh, hocn]
      soca_config: {r}/var3d.yaml
      fixed_file_config: {r}/fixed.yaml
      obs_config: {r}/obs.yaml
      bkgrd:
        ocean_path: {r}/com/ocn.%Y%m%d%H.nc
      berror:
        covariance model: SABER
    global_letkf:
      analysis_interval_seconds: 21600
      analysis_variables: [tocn, socn]
      state_variables: [tocn, socn, hocn]
      soca_config: {r}/letkf.yaml
      fixed_file_config: {r}/fixed.yaml
      obs_config: {r}/obs.yaml
      bkgrd:
        ocean_path: {r}/com/ocn.%Y%m%d%H.nc
      ensemble:
        size: 3
        ocean_path: {r}/com/enkf/mem$MEMBER/ocn.%Y%m%d%H.nc
        ice_path: {r}/com/enkf/mem$MEMBER/ice.%Y%m%d%H.nc
"
    )
}
