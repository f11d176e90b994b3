// Scratch experiment used by the SOCA and GDAS tests

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::domain::Options;

const VAR3D_TEMPLATE: &str = "\
cost function:
  cost type: 3D-Var
  window begin: '${ATM_WINDOW_BEGIN}'
  window length: ${ATM_WINDOW_LENGTH}
  analysis variables: ${ANALYSIS_VARIABLES_YAML}
  background:
    state variables: ${STATE_VARIABLES_YAML}
    states: ${SOCA_BKGRDS_YAML}
  background error: ${SOCA_BERROR_YAML}
  observations: ${SOCA_OBSERVATIONS_YAML}
variational:
  iterations:
  - ninner: ${NINNER}
";

const LETKF_TEMPLATE: &str = "\
window begin: '${ATM_WINDOW_BEGIN}'
window length: ${ATM_WINDOW_LENGTH}
geometry:
  gridspec: ${SOCA_DIRPATH}/static/soca_gridspec.nc
background:
  members: ${SOCA_ENSEMBLE_YAML}
  size: ${ENSEMBLE_SIZE}
observations: ${SOCA_OBSERVATIONS_YAML}
";

/// Temporary experiment with backgrounds, ensemble members, fixed files,
/// observations and configuration templates for cycle 2023010100
pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        for stamp in ["2022123121", "2023010100", "2023010103"] {
            touch(&root.join(format!("bkg/ocn.{stamp}.nc")));
            touch(&root.join(format!("bkg/ice.{stamp}.nc")));
        }
        for member in ["001", "002"] {
            touch(&root.join(format!("ens/mem{member}/ocn.2023010100.nc")));
        }
        touch(&root.join("fix/grid.nc"));
        touch(&root.join("fix/layout.nml"));
        touch(&root.join("obs/sst.2023010100.nc4"));

        let r = root.display();
        write(
            &root.join("fixed.yaml"),
            &format!(
                "static/soca_gridspec.nc: {r}/fix/grid.nc\n\
                 static/layout.nml: {r}/fix/layout.nml\n"
            ),
        );
        write(
            &root.join("obs.yaml"),
            &format!(
                "\
sst:
  obs_path: {r}/obs/sst.%Y%m%d%H.nc4
  simulated_variables: [seaSurfaceTemperature]
  obs_operator:
    name: Identity
adt:
  obs_path: {r}/obs/adt.%Y%m%d%H.nc4
  simulated_variables: [absoluteDynamicTopography]
  obs_error:
    covariance model: diagonal
"
            ),
        );
        write(&root.join("templates/3dvar.yaml"), VAR3D_TEMPLATE);
        write(&root.join("templates/letkf.yaml"), LETKF_TEMPLATE);
        write(
            &root.join("templates/broken.yaml"),
            "window begin: ${UFSDA_TEST_SURELY_UNDEFINED_VAR}\n",
        );

        write(
            &root.join("expt.yaml"),
            &format!(
                "\
cycling: false
gdas:
  soca:
    global_3dvar:
      analysis_interval_seconds: 21600
      analysis_variables: [tocn, socn, ssh]
      state_variables: [tocn, socn, ssh, hocn]
      soca_config: {r}/templates/3dvar.yaml
      fixed_file_config: {r}/fixed.yaml
      obs_config: {r}/obs.yaml
      bkgrd:
        ocean_path: {r}/bkg/ocn.%Y%m%d%H.nc
        ice_path: {r}/bkg/ice.%Y%m%d%H.nc
      berror:
        covariance model: SABER
      ninner: 50
    global_letkf:
      analysis_interval_seconds: 21600
      analysis_variables: [tocn, socn]
      state_variables: [tocn, socn, hocn]
      soca_config: {r}/templates/letkf.yaml
      fixed_file_config: {r}/fixed.yaml
      obs_config: {r}/obs.yaml
      bkgrd:
        ocean_path: {r}/bkg/ocn.%Y%m%d%H.nc
      ensemble:
        size: 2
        ocean_path: {r}/ens/mem$MEMBER/ocn.%Y%m%d%H.nc
    broken_template:
      analysis_interval_seconds: 21600
      analysis_variables: [tocn]
      state_variables: [tocn]
      soca_config: {r}/templates/broken.yaml
      fixed_file_config: {r}/fixed.yaml
      obs_config: {r}/obs.yaml
      bkgrd:
        ocean_path: {r}/bkg/ocn.%Y%m%d%H.nc
"
            ),
        );

        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn yaml_file(&self) -> PathBuf {
        self.root().join("expt.yaml")
    }

    pub fn options(&self, app_type: &str) -> Options {
        Options {
            yaml_file: Some(self.yaml_file()),
            cycle: Some("20230101000000".to_string()),
            expt_name: Some("soca_test".to_string()),
            work_path: Some(self.root().join("work")),
            app: Some("soca".to_string()),
            app_type: Some(app_type.to_string()),
            ..Options::default()
        }
    }
}

fn touch(path: &Path) {
    write(path, "data\n");
}

fn write(path: &Path, text: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}
