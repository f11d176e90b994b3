// SOCA global 3DVAR

use std::path::PathBuf;

use async_trait::async_trait;
use serde_yaml::Value;
use tracing::info;

use super::{Soca, SocaOutcome};
use crate::application::error::SocaError;
use crate::application::fileio;
use crate::application::task::WorkflowTask;
use crate::domain::Options;
use crate::error::Result;

pub const APP_TYPE: &str = "global_3dvar";
pub const TASK_ID: &str = "global_soca_3dvar";

const DEFAULT_NINNER: i64 = 100;

/// Global 3DVAR analysis preparation
#[derive(Debug)]
pub struct Global3dvar {
    soca: Soca,
}

impl Global3dvar {
    pub fn new(options: &Options) -> std::result::Result<Self, SocaError> {
        Ok(Self {
            soca: Soca::new(options, APP_TYPE, TASK_ID)?,
        })
    }

    pub fn soca(&self) -> &Soca {
        &self.soca
    }

    fn output(&self) -> PathBuf {
        self.soca.dirpath.join(format!("soca.{APP_TYPE}.yaml"))
    }

    /// Write the background error configuration
    fn berror_config(&mut self) -> std::result::Result<PathBuf, SocaError> {
        let berror = self
            .soca
            .attribute("berror")
            .ok_or_else(|| SocaError::MissingAttribute("berror".to_string()))?;
        if !berror.is_mapping() {
            return Err(SocaError::InvalidConfig(
                "berror must be a mapping of background error attributes".to_string(),
            ));
        }

        let path = self.soca.dirpath.join("soca_berror.yaml");
        fileio::write_yaml(&path, &berror)?;
        self.soca.env.set("SOCA_BERROR_YAML", path.display().to_string());
        Ok(path)
    }

    fn defaults(&self) -> std::result::Result<Vec<(&'static str, Value)>, SocaError> {
        Ok(vec![
            ("atm_window_begin", Value::from(self.soca.window_begin()?.to_iso())),
            (
                "atm_window_length",
                Value::from(format!("PT{}S", self.soca.config.analysis_interval_seconds)),
            ),
            ("ninner", Value::from(DEFAULT_NINNER)),
        ])
    }

    /// Prepare the task directory and render the 3DVAR configuration
    pub fn prepare(&mut self) -> std::result::Result<SocaOutcome, SocaError> {
        let soca = &self.soca;
        soca.build_dirtree(None)?;

        let fixed_yaml = soca.render_path(&soca.config.fixed_file_config)?;
        let fixed_files = soca.link_fixedfiles(&fixed_yaml, false)?;

        let bkgrds_yaml = soca.dirpath.join("soca_backgrounds.yaml");
        let backgrounds = soca.build_bkgrds_fgat(&bkgrds_yaml)?;

        let obs_yaml = soca.render_path(&soca.config.obs_config)?;
        let observations_yaml = soca.dirpath.join("soca_observations.yaml");
        let observations = soca.build_obs(&obs_yaml, &observations_yaml)?;

        self.soca
            .check_mandvars(&["analysis_variables", "state_variables", "berror"])?;
        self.soca.build_config_files()?;
        self.berror_config()?;

        self.soca.env.set("SOCA_BKGRDS_YAML", bkgrds_yaml.display().to_string());
        self.soca
            .env
            .set("SOCA_OBSERVATIONS_YAML", observations_yaml.display().to_string());
        let defaults = self.defaults()?;
        self.soca.define_environment(defaults)?;

        let config_yaml = self.output();
        self.soca.render_config(&config_yaml)?;

        Ok(SocaOutcome {
            dirpath: self.soca.dirpath.clone(),
            config_yaml,
            fixed_files,
            backgrounds,
            observations,
        })
    }
}

#[async_trait]
impl WorkflowTask for Global3dvar {
    type Output = SocaOutcome;

    async fn execute(&mut self) -> Result<SocaOutcome> {
        info!(
            cycle = %self.soca.cycle(),
            dirpath = %self.soca.dirpath.display(),
            "Preparing SOCA global 3DVAR"
        );
        Ok(self.prepare()?)
    }
}
