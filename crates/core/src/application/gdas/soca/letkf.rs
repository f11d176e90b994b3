// SOCA global LETKF

use std::path::PathBuf;

use async_trait::async_trait;
use serde_yaml::Value;
use tracing::info;

use super::{Soca, SocaOutcome};
use crate::application::error::SocaError;
use crate::application::task::WorkflowTask;
use crate::domain::Options;
use crate::error::Result;

pub const APP_TYPE: &str = "global_letkf";
pub const TASK_ID: &str = "global_soca_letkf";

/// Global LETKF analysis preparation
#[derive(Debug)]
pub struct GlobalLetkf {
    soca: Soca,
}

impl GlobalLetkf {
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

    fn ensemble_size(&self) -> std::result::Result<u32, SocaError> {
        match &self.soca.config.ensemble {
            Some(ensemble) if ensemble.size > 0 => Ok(ensemble.size),
            Some(_) => Err(SocaError::InvalidConfig(
                "ensemble size must be positive".to_string(),
            )),
            None => Err(SocaError::MissingAttribute("ensemble".to_string())),
        }
    }

    fn defaults(
        &self,
        ensemble_size: u32,
    ) -> std::result::Result<Vec<(&'static str, Value)>, SocaError> {
        Ok(vec![
            ("atm_window_begin", Value::from(self.soca.window_begin()?.to_iso())),
            (
                "atm_window_length",
                Value::from(format!("PT{}S", self.soca.config.analysis_interval_seconds)),
            ),
            ("ensemble_size", Value::from(ensemble_size)),
        ])
    }

    /// Prepare the task directory, link the ensemble and render the LETKF configuration
    pub fn prepare(&mut self) -> std::result::Result<SocaOutcome, SocaError> {
        self.soca
            .check_mandvars(&["analysis_variables", "state_variables", "ensemble"])?;
        let ensemble_size = self.ensemble_size()?;

        let soca = &self.soca;
        soca.build_dirtree(Some(ensemble_size))?;

        let fixed_yaml = soca.render_path(&soca.config.fixed_file_config)?;
        let fixed_files = soca.link_fixedfiles(&fixed_yaml, false)?;

        let bkgrds_yaml = soca.dirpath.join("soca_backgrounds.yaml");
        let backgrounds = soca.build_bkgrds_fgat(&bkgrds_yaml)?;

        let obs_yaml = soca.render_path(&soca.config.obs_config)?;
        let observations_yaml = soca.dirpath.join("soca_observations.yaml");
        let observations = soca.build_obs(&obs_yaml, &observations_yaml)?;

        let ensemble_yaml = self.soca.dirpath.join("soca_ensemble.yaml");
        self.soca.build_ensemble(&ensemble_yaml)?;
        self.soca.build_config_files()?;

        let env = &mut self.soca.env;
        env.set("SOCA_BKGRDS_YAML", bkgrds_yaml.display().to_string());
        env.set("SOCA_OBSERVATIONS_YAML", observations_yaml.display().to_string());
        env.set("SOCA_ENSEMBLE_YAML", ensemble_yaml.display().to_string());
        let defaults = self.defaults(ensemble_size)?;
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
impl WorkflowTask for GlobalLetkf {
    type Output = SocaOutcome;

    async fn execute(&mut self) -> Result<SocaOutcome> {
        info!(
            cycle = %self.soca.cycle(),
            dirpath = %self.soca.dirpath.display(),
            "Preparing SOCA global LETKF"
        );
        Ok(self.prepare()?)
    }
}
