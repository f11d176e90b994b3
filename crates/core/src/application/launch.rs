// Launch - per-cycle experiment directory tree and configuration snapshot

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::application::error::LaunchError;
use crate::application::fileio;
use crate::application::task::WorkflowTask;
use crate::domain::{Cycle, Environment, Options};
use crate::error::Result;

const MANDATORY_OPTIONS: [&str; 4] = ["cycle", "expt_name", "work_path", "yaml_file"];

/// Launch attributes recorded in `configs/launch.yaml`
#[derive(Debug, Clone, Serialize)]
struct LaunchRecord<'a> {
    cycle: String,
    expt_name: &'a str,
    work_path: &'a Path,
    expt_path: &'a Path,
    dirpath: &'a Path,
    yaml_file: &'a Path,
    task_id: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct Launch {
    pub cycle: Cycle,
    pub expt_name: String,
    pub work_path: PathBuf,
    pub yaml_file: PathBuf,
    pub task_id: Option<String>,
}

impl Launch {
    /// Validate the launch options
    ///
    /// # Errors
    /// - LaunchError::MissingOption for `cycle`, `expt_name`, `work_path` or `yaml_file`
    /// - LaunchError::Domain if the cycle is not `%Y%m%d%H%M%S`
    /// - LaunchError::MissingConfig if the YAML file does not exist
    pub fn new(options: &Options, task_id: Option<&str>) -> std::result::Result<Self, LaunchError> {
        for name in MANDATORY_OPTIONS {
            options
                .require(name)
                .map_err(|_| LaunchError::MissingOption(name.to_string()))?;
        }

        let cycle = Cycle::parse(&options.require("cycle")?)?;
        let yaml_file = PathBuf::from(options.require("yaml_file")?);
        if !yaml_file.is_file() {
            return Err(LaunchError::MissingConfig(yaml_file));
        }

        Ok(Self {
            cycle,
            expt_name: options.require("expt_name")?,
            work_path: PathBuf::from(options.require("work_path")?),
            yaml_file,
            task_id: task_id.map(str::to_string),
        })
    }

    /// `<work_path>/<expt_name>`
    pub fn expt_path(&self) -> PathBuf {
        self.work_path.join(&self.expt_name)
    }

    /// `<work_path>/<expt_name>/<cycle>`
    pub fn dirpath(&self) -> PathBuf {
        self.expt_path().join(self.cycle.to_string())
    }

    pub fn configs_path(&self) -> PathBuf {
        self.dirpath().join("configs")
    }

    /// Create the cycle directory tree
    pub fn build_dirpath(&self) -> std::result::Result<(), LaunchError> {
        fileio::build_dirpath_tree(&self.dirpath())?;
        fileio::build_dirpath_tree(&self.configs_path())?;
        Ok(())
    }

    /// Snapshot the experiment configuration and record the launch attributes
    pub fn build_configs(&self) -> std::result::Result<(), LaunchError> {
        let configs = self.configs_path();
        let file_name = self
            .yaml_file
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("experiment.yaml"));
        fileio::copy_file(&self.yaml_file, &configs.join(file_name))?;

        let expt_path = self.expt_path();
        let dirpath = self.dirpath();
        let record = LaunchRecord {
            cycle: self.cycle.to_string(),
            expt_name: &self.expt_name,
            work_path: &self.work_path,
            expt_path: &expt_path,
            dirpath: &dirpath,
            yaml_file: &self.yaml_file,
            task_id: self.task_id.as_deref(),
        };
        fileio::write_yaml(&configs.join("launch.yaml"), &record)?;
        fileio::write_text(&configs.join("launch.env"), &self.environment().to_shell())?;

        info!(
            dirpath = %dirpath.display(),
            expt_name = %self.expt_name,
            cycle = %self.cycle,
            "Experiment configuration staged"
        );
        Ok(())
    }

    /// Variables describing the launch for downstream tasks
    pub fn environment(&self) -> Environment {
        let mut env = Environment::new();
        env.set("CYCLE", self.cycle.to_string());
        env.set("EXPT_NAME", self.expt_name.clone());
        env.set("EXPT_PATH", self.expt_path().display().to_string());
        env.set("WORK_PATH", self.work_path.display().to_string());
        env.set("DATAROOT", self.dirpath().display().to_string());
        if let Some(task_id) = &self.task_id {
            env.set("TASK_ID", task_id.clone());
        }
        env
    }
}

#[async_trait]
impl WorkflowTask for Launch {
    type Output = PathBuf;

    async fn execute(&mut self) -> Result<PathBuf> {
        self.build_dirpath()?;
        self.build_configs()?;
        Ok(self.dirpath())
    }
}
