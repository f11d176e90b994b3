// Task base - experiment configuration plus the workflow runtime cycle

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use tracing::{info, warn};

use crate::application::error::TaskError;
use crate::application::fileio;
use crate::domain::{check_format, Cycle};
use crate::error::Result;
use crate::port::EnvSource;

/// Lifecycle shared by every workflow application.
///
/// `run` drives initialize → execute → finalize; implementors override
/// the steps they need.
#[async_trait]
pub trait WorkflowTask: Send {
    type Output: Send;

    async fn initialize(&mut self) -> Result<()> {
        Ok(())
    }

    async fn execute(&mut self) -> Result<Self::Output>;

    async fn finalize(&mut self) -> Result<()> {
        Ok(())
    }

    async fn run(&mut self) -> Result<Self::Output> {
        self.initialize().await?;
        let output = self.execute().await?;
        self.finalize().await?;
        Ok(output)
    }
}

/// Runtime variables required from the workflow manager, with their formats
const MANDATORY_RUNTIME_VARS: [(&str, &str); 2] = [("PDY", "%Y%m%d"), ("cyc", "%H")];

/// Previous and next cycles of a cycling experiment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CyclingTimes {
    pub ptime: Cycle,
    pub ntime: Cycle,
}

/// Experiment configuration validated against the runtime environment
#[derive(Debug, Clone)]
pub struct Task {
    pub yaml_file: PathBuf,
    pub config: Mapping,
    pub pdy: String,
    pub cyc: String,
    pub cycle: Cycle,
    pub cycling: Option<CyclingTimes>,
}

impl Task {
    /// Create a new task
    ///
    /// # Arguments
    /// * `yaml_file` - Experiment configuration
    /// * `env` - Runtime environment providing `PDY` and `cyc`
    /// * `attrs` - Attributes that override keys of the configuration
    ///
    /// # Errors
    /// - TaskError::MissingConfig if the configuration file does not exist
    /// - TaskError::MissingRuntimeVariable / InvalidRuntimeVariable for `PDY` and `cyc`
    /// - TaskError::MissingCyclingInterval if `cycling` is set without an interval
    /// - TaskError::Domain if the interval moves the cycle off the calendar
    pub fn new(
        yaml_file: &Path,
        env: &dyn EnvSource,
        attrs: Mapping,
    ) -> std::result::Result<Self, TaskError> {
        if !yaml_file.is_file() {
            return Err(TaskError::MissingConfig(yaml_file.to_path_buf()));
        }

        let mut config = match fileio::read_yaml(yaml_file)? {
            Value::Mapping(mapping) => mapping,
            Value::Null => Mapping::new(),
            _ => return Err(TaskError::NotAMapping(yaml_file.to_path_buf())),
        };
        for (key, value) in attrs {
            config.insert(key, value);
        }

        let mut runtime = Vec::with_capacity(MANDATORY_RUNTIME_VARS.len());
        for (name, format) in MANDATORY_RUNTIME_VARS {
            let value = env
                .var(name)
                .ok_or_else(|| TaskError::MissingRuntimeVariable(name.to_string()))?;
            check_format(&value, format).map_err(|source| TaskError::InvalidRuntimeVariable {
                name: name.to_string(),
                source,
            })?;
            config.insert(Value::from(name), Value::from(value.clone()));
            runtime.push(value);
        }

        let (pdy, cyc) = (runtime[0].clone(), runtime[1].clone());
        let cycle = Cycle::from_pdy_cyc(&pdy, &cyc).map_err(|source| {
            TaskError::InvalidRuntimeVariable {
                name: "PDY/cyc".to_string(),
                source,
            }
        })?;

        let cycling = define_cycle_timestamps(yaml_file, &config, &cycle)?;
        if let Some(times) = &cycling {
            config.insert(Value::from("ptime"), Value::from(times.ptime.to_string()));
            config.insert(Value::from("ntime"), Value::from(times.ntime.to_string()));
        }

        info!(cycle = %cycle, cycling = cycling.is_some(), "Task configuration loaded");

        Ok(Self {
            yaml_file: yaml_file.to_path_buf(),
            config,
            pdy,
            cyc,
            cycle,
            cycling,
        })
    }

    /// Configuration attribute by key
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.config.get(key)
    }

    /// `KEY=value` lines describing the cycle, for `eval` in job scripts
    pub fn describe(&self) -> Vec<(String, String)> {
        let mut lines = vec![
            ("PDY".to_string(), self.pdy.clone()),
            ("cyc".to_string(), self.cyc.clone()),
            ("CYCLE".to_string(), self.cycle.to_string()),
        ];
        if let Some(times) = &self.cycling {
            lines.push(("PTIME".to_string(), times.ptime.to_string()));
            lines.push(("NTIME".to_string(), times.ntime.to_string()));
        }
        lines
    }
}

fn define_cycle_timestamps(
    yaml_file: &Path,
    config: &Mapping,
    cycle: &Cycle,
) -> std::result::Result<Option<CyclingTimes>, TaskError> {
    let Some(cycling) = config.get("cycling") else {
        warn!(
            yaml_file = %yaml_file.display(),
            "The experiment configuration does not specify cycling; cycling will not be supported"
        );
        return Ok(None);
    };

    if !cycling.as_bool().unwrap_or(false) {
        info!("Cycling disabled by the experiment configuration");
        return Ok(None);
    }

    let interval = config
        .get("cycling_interval_seconds")
        .and_then(Value::as_i64)
        .filter(|seconds| *seconds > 0)
        .ok_or_else(|| TaskError::MissingCyclingInterval(yaml_file.to_path_buf()))?;

    Ok(Some(CyclingTimes {
        ptime: cycle.offset(-interval)?,
        ntime: cycle.offset(interval)?,
    }))
}
