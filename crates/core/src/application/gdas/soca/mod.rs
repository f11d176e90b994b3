// SOCA - Sea-ice and Ocean Coupled Analysis applications
//
// The base prepares everything the SOCA executables expect in the task
// directory: fixed files, FGAT backgrounds, observations and the rendered
// YAML configuration. Application types add their own pieces on top.

pub mod letkf;
pub mod var3d;

pub use letkf::GlobalLetkf;
pub use var3d::Global3dvar;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use tracing::{info, warn};

use crate::application::error::SocaError;
use crate::application::fileio;
use crate::application::launch::Launch;
use crate::domain::{
    build_timestamps, template, Cycle, Environment, OffsetSchedule, Options, StreamWindow,
};

type Result<T> = std::result::Result<T, SocaError>;

/// Sub-directories of every SOCA task directory
const DIRTREE: [&str; 4] = ["bkg", "obs", "diags", "static"];

/// Background forecast templates
#[derive(Debug, Clone, Deserialize)]
pub struct BackgroundConfig {
    pub ocean_path: String,
    #[serde(default)]
    pub ice_path: Option<String>,
    /// FGAT step; defaults to half the analysis interval
    #[serde(default)]
    pub interval_seconds: Option<i64>,
}

/// Ensemble member templates (`$MEMBER` expands to `001`, `002`, ...)
#[derive(Debug, Clone, Deserialize)]
pub struct EnsembleConfig {
    pub size: u32,
    pub ocean_path: String,
    #[serde(default)]
    pub ice_path: Option<String>,
}

/// `gdas.soca.<app_type>` block of the experiment configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SocaConfig {
    pub analysis_interval_seconds: i64,
    #[serde(default)]
    pub analysis_variables: Value,
    #[serde(default)]
    pub state_variables: Value,
    /// Template for the executable's YAML configuration
    pub soca_config: String,
    pub fixed_file_config: String,
    pub obs_config: String,
    pub bkgrd: BackgroundConfig,
    #[serde(default)]
    pub berror: Value,
    #[serde(default)]
    pub ensemble: Option<EnsembleConfig>,
    /// Any other key overrides the default environment attribute of the same name
    #[serde(flatten)]
    pub overrides: BTreeMap<String, Value>,
}

/// Observation type entry of the observation configuration file
#[derive(Debug, Clone, Deserialize)]
struct ObsConfig {
    obs_path: String,
    #[serde(default)]
    simulated_variables: Vec<String>,
    #[serde(default)]
    obs_operator: Option<Value>,
    #[serde(default)]
    obs_error: Option<Value>,
}

#[derive(Debug, Serialize)]
struct Engine {
    #[serde(rename = "type")]
    kind: &'static str,
    obsfile: PathBuf,
}

#[derive(Debug, Serialize)]
struct ObsData {
    engine: Engine,
}

#[derive(Debug, Serialize)]
struct ObsSpace {
    name: String,
    obsdatain: ObsData,
    obsdataout: ObsData,
    #[serde(rename = "simulated variables")]
    simulated_variables: Vec<String>,
}

#[derive(Debug, Serialize)]
struct Observer {
    #[serde(rename = "obs space")]
    obs_space: ObsSpace,
    #[serde(rename = "obs operator", skip_serializing_if = "Option::is_none")]
    obs_operator: Option<Value>,
    #[serde(rename = "obs error", skip_serializing_if = "Option::is_none")]
    obs_error: Option<Value>,
}

#[derive(Debug, Serialize)]
struct Observers {
    observers: Vec<Observer>,
}

/// One model state read by the SOCA executables
#[derive(Debug, Serialize)]
struct State {
    date: String,
    basename: String,
    ocn_filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    ice_filename: Option<String>,
    read_from_file: u8,
}

/// Summary of a prepared SOCA task directory
#[derive(Debug, Clone, Serialize)]
pub struct SocaOutcome {
    pub dirpath: PathBuf,
    pub config_yaml: PathBuf,
    pub fixed_files: usize,
    pub backgrounds: usize,
    pub observations: usize,
}

/// SOCA base
#[derive(Debug, Clone)]
pub struct Soca {
    pub launch: Launch,
    pub config: SocaConfig,
    pub app_type: String,
    pub dirpath: PathBuf,
    pub env: Environment,
}

impl Soca {
    /// Launch the task directory and read `gdas.soca.<app_type>`
    ///
    /// # Errors
    /// - SocaError::Launch if the launch options are invalid
    /// - SocaError::MissingConfig if the SOCA block is absent
    /// - SocaError::InvalidConfig if the SOCA block cannot be parsed
    pub fn new(options: &Options, app_type: &str, task_id: &str) -> Result<Self> {
        let launch = Launch::new(options, Some(task_id))?;
        launch.build_dirpath()?;
        launch.build_configs()?;

        let yaml = fileio::read_yaml(&launch.yaml_file)?;
        let block = yaml
            .get("gdas")
            .and_then(|gdas| gdas.get("soca"))
            .and_then(|soca| soca.get(app_type))
            .ok_or_else(|| SocaError::MissingConfig(app_type.to_string()))?;

        let config: SocaConfig = serde_yaml::from_value(block.clone())
            .map_err(|e| SocaError::InvalidConfig(e.to_string()))?;
        if config.analysis_interval_seconds <= 0 {
            return Err(SocaError::InvalidConfig(format!(
                "analysis_interval_seconds must be positive, got {}",
                config.analysis_interval_seconds
            )));
        }

        let dirpath = launch.dirpath().join("soca").join(task_id);
        let mut env = launch.environment();
        env.set("SOCA_DIRPATH", dirpath.display().to_string());

        Ok(Self {
            launch,
            config,
            app_type: app_type.to_string(),
            dirpath,
            env,
        })
    }

    pub fn cycle(&self) -> Cycle {
        self.launch.cycle
    }

    fn half_window(&self) -> i64 {
        self.config.analysis_interval_seconds / 2
    }

    pub fn window_begin(&self) -> Result<Cycle> {
        Ok(self.cycle().offset(-self.half_window())?)
    }

    pub fn window_end(&self) -> Result<Cycle> {
        Ok(self.cycle().offset(self.half_window())?)
    }

    /// Render a configuration path template at the analysis cycle
    pub fn render_path(&self, path_template: &str) -> Result<PathBuf> {
        Ok(PathBuf::from(template::render(path_template, &self.cycle(), &self.env)?))
    }

    /// Create the task directory tree; ensembles also get `ens/memNNN`
    pub fn build_dirtree(&self, ensemble_size: Option<u32>) -> Result<()> {
        fileio::build_dirpath_tree(&self.dirpath)?;
        for subdir in DIRTREE {
            fileio::build_dirpath_tree(&self.dirpath.join(subdir))?;
        }
        for member in 1..=ensemble_size.unwrap_or(0) {
            fileio::build_dirpath_tree(&self.member_path(member))?;
        }
        Ok(())
    }

    pub fn member_path(&self, member: u32) -> PathBuf {
        self.dirpath.join("ens").join(format!("mem{member:03}"))
    }

    /// Link the fixed files listed in `fixedfile_yaml` (`destination: source`)
    pub fn link_fixedfiles(&self, fixedfile_yaml: &Path, ignore_missing: bool) -> Result<usize> {
        let fixed = fileio::read_yaml(fixedfile_yaml)?;
        let Some(entries) = fixed.as_mapping() else {
            return Err(SocaError::InvalidConfig(format!(
                "fixed file configuration {} must map destinations to sources",
                fixedfile_yaml.display()
            )));
        };

        let mut linked = 0;
        for (dst, src) in entries {
            let (Some(dst), Some(src)) = (dst.as_str(), src.as_str()) else {
                return Err(SocaError::InvalidConfig(format!(
                    "fixed file entries in {} must be strings",
                    fixedfile_yaml.display()
                )));
            };

            let src = self.render_path(src)?;
            if !src.exists() {
                if ignore_missing {
                    warn!(src = %src.display(), "Fixed file does not exist; skipping");
                    continue;
                }
                return Err(SocaError::MissingFixedFile(src));
            }

            fileio::symlink_force(&src, &self.dirpath.join(dst))?;
            linked += 1;
        }

        info!(count = linked, dirpath = %self.dirpath.display(), "Linked fixed files");
        Ok(linked)
    }

    /// FGAT background times across the assimilation window
    pub fn fgat_times(&self) -> Result<Vec<Cycle>> {
        let half = self.half_window();
        let step = self.config.bkgrd.interval_seconds.unwrap_or(half).max(1);
        let schedule = OffsetSchedule::range(-half, half, step);
        Ok(build_timestamps(&self.cycle(), &schedule, &StreamWindow::default())?)
    }

    /// Link FGAT backgrounds into `bkg/` and describe them in `soca_fgat_file`
    pub fn build_bkgrds_fgat(&self, soca_fgat_file: &Path) -> Result<usize> {
        let bkgrd = &self.config.bkgrd;
        let basename = self.dirpath.join("bkg");

        let mut states = Vec::new();
        for at in self.fgat_times()? {
            let stamp = at.to_string();
            let ocn_filename = format!("ocn.bkg.{stamp}.nc");
            link_background(&bkgrd.ocean_path, &at, &self.env, &basename.join(&ocn_filename))?;

            let ice_filename = match &bkgrd.ice_path {
                Some(ice_path) => {
                    let ice_filename = format!("ice.bkg.{stamp}.nc");
                    link_background(ice_path, &at, &self.env, &basename.join(&ice_filename))?;
                    Some(ice_filename)
                }
                None => None,
            };

            states.push(State {
                date: at.to_iso(),
                basename: format!("{}/", basename.display()),
                ocn_filename,
                ice_filename,
                read_from_file: 1,
            });
        }

        let mut document = Mapping::new();
        document.insert(Value::from("states"), to_value(&states, soca_fgat_file)?);
        fileio::write_yaml(soca_fgat_file, &document)?;

        info!(count = states.len(), "Linked FGAT background files");
        Ok(states.len())
    }

    /// Link the ensemble member backgrounds into `ens/memNNN` and describe
    /// them in `soca_ens_file`
    pub fn build_ensemble(&self, soca_ens_file: &Path) -> Result<usize> {
        let ensemble = self
            .config
            .ensemble
            .as_ref()
            .ok_or_else(|| SocaError::MissingAttribute("ensemble".to_string()))?;
        let at = self.cycle();
        let stamp = at.to_string();

        let mut members = Vec::new();
        for member in 1..=ensemble.size {
            let mut env = self.env.clone();
            env.set("MEMBER", format!("{member:03}"));
            let basename = self.member_path(member);

            let ocn_filename = format!("ocn.bkg.{stamp}.nc");
            link_background(&ensemble.ocean_path, &at, &env, &basename.join(&ocn_filename))?;

            let ice_filename = match &ensemble.ice_path {
                Some(ice_path) => {
                    let ice_filename = format!("ice.bkg.{stamp}.nc");
                    link_background(ice_path, &at, &env, &basename.join(&ice_filename))?;
                    Some(ice_filename)
                }
                None => None,
            };

            members.push(State {
                date: at.to_iso(),
                basename: format!("{}/", basename.display()),
                ocn_filename,
                ice_filename,
                read_from_file: 1,
            });
        }

        let mut document = Mapping::new();
        document.insert(Value::from("members"), to_value(&members, soca_ens_file)?);
        fileio::write_yaml(soca_ens_file, &document)?;

        info!(size = ensemble.size, "Linked ensemble member backgrounds");
        Ok(members.len())
    }

    /// Link available observations into `obs/` and write the observer list
    pub fn build_obs(&self, obs_config_yaml: &Path, soca_obs_file: &Path) -> Result<usize> {
        let raw = fileio::read_yaml(obs_config_yaml)?;
        let obs_configs: BTreeMap<String, ObsConfig> = serde_yaml::from_value(raw)
            .map_err(|e| SocaError::InvalidConfig(format!("{}: {e}", obs_config_yaml.display())))?;

        let stamp = self.cycle().to_string();
        let mut observers = Vec::new();
        for (name, obs) in obs_configs {
            let src = self.render_path(&obs.obs_path)?;
            if !src.is_file() {
                warn!(
                    obs_type = %name,
                    path = %src.display(),
                    "Observation file does not exist; skipping"
                );
                continue;
            }

            let obsfile = self.dirpath.join("obs").join(format!("{name}.{stamp}.nc4"));
            fileio::symlink_force(&src, &obsfile)?;

            observers.push(Observer {
                obs_space: ObsSpace {
                    name: name.clone(),
                    obsdatain: ObsData {
                        engine: Engine { kind: "H5File", obsfile },
                    },
                    obsdataout: ObsData {
                        engine: Engine {
                            kind: "H5File",
                            obsfile: self.dirpath.join("diags").join(format!("{name}.{stamp}.nc4")),
                        },
                    },
                    simulated_variables: obs.simulated_variables,
                },
                obs_operator: obs.obs_operator,
                obs_error: obs.obs_error,
            });
        }

        let count = observers.len();
        fileio::write_yaml(soca_obs_file, &Observers { observers })?;
        info!(count, "Configured observations");
        Ok(count)
    }

    /// Configuration attribute by name (typed fields first, then overrides)
    pub fn attribute(&self, name: &str) -> Option<Value> {
        let value = match name {
            "analysis_variables" => self.config.analysis_variables.clone(),
            "state_variables" => self.config.state_variables.clone(),
            "berror" => self.config.berror.clone(),
            "ensemble" => match &self.config.ensemble {
                Some(_) => Value::Bool(true),
                None => Value::Null,
            },
            _ => self.config.overrides.get(name).cloned().unwrap_or(Value::Null),
        };
        (!value.is_null()).then_some(value)
    }

    /// Check that mandatory configuration attributes are present and non-null
    pub fn check_mandvars(&self, names: &[&str]) -> Result<()> {
        for name in names {
            if self.attribute(name).is_none() {
                return Err(SocaError::MissingAttribute(name.to_string()));
            }
        }
        Ok(())
    }

    /// Write `analysis_variables.yaml` and `state_variables.yaml`
    pub fn build_config_files(&mut self) -> Result<()> {
        let files = [
            ("analysis_variables", "ANALYSIS_VARIABLES_YAML"),
            ("state_variables", "STATE_VARIABLES_YAML"),
        ];
        for (name, env_key) in files {
            let value = self
                .attribute(name)
                .ok_or_else(|| SocaError::MissingAttribute(name.to_string()))?;
            let path = self.dirpath.join(format!("{name}.yaml"));
            fileio::write_yaml(&path, &value)?;
            self.env.set(env_key, path.display().to_string());
        }
        Ok(())
    }

    /// Export defaults (or their configured overrides) as upper-cased variables
    pub fn define_environment(&mut self, defaults: Vec<(&str, Value)>) -> Result<()> {
        for (key, default) in defaults {
            let value = self
                .config
                .overrides
                .get(key)
                .filter(|value| !value.is_null())
                .cloned()
                .unwrap_or(default);
            if value.is_null() {
                return Err(SocaError::MissingAttribute(key.to_string()));
            }
            self.env.set(key.to_uppercase(), scalar_string(&value));
        }

        // remaining scalar overrides are visible to the template as well
        for (key, value) in &self.config.overrides {
            let upper = key.to_uppercase();
            if self.env.get(&upper).is_none() && is_scalar(value) {
                self.env.set(upper, scalar_string(value));
            }
        }
        Ok(())
    }

    /// Expand the `soca_config` template with the task environment and write it
    pub fn render_config(&self, output: &Path) -> Result<()> {
        let template_path = self.render_path(&self.config.soca_config)?;
        let text = fileio::read_text(&template_path)?;

        let expanded = template::expand_vars(&text, &self.env).map_err(|e| SocaError::Render {
            path: template_path.clone(),
            reason: e.to_string(),
        })?;
        let rendered: Value = serde_yaml::from_str(&expanded).map_err(|e| SocaError::Render {
            path: template_path.clone(),
            reason: e.to_string(),
        })?;

        fileio::write_yaml(output, &rendered)?;
        fileio::write_text(&self.dirpath.join("soca.env"), &self.env.to_shell())?;

        info!(
            app_type = %self.app_type,
            output = %output.display(),
            "Rendered SOCA configuration"
        );
        Ok(())
    }
}

fn link_background(path_template: &str, at: &Cycle, env: &Environment, dst: &Path) -> Result<()> {
    let src = PathBuf::from(template::render(path_template, at, env)?);
    if !src.exists() {
        return Err(SocaError::MissingBackground(src));
    }
    fileio::symlink_force(&src, dst)?;
    Ok(())
}

fn to_value<T: Serialize>(value: &T, path: &Path) -> Result<Value> {
    serde_yaml::to_value(value).map_err(|source| {
        fileio::FileIoError::Yaml {
            path: path.to_path_buf(),
            source,
        }
        .into()
    })
}

fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

fn scalar_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
pub(crate) mod test_support;
