//! Driver settings
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! YAML settings file, then `UFSDA__*` environment variables
//! (e.g. `UFSDA__S3__REGION`, `UFSDA__HPSS__TIMEOUT_SECS`).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

use ufsda_infra_s3::S3Settings;
use ufsda_infra_system::HpssSettings;

use crate::telemetry::LogFormat;

const ENV_PREFIX: &str = "UFSDA";
const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub log_format: LogFormat,
    /// Directory for daily-rolled JSON log files
    pub log_dir: Option<PathBuf>,
    pub s3: S3Settings,
    pub hpss: HpssSettings,
}

impl Settings {
    /// Load the settings, reading `path` when given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Yaml).required(true));
        }

        let settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()
            .context("Failed to load settings")?
            .try_deserialize::<Settings>()
            .context("Invalid settings")?;

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let settings = Settings::load(None).unwrap();
        assert_eq!(settings.s3.region, "us-east-1");
        assert_eq!(settings.hpss.command, "hsi");
        assert!(settings.hpss.env_allowlist.contains(&"PATH".to_string()));
    }

    #[test]
    fn test_yaml_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ufsda.yaml");
        std::fs::write(
            &path,
            "log_format: json\n\
             s3:\n  region: us-west-2\n  anonymous: true\n\
             hpss:\n  timeout_secs: 60\n",
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.log_format, LogFormat::Json);
        assert_eq!(settings.s3.region, "us-west-2");
        assert!(settings.s3.anonymous);
        assert_eq!(settings.hpss.timeout_secs, 60);
        assert_eq!(settings.hpss.command, "hsi");
    }

    #[test]
    fn test_missing_file_fails() {
        let result = Settings::load(Some(Path::new("/nonexistent/ufsda.yaml")));
        assert!(result.is_err());
    }
}
