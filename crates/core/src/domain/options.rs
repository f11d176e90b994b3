// Command-line options shared by the workflow applications

use std::path::PathBuf;

use super::error::{DomainError, Result};

/// Options collected by the driver (one per invocation).
///
/// Every field is optional here; each application decides which ones are
/// mandatory through [`Options::require`].
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub yaml_file: Option<PathBuf>,
    pub cycle: Option<String>,
    pub expt_name: Option<String>,
    pub work_path: Option<PathBuf>,
    pub fetch_type: Option<String>,
    pub platform: Option<String>,
    pub fileid: Option<String>,
    pub app: Option<String>,
    pub app_type: Option<String>,
}

impl Options {
    /// Look up an option by its command-line name
    pub fn get(&self, name: &str) -> Option<String> {
        match name {
            "yaml_file" => self.yaml_file.as_ref().map(|p| p.display().to_string()),
            "cycle" => self.cycle.clone(),
            "expt_name" => self.expt_name.clone(),
            "work_path" => self.work_path.as_ref().map(|p| p.display().to_string()),
            "fetch_type" => self.fetch_type.clone(),
            "platform" => self.platform.clone(),
            "fileid" => self.fileid.clone(),
            "app" => self.app.clone(),
            "app_type" => self.app_type.clone(),
            _ => None,
        }
    }

    /// Value of a mandatory option; blank strings count as missing
    pub fn require(&self, name: &str) -> Result<String> {
        self.get(name)
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| DomainError::MissingAttribute(name.to_string()))
    }

    /// Check several mandatory options at once, reporting the first missing
    pub fn require_all(&self, names: &[&str]) -> Result<()> {
        for name in names {
            self.require(name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_reports_missing_name() {
        let options = Options {
            cycle: Some("20000101000000".to_string()),
            ..Options::default()
        };

        assert_eq!(options.require("cycle").unwrap(), "20000101000000");
        match options.require_all(&["cycle", "yaml_file"]) {
            Err(DomainError::MissingAttribute(name)) => assert_eq!(name, "yaml_file"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_blank_value_is_missing() {
        let options = Options {
            expt_name: Some("  ".to_string()),
            ..Options::default()
        };
        assert!(options.require("expt_name").is_err());
    }
}
