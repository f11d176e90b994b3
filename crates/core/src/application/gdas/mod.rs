// GDAS - Global Data Assimilation System applications

pub mod soca;

use async_trait::async_trait;
use tracing::info;

use crate::application::error::GdasError;
use crate::application::task::WorkflowTask;
use crate::domain::Options;
use crate::error::Result;
use soca::{Global3dvar, GlobalLetkf, SocaOutcome};

/// Supported GDAS applications and their application types
pub const GDAS_APPS: &[(&str, &[&str])] = &[(
    "soca",
    &[soca::var3d::APP_TYPE, soca::letkf::APP_TYPE],
)];

/// Resolved GDAS application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GdasApp {
    SocaGlobal3dvar,
    SocaGlobalLetkf,
}

impl GdasApp {
    /// Resolve `app` / `app_type` (case-insensitive) against [`GDAS_APPS`]
    pub fn resolve(app: &str, app_type: &str) -> std::result::Result<Self, GdasError> {
        let app = app.to_lowercase();
        let app_type = app_type.to_lowercase();

        let Some((_, app_types)) = GDAS_APPS.iter().find(|(name, _)| *name == app) else {
            return Err(GdasError::UnsupportedApp {
                app,
                valid: GDAS_APPS.iter().map(|(name, _)| name.to_string()).collect(),
            });
        };

        match (app.as_str(), app_type.as_str()) {
            ("soca", soca::var3d::APP_TYPE) => Ok(Self::SocaGlobal3dvar),
            ("soca", soca::letkf::APP_TYPE) => Ok(Self::SocaGlobalLetkf),
            _ => Err(GdasError::UnsupportedAppType {
                app,
                app_type,
                valid: app_types.iter().map(|name| name.to_string()).collect(),
            }),
        }
    }

    pub fn app_type(&self) -> &'static str {
        match self {
            Self::SocaGlobal3dvar => soca::var3d::APP_TYPE,
            Self::SocaGlobalLetkf => soca::letkf::APP_TYPE,
        }
    }
}

/// GDAS application dispatcher
#[derive(Debug, Clone)]
pub struct Gdas {
    options: Options,
    app: GdasApp,
}

impl Gdas {
    /// # Errors
    /// - GdasError::MissingOption if `app` or `app_type` is absent
    /// - GdasError::UnsupportedApp / UnsupportedAppType for unknown values
    pub fn new(options: &Options) -> std::result::Result<Self, GdasError> {
        let app = options
            .require("app")
            .map_err(|_| GdasError::MissingOption("app".to_string()))?;
        let app_type = options
            .require("app_type")
            .map_err(|_| GdasError::MissingOption("app_type".to_string()))?;

        Ok(Self {
            options: options.clone(),
            app: GdasApp::resolve(&app, &app_type)?,
        })
    }

    pub fn app(&self) -> GdasApp {
        self.app
    }
}

#[async_trait]
impl WorkflowTask for Gdas {
    type Output = SocaOutcome;

    async fn execute(&mut self) -> Result<SocaOutcome> {
        info!(app_type = self.app.app_type(), "Executing GDAS SOCA application");

        match self.app {
            GdasApp::SocaGlobal3dvar => Global3dvar::new(&self.options)?.run().await,
            GdasApp::SocaGlobalLetkf => GlobalLetkf::new(&self.options)?.run().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use soca::test_support::Fixture;

    #[test]
    fn test_resolve_case_insensitive() {
        assert_eq!(
            GdasApp::resolve("SOCA", "Global_3DVAR").unwrap(),
            GdasApp::SocaGlobal3dvar
        );
        assert_eq!(
            GdasApp::resolve("soca", "global_letkf").unwrap(),
            GdasApp::SocaGlobalLetkf
        );
    }

    #[test]
    fn test_resolve_unknown_app() {
        match GdasApp::resolve("jedi", "global_3dvar") {
            Err(GdasError::UnsupportedApp { app, valid }) => {
                assert_eq!(app, "jedi");
                assert_eq!(valid, vec!["soca".to_string()]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_resolve_unknown_app_type() {
        match GdasApp::resolve("soca", "global_4dvar") {
            Err(GdasError::UnsupportedAppType { app_type, valid, .. }) => {
                assert_eq!(app_type, "global_4dvar");
                assert_eq!(valid.len(), 2);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_new_requires_app_type() {
        let options = Options {
            app: Some("soca".to_string()),
            ..Options::default()
        };
        match Gdas::new(&options) {
            Err(GdasError::MissingOption(name)) => assert_eq!(name, "app_type"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_run_dispatches_3dvar() {
        let fixture = Fixture::new();
        let mut gdas = Gdas::new(&fixture.options("GLOBAL_3DVAR")).unwrap();

        let outcome = gdas.run().await.unwrap();
        assert!(outcome.config_yaml.ends_with("soca.global_3dvar.yaml"));
        assert!(outcome.config_yaml.is_file());
    }
}
