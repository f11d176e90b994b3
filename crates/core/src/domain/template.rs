// Path template rendering
//
// A template is first expanded for `$VAR` / `${VAR}` references and the
// result is then used as a strftime pattern for the requested time.

use super::cycle::Cycle;
use super::environment::Environment;
use super::error::{DomainError, Result};

/// Render `template` at time `at`.
///
/// Variables resolve from `env` first and then from the process
/// environment. An undefined variable is an error rather than being left
/// in the path.
pub fn render(template: &str, at: &Cycle, env: &Environment) -> Result<String> {
    let expanded = expand_vars(template, env)?;
    at.format(&expanded)
}

/// Expand `$VAR` / `${VAR}` references without any date rendering
pub fn expand_vars(template: &str, env: &Environment) -> Result<String> {
    let lookup = |name: &str| -> std::result::Result<Option<String>, std::env::VarError> {
        match env.get(name) {
            Some(value) => Ok(Some(value.to_string())),
            None => std::env::var(name).map(Some),
        }
    };

    shellexpand::env_with_context(template, lookup)
        .map(|expanded| expanded.into_owned())
        .map_err(|e| DomainError::UndefinedVariable {
            name: e.var_name,
            template: template.to_string(),
        })
}
