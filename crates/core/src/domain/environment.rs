// Task environment exported to downstream executables

use std::collections::BTreeMap;

/// Ordered set of environment variables defined by a task.
///
/// Variables are never written into the process environment; they are
/// used as the expansion context for templates and serialized with
/// [`Environment::to_shell`] for the scientific executables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn extend(&mut self, other: &Environment) {
        for (key, value) in &other.vars {
            self.vars.insert(key.clone(), value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Render as `export KEY="value"` lines, suitable for `source`
    pub fn to_shell(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.vars {
            let escaped = value
                .replace('\\', "\\\\")
                .replace('"', "\\\"")
                .replace('$', "\\$")
                .replace('`', "\\`");
            out.push_str(&format!("export {key}=\"{escaped}\"\n"));
        }
        out
    }
}
