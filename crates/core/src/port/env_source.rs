// Runtime Environment Port
// Workflow managers pass the cycle (PDY, cyc) through the environment

/// Read access to runtime environment variables
pub trait EnvSource: Send + Sync {
    fn var(&self, name: &str) -> Option<String>;
}

/// Process environment (production)
pub struct ProcessEnvSource;

impl EnvSource for ProcessEnvSource {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|v| !v.is_empty())
    }
}

pub mod mocks {
    use super::*;
    use std::collections::HashMap;

    /// Fixed set of variables for tests
    #[derive(Default)]
    pub struct MockEnvSource {
        vars: HashMap<String, String>,
    }

    impl MockEnvSource {
        pub fn new<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
        where
            K: Into<String>,
            V: Into<String>,
        {
            Self {
                vars: vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            }
        }
    }

    impl EnvSource for MockEnvSource {
        fn var(&self, name: &str) -> Option<String> {
            self.vars.get(name).cloned()
        }
    }
}
