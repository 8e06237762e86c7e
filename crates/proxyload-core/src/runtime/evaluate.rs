//! Turning fetched artifact scripts into factories.
//!
//! A Rust host does not run JavaScript. Instead, the components it can
//! render are linked in natively and registered with a [`StaticEvaluator`]
//! by logical path; fetching the artifact confirms that the release really
//! ships that component under that hash.

use rustc_hash::FxHashMap;

use crate::artifact::{ArtifactKey, LogicalPath};
use crate::compile::wrap::js_string;
use crate::error::{Error, Result};

use super::registry::Factory;

/// Evaluates an artifact script on the host.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, key: &ArtifactKey, code: &str) -> Result<Factory>;
}

/// Native factories keyed by logical path.
#[derive(Default, Clone)]
pub struct StaticEvaluator {
    factories: FxHashMap<LogicalPath, Factory>,
}

impl StaticEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, path: LogicalPath, factory: Factory) {
        self.factories.insert(path, factory);
    }

    pub fn with(mut self, path: LogicalPath, factory: Factory) -> Self {
        self.register(path, factory);
        self
    }
}

impl Evaluator for StaticEvaluator {
    fn evaluate(&self, key: &ArtifactKey, code: &str) -> Result<Factory> {
        let registration = format!("registry.items[{}]", js_string(&key.to_string()));
        if !code.contains(&registration) {
            return Err(Error::Evaluate {
                key: key.to_string(),
                message: "script does not register this artifact key".to_string(),
            });
        }

        self.factories.get(key.path()).cloned().ok_or_else(|| Error::Evaluate {
            key: key.to_string(),
            message: "no native implementation for this component".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::registry::{Module, factory};
    use serde_json::Value;

    #[test]
    fn test_static_evaluator_checks_registration() {
        let key: ArtifactKey = "Component/Button/default/h1".parse().unwrap();
        let evaluator = StaticEvaluator::new().with(
            key.path().clone(),
            factory(|_| Ok(Module::component(|_| Value::Null))),
        );

        let code = "registry.items[\"Component/Button/default/h1\"] = function (__pl_deps) {};";
        assert!(evaluator.evaluate(&key, code).is_ok());

        let stale = "registry.items[\"Component/Button/default/h0\"] = function (__pl_deps) {};";
        assert!(matches!(
            evaluator.evaluate(&key, stale),
            Err(Error::Evaluate { .. })
        ));

        let other: ArtifactKey = "Component/Card/default/h1".parse().unwrap();
        let code = "registry.items[\"Component/Card/default/h1\"] = 1;";
        assert!(evaluator.evaluate(&other, code).is_err());
    }
}
