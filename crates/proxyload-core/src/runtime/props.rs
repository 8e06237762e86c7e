//! Component props.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

/// Callback prop (`onClick`, `onSubmit`, ...).
pub type Handler = Arc<dyn Fn(&Value) + Send + Sync>;

/// Props passed to a component render: JSON values plus callbacks.
///
/// `variation`, `version` and `hash` are reserved and steer artifact
/// selection.
#[derive(Clone, Default)]
pub struct Props {
    values: Map<String, Value>,
    handlers: BTreeMap<String, Handler>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn with_handler(
        mut self,
        name: impl Into<String>,
        handler: impl Fn(&Value) + Send + Sync + 'static,
    ) -> Self {
        self.handlers.insert(name.into(), Arc::new(handler));
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key)?.as_str().filter(|s| !s.is_empty())
    }

    pub fn handler(&self, name: &str) -> Option<&Handler> {
        self.handlers.get(name)
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Requested variation.
    pub fn variation(&self) -> Option<&str> {
        self.get_str("variation")
    }

    /// Explicitly requested artifact version: `version`, else `hash`.
    pub fn version(&self) -> Option<&str> {
        self.get_str("version").or_else(|| self.get_str("hash"))
    }
}

impl From<Map<String, Value>> for Props {
    fn from(values: Map<String, Value>) -> Self {
        Self {
            values,
            handlers: BTreeMap::new(),
        }
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Props")
            .field("values", &self.values)
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}
