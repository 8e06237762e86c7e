//! Promotion store documents.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of history entries kept per environment.
pub const HISTORY_LIMIT: usize = 30;

/// A deployment target and the environments it can be promoted in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub environments: Vec<String>,
}

impl Target {
    pub fn has_environment(&self, environment: &str) -> bool {
        self.environments.iter().any(|e| e == environment)
    }
}

/// `targets.json`: target name → target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Targets(pub BTreeMap<String, Target>);

impl Targets {
    pub fn get(&self, name: &str) -> Option<&Target> {
        self.0.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Release currently promoted in one environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentEntry {
    pub current: String,
    pub updated_at: DateTime<Utc>,
}

/// One past promotion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub name: String,
    pub updated_at: DateTime<Utc>,
}

/// Promotion log of one environment, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentHistory {
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

/// `current.json`: environment → current release.
pub type CurrentDocument = BTreeMap<String, CurrentEntry>;

/// `history.json`: environment → promotion log.
pub type HistoryDocument = BTreeMap<String, EnvironmentHistory>;

/// `pending.json`: both documents of an interrupted promotion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Journal {
    pub current: CurrentDocument,
    pub history: HistoryDocument,
}

/// Result of a promotion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Promotion {
    pub target: String,
    pub environment: String,
    pub release: String,
    /// Release that was current before, if any.
    pub previous: Option<String>,
    pub updated_at: DateTime<Utc>,
}
