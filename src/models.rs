use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A single to-do item bound to one calendar day.
///
/// Wire field names stay camelCase so snapshots exchanged with the web
/// client (localStorage dumps, share payloads) deserialize unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub text: String,
    pub completed: bool,
    /// RFC 3339 instant. Only the local calendar day drives partitioning;
    /// sub-day precision is kept for stored-order tie-breaks.
    pub created_at: String,
    #[serde(default)]
    pub description: String,
}

impl Task {
    pub fn new(id: String, text: String, created_at: String) -> Self {
        Self {
            id,
            text,
            completed: false,
            created_at,
            description: String::new(),
        }
    }
}

/// The complete owned state for one device identity: display name, the
/// task collection, the daily recurring templates and the record of days
/// those templates were already materialized for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub templates: Vec<String>,
    #[serde(default)]
    pub initialized_days: BTreeSet<String>,
}
