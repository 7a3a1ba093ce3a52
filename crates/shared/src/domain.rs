use serde::{Deserialize, Serialize};

/// A single entry in the external key-value engine. The engine owns key
/// uniqueness; this layer treats both fields as opaque strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub key: String,
    pub value: String,
}

impl Record {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// One pending change against the engine. Constructed by a dialog or a row
/// action and consumed by exactly one relay call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum MutationIntent {
    Add { key: String, value: String },
    Update { key: String, value: String },
    Delete { key: String },
}
