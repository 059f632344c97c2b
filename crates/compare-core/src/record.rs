//! The `DiffRecord` entity.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{DiffReason, Endpoint, KeyType};

/// Outcome of one comparison step.
///
/// Field names on disk keep the capitalised form (`Key`, `IsEqual`, ...) so
/// result files can be consumed by existing tooling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffRecord {
    #[serde(rename = "Key", default)]
    pub key: String,
    #[serde(rename = "KeyType", default, with = "key_type_field")]
    pub key_type: Option<KeyType>,
    #[serde(rename = "Source", default)]
    pub source: Endpoint,
    #[serde(rename = "Target", default)]
    pub target: Endpoint,
    #[serde(rename = "SourceDB", default)]
    pub source_db: i64,
    #[serde(rename = "TargetDB", default)]
    pub target_db: i64,
    #[serde(rename = "IsEqual", default = "default_equal")]
    pub is_equal: bool,
    #[serde(rename = "KeyDiffReason", default)]
    pub reasons: Vec<DiffReason>,
}

fn default_equal() -> bool {
    true
}

impl DiffRecord {
    /// Create an equal, key-less record for the given pair.
    pub fn new(pair: &PairIdentity) -> Self {
        Self {
            key: String::new(),
            key_type: None,
            source: pair.source.clone(),
            target: pair.target.clone(),
            source_db: pair.source_db,
            target_db: pair.target_db,
            is_equal: true,
            reasons: Vec::new(),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>, key_type: Option<KeyType>) -> Self {
        self.key = key.into();
        self.key_type = key_type;
        self
    }

    /// Attach a reason and mark the record unequal.
    pub fn push_reason(&mut self, reason: DiffReason) {
        self.is_equal = false;
        self.reasons.push(reason);
    }

    /// Builder form of [`DiffRecord::push_reason`].
    pub fn mismatch(mut self, reason: DiffReason) -> Self {
        self.push_reason(reason);
        self
    }

    /// One JSON line, without the trailing newline.
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Identity of the two compared deployments, stamped on every record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairIdentity {
    pub source: Endpoint,
    pub target: Endpoint,
    pub source_db: i64,
    pub target_db: i64,
}

impl PairIdentity {
    /// A fresh equal record for `key`.
    pub fn record(&self, key: &str, key_type: Option<KeyType>) -> DiffRecord {
        DiffRecord::new(self).with_key(key, key_type)
    }
}

/// `KeyType` is written as an empty string for database-level records.
mod key_type_field {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<KeyType>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(kt) => s.serialize_str(kt.as_str()),
            None => s.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<KeyType>, D::Error> {
        let raw = Option::<String>::deserialize(d)?.unwrap_or_default();
        Ok(KeyType::from_type_reply(&raw.to_ascii_lowercase()))
    }
}
