//! Structured mismatch reasons.
//!
//! Each reason is written to disk as a flat JSON object carrying a
//! `description` plus the fields relevant to the failed check, e.g.
//!
//! ```json
//! {"description":"List index value not equal","Index":119,"sourceval":"a","targetval":"b"}
//! ```
//!
//! Reading a result file back maps known descriptions onto their variant.
//! Anything unrecognised (older tools, hand-edited files) is kept verbatim in
//! [`DiffReason::Other`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::KeyType;

const KEY_EXISTENCE: &str = "Source or Target key not exists";
const KEY_TYPE: &str = "Source and Target key type different";
const STRING_VALUE: &str = "String value not equal";
const LIST_INDEX: &str = "List index value not equal";
const SET_MEMBER_MISSING: &str = "Source set member not exists in Target";
const FIELD_VALUE: &str = "Field value not equal";
const ZSET_MEMBER_MISSING: &str = "Source zset member not exists in Target";
const ZSET_SCORE: &str = "zset member score not equal";
const SCORE_PARSE: &str = "Source zset score is not a float";
const SCAN_FAILED: &str = "Source scan error";
const TTL_MISMATCH: &str = "Key ttl difference is too large";
const DB_SIZE: &str = "Source and Target db size different";
const MISSING_IN_TARGET: &str = "key does not exists in Target";
const MISSING_IN_SOURCE: &str = "key does not exists in Source";
const DUMP_VALUE: &str = "Different value for key";
const PARAMETER: &str = "Parameter value not equal";
const LENGTH_SUFFIX: &str = " length not equal";

/// Why a comparison step decided two keys (or two databases) differ.
#[derive(Debug, Clone, PartialEq)]
pub enum DiffReason {
    /// The key exists on exactly one side.
    KeyExistence { source: bool, target: bool },
    /// Both sides hold the key, as different Redis types (raw `TYPE` replies).
    TypeMismatch { source: String, target: String },
    /// LLEN / SCARD / HLEN / ZCARD differ.
    LengthMismatch {
        key_type: KeyType,
        source: u64,
        target: u64,
    },
    StringValueMismatch { source: String, target: String },
    /// First differing position of a list, as an absolute index.
    ListIndexMismatch {
        index: u64,
        source: String,
        target: String,
    },
    SetMemberMissing { member: String },
    FieldValueMismatch {
        field: String,
        source: String,
        target: String,
    },
    ZsetMemberMissing { member: String },
    ZsetScoreMismatch {
        member: String,
        source_score: f64,
        target_score: f64,
    },
    /// A source score could not be parsed as a float.
    ScoreParse {
        member: String,
        score: String,
        error: String,
    },
    /// A cursor scan over the source value failed part way.
    ScanFailed { command: String, error: String },
    /// `diff` is `target_ttl - source_ttl` in milliseconds.
    TtlMismatch {
        diff: i64,
        source_ttl: i64,
        target_ttl: i64,
    },
    DbSizeMismatch { source: u64, target: u64 },
    KeyMissingInTarget { key: String },
    KeyMissingInSource { key: String },
    /// Serialized (DUMP) payloads differ.
    DumpValueMismatch { key: String },
    ParameterMismatch {
        parameter: String,
        source: String,
        target: String,
    },
    /// Free-form reason that matches none of the known checks.
    Other(Map<String, Value>),
}

impl DiffReason {
    /// Human readable summary, identical to the `description` field on disk.
    pub fn description(&self) -> String {
        match self {
            DiffReason::KeyExistence { .. } => KEY_EXISTENCE.to_string(),
            DiffReason::TypeMismatch { .. } => KEY_TYPE.to_string(),
            DiffReason::LengthMismatch { key_type, .. } => {
                format!("{}{LENGTH_SUFFIX}", key_type.title())
            }
            DiffReason::StringValueMismatch { .. } => STRING_VALUE.to_string(),
            DiffReason::ListIndexMismatch { .. } => LIST_INDEX.to_string(),
            DiffReason::SetMemberMissing { .. } => SET_MEMBER_MISSING.to_string(),
            DiffReason::FieldValueMismatch { .. } => FIELD_VALUE.to_string(),
            DiffReason::ZsetMemberMissing { .. } => ZSET_MEMBER_MISSING.to_string(),
            DiffReason::ZsetScoreMismatch { .. } => ZSET_SCORE.to_string(),
            DiffReason::ScoreParse { .. } => SCORE_PARSE.to_string(),
            DiffReason::ScanFailed { .. } => SCAN_FAILED.to_string(),
            DiffReason::TtlMismatch { .. } => TTL_MISMATCH.to_string(),
            DiffReason::DbSizeMismatch { .. } => DB_SIZE.to_string(),
            DiffReason::KeyMissingInTarget { .. } => MISSING_IN_TARGET.to_string(),
            DiffReason::KeyMissingInSource { .. } => MISSING_IN_SOURCE.to_string(),
            DiffReason::DumpValueMismatch { .. } => DUMP_VALUE.to_string(),
            DiffReason::ParameterMismatch { .. } => PARAMETER.to_string(),
            DiffReason::Other(map) => map
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        }
    }

    /// Flatten into the on-disk object form.
    pub fn to_json_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        match self {
            DiffReason::Other(raw) => return raw.clone(),
            DiffReason::KeyExistence { source, target } => {
                map.insert("source".into(), Value::from(*source));
                map.insert("target".into(), Value::from(*target));
            }
            DiffReason::TypeMismatch { source, target } => {
                map.insert("sourcetype".into(), Value::from(source.as_str()));
                map.insert("targettype".into(), Value::from(target.as_str()));
            }
            DiffReason::LengthMismatch { source, target, .. } => {
                map.insert("sourcelen".into(), Value::from(*source));
                map.insert("targetlen".into(), Value::from(*target));
            }
            DiffReason::StringValueMismatch { source, target } => {
                map.insert("sval".into(), Value::from(source.as_str()));
                map.insert("tval".into(), Value::from(target.as_str()));
            }
            DiffReason::ListIndexMismatch {
                index,
                source,
                target,
            } => {
                map.insert("Index".into(), Value::from(*index));
                map.insert("sourceval".into(), Value::from(source.as_str()));
                map.insert("targetval".into(), Value::from(target.as_str()));
            }
            DiffReason::SetMemberMissing { member } | DiffReason::ZsetMemberMissing { member } => {
                map.insert("member".into(), Value::from(member.as_str()));
            }
            DiffReason::FieldValueMismatch {
                field,
                source,
                target,
            } => {
                map.insert("field".into(), Value::from(field.as_str()));
                map.insert("sourceval".into(), Value::from(source.as_str()));
                map.insert("targetval".into(), Value::from(target.as_str()));
            }
            DiffReason::ZsetScoreMismatch {
                member,
                source_score,
                target_score,
            } => {
                map.insert("member".into(), Value::from(member.as_str()));
                map.insert("sourcescore".into(), Value::from(*source_score));
                map.insert("targetscore".into(), Value::from(*target_score));
            }
            DiffReason::ScoreParse {
                member,
                score,
                error,
            } => {
                map.insert("member".into(), Value::from(member.as_str()));
                map.insert("score".into(), Value::from(score.as_str()));
                map.insert("error".into(), Value::from(error.as_str()));
            }
            DiffReason::ScanFailed { command, error } => {
                map.insert("command".into(), Value::from(command.as_str()));
                map.insert("error".into(), Value::from(error.as_str()));
            }
            DiffReason::TtlMismatch {
                diff,
                source_ttl,
                target_ttl,
            } => {
                map.insert("TTLDiff".into(), Value::from(*diff));
                map.insert("sourcettl".into(), Value::from(*source_ttl));
                map.insert("targetttl".into(), Value::from(*target_ttl));
            }
            DiffReason::DbSizeMismatch { source, target } => {
                map.insert("source".into(), Value::from(*source));
                map.insert("target".into(), Value::from(*target));
            }
            DiffReason::KeyMissingInTarget { key }
            | DiffReason::KeyMissingInSource { key }
            | DiffReason::DumpValueMismatch { key } => {
                map.insert("key".into(), Value::from(key.as_str()));
            }
            DiffReason::ParameterMismatch {
                parameter,
                source,
                target,
            } => {
                map.insert("parameter".into(), Value::from(parameter.as_str()));
                map.insert("sourceval".into(), Value::from(source.as_str()));
                map.insert("targetval".into(), Value::from(target.as_str()));
            }
        }
        map.insert("description".into(), Value::from(self.description()));
        map
    }

    /// Rebuild a reason from its on-disk object form.
    ///
    /// Never fails: objects whose description is unknown, or whose fields do
    /// not have the expected types, come back as [`DiffReason::Other`].
    pub fn from_json_map(map: Map<String, Value>) -> Self {
        match Self::parse_known(&map) {
            Some(reason) => reason,
            None => DiffReason::Other(map),
        }
    }

    fn parse_known(map: &Map<String, Value>) -> Option<Self> {
        let description = map.get("description")?.as_str()?;
        let text = |name: &str| map.get(name).and_then(Value::as_str).map(str::to_string);
        let unsigned = |name: &str| map.get(name).and_then(Value::as_u64);
        let signed = |name: &str| map.get(name).and_then(Value::as_i64);
        let float = |name: &str| map.get(name).and_then(Value::as_f64);
        let flag = |name: &str| map.get(name).and_then(Value::as_bool);

        let reason = match description {
            KEY_EXISTENCE => DiffReason::KeyExistence {
                source: flag("source")?,
                target: flag("target")?,
            },
            KEY_TYPE => DiffReason::TypeMismatch {
                source: text("sourcetype")?,
                target: text("targettype")?,
            },
            STRING_VALUE => DiffReason::StringValueMismatch {
                source: text("sval")?,
                target: text("tval")?,
            },
            LIST_INDEX => DiffReason::ListIndexMismatch {
                index: unsigned("Index")?,
                source: text("sourceval")?,
                target: text("targetval")?,
            },
            SET_MEMBER_MISSING => DiffReason::SetMemberMissing {
                member: text("member")?,
            },
            FIELD_VALUE => DiffReason::FieldValueMismatch {
                field: text("field")?,
                source: text("sourceval")?,
                target: text("targetval")?,
            },
            ZSET_MEMBER_MISSING => DiffReason::ZsetMemberMissing {
                member: text("member")?,
            },
            ZSET_SCORE => DiffReason::ZsetScoreMismatch {
                member: text("member")?,
                source_score: float("sourcescore")?,
                target_score: float("targetscore")?,
            },
            SCORE_PARSE => DiffReason::ScoreParse {
                member: text("member")?,
                score: text("score")?,
                error: text("error")?,
            },
            SCAN_FAILED => DiffReason::ScanFailed {
                command: text("command")?,
                error: text("error")?,
            },
            TTL_MISMATCH => DiffReason::TtlMismatch {
                diff: signed("TTLDiff")?,
                source_ttl: signed("sourcettl")?,
                target_ttl: signed("targetttl")?,
            },
            DB_SIZE => DiffReason::DbSizeMismatch {
                source: unsigned("source")?,
                target: unsigned("target")?,
            },
            MISSING_IN_TARGET => DiffReason::KeyMissingInTarget { key: text("key")? },
            MISSING_IN_SOURCE => DiffReason::KeyMissingInSource { key: text("key")? },
            DUMP_VALUE => DiffReason::DumpValueMismatch { key: text("key")? },
            PARAMETER => DiffReason::ParameterMismatch {
                parameter: text("parameter")?,
                source: text("sourceval")?,
                target: text("targetval")?,
            },
            other => {
                let title = other.strip_suffix(LENGTH_SUFFIX)?;
                DiffReason::LengthMismatch {
                    key_type: KeyType::from_title(title)?,
                    source: unsigned("sourcelen")?,
                    target: unsigned("targetlen")?,
                }
            }
        };
        Some(reason)
    }
}

impl Serialize for DiffReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json_map().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DiffReason {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        Ok(DiffReason::from_json_map(map))
    }
}

impl std::fmt::Display for DiffReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", Value::Object(self.to_json_map()))
    }
}
