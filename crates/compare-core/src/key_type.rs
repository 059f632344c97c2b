//! Value encodings understood by the comparators.

use serde::{Deserialize, Serialize};

/// Redis value type as reported by `TYPE key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    String,
    List,
    Set,
    Hash,
    Zset,
}

impl KeyType {
    /// Parse a `TYPE` reply. Returns `None` for `none` (key vanished) and for
    /// encodings the comparators do not handle, such as `stream`.
    pub fn from_type_reply(reply: &str) -> Option<Self> {
        match reply {
            "string" => Some(KeyType::String),
            "list" => Some(KeyType::List),
            "set" => Some(KeyType::Set),
            "hash" => Some(KeyType::Hash),
            "zset" => Some(KeyType::Zset),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::String => "string",
            KeyType::List => "list",
            KeyType::Set => "set",
            KeyType::Hash => "hash",
            KeyType::Zset => "zset",
        }
    }

    /// Capitalised name used in reason descriptions ("List length not equal").
    pub fn title(&self) -> &'static str {
        match self {
            KeyType::String => "String",
            KeyType::List => "List",
            KeyType::Set => "Set",
            KeyType::Hash => "Hash",
            KeyType::Zset => "Zset",
        }
    }

    pub(crate) fn from_title(title: &str) -> Option<Self> {
        match title {
            "String" => Some(KeyType::String),
            "List" => Some(KeyType::List),
            "Set" => Some(KeyType::Set),
            "Hash" => Some(KeyType::Hash),
            "Zset" => Some(KeyType::Zset),
            _ => None,
        }
    }
}

impl std::fmt::Display for KeyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_reply() {
        assert_eq!(KeyType::from_type_reply("zset"), Some(KeyType::Zset));
        assert_eq!(KeyType::from_type_reply("none"), None);
        assert_eq!(KeyType::from_type_reply("stream"), None);
    }
}
