//! Identity of a compared deployment.

use serde::{Deserialize, Serialize};

/// Address of one side of a comparison.
///
/// Serialized as a plain string for a single node and as an array of
/// addresses for a cluster, so result files written against either topology
/// stay readable by the same parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Endpoint {
    Single(String),
    Cluster(Vec<String>),
}

impl Endpoint {
    pub fn addresses(&self) -> Vec<&str> {
        match self {
            Endpoint::Single(addr) => vec![addr.as_str()],
            Endpoint::Cluster(nodes) => nodes.iter().map(String::as_str).collect(),
        }
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Endpoint::Single(String::new())
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::Single(addr) => f.write_str(addr),
            Endpoint::Cluster(nodes) => f.write_str(&nodes.join(",")),
        }
    }
}
