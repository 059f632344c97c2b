//! Server parameter comparison (`CONFIG GET *`).

use std::collections::BTreeSet;

use compare_core::{DiffReason, DiffRecord, PairIdentity};
use compare_store::KeyValueStore;
use tracing::info;

use crate::Result;

/// Parameters that legitimately differ between two deployments.
pub const IGNORED_PARAMETERS: &[&str] = &[
    "port",
    "bind",
    "dir",
    "logfile",
    "pidfile",
    "requirepass",
    "masterauth",
    "dbfilename",
    "unixsocket",
    "cluster-config-file",
    "replicaof",
    "slaveof",
];

/// One record holding a `ParameterMismatch` per differing parameter, in
/// name order. A parameter unknown to one side compares as an empty value.
pub async fn compare_environment(
    source: &dyn KeyValueStore,
    target: &dyn KeyValueStore,
) -> Result<DiffRecord> {
    let pair = PairIdentity {
        source: source.endpoint(),
        target: target.endpoint(),
        source_db: source.db(),
        target_db: target.db(),
    };
    let source_params = source.config_get("*").await?;
    let target_params = target.config_get("*").await?;

    let names: BTreeSet<&String> = source_params.keys().chain(target_params.keys()).collect();
    let mut record = DiffRecord::new(&pair);
    for name in names {
        if IGNORED_PARAMETERS.contains(&name.as_str()) {
            continue;
        }
        let source_val = source_params.get(name).cloned().unwrap_or_default();
        let target_val = target_params.get(name).cloned().unwrap_or_default();
        if source_val != target_val {
            record.push_reason(DiffReason::ParameterMismatch {
                parameter: name.clone(),
                source: source_val,
                target: target_val,
            });
        }
    }

    info!(
        "Compared {} parameters, {} differ",
        source_params.len().max(target_params.len()),
        record.reasons.len()
    );
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use compare_store::MemoryStore;

    #[tokio::test]
    async fn test_only_meaningful_parameters_are_reported() {
        let source = MemoryStore::new("s");
        let target = MemoryStore::new("t");
        source.set_config("maxmemory", "1gb");
        target.set_config("maxmemory", "2gb");
        source.set_config("port", "6379");
        target.set_config("port", "6380");
        source.set_config("appendonly", "yes");
        target.set_config("appendonly", "yes");
        source.set_config("hz", "10");

        let record = compare_environment(&source, &target).await.unwrap();
        assert!(!record.is_equal);
        assert_eq!(
            record.reasons,
            vec![
                DiffReason::ParameterMismatch {
                    parameter: "hz".into(),
                    source: "10".into(),
                    target: String::new(),
                },
                DiffReason::ParameterMismatch {
                    parameter: "maxmemory".into(),
                    source: "1gb".into(),
                    target: "2gb".into(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_identical_configs_are_equal() {
        let source = MemoryStore::new("s");
        let target = MemoryStore::new("t");
        source.set_config("maxmemory", "0");
        target.set_config("maxmemory", "0");
        let record = compare_environment(&source, &target).await.unwrap();
        assert!(record.is_equal);
    }
}
