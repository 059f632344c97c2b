//! Full passes, replay, the pass loop and the whole-database differ.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use compare_core::result_file::read_records;
use compare_core::{DiffReason, DiffRecord};
use compare_engine::{
    result_files, BulkCompare, CompareMode, CompareOptions, CompareRun, PassPlan, SingleCompare,
};
use compare_store::{KeyValueStore, MemoryStore};
use tempfile::TempDir;

fn stores() -> (Arc<MemoryStore>, Arc<MemoryStore>) {
    (
        Arc::new(MemoryStore::new("source:6379")),
        Arc::new(MemoryStore::new("target:6379")),
    )
}

fn erase(store: &Arc<MemoryStore>) -> Arc<dyn KeyValueStore> {
    store.clone()
}

fn options(dir: &Path) -> CompareOptions {
    CompareOptions {
        batch_size: 3,
        threads: 4,
        output_dir: dir.to_path_buf(),
        ..Default::default()
    }
}

fn reasons(records: &[DiffRecord]) -> Vec<DiffReason> {
    records.iter().flat_map(|r| r.reasons.clone()).collect()
}

/// 20 equal strings plus one value mismatch on `k7`.
fn seed(source: &MemoryStore, target: &MemoryStore) {
    for i in 0..20 {
        source.set_string(&format!("k{i}"), "same");
        target.set_string(&format!("k{i}"), "same");
    }
    target.set_string("k7", "different");
}

#[tokio::test]
async fn test_full_pass_records_only_mismatches() {
    let dir = TempDir::new().unwrap();
    let (source, target) = stores();
    seed(&source, &target);

    let compare = SingleCompare::new(erase(&source), erase(&target), options(dir.path()));
    let path = dir.path().join("pass.result");
    let summary = compare.compare_db(&path).await.unwrap();

    assert_eq!(summary.keys_compared, 20);
    assert_eq!(summary.mismatches, 1);
    assert_eq!(summary.result_file.as_deref(), Some(path.as_path()));

    let records = read_records(&path).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].key, "k7");
    assert!(!records[0].is_equal);
    assert_eq!(records[0].source_db, 0);
}

#[tokio::test]
async fn test_equal_databases_write_nothing() {
    let dir = TempDir::new().unwrap();
    let (source, target) = stores();
    source.set_hash("h", &[("f", "v")]);
    target.set_hash("h", &[("f", "v")]);

    let compare = SingleCompare::new(erase(&source), erase(&target), options(dir.path()));
    let path = dir.path().join("pass.result");
    let summary = compare.compare_db(&path).await.unwrap();

    assert_eq!(summary.mismatches, 0);
    assert!(summary.result_file.is_none());
    assert!(!path.exists());
}

#[tokio::test]
async fn test_replay_twice_without_changes_is_stable() {
    let dir = TempDir::new().unwrap();
    let (source, target) = stores();
    seed(&source, &target);

    let compare = SingleCompare::new(erase(&source), erase(&target), options(dir.path()));
    let first = dir.path().join("first.result");
    compare.compare_db(&first).await.unwrap();

    let second = dir.path().join("second.result");
    let replay = compare
        .compare_from_results(&[first.clone()], &second)
        .await
        .unwrap();
    assert_eq!(replay.keys_compared, 1);

    let third = dir.path().join("third.result");
    compare
        .compare_from_results(&[second.clone()], &third)
        .await
        .unwrap();

    let keys = |path: &Path| -> Vec<String> {
        read_records(path)
            .unwrap()
            .into_iter()
            .map(|r| r.key)
            .collect()
    };
    assert_eq!(keys(&first), vec!["k7"]);
    assert_eq!(keys(&second), vec!["k7"]);
    assert_eq!(keys(&third), vec!["k7"]);
}

#[tokio::test]
async fn test_replay_after_fix_records_nothing() {
    let dir = TempDir::new().unwrap();
    let (source, target) = stores();
    seed(&source, &target);

    let compare = SingleCompare::new(erase(&source), erase(&target), options(dir.path()));
    let first = dir.path().join("first.result");
    compare.compare_db(&first).await.unwrap();

    target.set_string("k7", "same");
    let second = dir.path().join("second.result");
    let summary = compare
        .compare_from_results(&[first], &second)
        .await
        .unwrap();
    assert_eq!(summary.mismatches, 0);
    assert!(!second.exists());
}

#[tokio::test]
async fn test_replay_skips_lines_without_key() {
    let dir = TempDir::new().unwrap();
    let (source, target) = stores();
    source.set_string("k", "a");
    target.set_string("k", "b");

    let input = dir.path().join("input.result");
    std::fs::write(
        &input,
        "[{\"Source\":\"x\"}]\n{\"Key\":\"\",\"IsEqual\":false}\n{\"Key\":\"k\"}\nnot json\n",
    )
    .unwrap();

    let compare = SingleCompare::new(erase(&source), erase(&target), options(dir.path()));
    let out = dir.path().join("out.result");
    let summary = compare.compare_from_results(&[input], &out).await.unwrap();
    assert_eq!(summary.keys_compared, 1);
    assert_eq!(summary.mismatches, 1);
}

#[tokio::test]
async fn test_pass_loop_rechecks_previous_results() {
    let dir = TempDir::new().unwrap();
    let (source, target) = stores();
    seed(&source, &target);

    let stale = dir.path().join("compare_1.result");
    std::fs::write(&stale, "{\"Key\":\"old\"}\n").unwrap();

    let plan = PassPlan {
        times: 3,
        interval: Duration::from_millis(10),
    };
    let run = CompareRun::single(erase(&source), erase(&target), options(dir.path()), plan);
    assert_eq!(run.mode(), CompareMode::Single);

    let summaries = run.run().await.unwrap();
    assert!(!stale.exists());
    assert_eq!(summaries.len(), 3);
    assert_eq!(summaries[0].keys_compared, 20);
    assert_eq!(summaries[1].keys_compared, 1);
    assert_eq!(summaries[2].pass, 3);

    let files: Vec<_> = summaries
        .iter()
        .map(|s| s.result_file.clone().unwrap())
        .collect();
    assert_ne!(files[0], files[1]);
    assert_ne!(files[1], files[2]);
}

#[tokio::test]
async fn test_every_pass_contributes_a_result_file() {
    let dir = TempDir::new().unwrap();
    let (source, target) = stores();
    seed(&source, &target);
    target.set_string("k3", "gone");

    let plan = PassPlan {
        times: 3,
        interval: Duration::ZERO,
    };
    let run = CompareRun::single(erase(&source), erase(&target), options(dir.path()), plan);
    let summaries = run.run().await.unwrap();

    let files = result_files(&summaries);
    assert_eq!(files.len(), 3);
    for (file, summary) in files.iter().zip(&summaries) {
        assert_eq!(read_records(file).unwrap().len() as u64, summary.mismatches);
    }
    assert_eq!(summaries[2].mismatches, 2);
}

#[tokio::test]
async fn test_pass_loop_stops_when_nothing_left() {
    let dir = TempDir::new().unwrap();
    let (source, target) = stores();
    source.set_string("k", "v");
    target.set_string("k", "v");

    let plan = PassPlan {
        times: 5,
        interval: Duration::ZERO,
    };
    let run = CompareRun::single(erase(&source), erase(&target), options(dir.path()), plan);
    let summaries = run.run().await.unwrap();
    assert_eq!(summaries.len(), 1);
}

#[tokio::test]
async fn test_supplied_result_file_is_kept_and_used() {
    let dir = TempDir::new().unwrap();
    let (source, target) = stores();
    seed(&source, &target);

    let mine = dir.path().join("mine.result");
    std::fs::write(&mine, "").unwrap();
    let mut opts = options(dir.path());
    opts.result_file = Some(mine.clone());

    let run = CompareRun::single(erase(&source), erase(&target), opts, PassPlan::default());
    let summaries = run.run().await.unwrap();
    assert_eq!(summaries[0].result_file.as_deref(), Some(mine.as_path()));
    assert_eq!(read_records(&mine).unwrap().len(), 1);
}

#[tokio::test]
async fn test_whole_database_diff() {
    let dir = TempDir::new().unwrap();
    let (source, target) = stores();
    for key in ["k1", "k2", "k3"] {
        source.set_string(key, "v");
    }
    for key in ["k2", "k3", "k4"] {
        target.set_string(key, "v");
    }
    target.set_string("k3", "changed");

    let compare = BulkCompare::new(erase(&source), erase(&target), options(dir.path()));
    let path = dir.path().join("bulk.result");
    let summary = compare.compare_db(&path).await.unwrap();

    assert_eq!(summary.keys_compared, 2);
    let mut found = reasons(&read_records(&path).unwrap());
    found.sort_by_key(|r| r.to_string());
    let mut expected = vec![
        DiffReason::KeyMissingInTarget { key: "k1".into() },
        DiffReason::KeyMissingInSource { key: "k4".into() },
        DiffReason::DumpValueMismatch { key: "k3".into() },
    ];
    expected.sort_by_key(|r| r.to_string());
    assert_eq!(found, expected);
}

#[tokio::test]
async fn test_whole_database_size_mismatch_is_recorded() {
    let dir = TempDir::new().unwrap();
    let (source, target) = stores();
    source.set_string("a", "1");
    source.set_string("b", "1");
    target.set_string("a", "1");

    let worker_pairs = (0..2).map(|_| (erase(&source), erase(&target))).collect();
    let compare = BulkCompare::new(erase(&source), erase(&target), options(dir.path()))
        .with_worker_pairs(worker_pairs);
    let path = dir.path().join("bulk.result");
    compare.compare_db(&path).await.unwrap();

    let records = read_records(&path).unwrap();
    assert_eq!(
        records[0].reasons,
        vec![DiffReason::DbSizeMismatch {
            source: 2,
            target: 1
        }]
    );
    assert!(records[0].key.is_empty());
    assert_eq!(
        records[1].reasons,
        vec![DiffReason::KeyMissingInTarget { key: "b".into() }]
    );
}

#[tokio::test]
async fn test_bulk_run_replays_structurally() {
    let dir = TempDir::new().unwrap();
    let (source, target) = stores();
    source.set_list("l", &["a", "b"]);
    target.set_list("l", &["a", "c"]);

    let plan = PassPlan {
        times: 2,
        interval: Duration::ZERO,
    };
    let run = CompareRun::bulk(
        erase(&source),
        erase(&target),
        Vec::new(),
        options(dir.path()),
        plan,
    );
    assert_eq!(run.mode(), CompareMode::Bulk);

    let summaries = run.run().await.unwrap();
    let replayed = read_records(summaries[1].result_file.as_ref().unwrap()).unwrap();
    assert!(matches!(
        replayed[0].reasons.as_slice(),
        [DiffReason::ListIndexMismatch { index: 1, .. }]
    ));
}

#[tokio::test]
async fn test_scan_failure_still_finishes_the_pass() {
    let dir = TempDir::new().unwrap();
    let (source, target) = stores();
    seed(&source, &target);
    source.fail_on("SCAN");

    let compare = SingleCompare::new(erase(&source), erase(&target), options(dir.path()));
    let summary = compare
        .compare_db(&dir.path().join("x.result"))
        .await
        .unwrap();
    assert_eq!(summary.keys_compared, 0);
}

#[tokio::test]
async fn test_keys_of_different_types_are_recorded() {
    let dir = TempDir::new().unwrap();
    let (source, target) = stores();
    source.set_string("s", "a");
    target.set_list("s", &["a"]);
    source.set_set("m", &["m"]);
    target.set_zset("m", &[("m", "1")]);

    let compare = SingleCompare::new(erase(&source), erase(&target), options(dir.path()));
    let path = dir.path().join("pass.result");
    let summary = compare.compare_db(&path).await.unwrap();

    assert_eq!(summary.keys_compared, 2);
    assert_eq!(summary.mismatches, 2);
    let found = reasons(&read_records(&path).unwrap());
    assert!(found
        .iter()
        .all(|r| matches!(r, DiffReason::TypeMismatch { .. })));
    assert!(found.contains(&DiffReason::TypeMismatch {
        source: "set".into(),
        target: "zset".into()
    }));
    assert!(found.contains(&DiffReason::TypeMismatch {
        source: "string".into(),
        target: "list".into()
    }));
}
