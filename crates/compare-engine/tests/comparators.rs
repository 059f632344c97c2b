//! Per-type comparison behaviour against in-memory stores.

use std::sync::Arc;

use compare_core::{DiffReason, KeyType};
use compare_engine::{CompareOptions, PairComparator};
use compare_store::{KeyValueStore, MemoryStore};

struct Fixture {
    source: Arc<MemoryStore>,
    target: Arc<MemoryStore>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            source: Arc::new(MemoryStore::new("source:6379")),
            target: Arc::new(MemoryStore::new("target:6379")),
        }
    }

    fn comparator(&self, batch_size: usize) -> PairComparator {
        let options = CompareOptions {
            batch_size,
            ttl_diff_ms: 10_000,
            ..Default::default()
        };
        let source: Arc<dyn KeyValueStore> = self.source.clone();
        let target: Arc<dyn KeyValueStore> = self.target.clone();
        PairComparator::new(source, target, &options)
    }

    /// Compare `key` and return its reasons (empty when equal).
    async fn reasons(&self, key: &str) -> Vec<DiffReason> {
        self.reasons_with_batch(key, 50).await
    }

    async fn reasons_with_batch(&self, key: &str, batch_size: usize) -> Vec<DiffReason> {
        let record = self
            .comparator(batch_size)
            .compare_key(key)
            .await
            .unwrap()
            .expect("key has a comparable type");
        assert_eq!(record.is_equal, record.reasons.is_empty());
        record.reasons
    }
}

#[tokio::test]
async fn test_identical_keys_within_ttl_tolerance_are_equal() {
    let fx = Fixture::new();
    for store in [&fx.source, &fx.target] {
        store.set_string("s", "value");
        store.set_list("l", &["a", "b", "c"]);
        store.set_set("set", &["x", "y"]);
        store.set_hash("h", &[("a", "1"), ("b", "2")]);
        store.set_zset("z", &[("m", "1.5"), ("n", "2")]);
    }
    fx.source.set_pttl("s", 60_000);
    fx.target.set_pttl("s", 55_000);

    for key in ["s", "l", "set", "h", "z"] {
        assert!(fx.reasons(key).await.is_empty(), "{key} should be equal");
    }
}

#[tokio::test]
async fn test_key_missing_on_target() {
    let fx = Fixture::new();
    fx.source.set_string("k", "v");

    assert_eq!(
        fx.reasons("k").await,
        vec![DiffReason::KeyExistence {
            source: true,
            target: false
        }]
    );
}

#[tokio::test]
async fn test_key_missing_on_source_is_skipped() {
    let fx = Fixture::new();
    fx.target.set_string("k", "v");

    let outcome = fx.comparator(50).compare_key("k").await.unwrap();
    assert!(outcome.is_none());
}

#[tokio::test]
async fn test_string_value_mismatch() {
    let fx = Fixture::new();
    fx.source.set_string("k", "a");
    fx.target.set_string("k", "b");

    let record = fx.comparator(50).compare_key("k").await.unwrap().unwrap();
    assert_eq!(record.key, "k");
    assert_eq!(record.key_type, Some(KeyType::String));
    assert_eq!(
        record.reasons,
        vec![DiffReason::StringValueMismatch {
            source: "a".into(),
            target: "b".into()
        }]
    );

    let line = serde_json::to_value(&record).unwrap();
    assert_eq!(line["KeyDiffReason"][0]["sval"], "a");
    assert_eq!(line["KeyDiffReason"][0]["tval"], "b");
    assert_eq!(line["IsEqual"], false);
}

#[tokio::test]
async fn test_list_mismatch_reports_absolute_index() {
    let fx = Fixture::new();
    let items: Vec<String> = (0..120).map(|i| format!("item{i}")).collect();
    let mut other = items.clone();
    other[119] = "changed".to_string();

    let items: Vec<&str> = items.iter().map(String::as_str).collect();
    let other: Vec<&str> = other.iter().map(String::as_str).collect();
    fx.source.set_list("l", &items);
    fx.target.set_list("l", &other);

    assert_eq!(
        fx.reasons_with_batch("l", 50).await,
        vec![DiffReason::ListIndexMismatch {
            index: 119,
            source: "item119".into(),
            target: "changed".into()
        }]
    );
}

#[tokio::test]
async fn test_list_window_boundaries_are_all_checked() {
    let fx = Fixture::new();
    let items: Vec<String> = (0..101).map(|i| i.to_string()).collect();
    for changed in [49usize, 50, 100] {
        let mut other = items.clone();
        other[changed] = "x".to_string();
        let source: Vec<&str> = items.iter().map(String::as_str).collect();
        let target: Vec<&str> = other.iter().map(String::as_str).collect();
        fx.source.set_list("l", &source);
        fx.target.set_list("l", &target);

        let reasons = fx.reasons_with_batch("l", 50).await;
        assert!(
            matches!(reasons.as_slice(), [DiffReason::ListIndexMismatch { index, .. }] if *index == changed as u64),
            "index {changed}: {reasons:?}"
        );
    }
}

#[tokio::test]
async fn test_list_length_mismatch_comes_first() {
    let fx = Fixture::new();
    fx.source.set_list("l", &["a", "b"]);
    fx.target.set_list("l", &["a"]);

    assert_eq!(
        fx.reasons("l").await,
        vec![DiffReason::LengthMismatch {
            key_type: KeyType::List,
            source: 2,
            target: 1
        }]
    );
}

#[tokio::test]
async fn test_hash_field_mismatch() {
    let fx = Fixture::new();
    fx.source.set_hash("h", &[("a", "1"), ("b", "2")]);
    fx.target.set_hash("h", &[("a", "1"), ("b", "3")]);

    assert_eq!(
        fx.reasons("h").await,
        vec![DiffReason::FieldValueMismatch {
            field: "b".into(),
            source: "2".into(),
            target: "3".into()
        }]
    );
}

#[tokio::test]
async fn test_hash_ignores_ttl() {
    let fx = Fixture::new();
    fx.source.set_hash("h", &[("a", "1")]);
    fx.target.set_hash("h", &[("a", "1")]);
    fx.source.set_pttl("h", 1_000);

    assert!(fx.reasons("h").await.is_empty());
}

#[tokio::test]
async fn test_set_member_missing() {
    let fx = Fixture::new();
    fx.source.set_set("s", &["a", "b"]);
    fx.target.set_set("s", &["a", "c"]);

    assert_eq!(
        fx.reasons("s").await,
        vec![DiffReason::SetMemberMissing { member: "b".into() }]
    );
}

#[tokio::test]
async fn test_set_extra_target_member_caught_by_cardinality() {
    let fx = Fixture::new();
    fx.source.set_set("s", &["a"]);
    fx.target.set_set("s", &["a", "b"]);

    assert_eq!(
        fx.reasons("s").await,
        vec![DiffReason::LengthMismatch {
            key_type: KeyType::Set,
            source: 1,
            target: 2
        }]
    );
}

#[tokio::test]
async fn test_zset_member_missing_with_equal_cardinality() {
    let fx = Fixture::new();
    fx.source.set_zset("z", &[("a", "1"), ("m", "2")]);
    fx.target.set_zset("z", &[("a", "1"), ("other", "2")]);

    assert_eq!(
        fx.reasons("z").await,
        vec![DiffReason::ZsetMemberMissing { member: "m".into() }]
    );
}

#[tokio::test]
async fn test_zset_cardinality_reported_before_members() {
    let fx = Fixture::new();
    fx.source.set_zset("z", &[("a", "1"), ("m", "2")]);
    fx.target.set_zset("z", &[("a", "1")]);

    assert_eq!(
        fx.reasons("z").await,
        vec![DiffReason::LengthMismatch {
            key_type: KeyType::Zset,
            source: 2,
            target: 1
        }]
    );
}

#[tokio::test]
async fn test_zset_score_mismatch() {
    let fx = Fixture::new();
    fx.source.set_zset("z", &[("m", "1.5")]);
    fx.target.set_zset("z", &[("m", "2.5")]);

    assert_eq!(
        fx.reasons("z").await,
        vec![DiffReason::ZsetScoreMismatch {
            member: "m".into(),
            source_score: 1.5,
            target_score: 2.5
        }]
    );
}

#[tokio::test]
async fn test_unparsable_source_score_becomes_a_reason() {
    let fx = Fixture::new();
    fx.source.set_zset("z", &[("m", "not-a-number")]);
    fx.target.set_zset("z", &[("m", "1")]);

    let reasons = fx.reasons("z").await;
    assert!(
        matches!(reasons.as_slice(), [DiffReason::ScoreParse { member, score, .. }] if member == "m" && score == "not-a-number"),
        "{reasons:?}"
    );
}

#[tokio::test]
async fn test_ttl_difference_over_tolerance() {
    let fx = Fixture::new();
    fx.source.set_string("k", "v");
    fx.target.set_string("k", "v");
    fx.source.set_pttl("k", 5_000);
    fx.target.set_pttl("k", 20_000);

    assert_eq!(
        fx.reasons("k").await,
        vec![DiffReason::TtlMismatch {
            diff: 15_000,
            source_ttl: 5_000,
            target_ttl: 20_000
        }]
    );
}

#[tokio::test]
async fn test_persistent_versus_expiring_key() {
    let fx = Fixture::new();
    fx.source.set_set("s", &["a"]);
    fx.target.set_set("s", &["a"]);
    fx.source.set_pttl("s", 30_000);

    assert_eq!(
        fx.reasons("s").await,
        vec![DiffReason::TtlMismatch {
            diff: -30_000,
            source_ttl: 30_000,
            target_ttl: 0
        }]
    );
}

#[tokio::test]
async fn test_source_scan_failure_becomes_a_reason() {
    let fx = Fixture::new();
    fx.source.set_hash("h", &[("a", "1")]);
    fx.target.set_hash("h", &[("a", "1")]);
    fx.source.fail_on("HSCAN");

    let reasons = fx.reasons("h").await;
    assert!(
        matches!(reasons.as_slice(), [DiffReason::ScanFailed { command, .. }] if command == "HSCAN"),
        "{reasons:?}"
    );
}

#[tokio::test]
async fn test_failing_type_lookup_is_an_error() {
    let fx = Fixture::new();
    fx.source.set_string("k", "v");
    fx.source.fail_on("TYPE");

    assert!(fx.comparator(50).compare_key("k").await.is_err());
}

#[tokio::test]
async fn test_string_against_list_is_a_type_mismatch() {
    let fx = Fixture::new();
    fx.source.set_string("k", "a");
    fx.target.set_list("k", &["a"]);

    let record = fx.comparator(50).compare_key("k").await.unwrap().unwrap();
    assert_eq!(record.key_type, Some(KeyType::String));
    assert_eq!(
        record.reasons,
        vec![DiffReason::TypeMismatch {
            source: "string".into(),
            target: "list".into()
        }]
    );
}

#[tokio::test]
async fn test_set_against_zset_is_a_type_mismatch() {
    let fx = Fixture::new();
    fx.source.set_set("k", &["m"]);
    fx.target.set_zset("k", &[("m", "1")]);

    assert_eq!(
        fx.reasons("k").await,
        vec![DiffReason::TypeMismatch {
            source: "set".into(),
            target: "zset".into()
        }]
    );
}
