//! Structural, per-type key comparison.
//!
//! `TYPE` on the source picks a pipeline of checks. Checks run in order and
//! the first one that reports a difference ends the comparison of that key:
//!
//! | type   | pipeline                                    |
//! |--------|---------------------------------------------|
//! | string | existence, value, ttl                       |
//! | list   | existence, length, ttl, index windows       |
//! | set    | existence, length, ttl, member containment  |
//! | hash   | existence, length, field values             |
//! | zset   | existence, length, ttl, member scores       |
//!
//! A target key holding another type is reported before the pipeline runs.

mod existence;
mod hash;
mod list;
mod set;
mod string;
mod ttl;
mod zset;

use std::sync::Arc;

use compare_core::{DiffReason, DiffRecord, KeyType, PairIdentity};
use compare_store::{KeyValueStore, StoreResult};
use tracing::{error, info};

use crate::recorder::ResultRecorder;
use crate::{CompareOptions, Result};

/// `TYPE` reply for a missing key.
const NO_KEY: &str = "none";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Check {
    Existence,
    Length,
    Ttl,
    Content,
}

fn pipeline(key_type: KeyType) -> &'static [Check] {
    use Check::*;
    match key_type {
        KeyType::String => &[Existence, Content, Ttl],
        KeyType::Hash => &[Existence, Length, Content],
        KeyType::List | KeyType::Set | KeyType::Zset => &[Existence, Length, Ttl, Content],
    }
}

/// Compares keys between one source and one target.
#[derive(Clone)]
pub struct PairComparator {
    source: Arc<dyn KeyValueStore>,
    target: Arc<dyn KeyValueStore>,
    pair: PairIdentity,
    batch_size: usize,
    ttl_diff_ms: i64,
}

impl PairComparator {
    pub fn new(
        source: Arc<dyn KeyValueStore>,
        target: Arc<dyn KeyValueStore>,
        options: &CompareOptions,
    ) -> Self {
        let pair = PairIdentity {
            source: source.endpoint(),
            target: target.endpoint(),
            source_db: source.db(),
            target_db: target.db(),
        };
        Self {
            source,
            target,
            pair,
            batch_size: options.batch_size.max(1),
            ttl_diff_ms: options.ttl_diff_ms,
        }
    }

    pub fn pair(&self) -> &PairIdentity {
        &self.pair
    }

    pub fn source(&self) -> Arc<dyn KeyValueStore> {
        self.source.clone()
    }

    /// Classify `key` on the source and run its pipeline.
    ///
    /// Returns `None` when the key has no comparable type (missing on the
    /// source, or a type without a comparator). A key stored as another
    /// type on the target is a `TypeMismatch` and runs no further checks.
    pub async fn compare_key(&self, key: &str) -> StoreResult<Option<DiffRecord>> {
        let reply = self.source.key_type(key).await?;
        let Some(key_type) = KeyType::from_type_reply(&reply) else {
            info!(key, key_type = %reply, "No type find in compare list");
            return Ok(None);
        };

        let target_reply = self.target.key_type(key).await?;
        if target_reply != NO_KEY && target_reply != reply {
            let record = self
                .pair
                .record(key, Some(key_type))
                .mismatch(DiffReason::TypeMismatch {
                    source: reply,
                    target: target_reply,
                });
            return Ok(Some(record));
        }
        self.compare_typed(key, key_type).await.map(Some)
    }

    /// Run the pipeline for a key whose type is already known.
    pub async fn compare_typed(&self, key: &str, key_type: KeyType) -> StoreResult<DiffRecord> {
        let record = self.pair.record(key, Some(key_type));
        for check in pipeline(key_type) {
            if let Some(reason) = self.run_check(*check, key, key_type).await? {
                return Ok(record.mismatch(reason));
            }
        }
        Ok(record)
    }

    async fn run_check(
        &self,
        check: Check,
        key: &str,
        key_type: KeyType,
    ) -> StoreResult<Option<DiffReason>> {
        let (source, target) = (self.source.as_ref(), self.target.as_ref());
        match check {
            Check::Existence => existence::compare_existence(source, target, key).await,
            Check::Length => existence::compare_length(source, target, key, key_type).await,
            Check::Ttl => ttl::compare_ttl(source, target, key, self.ttl_diff_ms).await,
            Check::Content => match key_type {
                KeyType::String => string::compare_value(source, target, key).await,
                KeyType::List => list::compare_items(source, target, key, self.batch_size).await,
                KeyType::Set => set::compare_members(source, target, key, self.batch_size).await,
                KeyType::Hash => hash::compare_fields(source, target, key, self.batch_size).await,
                KeyType::Zset => zset::compare_scores(source, target, key, self.batch_size).await,
            },
        }
    }

    /// Compare every key, recording mismatches.
    ///
    /// Store failures are logged and the key skipped; only recorder errors
    /// end the batch. Returns how many keys were compared.
    pub async fn compare_keys(&self, keys: &[String], recorder: &ResultRecorder) -> Result<u64> {
        let mut compared = 0;
        for key in keys {
            match self.compare_key(key).await {
                Ok(Some(record)) => {
                    compared += 1;
                    recorder.record(&record)?;
                }
                Ok(None) => {}
                Err(e) => error!(key = %key, "Comparison failed: {}", e),
            }
        }
        Ok(compared)
    }
}

/// Lossy text form of a binary value, as written into reasons.
pub(crate) fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
