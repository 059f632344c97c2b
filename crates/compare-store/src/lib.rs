//! Connection provider for redis-compare.
//!
//! The comparison engine never talks to a client library directly. It works
//! against the [`KeyValueStore`] trait, which exposes exactly the read-only
//! commands the comparators need. Two implementations ship here:
//!
//! - [`RedisStore`] - a single node or a cluster, backed by the `redis` crate
//! - [`MemoryStore`] - an in-process store with Redis scan semantics, used by
//!   the test suites
//!
//! Nothing in this trait mutates the compared data.

mod config;
mod error;
pub mod memory;
mod redis_store;
pub mod slots;

pub use config::ConnectOptions;
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use redis_store::RedisStore;

use std::collections::BTreeMap;

use async_trait::async_trait;
use compare_core::Endpoint;

/// A member and its raw score string, as returned by `ZSCAN`.
pub type ScoredMember = (Vec<u8>, String);

/// Read-only access to one deployment.
///
/// Scans follow Redis semantics: start at cursor 0, stop when the returned
/// cursor is 0 again. Results within a page are unordered and may repeat
/// across pages.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Identity written into diff records.
    fn endpoint(&self) -> Endpoint;

    /// Logical database index.
    fn db(&self) -> i64;

    /// Number of independently scannable shards (1 for a single node).
    fn shard_count(&self) -> usize {
        1
    }

    async fn ping(&self) -> StoreResult<()>;

    /// `SCAN cursor COUNT count` against one shard.
    async fn scan(&self, shard: usize, cursor: u64, count: usize)
        -> StoreResult<(u64, Vec<String>)>;

    /// `DBSIZE`, summed across shards.
    async fn dbsize(&self) -> StoreResult<u64>;

    /// Raw `TYPE` reply (`none` for a missing key).
    async fn key_type(&self, key: &str) -> StoreResult<String>;

    async fn exists(&self, key: &str) -> StoreResult<bool>;

    /// `PTTL` reply: -2 missing, -1 persistent, otherwise milliseconds left.
    async fn pttl(&self, key: &str) -> StoreResult<i64>;

    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    async fn llen(&self, key: &str) -> StoreResult<u64>;

    /// `LRANGE key start stop`, both bounds inclusive.
    async fn lrange(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<Vec<u8>>>;

    async fn scard(&self, key: &str) -> StoreResult<u64>;

    async fn sscan(&self, key: &str, cursor: u64, count: usize)
        -> StoreResult<(u64, Vec<Vec<u8>>)>;

    async fn sismember(&self, key: &str, member: &[u8]) -> StoreResult<bool>;

    async fn hlen(&self, key: &str) -> StoreResult<u64>;

    async fn hscan(
        &self,
        key: &str,
        cursor: u64,
        count: usize,
    ) -> StoreResult<(u64, Vec<(Vec<u8>, Vec<u8>)>)>;

    async fn hget(&self, key: &str, field: &[u8]) -> StoreResult<Option<Vec<u8>>>;

    async fn zcard(&self, key: &str) -> StoreResult<u64>;

    async fn zscan(&self, key: &str, cursor: u64, count: usize)
        -> StoreResult<(u64, Vec<ScoredMember>)>;

    async fn zrank(&self, key: &str, member: &[u8]) -> StoreResult<Option<u64>>;

    async fn zscore(&self, key: &str, member: &[u8]) -> StoreResult<Option<f64>>;

    /// Pipelined `DUMP` of every key, in input order. Missing keys are `None`.
    async fn dump_batch(&self, keys: &[String]) -> StoreResult<Vec<Option<Vec<u8>>>>;

    /// `CONFIG GET pattern` as a name → value map.
    async fn config_get(&self, pattern: &str) -> StoreResult<BTreeMap<String, String>>;
}

/// Split a flat `[a, b, c, d]` reply into `[(a, b), (c, d)]`.
/// A trailing unpaired element is dropped.
pub(crate) fn pairs<T>(flat: Vec<T>) -> Vec<(T, T)> {
    let mut out = Vec::with_capacity(flat.len() / 2);
    let mut iter = flat.into_iter();
    while let (Some(a), Some(b)) = (iter.next(), iter.next()) {
        out.push((a, b));
    }
    out
}
