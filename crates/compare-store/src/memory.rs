//! In-process `KeyValueStore` for tests.
//!
//! Scans page through keys (and members) in sorted order using the offset as
//! the cursor, and return cursor 0 once the last page has been served, which
//! is all the comparators rely on. Expiry is not simulated: a key keeps
//! whatever PTTL it was given.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use compare_core::Endpoint;

use crate::{KeyValueStore, ScoredMember, StoreError, StoreResult};

/// A stored value.
#[derive(Debug, Clone, PartialEq)]
pub enum MemoryValue {
    String(Vec<u8>),
    List(Vec<Vec<u8>>),
    Set(BTreeSet<Vec<u8>>),
    Hash(BTreeMap<Vec<u8>, Vec<u8>>),
    /// Scores are kept as their raw string so malformed scores can be tested.
    Zset(BTreeMap<Vec<u8>, String>),
}

impl MemoryValue {
    fn type_name(&self) -> &'static str {
        match self {
            MemoryValue::String(_) => "string",
            MemoryValue::List(_) => "list",
            MemoryValue::Set(_) => "set",
            MemoryValue::Hash(_) => "hash",
            MemoryValue::Zset(_) => "zset",
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    value: MemoryValue,
    pttl: i64,
}

/// In-memory store addressed as `name`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    name: String,
    db: i64,
    data: RwLock<BTreeMap<String, Entry>>,
    config: RwLock<BTreeMap<String, String>>,
    failing: Mutex<HashSet<String>>,
}

impl MemoryStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_db(mut self, db: i64) -> Self {
        self.db = db;
        self
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Entry>> {
        self.data.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Entry>> {
        self.data.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Store `value` under `key` without expiry, replacing any previous value.
    pub fn insert(&self, key: &str, value: MemoryValue) {
        self.write()
            .insert(key.to_string(), Entry { value, pttl: -1 });
    }

    pub fn set_string(&self, key: &str, value: &str) {
        self.insert(key, MemoryValue::String(value.as_bytes().to_vec()));
    }

    pub fn set_list(&self, key: &str, items: &[&str]) {
        self.insert(
            key,
            MemoryValue::List(items.iter().map(|i| i.as_bytes().to_vec()).collect()),
        );
    }

    pub fn set_set(&self, key: &str, members: &[&str]) {
        self.insert(
            key,
            MemoryValue::Set(members.iter().map(|m| m.as_bytes().to_vec()).collect()),
        );
    }

    pub fn set_hash(&self, key: &str, fields: &[(&str, &str)]) {
        self.insert(
            key,
            MemoryValue::Hash(
                fields
                    .iter()
                    .map(|(f, v)| (f.as_bytes().to_vec(), v.as_bytes().to_vec()))
                    .collect(),
            ),
        );
    }

    pub fn set_zset(&self, key: &str, members: &[(&str, &str)]) {
        self.insert(
            key,
            MemoryValue::Zset(
                members
                    .iter()
                    .map(|(m, s)| (m.as_bytes().to_vec(), s.to_string()))
                    .collect(),
            ),
        );
    }

    /// Set the remaining time to live of an existing key.
    pub fn set_pttl(&self, key: &str, pttl: i64) {
        if let Some(entry) = self.write().get_mut(key) {
            entry.pttl = pttl;
        }
    }

    pub fn remove(&self, key: &str) {
        self.write().remove(key);
    }

    pub fn set_config(&self, name: &str, value: &str) {
        self.config
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.to_string(), value.to_string());
    }

    /// Make every later call of `command` (e.g. `"SCAN"`, `"ZSCAN"`) fail.
    pub fn fail_on(&self, command: &str) {
        self.failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(command.to_string());
    }

    fn check(&self, command: &str) -> StoreResult<()> {
        let failing = self.failing.lock().unwrap_or_else(|e| e.into_inner());
        if failing.contains(command) {
            return Err(StoreError::Injected(command.to_string()));
        }
        Ok(())
    }

    /// Run `f` on the value at `key`; `Ok(None)` when the key is missing.
    fn with_value<T>(
        &self,
        command: &str,
        key: &str,
        f: impl FnOnce(&MemoryValue) -> Option<T>,
    ) -> StoreResult<Option<T>> {
        self.check(command)?;
        let data = self.read();
        match data.get(key) {
            None => Ok(None),
            Some(entry) => f(&entry.value).map(Some).ok_or_else(|| StoreError::WrongType {
                command: command.to_string(),
                key: key.to_string(),
            }),
        }
    }
}

/// One page of `items` starting at `cursor`, plus the next cursor.
fn page<T: Clone>(items: &[T], cursor: u64, count: usize) -> (u64, Vec<T>) {
    let start = (cursor as usize).min(items.len());
    let end = (start + count.max(1)).min(items.len());
    let next = if end >= items.len() { 0 } else { end as u64 };
    (next, items[start..end].to_vec())
}

/// Resolve Redis-style inclusive, possibly negative, range bounds.
fn range_bounds(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len = len as i64;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len {
        return None;
    }
    Some((start as usize, stop as usize))
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    fn endpoint(&self) -> Endpoint {
        Endpoint::Single(self.name.clone())
    }

    fn db(&self) -> i64 {
        self.db
    }

    async fn ping(&self) -> StoreResult<()> {
        self.check("PING")
    }

    async fn scan(
        &self,
        _shard: usize,
        cursor: u64,
        count: usize,
    ) -> StoreResult<(u64, Vec<String>)> {
        self.check("SCAN")?;
        let keys: Vec<String> = self.read().keys().cloned().collect();
        Ok(page(&keys, cursor, count))
    }

    async fn dbsize(&self) -> StoreResult<u64> {
        self.check("DBSIZE")?;
        Ok(self.read().len() as u64)
    }

    async fn key_type(&self, key: &str) -> StoreResult<String> {
        self.check("TYPE")?;
        Ok(self
            .read()
            .get(key)
            .map(|e| e.value.type_name())
            .unwrap_or("none")
            .to_string())
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        self.check("EXISTS")?;
        Ok(self.read().contains_key(key))
    }

    async fn pttl(&self, key: &str) -> StoreResult<i64> {
        self.check("PTTL")?;
        Ok(self.read().get(key).map(|e| e.pttl).unwrap_or(-2))
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.with_value("GET", key, |v| match v {
            MemoryValue::String(s) => Some(s.clone()),
            _ => None,
        })
    }

    async fn llen(&self, key: &str) -> StoreResult<u64> {
        let len = self.with_value("LLEN", key, |v| match v {
            MemoryValue::List(items) => Some(items.len() as u64),
            _ => None,
        })?;
        Ok(len.unwrap_or(0))
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<Vec<u8>>> {
        let items = self.with_value("LRANGE", key, |v| match v {
            MemoryValue::List(items) => Some(match range_bounds(items.len(), start, stop) {
                Some((from, to)) => items[from..=to].to_vec(),
                None => Vec::new(),
            }),
            _ => None,
        })?;
        Ok(items.unwrap_or_default())
    }

    async fn scard(&self, key: &str) -> StoreResult<u64> {
        let len = self.with_value("SCARD", key, |v| match v {
            MemoryValue::Set(members) => Some(members.len() as u64),
            _ => None,
        })?;
        Ok(len.unwrap_or(0))
    }

    async fn sscan(
        &self,
        key: &str,
        cursor: u64,
        count: usize,
    ) -> StoreResult<(u64, Vec<Vec<u8>>)> {
        let members = self.with_value("SSCAN", key, |v| match v {
            MemoryValue::Set(members) => Some(members.iter().cloned().collect::<Vec<_>>()),
            _ => None,
        })?;
        Ok(page(&members.unwrap_or_default(), cursor, count))
    }

    async fn sismember(&self, key: &str, member: &[u8]) -> StoreResult<bool> {
        let found = self.with_value("SISMEMBER", key, |v| match v {
            MemoryValue::Set(members) => Some(members.contains(member)),
            _ => None,
        })?;
        Ok(found.unwrap_or(false))
    }

    async fn hlen(&self, key: &str) -> StoreResult<u64> {
        let len = self.with_value("HLEN", key, |v| match v {
            MemoryValue::Hash(fields) => Some(fields.len() as u64),
            _ => None,
        })?;
        Ok(len.unwrap_or(0))
    }

    async fn hscan(
        &self,
        key: &str,
        cursor: u64,
        count: usize,
    ) -> StoreResult<(u64, Vec<(Vec<u8>, Vec<u8>)>)> {
        let fields = self.with_value("HSCAN", key, |v| match v {
            MemoryValue::Hash(fields) => Some(
                fields
                    .iter()
                    .map(|(f, v)| (f.clone(), v.clone()))
                    .collect::<Vec<_>>(),
            ),
            _ => None,
        })?;
        Ok(page(&fields.unwrap_or_default(), cursor, count))
    }

    async fn hget(&self, key: &str, field: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let value = self.with_value("HGET", key, |v| match v {
            MemoryValue::Hash(fields) => Some(fields.get(field).cloned()),
            _ => None,
        })?;
        Ok(value.flatten())
    }

    async fn zcard(&self, key: &str) -> StoreResult<u64> {
        let len = self.with_value("ZCARD", key, |v| match v {
            MemoryValue::Zset(members) => Some(members.len() as u64),
            _ => None,
        })?;
        Ok(len.unwrap_or(0))
    }

    async fn zscan(
        &self,
        key: &str,
        cursor: u64,
        count: usize,
    ) -> StoreResult<(u64, Vec<ScoredMember>)> {
        let members = self.with_value("ZSCAN", key, |v| match v {
            MemoryValue::Zset(members) => Some(
                members
                    .iter()
                    .map(|(m, s)| (m.clone(), s.clone()))
                    .collect::<Vec<_>>(),
            ),
            _ => None,
        })?;
        Ok(page(&members.unwrap_or_default(), cursor, count))
    }

    async fn zrank(&self, key: &str, member: &[u8]) -> StoreResult<Option<u64>> {
        let rank = self.with_value("ZRANK", key, |v| match v {
            MemoryValue::Zset(members) => {
                let score = |s: &String| s.parse::<f64>().unwrap_or(f64::NAN);
                Some(members.get(member).map(|own| {
                    let own = score(own);
                    members.values().filter(|s| score(s) < own).count() as u64
                }))
            }
            _ => None,
        })?;
        Ok(rank.flatten())
    }

    async fn zscore(&self, key: &str, member: &[u8]) -> StoreResult<Option<f64>> {
        let score = self.with_value("ZSCORE", key, |v| match v {
            MemoryValue::Zset(members) => Some(members.get(member).and_then(|s| s.parse().ok())),
            _ => None,
        })?;
        Ok(score.flatten())
    }

    async fn dump_batch(&self, keys: &[String]) -> StoreResult<Vec<Option<Vec<u8>>>> {
        self.check("DUMP")?;
        let data = self.read();
        Ok(keys
            .iter()
            .map(|key| {
                data.get(key)
                    .map(|entry| format!("{:?}", entry.value).into_bytes())
            })
            .collect())
    }

    async fn config_get(&self, _pattern: &str) -> StoreResult<BTreeMap<String, String>> {
        self.check("CONFIG")?;
        Ok(self.config.read().unwrap_or_else(|e| e.into_inner()).clone())
    }
}
