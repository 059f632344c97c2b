//! `KeyValueStore` backed by the `redis` crate.

use std::collections::BTreeMap;

use async_trait::async_trait;
use compare_core::Endpoint;
use redis::aio::MultiplexedConnection;
use redis::cluster::ClusterClientBuilder;
use redis::cluster_async::ClusterConnection;
use redis::{FromRedisValue, IntoConnectionInfo, RedisResult};
use tracing::{debug, info, warn};

use crate::slots::{parse_cluster_slots, slot_coverage, CLUSTER_SLOTS};
use crate::{pairs, ConnectOptions, KeyValueStore, ScoredMember, StoreError, StoreResult};

/// Connection used for per-key commands. Cluster connections route each
/// command to the slot owner.
#[derive(Clone)]
enum Routed {
    Single(MultiplexedConnection),
    Cluster(ClusterConnection),
}

impl Routed {
    async fn query<T: FromRedisValue>(&self, cmd: &redis::Cmd) -> RedisResult<T> {
        match self {
            Routed::Single(conn) => {
                let mut conn = conn.clone();
                cmd.query_async(&mut conn).await
            }
            Routed::Cluster(conn) => {
                let mut conn = conn.clone();
                cmd.query_async(&mut conn).await
            }
        }
    }
}

/// A connected single node or cluster.
///
/// Cloning is cheap and shares the underlying multiplexed connections; open
/// a second store with [`RedisStore::connect`] when a worker needs handles of
/// its own.
#[derive(Clone)]
pub struct RedisStore {
    endpoint: Endpoint,
    db: i64,
    routed: Routed,
    /// One direct connection per node, used for SCAN and DBSIZE.
    shards: Vec<MultiplexedConnection>,
}

impl RedisStore {
    /// Connect and ping. Any failure is reported as [`StoreError::Connect`].
    pub async fn connect(opts: &ConnectOptions) -> StoreResult<Self> {
        opts.validate()?;

        let mut shards = Vec::with_capacity(opts.addresses.len());
        for address in &opts.addresses {
            shards.push(connect_node(opts, address).await?);
        }

        let (endpoint, routed) = if opts.cluster {
            (
                Endpoint::Cluster(opts.addresses.clone()),
                Routed::Cluster(connect_cluster(opts).await?),
            )
        } else {
            (
                Endpoint::Single(opts.addresses[0].clone()),
                Routed::Single(shards[0].clone()),
            )
        };

        let store = Self {
            endpoint,
            db: opts.db,
            routed,
            shards,
        };
        store.ping().await.map_err(|e| match e {
            StoreError::Redis(source) => StoreError::Connect {
                address: store.endpoint.to_string(),
                source,
            },
            other => other,
        })?;

        if opts.cluster {
            store.check_slot_coverage(&opts.addresses).await?;
        }

        info!("Connected to {} (db {})", store.endpoint, store.db);
        Ok(store)
    }

    /// Warn when the scanned nodes do not own every hash slot.
    async fn check_slot_coverage(&self, addresses: &[String]) -> StoreResult<()> {
        let mut conn = self.shard(0)?;
        let reply: redis::Value = redis::cmd("CLUSTER")
            .arg("SLOTS")
            .query_async(&mut conn)
            .await?;
        let coverage = slot_coverage(&parse_cluster_slots(&reply), addresses);
        if coverage.is_complete() {
            debug!("Scanned nodes own all {} slots", CLUSTER_SLOTS);
        } else {
            warn!(
                covered = coverage.covered,
                missing = %coverage.missing.join(","),
                "Scanned nodes own {} of {} slots, keys on the missing primaries are skipped",
                coverage.covered,
                CLUSTER_SLOTS
            );
        }
        Ok(())
    }

    fn shard(&self, shard: usize) -> StoreResult<MultiplexedConnection> {
        self.shards.get(shard).cloned().ok_or_else(|| {
            StoreError::InvalidOptions(format!(
                "shard {shard} out of range, {} shards connected",
                self.shards.len()
            ))
        })
    }
}

async fn connect_node(opts: &ConnectOptions, address: &str) -> StoreResult<MultiplexedConnection> {
    let connect_err = |source| StoreError::Connect {
        address: address.to_string(),
        source,
    };

    let mut info = opts
        .url_for(address)
        .as_str()
        .into_connection_info()
        .map_err(connect_err)?;
    info.redis.username = opts.username.clone();
    info.redis.password = opts.password.clone();

    let client = redis::Client::open(info).map_err(connect_err)?;
    let conn = client
        .get_multiplexed_async_connection()
        .await
        .map_err(connect_err)?;
    debug!("Opened connection to {}", address);
    Ok(conn)
}

async fn connect_cluster(opts: &ConnectOptions) -> StoreResult<ClusterConnection> {
    let connect_err = |source| StoreError::Connect {
        address: opts.addresses.join(","),
        source,
    };

    let nodes: Vec<String> = opts.addresses.iter().map(|a| opts.url_for(a)).collect();
    let mut builder = ClusterClientBuilder::new(nodes);
    if let Some(username) = &opts.username {
        builder = builder.username(username.clone());
    }
    if let Some(password) = &opts.password {
        builder = builder.password(password.clone());
    }
    let client = builder.build().map_err(connect_err)?;
    client.get_async_connection().await.map_err(connect_err)
}

fn key_cmd(name: &str, key: &str) -> redis::Cmd {
    let mut cmd = redis::cmd(name);
    cmd.arg(key);
    cmd
}

fn scan_cmd(name: &str, key: Option<&str>, cursor: u64, count: usize) -> redis::Cmd {
    let mut cmd = redis::cmd(name);
    if let Some(key) = key {
        cmd.arg(key);
    }
    cmd.arg(cursor).arg("COUNT").arg(count);
    cmd
}

#[async_trait]
impl KeyValueStore for RedisStore {
    fn endpoint(&self) -> Endpoint {
        self.endpoint.clone()
    }

    fn db(&self) -> i64 {
        self.db
    }

    fn shard_count(&self) -> usize {
        self.shards.len()
    }

    async fn ping(&self) -> StoreResult<()> {
        let _: String = self.routed.query(&redis::cmd("PING")).await?;
        if matches!(self.routed, Routed::Cluster(_)) {
            for conn in &self.shards {
                let mut conn = conn.clone();
                let _: String = redis::cmd("PING").query_async(&mut conn).await?;
            }
        }
        Ok(())
    }

    async fn scan(
        &self,
        shard: usize,
        cursor: u64,
        count: usize,
    ) -> StoreResult<(u64, Vec<String>)> {
        let mut conn = self.shard(shard)?;
        Ok(scan_cmd("SCAN", None, cursor, count)
            .query_async(&mut conn)
            .await?)
    }

    async fn dbsize(&self) -> StoreResult<u64> {
        let mut total = 0;
        for conn in &self.shards {
            let mut conn = conn.clone();
            let size: u64 = redis::cmd("DBSIZE").query_async(&mut conn).await?;
            total += size;
        }
        Ok(total)
    }

    async fn key_type(&self, key: &str) -> StoreResult<String> {
        Ok(self.routed.query(&key_cmd("TYPE", key)).await?)
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let count: u64 = self.routed.query(&key_cmd("EXISTS", key)).await?;
        Ok(count == 1)
    }

    async fn pttl(&self, key: &str) -> StoreResult<i64> {
        Ok(self.routed.query(&key_cmd("PTTL", key)).await?)
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.routed.query(&key_cmd("GET", key)).await?)
    }

    async fn llen(&self, key: &str) -> StoreResult<u64> {
        Ok(self.routed.query(&key_cmd("LLEN", key)).await?)
    }

    async fn lrange(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<Vec<u8>>> {
        let mut cmd = key_cmd("LRANGE", key);
        cmd.arg(start).arg(stop);
        Ok(self.routed.query(&cmd).await?)
    }

    async fn scard(&self, key: &str) -> StoreResult<u64> {
        Ok(self.routed.query(&key_cmd("SCARD", key)).await?)
    }

    async fn sscan(
        &self,
        key: &str,
        cursor: u64,
        count: usize,
    ) -> StoreResult<(u64, Vec<Vec<u8>>)> {
        Ok(self
            .routed
            .query(&scan_cmd("SSCAN", Some(key), cursor, count))
            .await?)
    }

    async fn sismember(&self, key: &str, member: &[u8]) -> StoreResult<bool> {
        let mut cmd = key_cmd("SISMEMBER", key);
        cmd.arg(member);
        let found: u64 = self.routed.query(&cmd).await?;
        Ok(found == 1)
    }

    async fn hlen(&self, key: &str) -> StoreResult<u64> {
        Ok(self.routed.query(&key_cmd("HLEN", key)).await?)
    }

    async fn hscan(
        &self,
        key: &str,
        cursor: u64,
        count: usize,
    ) -> StoreResult<(u64, Vec<(Vec<u8>, Vec<u8>)>)> {
        let (next, flat): (u64, Vec<Vec<u8>>) = self
            .routed
            .query(&scan_cmd("HSCAN", Some(key), cursor, count))
            .await?;
        Ok((next, pairs(flat)))
    }

    async fn hget(&self, key: &str, field: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let mut cmd = key_cmd("HGET", key);
        cmd.arg(field);
        Ok(self.routed.query(&cmd).await?)
    }

    async fn zcard(&self, key: &str) -> StoreResult<u64> {
        Ok(self.routed.query(&key_cmd("ZCARD", key)).await?)
    }

    async fn zscan(
        &self,
        key: &str,
        cursor: u64,
        count: usize,
    ) -> StoreResult<(u64, Vec<ScoredMember>)> {
        let (next, flat): (u64, Vec<Vec<u8>>) = self
            .routed
            .query(&scan_cmd("ZSCAN", Some(key), cursor, count))
            .await?;
        let members = pairs(flat)
            .into_iter()
            .map(|(member, score)| (member, String::from_utf8_lossy(&score).into_owned()))
            .collect();
        Ok((next, members))
    }

    async fn zrank(&self, key: &str, member: &[u8]) -> StoreResult<Option<u64>> {
        let mut cmd = key_cmd("ZRANK", key);
        cmd.arg(member);
        Ok(self.routed.query(&cmd).await?)
    }

    async fn zscore(&self, key: &str, member: &[u8]) -> StoreResult<Option<f64>> {
        let mut cmd = key_cmd("ZSCORE", key);
        cmd.arg(member);
        Ok(self.routed.query(&cmd).await?)
    }

    async fn dump_batch(&self, keys: &[String]) -> StoreResult<Vec<Option<Vec<u8>>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        match &self.routed {
            Routed::Single(conn) => {
                let mut pipe = redis::pipe();
                for key in keys {
                    pipe.cmd("DUMP").arg(key);
                }
                let mut conn = conn.clone();
                Ok(pipe.query_async(&mut conn).await?)
            }
            // Keys of one batch hash to arbitrary slots, so each DUMP is
            // routed on its own and awaited together.
            Routed::Cluster(_) => {
                let dumps = keys.iter().map(|key| async move {
                    self.routed
                        .query::<Option<Vec<u8>>>(&key_cmd("DUMP", key))
                        .await
                });
                Ok(futures::future::try_join_all(dumps).await?)
            }
        }
    }

    async fn config_get(&self, pattern: &str) -> StoreResult<BTreeMap<String, String>> {
        let mut conn = self.shard(0)?;
        let mut cmd = redis::cmd("CONFIG");
        cmd.arg("GET").arg(pattern);
        Ok(cmd.query_async(&mut conn).await?)
    }
}
