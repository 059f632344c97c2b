//! Connection options.

use crate::{StoreError, StoreResult};

/// How to reach one side of the comparison.
#[derive(Debug, Clone, Default)]
pub struct ConnectOptions {
    /// `host:port` of the node, or of every cluster master when `cluster` is set.
    pub addresses: Vec<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Logical database. Clusters only serve database 0.
    pub db: i64,
    pub cluster: bool,
}

impl ConnectOptions {
    pub fn single(address: impl Into<String>, db: i64) -> Self {
        Self {
            addresses: vec![address.into()],
            db,
            ..Default::default()
        }
    }

    pub fn with_password(mut self, password: Option<String>) -> Self {
        self.password = password.filter(|p| !p.is_empty());
        self
    }

    pub fn validate(&self) -> StoreResult<()> {
        if self.addresses.is_empty() {
            return Err(StoreError::InvalidOptions(
                "at least one address is required".to_string(),
            ));
        }
        if !self.cluster && self.addresses.len() > 1 {
            return Err(StoreError::InvalidOptions(format!(
                "{} addresses given for a single-node deployment",
                self.addresses.len()
            )));
        }
        if self.cluster && self.db != 0 {
            return Err(StoreError::InvalidOptions(format!(
                "cluster deployments only support db 0, got {}",
                self.db
            )));
        }
        Ok(())
    }

    /// `redis://host:port/db` for one address. Credentials are applied
    /// separately so they never need URL escaping.
    pub(crate) fn url_for(&self, address: &str) -> String {
        let address = address
            .trim_start_matches("redis://")
            .trim_end_matches('/');
        format!("redis://{address}/{}", self.db)
    }
}
