use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_POOL_KEY: &str = "config/db/pool";

/// Database connection parameters, stored in the registry as a JSON value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    pub user: String,
    pub host: String,
    pub database: String,
    pub password: String,
    pub port: u16,
}

impl PoolConfig {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

// Keeps the password out of logs.
impl fmt::Debug for PoolConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolConfig")
            .field("user", &self.user)
            .field("host", &self.host)
            .field("database", &self.database)
            .field("password", &"<redacted>")
            .field("port", &self.port)
            .finish()
    }
}
