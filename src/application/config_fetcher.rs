use crate::domain::config::{DEFAULT_POOL_KEY, PoolConfig};
use crate::domain::ports::RegistryClientRef;
use crate::error::{Result, ServiceError};
use tracing::info;

/// Reads the database configuration from the registry's key-value store.
///
/// There is no retry and no fallback configuration: the caller treats any
/// error as fatal for the worker.
pub struct ConfigFetcher {
    registry: RegistryClientRef,
    key: String,
}

impl ConfigFetcher {
    pub fn new(registry: RegistryClientRef) -> Self {
        Self {
            registry,
            key: DEFAULT_POOL_KEY.to_string(),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub async fn fetch(&self) -> Result<PoolConfig> {
        let value = self.registry.get_value(&self.key).await?;
        let bytes = match value {
            Some(bytes) if !bytes.iter().all(u8::is_ascii_whitespace) => bytes,
            _ => {
                return Err(ServiceError::ConfigNotFound {
                    key: self.key.clone(),
                });
            }
        };

        let config = PoolConfig::from_slice(&bytes)?;
        info!(
            key = %self.key,
            host = %config.host,
            port = config.port,
            database = %config.database,
            "database configuration fetched"
        );
        Ok(config)
    }
}
