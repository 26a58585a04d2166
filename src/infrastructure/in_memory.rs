use crate::domain::config::PoolConfig;
use crate::domain::ports::{DatabasePool, DatabasePoolRef, PoolConnector, RegistryClient};
use crate::domain::registration::{ServiceNode, ServiceRegistration};
use crate::domain::transaction::PaymentTransaction;
use crate::error::{Result, ServiceError};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// A thread-safe in-memory registry.
///
/// Holds key-value entries and registered services behind `Arc<RwLock<..>>` so
/// clones share state. Can be switched offline to simulate an unreachable registry.
#[derive(Default, Clone)]
pub struct InMemoryRegistry {
    values: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    services: Arc<RwLock<BTreeMap<String, ServiceRegistration>>>,
    offline: Arc<AtomicBool>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_value(&self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        let mut values = self.values.write().await;
        values.insert(key.into(), value.into());
    }

    /// While offline every call fails with `RegistryUnavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Registered services ordered by service ID.
    pub async fn registrations(&self) -> Vec<ServiceRegistration> {
        let services = self.services.read().await;
        services.values().cloned().collect()
    }

    fn ensure_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(ServiceError::RegistryUnavailable(
                "registry is offline".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RegistryClient for InMemoryRegistry {
    async fn get_value(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.ensure_online()?;
        let values = self.values.read().await;
        Ok(values.get(key).cloned())
    }

    async fn register_service(&self, registration: &ServiceRegistration) -> Result<()> {
        self.ensure_online()?;
        let mut services = self.services.write().await;
        services.insert(registration.id.clone(), registration.clone());
        Ok(())
    }

    async fn deregister_service(&self, service_id: &str) -> Result<()> {
        self.ensure_online()?;
        let mut services = self.services.write().await;
        services.remove(service_id);
        Ok(())
    }

    async fn list_service_nodes(&self, service_name: &str) -> Result<Vec<ServiceNode>> {
        self.ensure_online()?;
        let services = self.services.read().await;
        Ok(services
            .values()
            .filter(|registration| registration.name == service_name)
            .map(|registration| ServiceNode {
                node: "in-memory".to_string(),
                address: registration.address.clone(),
                service_id: registration.id.clone(),
                service_address: registration.address.clone(),
                service_port: registration.port,
            })
            .collect())
    }
}

/// A thread-safe in-memory transactions table.
#[derive(Default, Clone)]
pub struct InMemoryDatabase {
    transactions: Arc<RwLock<Vec<PaymentTransaction>>>,
    failing: Arc<AtomicBool>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// While failing every query returns `QueryExecution`.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn transactions(&self) -> Vec<PaymentTransaction> {
        self.transactions.read().await.clone()
    }

    fn ensure_reachable(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(ServiceError::QueryExecution(
                "connection refused".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DatabasePool for InMemoryDatabase {
    async fn ping(&self) -> Result<String> {
        self.ensure_reachable()?;
        Ok(chrono::Utc::now().to_rfc3339())
    }

    async fn insert_transaction(&self, tx: &PaymentTransaction) -> Result<PaymentTransaction> {
        self.ensure_reachable()?;
        let mut transactions = self.transactions.write().await;
        transactions.push(tx.clone());
        Ok(tx.clone())
    }
}

/// Connector handing out a shared [`InMemoryDatabase`], recording every config it receives.
#[derive(Default, Clone)]
pub struct InMemoryConnector {
    database: InMemoryDatabase,
    configs: Arc<RwLock<Vec<PoolConfig>>>,
}

impl InMemoryConnector {
    pub fn new(database: InMemoryDatabase) -> Self {
        Self {
            database,
            configs: Arc::default(),
        }
    }

    pub async fn configs(&self) -> Vec<PoolConfig> {
        self.configs.read().await.clone()
    }
}

#[async_trait]
impl PoolConnector for InMemoryConnector {
    async fn connect(&self, config: PoolConfig) -> Result<DatabasePoolRef> {
        self.configs.write().await.push(config);
        Ok(Arc::new(self.database.clone()))
    }
}
