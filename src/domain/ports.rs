use super::config::PoolConfig;
use super::registration::{ServiceNode, ServiceRegistration};
use super::transaction::PaymentTransaction;
use super::worker::{WorkerExit, WorkerIdentity};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Key-value, agent and catalog operations of the discovery registry.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Raw value stored under `key`, `None` when the key does not exist.
    async fn get_value(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn register_service(&self, registration: &ServiceRegistration) -> Result<()>;
    async fn deregister_service(&self, service_id: &str) -> Result<()>;
    /// May legitimately be empty.
    async fn list_service_nodes(&self, service_name: &str) -> Result<Vec<ServiceNode>>;
}

pub type RegistryClientRef = Arc<dyn RegistryClient>;

/// A ready pool of database connections.
#[async_trait]
pub trait DatabasePool: Send + Sync {
    /// Trivial round trip, returns the server's current time.
    async fn ping(&self) -> Result<String>;
    async fn insert_transaction(&self, tx: &PaymentTransaction) -> Result<PaymentTransaction>;
}

pub type DatabasePoolRef = Arc<dyn DatabasePool>;

#[async_trait]
pub trait PoolConnector: Send + Sync {
    async fn connect(&self, config: PoolConfig) -> Result<DatabasePoolRef>;
}

pub type PoolConnectorRef = Arc<dyn PoolConnector>;

/// Handle on a running worker process.
#[async_trait]
pub trait WorkerProcess: Send {
    fn pid(&self) -> Option<u32>;
    /// Resolves once the process has exited.
    async fn wait(&mut self) -> Result<WorkerExit>;
    /// Asks the process to terminate, forcing it after `grace`.
    async fn stop(&mut self, grace: Duration) -> Result<WorkerExit>;
}

pub type WorkerProcessBox = Box<dyn WorkerProcess>;

#[async_trait]
pub trait WorkerSpawner: Send + Sync {
    async fn spawn(&self, identity: WorkerIdentity) -> Result<WorkerProcessBox>;
}

pub type WorkerSpawnerRef = Arc<dyn WorkerSpawner>;
