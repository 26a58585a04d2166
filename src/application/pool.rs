use crate::domain::config::PoolConfig;
use crate::domain::ports::{DatabasePoolRef, PoolConnectorRef};
use crate::error::{Result, ServiceError};
use tokio::sync::watch;
use tracing::{error, info};

/// Lifecycle of the worker's connection pool.
#[derive(Clone)]
pub enum PoolState {
    Initializing,
    Ready(DatabasePoolRef),
    Failed(String),
}

impl PoolState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Ready(_) => "ready",
            Self::Failed(_) => "failed",
        }
    }
}

/// Owns the single connection pool of a worker process.
///
/// The pool is built in the background once; [`ConnectionPoolManager::ready`]
/// is the only way to reach it and resolves after construction finished, so no
/// query can observe an uninitialized pool. Clones share the same pool.
#[derive(Clone)]
pub struct ConnectionPoolManager {
    state: watch::Receiver<PoolState>,
}

impl ConnectionPoolManager {
    /// Starts building the pool. Must be called from within a tokio runtime.
    pub fn initialize(config: PoolConfig, connector: PoolConnectorRef) -> Self {
        let (tx, rx) = watch::channel(PoolState::Initializing);

        tokio::spawn(async move {
            let state = match connector.connect(config).await {
                Ok(pool) => {
                    info!("database pool initialized");
                    PoolState::Ready(pool)
                }
                Err(err) => {
                    error!(error = %err, "database pool initialization failed");
                    PoolState::Failed(err.to_string())
                }
            };
            // Fails only when every manager handle is gone.
            let _ = tx.send(state);
        });

        Self { state: rx }
    }

    pub fn state(&self) -> PoolState {
        self.state.borrow().clone()
    }

    /// Waits until the pool is built.
    pub async fn ready(&self) -> Result<DatabasePoolRef> {
        let mut rx = self.state.clone();
        let state = rx
            .wait_for(|state| !matches!(state, PoolState::Initializing))
            .await
            .map_err(|_| {
                ServiceError::PoolUnavailable("pool initialization was abandoned".to_string())
            })?;

        match &*state {
            PoolState::Ready(pool) => Ok(pool.clone()),
            PoolState::Failed(reason) => Err(ServiceError::PoolUnavailable(reason.clone())),
            PoolState::Initializing => Err(ServiceError::PoolNotReady),
        }
    }

    /// Non-blocking access; `PoolNotReady` while the pool is still being built.
    pub fn try_ready(&self) -> Result<DatabasePoolRef> {
        match &*self.state.borrow() {
            PoolState::Ready(pool) => Ok(pool.clone()),
            PoolState::Failed(reason) => Err(ServiceError::PoolUnavailable(reason.clone())),
            PoolState::Initializing => Err(ServiceError::PoolNotReady),
        }
    }

    /// Waits for the pool and issues a trivial round trip.
    ///
    /// Failures are logged and returned, never escalated: a database that is
    /// briefly unreachable at startup does not take the worker down.
    pub async fn verify_connectivity(&self) -> Result<String> {
        let outcome = match self.ready().await {
            Ok(pool) => pool.ping().await,
            Err(err) => Err(err),
        };

        match &outcome {
            Ok(now) => info!(server_time = %now, "database connection successful"),
            Err(err) => error!(error = %err, "database connection check failed"),
        }
        outcome
    }
}
