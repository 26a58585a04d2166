//! Lifecycle of one worker process: configuration, pool, listener, registration.

use crate::application::config_fetcher::ConfigFetcher;
use crate::application::pool::ConnectionPoolManager;
use crate::application::registrar::ServiceRegistrar;
use crate::application::status::{TaskOutcome, WorkerStatus};
use crate::domain::ports::{PoolConnectorRef, RegistryClientRef};
use crate::domain::worker::WorkerSpec;
use crate::error::Result;
use crate::interfaces::http;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::{Instrument, error, info, warn};

/// Everything request handlers may touch inside one worker.
pub struct WorkerContext {
    pub spec: WorkerSpec,
    pub pool: ConnectionPoolManager,
    pub status: WorkerStatus,
}

pub type SharedContext = Arc<WorkerContext>;

pub struct Worker {
    spec: WorkerSpec,
    registry: RegistryClientRef,
    connector: PoolConnectorRef,
}

impl Worker {
    pub fn new(spec: WorkerSpec, registry: RegistryClientRef, connector: PoolConnectorRef) -> Self {
        Self {
            spec,
            registry,
            connector,
        }
    }

    /// Runs the startup sequence up to a bound listener.
    ///
    /// Order: fetch configuration, start building the pool, bind
    /// `base_port + identity`, then launch registration, the discovery probe
    /// and the connectivity check in the background. An error from the
    /// configuration fetch returns before any port is bound; the background
    /// tasks only record and log their failures.
    pub async fn start(self) -> Result<RunningWorker> {
        let Worker {
            spec,
            registry,
            connector,
        } = self;

        let config = ConfigFetcher::new(registry.clone())
            .with_key(spec.pool_key.clone())
            .fetch()
            .await?;
        let pool = ConnectionPoolManager::initialize(config, connector);

        let listener = TcpListener::bind(spec.bind_address()).await?;
        info!(
            worker_id = %spec.identity,
            address = %listener.local_addr()?,
            "worker listening"
        );

        let context = Arc::new(WorkerContext {
            spec,
            pool,
            status: WorkerStatus::new(),
        });
        let mut tasks = JoinSet::new();

        let registrar = ServiceRegistrar::new(registry.clone());
        let ctx = context.clone();
        tasks.spawn(
            async move {
                let outcome = match registrar.register(&ctx.spec).await {
                    Ok(registration) => TaskOutcome::Succeeded(registration.id),
                    Err(err) => {
                        error!(error = %err, "registration failed; serving without discoverability");
                        TaskOutcome::Failed(err.to_string())
                    }
                };
                ctx.status.set_registration(outcome).await;
            }
            .in_current_span(),
        );

        let ctx = context.clone();
        let probe_registry = registry.clone();
        tasks.spawn(
            async move {
                let Some(target) = ctx.spec.discovery_target.clone() else {
                    ctx.status.set_discovery(TaskOutcome::Skipped).await;
                    return;
                };
                let outcome = match probe_registry.list_service_nodes(&target).await {
                    Ok(nodes) => {
                        info!(service = %target, nodes = nodes.len(), "service discovery probe");
                        TaskOutcome::Succeeded(format!("{} node(s) for {}", nodes.len(), target))
                    }
                    Err(err) => {
                        error!(service = %target, error = %err, "service discovery failed");
                        TaskOutcome::Failed(err.to_string())
                    }
                };
                ctx.status.set_discovery(outcome).await;
            }
            .in_current_span(),
        );

        let ctx = context.clone();
        tasks.spawn(
            async move {
                let outcome = match ctx.pool.verify_connectivity().await {
                    Ok(server_time) => TaskOutcome::Succeeded(server_time),
                    Err(err) => TaskOutcome::Failed(err.to_string()),
                };
                ctx.status.set_connectivity(outcome).await;
            }
            .in_current_span(),
        );

        Ok(RunningWorker {
            listener,
            context,
            registrar: ServiceRegistrar::new(registry),
            tasks,
        })
    }
}

/// A worker whose port is bound and whose startup tasks are in flight.
pub struct RunningWorker {
    listener: TcpListener,
    context: SharedContext,
    registrar: ServiceRegistrar,
    tasks: JoinSet<()>,
}

impl RunningWorker {
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn context(&self) -> SharedContext {
        self.context.clone()
    }

    /// Serves HTTP until `shutdown` resolves, then deregisters the worker.
    pub async fn serve<F>(mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = http::build_router(self.context.clone());
        axum::serve(self.listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;

        self.tasks.shutdown().await;
        let service_id = self.context.spec.service_id();
        if let Err(err) = self.registrar.deregister(&service_id).await {
            warn!(%service_id, error = %err, "deregistration failed");
        }
        info!(%service_id, "worker stopped");
        Ok(())
    }
}
