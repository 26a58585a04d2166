use crate::domain::ports::WorkerSpawnerRef;
use crate::domain::worker::{WorkerExit, WorkerIdentity};
use crate::error::Result;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::time::Duration;
use tokio::task::{self, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// How long a worker gets to drain and deregister before it is killed.
pub const STOP_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug)]
struct WorkerEntry {
    pid: Option<u32>,
    cancel: CancellationToken,
}

/// Live workers keyed by identity. Identities are unique by construction.
#[derive(Debug, Default)]
pub struct WorkerTable {
    entries: BTreeMap<WorkerIdentity, WorkerEntry>,
}

impl WorkerTable {
    fn insert(&mut self, identity: WorkerIdentity, entry: WorkerEntry) {
        self.entries.insert(identity, entry);
    }

    fn remove(&mut self, identity: WorkerIdentity) -> Option<WorkerEntry> {
        self.entries.remove(&identity)
    }

    pub fn identities(&self) -> Vec<WorkerIdentity> {
        self.entries.keys().copied().collect()
    }

    pub fn pid(&self, identity: WorkerIdentity) -> Option<u32> {
        self.entries.get(&identity).and_then(|entry| entry.pid)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lowest identity in `1..=capacity` not held by a live worker.
    pub fn next_free(&self, capacity: u16) -> Option<WorkerIdentity> {
        WorkerIdentity::all(capacity).find(|identity| !self.entries.contains_key(identity))
    }
}

/// Master process logic: keeps exactly `worker_count` workers alive.
///
/// Every worker runs behind a task that resolves when its process exits; on
/// each exit the lowest free identity is respawned, so the live identity set
/// returns to `1..=N` and identities are reused instead of growing.
pub struct WorkerSupervisor {
    spawner: WorkerSpawnerRef,
    worker_count: u16,
    table: WorkerTable,
    exits: JoinSet<(WorkerIdentity, Result<WorkerExit>)>,
    /// Monitor task of each live worker, so a panicked monitor still names its worker.
    monitors: HashMap<task::Id, WorkerIdentity>,
    shutdown: CancellationToken,
}

impl WorkerSupervisor {
    pub fn new(spawner: WorkerSpawnerRef, worker_count: u16) -> Self {
        Self {
            spawner,
            worker_count: worker_count.max(1),
            table: WorkerTable::default(),
            exits: JoinSet::new(),
            monitors: HashMap::new(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn worker_count(&self) -> u16 {
        self.worker_count
    }

    pub fn table(&self) -> &WorkerTable {
        &self.table
    }

    pub fn live_identities(&self) -> Vec<WorkerIdentity> {
        self.table.identities()
    }

    /// Spawns workers `1..=N`. A spawn failure here aborts startup.
    pub async fn start(&mut self) -> Result<()> {
        info!(
            pid = std::process::id(),
            workers = self.worker_count,
            "starting worker pool"
        );
        for identity in WorkerIdentity::all(self.worker_count) {
            self.launch(identity).await?;
        }
        Ok(())
    }

    async fn launch(&mut self, identity: WorkerIdentity) -> Result<()> {
        let mut process = self.spawner.spawn(identity).await?;
        let pid = process.pid();
        let cancel = self.shutdown.child_token();

        self.table.insert(
            identity,
            WorkerEntry {
                pid,
                cancel: cancel.clone(),
            },
        );
        info!(worker_id = %identity, ?pid, "worker started");

        let monitor = self.exits.spawn(async move {
            let exited = tokio::select! {
                exit = process.wait() => Some(exit),
                _ = cancel.cancelled() => None,
            };
            let exit = match exited {
                Some(exit) => exit,
                None => process.stop(STOP_GRACE).await,
            };
            (identity, exit)
        });
        self.monitors.insert(monitor.id(), identity);
        Ok(())
    }

    /// Asks one worker to stop. Its exit is healed like any other.
    pub fn recycle(&self, identity: WorkerIdentity) -> bool {
        match self.table.entries.get(&identity) {
            Some(entry) => {
                entry.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Waits for the next worker exit and starts its replacement.
    ///
    /// Returns the identity given to the replacement, or `None` when nothing
    /// was restarted (no workers left, or the respawn failed).
    pub async fn supervise_once(&mut self) -> Option<WorkerIdentity> {
        let (identity, exit) = match self.exits.join_next_with_id().await? {
            Ok((monitor, (identity, exit))) => {
                self.monitors.remove(&monitor);
                (identity, exit.map_err(|err| err.to_string()))
            }
            // The worker handle went down with the monitor and its process was killed on drop.
            Err(err) => match self.monitors.remove(&err.id()) {
                Some(identity) => (identity, Err(format!("worker monitor task failed: {}", err))),
                None => {
                    error!(error = %err, "unknown worker monitor task failed");
                    return None;
                }
            },
        };

        let pid = self.table.remove(identity).and_then(|entry| entry.pid);
        match exit {
            Ok(reason) => warn!(worker_id = %identity, ?pid, %reason, "worker exited; restarting"),
            Err(err) => warn!(worker_id = %identity, ?pid, error = %err, "lost track of worker; restarting"),
        }

        self.heal().await
    }

    async fn heal(&mut self) -> Option<WorkerIdentity> {
        let Some(identity) = self.table.next_free(self.worker_count) else {
            warn!("every worker identity is live; nothing to restart");
            return None;
        };

        info!(worker_id = %identity, "restarting worker");
        match self.launch(identity).await {
            Ok(()) => Some(identity),
            Err(err) => {
                error!(worker_id = %identity, error = %err, "failed to restart worker");
                None
            }
        }
    }

    /// Stops every worker and waits for them to exit.
    pub async fn shutdown(&mut self) {
        self.shutdown.cancel();
        while let Some(joined) = self.exits.join_next().await {
            match joined {
                Ok((identity, Ok(reason))) => info!(worker_id = %identity, %reason, "worker stopped"),
                Ok((identity, Err(err))) => warn!(worker_id = %identity, error = %err, "worker stop failed"),
                Err(err) => error!(error = %err, "worker monitor task failed"),
            }
        }
        self.table = WorkerTable::default();
        self.monitors.clear();
    }

    /// Starts the pool and heals it until `signal` resolves, then stops every worker.
    pub async fn run<F>(mut self, signal: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        if let Err(err) = self.start().await {
            self.shutdown().await;
            return Err(err);
        }

        tokio::pin!(signal);
        loop {
            tokio::select! {
                _ = &mut signal => {
                    info!("shutdown requested; stopping workers");
                    break;
                }
                restarted = self.supervise_once() => {
                    if restarted.is_none() && self.exits.is_empty() {
                        error!("no live workers remain; supervisor exiting");
                        break;
                    }
                }
            }
        }

        self.shutdown().await;
        Ok(())
    }
}
