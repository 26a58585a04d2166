use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Outcome of one background startup task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum TaskOutcome {
    #[default]
    Pending,
    Succeeded(String),
    Failed(String),
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct StartupReport {
    pub registration: TaskOutcome,
    pub discovery: TaskOutcome,
    pub connectivity: TaskOutcome,
}

/// Startup task outcomes shared between the tasks and the `/status` endpoint.
#[derive(Debug, Clone, Default)]
pub struct WorkerStatus {
    report: Arc<RwLock<StartupReport>>,
}

impl WorkerStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> StartupReport {
        self.report.read().await.clone()
    }

    pub async fn set_registration(&self, outcome: TaskOutcome) {
        self.report.write().await.registration = outcome;
    }

    pub async fn set_discovery(&self, outcome: TaskOutcome) {
        self.report.write().await.discovery = outcome;
    }

    pub async fn set_connectivity(&self, outcome: TaskOutcome) {
        self.report.write().await.connectivity = outcome;
    }
}
