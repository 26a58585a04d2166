//! Worker processes started by re-executing a program with the `worker` subcommand.

use crate::domain::ports::{WorkerProcess, WorkerProcessBox, WorkerSpawner};
use crate::domain::worker::{WorkerExit, WorkerIdentity};
use crate::error::{Result, ServiceError};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::warn;

/// Spawns `<program> <args..> worker --worker-id <N>`.
#[derive(Debug, Clone)]
pub struct ProcessSpawner {
    program: PathBuf,
    args: Vec<String>,
    envs: Vec<(String, String)>,
}

impl ProcessSpawner {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            envs: Vec::new(),
        }
    }

    /// Re-executes the running binary.
    pub fn current_exe(args: Vec<String>) -> Result<Self> {
        let program = std::env::current_exe().map_err(|e| {
            ServiceError::Spawn(format!("failed to locate current executable: {}", e))
        })?;
        Ok(Self::new(program, args))
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }
}

#[async_trait]
impl WorkerSpawner for ProcessSpawner {
    async fn spawn(&self, identity: WorkerIdentity) -> Result<WorkerProcessBox> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg("worker")
            .arg("--worker-id")
            .arg(identity.to_string())
            .env_remove("WORKER_ID")
            .envs(self.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let child = command
            .spawn()
            .map_err(|e| ServiceError::Spawn(format!("worker {}: {}", identity, e)))?;

        Ok(Box::new(ChildProcess { child }))
    }
}

struct ChildProcess {
    child: Child,
}

impl ChildProcess {
    #[cfg(unix)]
    fn request_termination(&self) {
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        if let Some(pid) = self.child.id()
            && let Err(err) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM)
        {
            warn!(pid, %err, "failed to send SIGTERM to worker");
        }
    }

    #[cfg(not(unix))]
    fn request_termination(&self) {}
}

#[async_trait]
impl WorkerProcess for ChildProcess {
    fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    async fn wait(&mut self) -> Result<WorkerExit> {
        Ok(self.child.wait().await?.into())
    }

    async fn stop(&mut self, grace: Duration) -> Result<WorkerExit> {
        self.request_termination();
        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(status) => Ok(status?.into()),
            Err(_) => {
                warn!(pid = ?self.child.id(), "worker ignored SIGTERM; killing");
                self.child.kill().await?;
                Ok(self.child.wait().await?.into())
            }
        }
    }
}
