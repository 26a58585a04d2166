#![allow(dead_code)]

use async_trait::async_trait;
use payment_service::domain::ports::{WorkerProcess, WorkerProcessBox, WorkerSpawner};
use payment_service::domain::worker::{WorkerExit, WorkerIdentity, WorkerSpec};
use payment_service::error::{Result, ServiceError};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

pub const POOL_CONFIG: &str =
    r#"{"user":"payments","host":"db.internal","database":"payments","password":"s3cret","port":5432}"#;

pub fn id(value: u16) -> WorkerIdentity {
    WorkerIdentity::new(value).unwrap()
}

pub fn ids(values: impl IntoIterator<Item = u16>) -> Vec<WorkerIdentity> {
    values.into_iter().map(id).collect()
}

/// Worker spec listening and advertising on loopback only.
pub fn loopback_spec(identity: u16, base_port: u16) -> WorkerSpec {
    WorkerSpec::new(id(identity), base_port, "Payment")
        .unwrap()
        .with_bind_host("127.0.0.1")
        .with_advertise_address("127.0.0.1")
}

/// A base port such that `base + 1..=base + count` are currently free on loopback.
pub fn free_base_port(count: u16) -> u16 {
    loop {
        let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let first = probe.local_addr().unwrap().port();
        drop(probe);

        if first < 1025 || first.checked_add(count).is_none() {
            continue;
        }
        let listeners: Vec<_> = (0..count)
            .map(|offset| std::net::TcpListener::bind(("127.0.0.1", first + offset)))
            .collect();
        if listeners.iter().all(|listener| listener.is_ok()) {
            return first - 1;
        }
    }
}

/// Polls `check` until it holds, panicking after roughly five seconds.
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..250 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not met in time");
}

enum FakeExit {
    Code(i32),
    /// Makes the waiting monitor task panic.
    Panic,
}

#[derive(Default)]
struct SpawnerState {
    spawned: Vec<WorkerIdentity>,
    exits: HashMap<WorkerIdentity, oneshot::Sender<FakeExit>>,
    stopped: Vec<WorkerIdentity>,
    next_pid: u32,
    fail_on: Option<WorkerIdentity>,
}

/// Spawner handing out fake processes whose exits are triggered by the test.
#[derive(Clone, Default)]
pub struct FakeSpawner {
    state: Arc<Mutex<SpawnerState>>,
}

impl FakeSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawning `identity` fails.
    pub fn failing_on(identity: WorkerIdentity) -> Self {
        let spawner = Self::default();
        spawner.state.lock().unwrap().fail_on = Some(identity);
        spawner
    }

    /// Identities in spawn order, restarts included.
    pub fn spawned(&self) -> Vec<WorkerIdentity> {
        self.state.lock().unwrap().spawned.clone()
    }

    pub fn stopped(&self) -> Vec<WorkerIdentity> {
        self.state.lock().unwrap().stopped.clone()
    }

    /// Makes the live worker `identity` exit with `code`.
    pub fn crash(&self, identity: WorkerIdentity, code: i32) -> bool {
        self.send_exit(identity, FakeExit::Code(code))
    }

    /// Panics inside the `wait` of the live worker `identity`.
    pub fn break_monitor(&self, identity: WorkerIdentity) -> bool {
        self.send_exit(identity, FakeExit::Panic)
    }

    fn send_exit(&self, identity: WorkerIdentity, exit: FakeExit) -> bool {
        let sender = self.state.lock().unwrap().exits.remove(&identity);
        sender.is_some_and(|sender| sender.send(exit).is_ok())
    }
}

#[async_trait]
impl WorkerSpawner for FakeSpawner {
    async fn spawn(&self, identity: WorkerIdentity) -> Result<WorkerProcessBox> {
        let mut state = self.state.lock().unwrap();
        if state.fail_on == Some(identity) {
            return Err(ServiceError::Spawn(format!("refusing worker {}", identity)));
        }

        let (tx, rx) = oneshot::channel();
        state.spawned.push(identity);
        state.exits.insert(identity, tx);
        state.next_pid += 1;

        Ok(Box::new(FakeProcess {
            identity,
            pid: 1000 + state.next_pid,
            exit: rx,
            state: self.state.clone(),
        }))
    }
}

struct FakeProcess {
    identity: WorkerIdentity,
    pid: u32,
    exit: oneshot::Receiver<FakeExit>,
    state: Arc<Mutex<SpawnerState>>,
}

#[async_trait]
impl WorkerProcess for FakeProcess {
    fn pid(&self) -> Option<u32> {
        Some(self.pid)
    }

    async fn wait(&mut self) -> Result<WorkerExit> {
        match (&mut self.exit).await {
            Ok(FakeExit::Code(code)) => Ok(WorkerExit::Exited(code)),
            Ok(FakeExit::Panic) => panic!("worker {} handle poisoned", self.identity),
            Err(_) => Ok(WorkerExit::Unknown),
        }
    }

    async fn stop(&mut self, _grace: Duration) -> Result<WorkerExit> {
        let mut state = self.state.lock().unwrap();
        state.stopped.push(self.identity);
        state.exits.remove(&self.identity);
        Ok(WorkerExit::Signaled(15))
    }
}
