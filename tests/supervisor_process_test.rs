#![cfg(unix)]

mod common;

use common::{id, ids};
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use payment_service::application::supervisor::WorkerSupervisor;
use payment_service::infrastructure::process::ProcessSpawner;
use std::sync::Arc;

fn sleeping_spawner() -> ProcessSpawner {
    // `sh -c <script> worker --worker-id N`: the trailing words become $0.. and are ignored.
    ProcessSpawner::new("/bin/sh", vec!["-c".into(), "exec sleep 30".into()])
}

#[tokio::test]
async fn test_killed_process_is_replaced_with_same_identity() {
    let mut supervisor = WorkerSupervisor::new(Arc::new(sleeping_spawner()), 2);
    supervisor.start().await.unwrap();
    assert_eq!(supervisor.live_identities(), ids([1, 2]));

    let victim = supervisor.table().pid(id(1)).unwrap();
    let survivor = supervisor.table().pid(id(2)).unwrap();
    kill(Pid::from_raw(victim as i32), Signal::SIGKILL).unwrap();

    assert_eq!(supervisor.supervise_once().await, Some(id(1)));
    assert_eq!(supervisor.live_identities(), ids([1, 2]));

    let replacement = supervisor.table().pid(id(1)).unwrap();
    assert_ne!(replacement, victim);
    assert_eq!(supervisor.table().pid(id(2)), Some(survivor));

    supervisor.shutdown().await;
    assert!(supervisor.table().is_empty());
}
