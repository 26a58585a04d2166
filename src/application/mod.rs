//! Application layer: worker supervision and the per-worker service lifecycle.
//!
//! The supervisor owns worker processes; each worker fetches its database
//! configuration from the registry, builds its connection pool behind a
//! readiness gate and registers itself for discovery.

pub mod config_fetcher;
pub mod pool;
pub mod registrar;
pub mod status;
pub mod supervisor;
pub mod worker;
