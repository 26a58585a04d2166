//! Adapters for the domain ports.

pub mod consul;
pub mod in_memory;
pub mod postgres;
pub mod process;
