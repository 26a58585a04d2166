//! Domain types and the ports the rest of the service plugs into.

pub mod config;
pub mod ports;
pub mod registration;
pub mod transaction;
pub mod worker;
