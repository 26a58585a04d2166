//! Command line and environment configuration.

use crate::domain::config::DEFAULT_POOL_KEY;
use crate::domain::worker::{DEFAULT_BASE_PORT, DEFAULT_SERVICE_NAME, WorkerIdentity, WorkerSpec};
use crate::error::Result;
use crate::infrastructure::consul::DEFAULT_REGISTRY_URL;
use crate::infrastructure::postgres::DEFAULT_MAX_CONNECTIONS;
use crate::logging::{LogConfig, LogFormat, parse_level};
use clap::{Args, Parser, Subcommand};
use tracing::Level;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub service: ServiceArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start and supervise the worker pool (default)
    Supervise,
    /// Run a single worker; normally started by the supervisor
    Worker {
        /// Identity of this worker, 1..=N
        #[arg(long, env = "WORKER_ID")]
        worker_id: WorkerIdentity,
    },
}

/// Options shared by the supervisor and the workers it forwards them to.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct ServiceArgs {
    /// Base port; worker N listens on base + N
    #[arg(long = "port", env = "PORT", default_value_t = DEFAULT_BASE_PORT, global = true)]
    pub base_port: u16,

    /// Number of workers [default: available parallelism]
    #[arg(long, env = "PAYMENT_WORKERS", global = true)]
    pub workers: Option<u16>,

    /// Registry HTTP address
    #[arg(long, env = "CONSUL_HTTP_ADDR", default_value = DEFAULT_REGISTRY_URL, global = true)]
    pub registry_url: String,

    /// Registry ACL token
    #[arg(long, env = "CONSUL_HTTP_TOKEN", hide_env_values = true, global = true)]
    pub registry_token: Option<String>,

    #[arg(long, env = "SERVICE_NAME", default_value = DEFAULT_SERVICE_NAME, global = true)]
    pub service_name: String,

    /// Address announced to the registry
    #[arg(long, env = "ADVERTISE_ADDRESS", default_value = "localhost", global = true)]
    pub advertise_address: String,

    /// Interface the workers listen on
    #[arg(long, env = "BIND_HOST", default_value = "0.0.0.0", global = true)]
    pub bind_host: String,

    /// Registry key holding the database configuration
    #[arg(long, env = "DB_POOL_KEY", default_value = DEFAULT_POOL_KEY, global = true)]
    pub pool_key: String,

    /// Service looked up once at startup; empty disables the probe
    #[arg(long = "discover", env = "DISCOVER_SERVICE", default_value = "review", global = true)]
    pub discover: String,

    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = DEFAULT_MAX_CONNECTIONS, global = true)]
    pub max_connections: u32,

    #[arg(long, env = "PAYMENT_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty, global = true)]
    pub log_format: LogFormat,

    #[arg(long, env = "PAYMENT_LOG_LEVEL", default_value = "info", value_parser = level_arg, global = true)]
    pub log_level: Level,
}

fn level_arg(s: &str) -> std::result::Result<Level, String> {
    parse_level(s).ok_or_else(|| format!("Unknown log level: '{}'", s))
}

pub fn default_worker_count() -> u16 {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(u16::MAX as usize) as u16
}

impl ServiceArgs {
    pub fn worker_count(&self) -> u16 {
        self.workers.unwrap_or_else(default_worker_count).max(1)
    }

    pub fn worker_spec(&self, identity: WorkerIdentity) -> Result<WorkerSpec> {
        let discovery_target = Some(self.discover.trim().to_string()).filter(|s| !s.is_empty());
        Ok(WorkerSpec::new(identity, self.base_port, self.service_name.clone())?
            .with_advertise_address(self.advertise_address.clone())
            .with_bind_host(self.bind_host.clone())
            .with_pool_key(self.pool_key.clone())
            .with_discovery_target(discovery_target))
    }

    pub fn log_config(&self) -> LogConfig {
        LogConfig::new()
            .with_level(self.log_level)
            .with_format(self.log_format)
            .with_env_overrides()
    }

    /// Arguments that hand this configuration to a worker process.
    ///
    /// The registry token is left out so it does not show up in process
    /// listings; it travels through the environment instead.
    pub fn worker_args(&self) -> Vec<String> {
        vec![
            "--port".to_string(),
            self.base_port.to_string(),
            "--registry-url".to_string(),
            self.registry_url.clone(),
            "--service-name".to_string(),
            self.service_name.clone(),
            "--advertise-address".to_string(),
            self.advertise_address.clone(),
            "--bind-host".to_string(),
            self.bind_host.clone(),
            "--pool-key".to_string(),
            self.pool_key.clone(),
            format!("--discover={}", self.discover),
            "--max-connections".to_string(),
            self.max_connections.to_string(),
            "--log-format".to_string(),
            self.log_format.to_string(),
            "--log-level".to_string(),
            self.log_level.to_string().to_lowercase(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["payment-service", "--port", "3033"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.service.base_port, 3033);
        assert_eq!(cli.service.pool_key, "config/db/pool");
        assert!(cli.service.worker_count() >= 1);
    }

    #[test]
    fn test_worker_subcommand_with_global_options() {
        let cli = Cli::try_parse_from([
            "payment-service",
            "worker",
            "--worker-id",
            "2",
            "--port",
            "4000",
            "--discover",
            "",
        ])
        .unwrap();

        let Some(Command::Worker { worker_id }) = cli.command else {
            panic!("expected worker subcommand");
        };
        let spec = cli.service.worker_spec(worker_id).unwrap();
        assert_eq!(spec.port(), 4002);
        assert_eq!(spec.service_id(), "Payment-2");
        assert_eq!(spec.discovery_target, None);
    }

    #[test]
    fn test_worker_id_zero_rejected() {
        let result = Cli::try_parse_from(["payment-service", "worker", "--worker-id", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_worker_args_reproduce_configuration() {
        let parent = Cli::try_parse_from([
            "payment-service",
            "--port",
            "5000",
            "--service-name",
            "Billing",
            "--log-format",
            "json",
            "--log-level",
            "debug",
            "--workers",
            "3",
        ])
        .unwrap()
        .service;

        let mut argv = vec!["payment-service".to_string()];
        argv.extend(parent.worker_args());
        argv.extend(["worker".into(), "--worker-id".into(), "1".into()]);
        let child = Cli::try_parse_from(argv).unwrap().service;

        assert_eq!(child.base_port, 5000);
        assert_eq!(child.service_name, "Billing");
        assert_eq!(child.log_format, LogFormat::Json);
        assert_eq!(child.log_level, Level::DEBUG);
        assert_eq!(child.discover, parent.discover);
        assert_eq!(child.registry_url, parent.registry_url);
    }
}
