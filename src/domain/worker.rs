use crate::error::{Result, ServiceError};
use serde::Serialize;
use std::fmt;
use std::process::ExitStatus;
use std::str::FromStr;

pub const DEFAULT_BASE_PORT: u16 = 3033;
pub const DEFAULT_SERVICE_NAME: &str = "Payment";

/// Stable numeric identity of a worker process, always in `1..=N`.
///
/// The identity decides both the bound port (`base_port + identity`) and the
/// registry service ID (`<service>-<identity>`), so a restarted worker that
/// reuses an identity is indistinguishable from the one it replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct WorkerIdentity(u16);

impl WorkerIdentity {
    pub fn new(value: u16) -> Result<Self> {
        if value == 0 {
            Err(ServiceError::InvalidWorkerId(
                "worker ids start at 1".to_string(),
            ))
        } else {
            Ok(Self(value))
        }
    }

    pub fn get(self) -> u16 {
        self.0
    }

    /// Every identity of a pool of `count` workers, lowest first.
    pub fn all(count: u16) -> impl Iterator<Item = WorkerIdentity> {
        (1..=count).map(Self)
    }
}

impl TryFrom<u16> for WorkerIdentity {
    type Error = ServiceError;

    fn try_from(value: u16) -> Result<Self> {
        Self::new(value)
    }
}

impl FromStr for WorkerIdentity {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self> {
        let value = s
            .trim()
            .parse::<u16>()
            .map_err(|_| ServiceError::InvalidWorkerId(format!("'{}' is not a worker id", s)))?;
        Self::new(value)
    }
}

impl fmt::Display for WorkerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Immutable configuration of one worker, handed over when the worker starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSpec {
    pub identity: WorkerIdentity,
    pub base_port: u16,
    pub service_name: String,
    /// Address announced to the registry and used by its health check.
    pub advertise_address: String,
    /// Interface the HTTP listener binds to.
    pub bind_host: String,
    /// Registry key holding the serialized database configuration.
    pub pool_key: String,
    /// Service looked up in the catalog once at startup.
    pub discovery_target: Option<String>,
}

impl WorkerSpec {
    pub fn new(
        identity: WorkerIdentity,
        base_port: u16,
        service_name: impl Into<String>,
    ) -> Result<Self> {
        if base_port.checked_add(identity.get()).is_none() {
            return Err(ServiceError::PortOutOfRange {
                base_port,
                identity: identity.get(),
            });
        }

        Ok(Self {
            identity,
            base_port,
            service_name: service_name.into(),
            advertise_address: "localhost".to_string(),
            bind_host: "0.0.0.0".to_string(),
            pool_key: crate::domain::config::DEFAULT_POOL_KEY.to_string(),
            discovery_target: None,
        })
    }

    pub fn with_advertise_address(mut self, address: impl Into<String>) -> Self {
        self.advertise_address = address.into();
        self
    }

    pub fn with_bind_host(mut self, host: impl Into<String>) -> Self {
        self.bind_host = host.into();
        self
    }

    pub fn with_pool_key(mut self, key: impl Into<String>) -> Self {
        self.pool_key = key.into();
        self
    }

    pub fn with_discovery_target(mut self, target: Option<String>) -> Self {
        self.discovery_target = target;
        self
    }

    /// Port this worker binds, `base_port + identity`. Overflow is rejected in [`WorkerSpec::new`].
    pub fn port(&self) -> u16 {
        self.base_port + self.identity.get()
    }

    pub fn service_id(&self) -> String {
        format!("{}-{}", self.service_name, self.identity)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_host, self.port())
    }
}

/// Why a worker process went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Normal exit with status code.
    Exited(i32),
    /// Killed by the given signal number.
    Signaled(i32),
    Unknown,
}

impl WorkerExit {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Exited(0))
    }
}

impl From<ExitStatus> for WorkerExit {
    fn from(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return Self::Exited(code);
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return Self::Signaled(signal);
            }
        }

        Self::Unknown
    }
}

impl fmt::Display for WorkerExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "exited with code {}", code),
            Self::Signaled(signal) => write!(f, "killed by signal {}", signal),
            Self::Unknown => write!(f, "unknown reason"),
        }
    }
}
