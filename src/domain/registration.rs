use crate::domain::worker::WorkerSpec;
use serde::{Deserialize, Serialize, Serializer};
use std::time::Duration;

pub const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(10);
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEREGISTER_CRITICAL_AFTER: Duration = Duration::from_secs(30);

/// A service instance as submitted to the registry's agent API.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceRegistration {
    pub name: String,
    #[serde(rename = "ID")]
    pub id: String,
    pub address: String,
    pub port: u16,
    pub checks: Vec<HealthCheck>,
}

impl ServiceRegistration {
    /// Registration for one worker: `<service>-<identity>` with an HTTP check on `/health`.
    pub fn for_worker(spec: &WorkerSpec) -> Self {
        let port = spec.port();
        Self {
            name: spec.service_name.clone(),
            id: spec.service_id(),
            address: spec.advertise_address.clone(),
            port,
            checks: vec![HealthCheck {
                name: format!("{}-health-check", spec.service_name),
                http: format!("http://{}:{}/health", spec.advertise_address, port),
                interval: HEALTH_CHECK_INTERVAL,
                timeout: HEALTH_CHECK_TIMEOUT,
                deregister_after: DEREGISTER_CRITICAL_AFTER,
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthCheck {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "HTTP")]
    pub http: String,
    #[serde(rename = "Interval", serialize_with = "serialize_duration")]
    pub interval: Duration,
    #[serde(rename = "Timeout", serialize_with = "serialize_duration")]
    pub timeout: Duration,
    #[serde(
        rename = "DeregisterCriticalServiceAfter",
        serialize_with = "serialize_duration"
    )]
    pub deregister_after: Duration,
}

/// Renders a duration the way the registry expects it (`10s`, `1500ms`).
pub fn format_duration(duration: Duration) -> String {
    if duration.subsec_millis() == 0 {
        format!("{}s", duration.as_secs())
    } else {
        format!("{}ms", duration.as_millis())
    }
}

fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_duration(*duration))
}

/// One entry of a catalog lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ServiceNode {
    #[serde(rename = "Node", default)]
    pub node: String,
    #[serde(rename = "Address", default)]
    pub address: String,
    #[serde(rename = "ServiceID", default)]
    pub service_id: String,
    #[serde(rename = "ServiceAddress", default)]
    pub service_address: String,
    #[serde(rename = "ServicePort", default)]
    pub service_port: u16,
}

impl ServiceNode {
    /// Address/port pair to reach the service; falls back to the node address.
    pub fn endpoint(&self) -> (&str, u16) {
        let address = if self.service_address.is_empty() {
            &self.address
        } else {
            &self.service_address
        };
        (address, self.service_port)
    }
}
