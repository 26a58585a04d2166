use crate::domain::ports::RegistryClientRef;
use crate::domain::registration::ServiceRegistration;
use crate::domain::worker::WorkerSpec;
use crate::error::Result;
use tracing::info;

/// Registration lifecycle of one worker in the discovery registry.
pub struct ServiceRegistrar {
    registry: RegistryClientRef,
}

impl ServiceRegistrar {
    pub fn new(registry: RegistryClientRef) -> Self {
        Self { registry }
    }

    /// Registers the worker as `<service>-<identity>` with its `/health` check attached.
    pub async fn register(&self, spec: &WorkerSpec) -> Result<ServiceRegistration> {
        let registration = ServiceRegistration::for_worker(spec);
        self.registry.register_service(&registration).await?;
        info!(
            service_id = %registration.id,
            address = %registration.address,
            port = registration.port,
            "registered with registry"
        );
        Ok(registration)
    }

    pub async fn deregister(&self, service_id: &str) -> Result<()> {
        self.registry.deregister_service(service_id).await?;
        info!(%service_id, "deregistered from registry");
        Ok(())
    }
}
