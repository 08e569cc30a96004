//! Loopback Registry
//! RemoteRegistry adapter for single-node deployments without a reachable
//! domain manager: registrations are accepted, recorded, and logged

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::info;

use crate::domain::ports::{
    DeviceRegistration, EventSink, ManagerRegistration, RegistryError, RemoteRegistry,
    ServiceRegistration,
};

/// In-process registry standing in for a remote domain manager
#[derive(Default)]
pub struct LoopbackRegistry {
    managers: Mutex<HashMap<String, ManagerRegistration>>,
    devices: Mutex<HashMap<String, DeviceRegistration>>,
    services: Mutex<HashMap<String, ServiceRegistration>>,
}

impl LoopbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn device_count(&self) -> usize {
        self.devices.lock().unwrap().len()
    }

    pub fn service_count(&self) -> usize {
        self.services.lock().unwrap().len()
    }
}

#[async_trait]
impl RemoteRegistry for LoopbackRegistry {
    async fn register_manager(&self, manager: ManagerRegistration) -> Result<(), RegistryError> {
        info!(
            manager = %manager.label,
            host = %manager.hostname,
            "Manager registered (loopback domain)"
        );
        self.managers
            .lock()
            .unwrap()
            .insert(manager.identifier.clone(), manager);
        Ok(())
    }

    async fn unregister_manager(&self, identifier: &str) -> Result<(), RegistryError> {
        self.managers.lock().unwrap().remove(identifier);
        Ok(())
    }

    async fn register_device(&self, device: DeviceRegistration) -> Result<(), RegistryError> {
        info!(device = %device.label, "Device registered (loopback domain)");
        self.devices
            .lock()
            .unwrap()
            .insert(device.ior.clone(), device);
        Ok(())
    }

    async fn unregister_device(&self, ior: &str) -> Result<(), RegistryError> {
        self.devices.lock().unwrap().remove(ior);
        Ok(())
    }

    async fn register_service(&self, service: ServiceRegistration) -> Result<(), RegistryError> {
        info!(service = %service.name, "Service registered (loopback domain)");
        self.services
            .lock()
            .unwrap()
            .insert(service.name.clone(), service);
        Ok(())
    }

    async fn unregister_service(&self, name: &str) -> Result<(), RegistryError> {
        self.services.lock().unwrap().remove(name);
        Ok(())
    }

    async fn event_channel(&self, name: &str) -> Result<Arc<dyn EventSink>, RegistryError> {
        Err(RegistryError::Failure(format!("no channel: {}", name)))
    }

    fn set_reconnect_policy(&self, _retries: u32) {}
}
