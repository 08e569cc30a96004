//! RemoteRegistry port
//! The domain manager's registration surface as seen from this node

use crate::domain::ports::EventSink;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Failures raised by the remote registry
#[derive(Debug, Error, Clone)]
pub enum RegistryError {
    /// The registry is temporarily unreachable
    #[error("registry transiently unavailable")]
    Transient,

    /// The registry object is still being constructed
    #[error("registry object does not exist yet")]
    ObjectNotExist,

    /// The registry rejected the registration
    #[error("registration rejected: {0}")]
    Rejected(String),

    /// The registry did not accept the passed reference
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    #[error("registry failure: {0}")]
    Failure(String),
}

impl RegistryError {
    /// Transient and not-yet-constructed conditions are retried indefinitely;
    /// rejections and invalid references are terminal.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient | Self::ObjectNotExist)
    }
}

/// Registration payload for this manager
#[derive(Debug, Clone)]
pub struct ManagerRegistration {
    pub identifier: String,
    pub label: String,
    pub ior: String,
    pub profile_path: String,
    pub hostname: String,
}

/// Registration payload for a device
#[derive(Debug, Clone)]
pub struct DeviceRegistration {
    pub identifier: String,
    pub label: String,
    pub ior: String,
    pub manager_ior: String,
}

/// Registration payload for a service
#[derive(Debug, Clone)]
pub struct ServiceRegistration {
    pub name: String,
    pub ior: String,
    pub manager_ior: String,
}

/// Port for the remote domain manager
#[async_trait]
pub trait RemoteRegistry: Send + Sync {
    async fn register_manager(&self, manager: ManagerRegistration) -> Result<(), RegistryError>;

    async fn unregister_manager(&self, identifier: &str) -> Result<(), RegistryError>;

    async fn register_device(&self, device: DeviceRegistration) -> Result<(), RegistryError>;

    async fn unregister_device(&self, ior: &str) -> Result<(), RegistryError>;

    async fn register_service(&self, service: ServiceRegistration) -> Result<(), RegistryError>;

    async fn unregister_service(&self, name: &str) -> Result<(), RegistryError>;

    /// Access a named event channel, if the registry hosts one
    async fn event_channel(&self, name: &str) -> Result<Arc<dyn EventSink>, RegistryError>;

    /// Allow `retries` reconnect attempts on a stale connection before a call
    /// fails; applied once after the registry has been located
    fn set_reconnect_policy(&self, retries: u32);
}
