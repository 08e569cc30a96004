//! ChildObject port
//! The remote surface a registering device or service exposes to the manager

use crate::domain::profile::PropertyValue;
use async_trait::async_trait;
use thiserror::Error;

/// Failures raised by calls on a child reference
///
/// These are remapped to `DomainError::InvalidReference` inside the
/// registration protocol; transport-level detail never reaches callers.
#[derive(Debug, Error, Clone)]
pub enum ChildCallError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Some properties were applied, others were not
    #[error("partial configuration: {0}")]
    PartialConfiguration(String),

    #[error("initialize failed: {0}")]
    InitializeFailed(String),

    #[error("transport failure: {0}")]
    Transport(String),
}

/// Remote operations on a registered (or registering) child
#[async_trait]
pub trait ChildObject: Send + Sync {
    /// Opaque stringified reference; stable for the lifetime of the child
    /// and usable as a lookup key
    fn stringified(&self) -> String;

    async fn identifier(&self) -> Result<String, ChildCallError>;

    async fn label(&self) -> Result<String, ChildCallError>;

    async fn software_profile(&self) -> Result<String, ChildCallError>;

    /// Deliver construct-time property values before `initialize`
    async fn initialize_properties(
        &self,
        properties: &[PropertyValue],
    ) -> Result<(), ChildCallError>;

    async fn initialize(&self) -> Result<(), ChildCallError>;

    /// Deliver configure-kind property values after `initialize`
    async fn configure(&self, properties: &[PropertyValue]) -> Result<(), ChildCallError>;

    /// Ask the child to release itself and exit
    async fn release_object(&self) -> Result<(), ChildCallError>;
}
