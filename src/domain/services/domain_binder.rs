//! Domain Binder
//! Owns this manager's registration with the remote domain registry:
//! locate, register with retry through transient faults, unregister on
//! shutdown.

use std::sync::Arc;
use std::sync::RwLock;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::constants::{
    DOMAIN_RESOLVE_POLL, IDM_CHANNEL_NAME, MANAGER_REGISTER_LOG_EVERY, MANAGER_REGISTER_RETRY,
};
use crate::domain::ports::{
    EventSink, ManagerRegistration, NameDirectory, RegistryError, RemoteRegistry,
};
use crate::domain::value_objects::ManagerIdentity;
use crate::domain::{DomainError, Result};

/// Shared handles to the domain, filled in once binding succeeds
///
/// Readers clone the Arc out under the lock; no lock is ever held across an
/// outbound call.
#[derive(Default)]
pub struct DomainLink {
    registry: RwLock<Option<Arc<dyn RemoteRegistry>>>,
    event_sink: RwLock<Option<Arc<dyn EventSink>>>,
}

impl DomainLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> Option<Arc<dyn RemoteRegistry>> {
        self.registry.read().unwrap().clone()
    }

    pub fn set_registry(&self, registry: Arc<dyn RemoteRegistry>) {
        *self.registry.write().unwrap() = Some(registry);
    }

    pub fn event_sink(&self) -> Option<Arc<dyn EventSink>> {
        self.event_sink.read().unwrap().clone()
    }

    pub fn set_event_sink(&self, sink: Arc<dyn EventSink>) {
        *self.event_sink.write().unwrap() = Some(sink);
    }
}

/// Manager-level registration lifecycle
pub struct DomainBinder {
    identity: ManagerIdentity,
    directory: Arc<dyn NameDirectory>,
    link: Arc<DomainLink>,
    shutdown: CancellationToken,
}

impl DomainBinder {
    pub fn new(
        identity: ManagerIdentity,
        directory: Arc<dyn NameDirectory>,
        link: Arc<DomainLink>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            identity,
            directory,
            link,
            shutdown,
        }
    }

    /// Locate the domain registry in the naming directory, retrying until it
    /// appears. A single warning is logged on the first failure; a shutdown
    /// observed mid-wait aborts the loop.
    async fn locate_registry(&self) -> Result<Arc<dyn RemoteRegistry>> {
        let path = self.identity.registry_path();
        info!(registry = %path, "Connecting to domain manager");

        let mut warned_missing = false;
        loop {
            match self.directory.resolve_registry(&path).await {
                Ok(registry) => {
                    debug!(registry = %path, "Resolved domain registry");
                    return Ok(registry);
                }
                Err(e) => {
                    if !warned_missing {
                        warned_missing = true;
                        warn!(registry = %path, error = %e, "Domain manager not found in directory; retrying");
                    }
                }
            }

            // Give the domain manager a chance to bind itself before the
            // next attempt.
            sleep(DOMAIN_RESOLVE_POLL).await;

            if self.shutdown.is_cancelled() {
                debug!("Interrupted while waiting to locate the domain manager");
                return Err(DomainError::Cancelled);
            }
        }
    }

    /// Locate the registry and register this manager with it
    ///
    /// Transient and not-yet-constructed faults are retried indefinitely;
    /// rejections and invalid-reference responses are terminal.
    pub async fn register_manager(&self) -> Result<()> {
        let registry = self.locate_registry().await?;

        // The registry reference may outlive a domain manager restart; allow
        // one reconnect on a stale connection.
        registry.set_reconnect_policy(1);

        debug!("Registering with the domain manager");
        let mut attempts: u64 = 0;
        loop {
            if self.shutdown.is_cancelled() {
                return Err(DomainError::Cancelled);
            }
            attempts += 1;
            match registry
                .register_manager(ManagerRegistration {
                    identifier: self.identity.identifier.clone(),
                    label: self.identity.label.clone(),
                    ior: self.identity.ior.clone(),
                    profile_path: self.identity.profile_path.clone(),
                    hostname: self.identity.hostname.clone(),
                })
                .await
            {
                Ok(()) => break,
                Err(e) if e.is_retryable() => {
                    if attempts % MANAGER_REGISTER_LOG_EVERY == 0 {
                        warn!(
                            attempts = attempts,
                            error = %e,
                            "Domain manager not available; retrying"
                        );
                    }
                    sleep(MANAGER_REGISTER_RETRY).await;
                }
                Err(RegistryError::Rejected(msg)) => {
                    error!(error = %msg, "Failed to register with the domain manager");
                    return Err(DomainError::RegisterError(msg));
                }
                Err(RegistryError::InvalidReference(msg)) => {
                    error!(error = %msg, "Domain manager rejected this manager's reference");
                    return Err(DomainError::InvalidReference(msg));
                }
                Err(e) => {
                    error!(error = %e, "Failure registering with the domain manager");
                    return Err(DomainError::FatalInit(format!(
                        "Error registering with the domain manager: {}",
                        e
                    )));
                }
            }
        }

        self.link.set_registry(registry.clone());
        self.subscribe_event_channel(&registry).await;
        Ok(())
    }

    /// Subscribe to the device-state event channel; a missing channel is not
    /// an error.
    async fn subscribe_event_channel(&self, registry: &Arc<dyn RemoteRegistry>) {
        match registry.event_channel(IDM_CHANNEL_NAME).await {
            Ok(sink) => {
                debug!(channel = IDM_CHANNEL_NAME, "Subscribed to event channel");
                self.link.set_event_sink(sink);
            }
            Err(e) => {
                info!(
                    channel = IDM_CHANNEL_NAME,
                    error = %e,
                    "Event channel not found; continuing without it"
                );
            }
        }
    }

    /// Best-effort withdrawal on shutdown; every failure is swallowed
    pub async fn unregister_manager(&self) {
        if let Some(sink) = self.link.event_sink() {
            sink.release().await;
            debug!("Released event channel subscription");
        }
        if let Some(registry) = self.link.registry() {
            if let Err(e) = registry.unregister_manager(&self.identity.identifier).await {
                debug!(error = %e, "unregisterManager failed during shutdown");
            } else {
                debug!("Unregistered from the domain manager");
            }
        }
    }
}
