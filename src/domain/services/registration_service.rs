//! Registration Service
//! Inbound registration and unregistration of devices and services
//!
//! Devices and services follow one protocol: shutdown gate, nil check,
//! duplicate check, profile lookup, property initialization, initialize,
//! configure, name binding, bucket promotion, upstream forwarding. The
//! registry mutex is taken only for the bucket update and never across an
//! outbound call.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::constants::{DEFAULT_CLIENT_WAIT_TIME_MS, DEFAULT_DEVICE_FORCE_QUIT_TIME_SEC};
use crate::domain::entities::ChildRecord;
use crate::domain::ports::{
    ChildCallError, ChildObject, DeviceRegistration, FileView, NameDirectory, ServiceRegistration,
    StateChange, StateEvent,
};
use crate::domain::profile::ProgramProfile;
use crate::domain::services::{ChildRegistry, DeploymentLedger};
use crate::domain::services::domain_binder::DomainLink;
use crate::domain::value_objects::{AdminState, AdminStateCell, ChildKind, ManagerIdentity};
use crate::domain::{DomainError, Result};

/// Runtime-writable manager settings
///
/// `DEVICE_FORCE_QUIT_TIME` and `CLIENT_WAIT_TIME` are writable configuration
/// properties; they are stored atomically so readers never block.
pub struct ManagerSettings {
    /// f64 seconds, stored as bit pattern
    device_force_quit_time: AtomicU64,
    client_wait_time_ms: AtomicU64,
}

impl ManagerSettings {
    pub fn new() -> Self {
        Self {
            device_force_quit_time: AtomicU64::new(DEFAULT_DEVICE_FORCE_QUIT_TIME_SEC.to_bits()),
            client_wait_time_ms: AtomicU64::new(DEFAULT_CLIENT_WAIT_TIME_MS),
        }
    }

    pub fn device_force_quit_time(&self) -> Duration {
        Duration::from_secs_f64(f64::from_bits(
            self.device_force_quit_time.load(Ordering::Relaxed),
        ))
    }

    pub fn set_device_force_quit_time(&self, seconds: f64) {
        self.device_force_quit_time
            .store(seconds.to_bits(), Ordering::Relaxed);
    }

    pub fn client_wait_time(&self) -> Duration {
        Duration::from_millis(self.client_wait_time_ms.load(Ordering::Relaxed))
    }

    pub fn set_client_wait_time_ms(&self, millis: u64) {
        self.client_wait_time_ms.store(millis, Ordering::Relaxed);
    }
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self::new()
    }
}

/// Handles the four inbound registration operations
pub struct RegistrationService {
    identity: ManagerIdentity,
    admin: Arc<AdminStateCell>,
    registry: Arc<ChildRegistry>,
    ledger: Arc<DeploymentLedger>,
    directory: Arc<dyn NameDirectory>,
    file_view: Arc<dyn FileView>,
    link: Arc<DomainLink>,
    settings: Arc<ManagerSettings>,
}

impl RegistrationService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        identity: ManagerIdentity,
        admin: Arc<AdminStateCell>,
        registry: Arc<ChildRegistry>,
        ledger: Arc<DeploymentLedger>,
        directory: Arc<dyn NameDirectory>,
        file_view: Arc<dyn FileView>,
        link: Arc<DomainLink>,
        settings: Arc<ManagerSettings>,
    ) -> Self {
        Self {
            identity,
            admin,
            registry,
            ledger,
            directory,
            file_view,
            link,
            settings,
        }
    }

    /// Bound outbound call on a child reference; a call that exceeds
    /// `CLIENT_WAIT_TIME` counts as a transport failure
    async fn bounded<T, F>(&self, future: F) -> std::result::Result<T, ChildCallError>
    where
        F: std::future::Future<Output = std::result::Result<T, ChildCallError>>,
    {
        match timeout(self.settings.client_wait_time(), future).await {
            Ok(result) => result,
            Err(_) => Err(ChildCallError::Transport(
                "call exceeded client wait time".to_string(),
            )),
        }
    }

    /// Register a device with this manager
    pub async fn register_device(&self, device: Option<Arc<dyn ChildObject>>) -> Result<()> {
        // Do not service a registration request while shutting down
        if self.admin.load().is_shutting_down() {
            return Ok(());
        }

        let device = device.ok_or_else(|| {
            warn!("Attempted to register nil device");
            DomainError::InvalidReference(
                "Cannot register device. The registering device is a nil reference.".to_string(),
            )
        })?;

        let ior = device.stringified();
        let label = self
            .bounded(device.label())
            .await
            .map_err(|e| DomainError::InvalidReference(format!("Device label unavailable: {}", e)))?;
        let identifier = self.bounded(device.identifier()).await.map_err(|e| {
            DomainError::InvalidReference(format!("Device identifier unavailable: {}", e))
        })?;
        info!(
            device = %label,
            identifier = %identifier,
            manager = %self.identity.label,
            "Registering device"
        );

        if self.registry.find_by_ior(&ior).is_some() {
            warn!(device = %label, "Device is already registered");
            return Ok(());
        }

        let profile = self.device_profile(&device, &identifier, &label).await?;

        self.drive_child_lifecycle(&device, &profile, &label).await?;

        // Bind into the naming directory under this manager's context. A
        // collision means something already owns the name; treat the device
        // as registered.
        let path = self.identity.child_path(&label);
        if let Err(e) = self.directory.bind(&path, &ior).await {
            warn!(device = %label, error = %e, "Device is already registered");
            return Ok(());
        }

        if !self
            .registry
            .promote_to_registered(&identifier, &label, &ior, device.clone())
        {
            let record = ChildRecord::external(
                identifier.as_str(),
                label.as_str(),
                ior.as_str(),
                device.clone(),
                ChildKind::Device,
            );
            if !self.registry.insert_external(record) {
                warn!(device = %label, "Device is already registered");
                return Ok(());
            }
        }

        self.forward_device_registration(&label, &identifier, &ior)
            .await;
        self.publish_state(&identifier, &label, ChildKind::Device, StateChange::Added)
            .await;

        debug!(device = %label, "Done registering device");
        Ok(())
    }

    /// Register a service with this manager under `name`
    pub async fn register_service(
        &self,
        service: Option<Arc<dyn ChildObject>>,
        name: &str,
    ) -> Result<()> {
        if self.admin.load().is_shutting_down() {
            return Ok(());
        }

        let service = service.ok_or_else(|| {
            DomainError::InvalidReference(
                "Cannot register service. The registering service is a nil reference.".to_string(),
            )
        })?;

        info!(service = %name, "Registering service");

        if self.registry.find_registered_service(name).is_some() {
            warn!(service = %name, "Service is already registered");
            return Ok(());
        }

        // Configure the service when we deployed it and its profile accepts
        // properties; an externally launched service has no profile here.
        if let Some(profile) = self.ledger.profile_by_usage_name(name) {
            self.drive_child_lifecycle(&service, &profile, name).await?;
        }

        let ior = service.stringified();
        // Service usage names must be unique per service type, so a stale
        // binding is replaced rather than treated as a collision.
        let path = self.identity.child_path(name);
        if let Err(e) = self.directory.rebind(&path, &ior).await {
            warn!(service = %name, error = %e, "Service is already registered");
            return Ok(());
        }

        // The identifier of a launched service is its instantiation id; an
        // external service is keyed by its registered name.
        let identifier = self
            .ledger
            .identifier_by_usage_name(name)
            .unwrap_or_else(|| name.to_string());
        if !self
            .registry
            .promote_to_registered(&identifier, name, &ior, service.clone())
        {
            let record = ChildRecord::external(
                identifier.as_str(),
                name,
                ior.as_str(),
                service.clone(),
                ChildKind::Service,
            );
            if !self.registry.insert_external(record) {
                warn!(service = %name, "Service is already registered");
                return Ok(());
            }
        }

        self.forward_service_registration(name, &ior).await;
        self.publish_state(&identifier, name, ChildKind::Service, StateChange::Added)
            .await;

        Ok(())
    }

    /// Unregister a device by reference
    pub async fn unregister_device(&self, device: Option<Arc<dyn ChildObject>>) -> Result<()> {
        let device = device.ok_or_else(|| {
            error!("Attempt to unregister nil device");
            DomainError::InvalidReference(
                "Cannot unregister device. The registered device is a nil reference.".to_string(),
            )
        })?;

        let ior = device.stringified();
        let record = self.registry.find_by_ior(&ior).ok_or_else(|| {
            error!("Cannot unregister device. The device was not registered.");
            DomainError::InvalidReference(
                "Cannot unregister device. The device was not registered.".to_string(),
            )
        })?;

        self.registry.demote(&record.identifier);
        self.release_registration(&record).await;
        Ok(())
    }

    /// Unregister a service by reference and name
    pub async fn unregister_service(
        &self,
        service: Option<Arc<dyn ChildObject>>,
        name: &str,
    ) -> Result<()> {
        info!(service = %name, "Unregistering service");

        if service.is_none() {
            return Err(DomainError::InvalidReference(
                "Cannot unregister service. The registered service is a nil reference.".to_string(),
            ));
        }

        let record = self.registry.find_registered_service(name).ok_or_else(|| {
            DomainError::InvalidReference(
                "Cannot unregister service. The service was not registered.".to_string(),
            )
        })?;

        self.registry.demote(&record.identifier);
        self.release_registration(&record).await;
        Ok(())
    }

    /// Implicit unregistration used by the reap handler and shutdown paths:
    /// unbind the name and withdraw the upstream registration, swallowing
    /// every failure.
    pub async fn release_registration(&self, record: &ChildRecord) {
        let path = self.identity.child_path(&record.label);
        if let Err(e) = self.directory.unbind(&path).await {
            debug!(child = %record.label, error = %e, "Unable to unbind child");
        }

        // Never withdraw upstream while shutting down; the domain manager is
        // told once via unregisterManager instead.
        if self.admin.load() == AdminState::Registered {
            if let Some(remote) = self.link.registry() {
                let result = match record.kind {
                    ChildKind::Device => match &record.ior {
                        Some(ior) => remote.unregister_device(ior).await,
                        None => Ok(()),
                    },
                    ChildKind::Service => remote.unregister_service(&record.label).await,
                };
                if let Err(e) = result {
                    warn!(
                        child = %record.label,
                        error = %e,
                        "Failed to unregister child from the domain manager"
                    );
                }
            }
        }

        self.publish_state(
            &record.identifier,
            &record.label,
            record.kind,
            StateChange::Removed,
        )
        .await;
    }

    /// Locate the profile for a registering device. Devices we deployed are
    /// in the ledger; a device launched elsewhere supplies its own profile
    /// path.
    async fn device_profile(
        &self,
        device: &Arc<dyn ChildObject>,
        identifier: &str,
        label: &str,
    ) -> Result<ProgramProfile> {
        if let Some(profile) = self.ledger.profile_by_identifier(identifier) {
            debug!(
                device = %label,
                profile = %profile.id,
                "Program profile found in deployment ledger"
            );
            return Ok(profile);
        }

        let spd_path = self
            .bounded(device.software_profile())
            .await
            .map_err(|e| {
                error!(device = %label, error = %e, "Loading device's program profile failed");
                DomainError::InvalidReference(format!(
                    "Loading device's program profile failed, device: {}",
                    label
                ))
            })?;
        self.file_view.load_program_profile(&spd_path).map_err(|e| {
            error!(device = %label, error = %e, "Loading device's program profile failed");
            DomainError::InvalidReference(format!(
                "Loading device's program profile failed, device: {}",
                label
            ))
        })
    }

    /// Steps 5-7 of the registration protocol: property initialization,
    /// initialize, configure. Any failure aborts this child's registration.
    async fn drive_child_lifecycle(
        &self,
        child: &Arc<dyn ChildObject>,
        profile: &ProgramProfile,
        label: &str,
    ) -> Result<()> {
        if profile.configurable {
            let construct = profile.properties.non_nil_construct();
            debug!(
                child = %label,
                profile = %profile.name,
                properties = construct.len(),
                "Initializing properties"
            );
            self.bounded(child.initialize_properties(&construct))
                .await
                .map_err(|e| {
                    error!(child = %label, error = %e, "initializeProperties failed");
                    DomainError::InvalidReference(format!(
                        "'{}' - '{}' may not have been initialized correctly; \
                         initializeProperties failed: {}. Registration with the manager failed",
                        label, profile.id, e
                    ))
                })?;
        }

        debug!(child = %label, manager = %self.identity.label, "Initializing child");
        self.bounded(child.initialize()).await.map_err(|e| {
            error!(child = %label, error = %e, "initialize failed");
            DomainError::InvalidReference(format!(
                "'{}' initialize failed: {}. Registration with the manager failed",
                label, e
            ))
        })?;

        let configure = profile.properties.non_nil_configure();
        if !configure.is_empty() {
            debug!(
                child = %label,
                properties = configure.len(),
                "Configuring child"
            );
            self.bounded(child.configure(&configure)).await.map_err(|e| {
                error!(child = %label, error = %e, "configure failed");
                DomainError::InvalidReference(format!(
                    "'{}' - '{}' may not have been configured correctly; configure failed: {}",
                    label, profile.id, e
                ))
            })?;
        }

        Ok(())
    }

    /// Step 9 upstream half: forward a device registration when this manager
    /// is registered. Failures are logged; local state stays intact.
    async fn forward_device_registration(&self, label: &str, identifier: &str, ior: &str) {
        if self.admin.load() != AdminState::Registered {
            warn!(
                device = %label,
                "Skipping domain registerDevice because the manager isn't registered"
            );
            return;
        }
        let Some(remote) = self.link.registry() else {
            return;
        };
        info!(device = %label, domain = %self.identity.domain_name, "Registering device on domain manager");
        if let Err(e) = remote
            .register_device(DeviceRegistration {
                identifier: identifier.to_string(),
                label: label.to_string(),
                ior: ior.to_string(),
                manager_ior: self.identity.ior.clone(),
            })
            .await
        {
            error!(
                device = %label,
                error = %e,
                "Failed to register device with the domain manager"
            );
        }
    }

    async fn forward_service_registration(&self, name: &str, ior: &str) {
        if self.admin.load() != AdminState::Registered {
            warn!(
                service = %name,
                "Skipping domain registerService because the manager isn't registered"
            );
            return;
        }
        let Some(remote) = self.link.registry() else {
            return;
        };
        if let Err(e) = remote
            .register_service(ServiceRegistration {
                name: name.to_string(),
                ior: ior.to_string(),
                manager_ior: self.identity.ior.clone(),
            })
            .await
        {
            error!(
                service = %name,
                error = %e,
                "Failed to register service with the domain manager"
            );
        }
    }

    async fn publish_state(
        &self,
        identifier: &str,
        label: &str,
        kind: ChildKind,
        change: StateChange,
    ) {
        if let Some(sink) = self.link.event_sink() {
            sink.publish(StateEvent {
                identifier: identifier.to_string(),
                label: label.to_string(),
                kind,
                change,
            })
            .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::profile::{NodeProfile, PropertySet, PropertyValue};
    use crate::infrastructure::InMemoryNameDirectory;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::AtomicU32;

    struct NullFileView;

    impl FileView for NullFileView {
        fn exists(&self, _path: &str) -> bool {
            false
        }

        fn load_node_profile(&self, path: &str) -> Result<NodeProfile> {
            Err(DomainError::InternalFailure(format!(
                "no node profile: {}",
                path
            )))
        }

        fn load_program_profile(&self, path: &str) -> Result<ProgramProfile> {
            Err(DomainError::InternalFailure(format!("no profile: {}", path)))
        }

        fn load_property_set(&self, path: &str) -> Result<PropertySet> {
            Err(DomainError::InternalFailure(format!("no PRF: {}", path)))
        }

        fn local_path(&self, path: &str) -> PathBuf {
            PathBuf::from(path)
        }
    }

    /// Child that counts remote calls and optionally never answers them
    struct StubChild {
        hang: bool,
        calls: AtomicU32,
    }

    impl StubChild {
        fn new(hang: bool) -> Arc<Self> {
            Arc::new(Self {
                hang,
                calls: AtomicU32::new(0),
            })
        }

        fn call_count(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }

        async fn touch(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.hang {
                // Outlive any reasonable client wait time
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
        }
    }

    #[async_trait]
    impl ChildObject for StubChild {
        fn stringified(&self) -> String {
            "IOR:stub".to_string()
        }

        async fn identifier(&self) -> std::result::Result<String, ChildCallError> {
            self.touch().await;
            Ok("DCE:stub".to_string())
        }

        async fn label(&self) -> std::result::Result<String, ChildCallError> {
            self.touch().await;
            Ok("stub".to_string())
        }

        async fn software_profile(&self) -> std::result::Result<String, ChildCallError> {
            self.touch().await;
            Err(ChildCallError::Transport("no profile".to_string()))
        }

        async fn initialize_properties(
            &self,
            _properties: &[PropertyValue],
        ) -> std::result::Result<(), ChildCallError> {
            self.touch().await;
            Ok(())
        }

        async fn initialize(&self) -> std::result::Result<(), ChildCallError> {
            self.touch().await;
            Ok(())
        }

        async fn configure(
            &self,
            _properties: &[PropertyValue],
        ) -> std::result::Result<(), ChildCallError> {
            self.touch().await;
            Ok(())
        }

        async fn release_object(&self) -> std::result::Result<(), ChildCallError> {
            self.touch().await;
            Ok(())
        }
    }

    fn identity() -> ManagerIdentity {
        ManagerIdentity {
            identifier: "DCE:node-1".to_string(),
            label: "DevMgr_node-1".to_string(),
            domain_name: "REDHAWK_DEV".to_string(),
            ior: "devmgr:DevMgr_node-1@node-1".to_string(),
            profile_path: "/dev/nodes/node-1/dcd.json".to_string(),
            hostname: "node-1".to_string(),
        }
    }

    fn under_test(
        state: AdminState,
    ) -> (RegistrationService, Arc<ChildRegistry>, Arc<ManagerSettings>) {
        let registry = Arc::new(ChildRegistry::new());
        let settings = Arc::new(ManagerSettings::new());
        let service = RegistrationService::new(
            identity(),
            Arc::new(AdminStateCell::new(state)),
            registry.clone(),
            Arc::new(DeploymentLedger::new()),
            Arc::new(InMemoryNameDirectory::new()),
            Arc::new(NullFileView),
            Arc::new(DomainLink::new()),
            settings.clone(),
        );
        (service, registry, settings)
    }

    #[tokio::test]
    async fn test_nil_device_is_rejected() {
        let (service, registry, _settings) = under_test(AdminState::Registered);

        let result = service.register_device(None).await;

        assert!(matches!(result, Err(DomainError::InvalidReference(_))));
        assert!(registry.all_children_gone());
    }

    #[tokio::test]
    async fn test_registration_gate_while_shutting_down() {
        let (service, registry, _settings) = under_test(AdminState::ShuttingDown);
        let child = StubChild::new(false);

        // Silently ignored: no error, no side effects, no calls on the child
        service.register_device(Some(child.clone())).await.unwrap();
        service
            .register_service(Some(child.clone()), "svc")
            .await
            .unwrap();

        assert_eq!(child.call_count(), 0);
        assert!(registry.all_children_gone());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_child_call_maps_to_invalid_reference() {
        let (service, registry, settings) = under_test(AdminState::Registered);
        settings.set_client_wait_time_ms(25);
        let child = StubChild::new(true);

        let result = service.register_device(Some(child.clone())).await;

        assert!(matches!(result, Err(DomainError::InvalidReference(_))));
        // The first remote call (label) timed out; nothing else was tried
        assert_eq!(child.call_count(), 1);
        assert!(registry.all_children_gone());
    }

    #[test]
    fn test_settings_are_runtime_writable() {
        let settings = ManagerSettings::new();
        assert_eq!(settings.device_force_quit_time(), Duration::from_secs_f64(0.5));
        assert_eq!(settings.client_wait_time(), Duration::from_millis(10_000));

        settings.set_device_force_quit_time(1.5);
        settings.set_client_wait_time_ms(250);

        assert_eq!(settings.device_force_quit_time(), Duration::from_secs_f64(1.5));
        assert_eq!(settings.client_wait_time(), Duration::from_millis(250));
    }
}
