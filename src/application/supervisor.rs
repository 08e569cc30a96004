//! Supervisor
//! Top-level coordinator: wires the planner, registry, launcher, binder,
//! registration service and shutdown engine; owns the administrative state
//! machine and the child-reap event stream.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Notify};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::constants::COMPOSITE_IOR_POLL;
use crate::domain::entities::{Bucket, ChildRecord};
use crate::domain::ports::{ChildObject, FileView, Launcher, NameDirectory, ReapEvent, RemoteRegistry};
use crate::domain::profile::{NodeProfile, ProgramProfile};
use crate::domain::services::{
    prepare_cache_directory, ChildRegistry, DeploymentLedger, DeploymentSpec, DomainBinder,
    DomainLink, ManagerSettings, ProfileResolver, RegistrationService, ShutdownEngine,
};
use crate::domain::value_objects::{
    AdminState, AdminStateCell, ChildKind, ComponentType, HostFacts, ManagerIdentity,
};
use crate::domain::{DomainError, Result};

/// Static inputs for one supervisor instance
pub struct SupervisorConfig {
    pub node_profile: NodeProfile,
    pub manager_profile: ProgramProfile,
    pub host_facts: HostFacts,
    /// This manager's own stringified reference
    pub manager_ior: String,
    /// Path of the node profile document, reported to the domain manager
    pub dcd_path: String,
    pub cache_root: PathBuf,
    pub logging_config_uri: Option<String>,
    /// Bounded call timeout for `releaseObject` during shutdown
    pub release_timeout: Duration,
}

impl SupervisorConfig {
    pub fn identity(&self) -> ManagerIdentity {
        ManagerIdentity {
            identifier: self.node_profile.id.clone(),
            label: self.node_profile.name.clone(),
            domain_name: self.node_profile.domain_name.clone(),
            ior: self.manager_ior.clone(),
            profile_path: self.dcd_path.clone(),
            hostname: self.host_facts.hostname.clone(),
        }
    }
}

/// The node-local supervisor
pub struct Supervisor {
    config: SupervisorConfig,
    identity: ManagerIdentity,
    admin: Arc<AdminStateCell>,
    internal_shutdown: CancellationToken,
    registry: Arc<ChildRegistry>,
    ledger: Arc<DeploymentLedger>,
    launcher: Arc<dyn Launcher>,
    file_view: Arc<dyn FileView>,
    link: Arc<DomainLink>,
    settings: Arc<ManagerSettings>,
    registration: Arc<RegistrationService>,
    binder: DomainBinder,
    shutdown_engine: ShutdownEngine,
    directory: Arc<dyn NameDirectory>,
    shutdown_complete: Notify,
}

impl Supervisor {
    pub fn new(
        config: SupervisorConfig,
        launcher: Arc<dyn Launcher>,
        directory: Arc<dyn NameDirectory>,
        file_view: Arc<dyn FileView>,
    ) -> Arc<Self> {
        let identity = config.identity();
        let admin = Arc::new(AdminStateCell::new(AdminState::Unregistered));
        let internal_shutdown = CancellationToken::new();
        let registry = Arc::new(ChildRegistry::new());
        let ledger = Arc::new(DeploymentLedger::new());
        let link = Arc::new(DomainLink::new());
        let settings = Arc::new(ManagerSettings::new());

        let registration = Arc::new(RegistrationService::new(
            identity.clone(),
            admin.clone(),
            registry.clone(),
            ledger.clone(),
            directory.clone(),
            file_view.clone(),
            link.clone(),
            settings.clone(),
        ));
        let binder = DomainBinder::new(
            identity.clone(),
            directory.clone(),
            link.clone(),
            internal_shutdown.clone(),
        );
        let shutdown_engine = ShutdownEngine::new(
            identity.clone(),
            registry.clone(),
            launcher.clone(),
            registration.clone(),
            directory.clone(),
            settings.clone(),
            config.release_timeout,
        );

        Arc::new(Self {
            config,
            identity,
            admin,
            internal_shutdown,
            registry,
            ledger,
            launcher,
            file_view,
            link,
            settings,
            registration,
            binder,
            shutdown_engine,
            directory,
            shutdown_complete: Notify::new(),
        })
    }

    /// Start the manager: plan, bind to the domain, launch all children.
    /// Consumes the launcher's reap channel; the reap handler keeps running
    /// in the background after this returns.
    ///
    /// A returned error is fatal; the caller aborts and exits non-zero.
    pub async fn run(
        self: &Arc<Self>,
        reap_rx: mpsc::UnboundedReceiver<ReapEvent>,
    ) -> Result<()> {
        let resolver = ProfileResolver::new(self.file_view.clone());
        let plan = resolver.plan(
            &self.config.node_profile,
            &self.config.manager_profile,
            &self.config.host_facts,
        )?;
        info!(
            implementation = %plan.manager_implementation_id,
            "Manager implementation selected"
        );

        prepare_cache_directory(&self.config.cache_root, &self.identity.label)?;

        // Reap events may arrive as soon as the first child is spawned
        let supervisor = self.clone();
        tokio::spawn(async move { supervisor.reap_loop(reap_rx).await });

        self.binder.register_manager().await?;
        if !self
            .admin
            .advance(AdminState::Unregistered, AdminState::Registered)
        {
            // A concurrent shutdown won the race; nothing left to do
            return Ok(());
        }
        info!(
            manager = %self.identity.label,
            domain = %self.identity.domain_name,
            "Manager registered with domain"
        );

        self.bind_naming_context().await?;

        for spec in &plan.standalone {
            self.launch_child(spec, None).await;
        }
        self.launch_composites(&plan.composite).await?;

        Ok(())
    }

    /// Bind this manager's naming context; a leftover binding from a prior
    /// run is replaced.
    async fn bind_naming_context(&self) -> Result<()> {
        let context = self.identity.naming_context();
        match self.directory.bind_new_context(&context).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_already_bound() => {
                warn!(context = %context, "Manager name already bound");
                self.directory.unbind(&context).await.map_err(|e| {
                    DomainError::FatalInit(format!(
                        "Unable to replace manager naming context: {}",
                        e
                    ))
                })?;
                self.directory.bind_new_context(&context).await.map_err(|e| {
                    DomainError::FatalInit(format!("Unable to create manager naming context: {}", e))
                })
            }
            Err(e) => Err(DomainError::FatalInit(format!(
                "Unable to create manager naming context: {}",
                e
            ))),
        }
    }

    /// Spawn one planned child and insert it into *pending*
    async fn launch_child(&self, spec: &DeploymentSpec, composite_ior: Option<&str>) {
        let request = self.spawn_request(spec, composite_ior);
        info!(
            child = %spec.identifier(),
            profile = %spec.profile.name,
            component_type = %spec.component_type,
            "Launching child"
        );
        match self.launcher.spawn(request).await {
            Ok(handle) => {
                self.ledger.record_deployed(spec);
                self.registry.insert_pending(ChildRecord::spawned(
                    spec.identifier(),
                    spec.label(),
                    handle.pid,
                    spec.component_type.child_kind(),
                ));
            }
            Err(e) => {
                error!(
                    child = %spec.identifier(),
                    error = %e,
                    "Skipping instantiation; launch failed"
                );
            }
        }
    }

    /// Build the launch arguments for a child, the key/value convention its
    /// runtime shell expects
    fn spawn_request(
        &self,
        spec: &DeploymentSpec,
        composite_ior: Option<&str>,
    ) -> crate::domain::ports::SpawnRequest {
        use crate::domain::ports::SpawnRequest;

        let mut request = SpawnRequest::new(spec.code_path.clone());
        match spec.component_type {
            ComponentType::Service => {
                request = request
                    .arg_pair("SERVICE_NAME", spec.label())
                    .arg_pair("DEVICE_MGR_IOR", self.identity.ior.as_str());
            }
            ComponentType::Device | ComponentType::SharedLibrary => {
                request = request
                    .arg_pair("PROFILE_NAME", spec.placement.file_ref.as_str())
                    .arg_pair("DEVICE_ID", spec.identifier())
                    .arg_pair("DEVICE_LABEL", spec.label())
                    .arg_pair("DEVICE_MGR_IOR", self.identity.ior.as_str());
                if let Some(ior) = composite_ior {
                    request = request.arg_pair("COMPOSITE_DEVICE_IOR", ior);
                }
            }
        }

        let logging = spec
            .instantiation
            .logging_config
            .clone()
            .or_else(|| self.config.logging_config_uri.clone());
        if let Some(uri) = logging {
            request = request.arg_pair("LOGGING_CONFIG_URI", uri);
        }

        for (id, value) in spec.profile.properties.exec_parameters() {
            request = request.arg_pair(id, value);
        }
        request
    }

    /// Launch composite children once their parents are live
    async fn launch_composites(&self, composites: &[DeploymentSpec]) -> Result<()> {
        for spec in composites {
            let Some(parent_id) = spec.placement.composite_part_of.as_deref() else {
                error!(
                    child = %spec.identifier(),
                    "Composite placement without a parent instance; skipping"
                );
                continue;
            };

            if !self.registry.is_deployed(parent_id) {
                error!(
                    parent = %parent_id,
                    child = %spec.identifier(),
                    "Unable to locate composite parent; skipping instantiation"
                );
                continue;
            }

            info!(
                parent = %parent_id,
                child = %spec.identifier(),
                "Placing composite child"
            );
            let parent_ior = self.await_parent_ior(parent_id).await?;
            self.launch_child(spec, Some(&parent_ior)).await;
        }
        Ok(())
    }

    /// Poll the registry until the parent has registered and exposed its
    /// reference; cancelled by shutdown.
    async fn await_parent_ior(&self, parent_id: &str) -> Result<String> {
        loop {
            if let Some(ior) = self.registry.ior_of(parent_id) {
                return Ok(ior);
            }
            if self.internal_shutdown.is_cancelled() {
                return Err(DomainError::Cancelled);
            }
            sleep(COMPOSITE_IOR_POLL).await;
        }
    }

    /// Child-reap event stream handler
    async fn reap_loop(self: Arc<Self>, mut reap_rx: mpsc::UnboundedReceiver<ReapEvent>) {
        while let Some(event) = reap_rx.recv().await {
            self.handle_reap(event).await;
        }
        debug!("Reap channel closed");
    }

    async fn handle_reap(&self, event: ReapEvent) {
        let Some(record) = self.registry.find_by_pid(event.pid) else {
            error!(
                pid = event.pid,
                "Reaped process is not associated with a known child"
            );
            return;
        };

        match (event.signal, record.kind) {
            (Some(signal), ChildKind::Device) => warn!(
                child = %record.label,
                pid = event.pid,
                signal = signal,
                "Child process terminated by signal"
            ),
            // Services terminating by signal is the normal shutdown path
            (Some(signal), ChildKind::Service) => info!(
                child = %record.label,
                pid = event.pid,
                signal = signal,
                "Child process terminated by signal"
            ),
            (None, _) => info!(
                child = %record.label,
                pid = event.pid,
                status = event.exit_code.unwrap_or(0),
                "Child process exited"
            ),
        }

        self.registry.remove(&record.identifier);
        // A registered child that died gets an implicit unregister
        if matches!(record.bucket, Bucket::Registered | Bucket::ExternalRegistered) {
            self.registration.release_registration(&record).await;
        }

        if self.admin.load() == AdminState::ShuttingDown && self.registry.all_children_gone() {
            self.shutdown_complete.notify_waiters();
        }
    }

    /// Orderly shutdown; idempotent, returns once the state is ShutDown
    pub async fn shutdown(&self) {
        self.internal_shutdown.cancel();

        let initiated = self
            .admin
            .advance(AdminState::Registered, AdminState::ShuttingDown)
            || self
                .admin
                .advance(AdminState::Unregistered, AdminState::ShuttingDown);
        if !initiated {
            // Someone else is (or was) tearing down; wait it out
            self.await_shutdown_complete().await;
            return;
        }

        info!(manager = %self.identity.label, "Shutting down");

        // Unregister self first; a failure here must not prevent cleanup
        self.binder.unregister_manager().await;

        self.shutdown_engine.run().await;
        self.await_children_reaped().await;

        self.admin
            .advance(AdminState::ShuttingDown, AdminState::ShutDown);
        self.shutdown_complete.notify_waiters();
        info!(manager = %self.identity.label, "Shutdown complete");
    }

    /// Forced teardown: SIGKILL every pending child, then run the normal
    /// shutdown path
    pub async fn abort(&self) {
        warn!(manager = %self.identity.label, "Aborting");
        self.shutdown_engine.kill_all_pending();
        self.shutdown().await;
    }

    /// A reap notification wakes the wait early; the timeout guards against
    /// a notification landing between the emptiness check and the park.
    async fn await_children_reaped(&self) {
        while !self.registry.all_children_gone() {
            let _ = tokio::time::timeout(
                Duration::from_millis(10),
                self.registry.reap_signal().notified(),
            )
            .await;
        }
    }

    async fn await_shutdown_complete(&self) {
        while self.admin.load() != AdminState::ShutDown {
            let _ = tokio::time::timeout(
                Duration::from_millis(10),
                self.shutdown_complete.notified(),
            )
            .await;
        }
    }

    // ===== Inbound operations =====

    pub async fn register_device(&self, device: Option<Arc<dyn ChildObject>>) -> Result<()> {
        self.registration.register_device(device).await
    }

    pub async fn register_service(
        &self,
        service: Option<Arc<dyn ChildObject>>,
        name: &str,
    ) -> Result<()> {
        self.registration.register_service(service, name).await
    }

    pub async fn unregister_device(&self, device: Option<Arc<dyn ChildObject>>) -> Result<()> {
        self.registration.unregister_device(device).await
    }

    pub async fn unregister_service(
        &self,
        service: Option<Arc<dyn ChildObject>>,
        name: &str,
    ) -> Result<()> {
        self.registration.unregister_service(service, name).await
    }

    /// Read-only snapshot of registered devices
    pub fn registered_devices(&self) -> Vec<ChildRecord> {
        self.registry.snapshot_devices()
    }

    /// Read-only snapshot of registered services
    pub fn registered_services(&self) -> Vec<ChildRecord> {
        self.registry.snapshot_services()
    }

    /// Selected implementation id for an instantiation; empty when unknown
    pub fn component_implementation_id(&self, instantiation_id: &str) -> String {
        self.ledger.implementation_id(instantiation_id)
    }

    pub fn device_configuration_profile(&self) -> &str {
        &self.identity.profile_path
    }

    pub fn file_sys(&self) -> Arc<dyn FileView> {
        self.file_view.clone()
    }

    pub fn identifier(&self) -> &str {
        &self.identity.identifier
    }

    pub fn label(&self) -> &str {
        &self.identity.label
    }

    pub fn dom_mgr(&self) -> Option<Arc<dyn RemoteRegistry>> {
        self.link.registry()
    }

    pub fn admin_state(&self) -> AdminState {
        self.admin.load()
    }

    /// Runtime-writable settings (`DEVICE_FORCE_QUIT_TIME`, `CLIENT_WAIT_TIME`)
    pub fn settings(&self) -> &Arc<ManagerSettings> {
        &self.settings
    }
}
