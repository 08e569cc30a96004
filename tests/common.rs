//! Shared test harness: mock ports and a supervisor factory
//!
//! The mocks stand in for the RPC transport: children are driven by calling
//! the supervisor's inbound operations directly, and process lifecycles are
//! simulated through the launcher's reap channel.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use devmgr_engine::application::{Supervisor, SupervisorConfig};
use devmgr_engine::domain::ports::{
    ChildCallError, ChildHandle, ChildObject, DeviceRegistration, EventSink, FileView, Launcher,
    ManagerRegistration, ReapEvent, RegistryError, RemoteRegistry, ServiceRegistration,
    SpawnRequest,
};
use devmgr_engine::domain::profile::{
    CodeType, ImplementationVariant, Instantiation, NodeProfile, Placement, ProgramProfile,
    Property, PropertyKind, PropertyMode, PropertySet, PropertyValue,
};
use devmgr_engine::domain::value_objects::HostFacts;
use devmgr_engine::domain::{DomainError, Result};
use devmgr_engine::infrastructure::InMemoryNameDirectory;

// ===== Mock child =====

/// How a mock child reacts to one of its lifecycle calls
#[derive(Clone, Default)]
pub struct ChildBehavior {
    pub fail_initialize_properties: Option<ChildCallError>,
    pub fail_initialize: Option<ChildCallError>,
    pub fail_configure: Option<ChildCallError>,
    /// Never answer `releaseObject`; the caller's timeout fires
    pub ignore_release: bool,
    /// Never answer the named remote call ("identifier", "label",
    /// "software_profile", "initialize_properties", "initialize",
    /// "configure"); the manager's client wait time fires
    pub hang_on: Option<&'static str>,
}

/// Scriptable child reference
pub struct MockChild {
    identifier: String,
    label: String,
    ior: String,
    software_profile: String,
    behavior: ChildBehavior,
    pub calls: Mutex<Vec<&'static str>>,
}

impl MockChild {
    pub fn new(identifier: &str, label: &str) -> Arc<Self> {
        Arc::new(Self {
            identifier: identifier.to_string(),
            label: label.to_string(),
            ior: format!("IOR:{}", identifier),
            software_profile: String::new(),
            behavior: ChildBehavior::default(),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn with_behavior(identifier: &str, label: &str, behavior: ChildBehavior) -> Arc<Self> {
        Arc::new(Self {
            identifier: identifier.to_string(),
            label: label.to_string(),
            ior: format!("IOR:{}", identifier),
            software_profile: String::new(),
            behavior,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn call_log(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }

    async fn maybe_hang(&self, call: &'static str) {
        if self.behavior.hang_on == Some(call) {
            // Outlive any reasonable client wait time
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
    }
}

#[async_trait]
impl ChildObject for MockChild {
    fn stringified(&self) -> String {
        self.ior.clone()
    }

    async fn identifier(&self) -> std::result::Result<String, ChildCallError> {
        self.maybe_hang("identifier").await;
        Ok(self.identifier.clone())
    }

    async fn label(&self) -> std::result::Result<String, ChildCallError> {
        self.maybe_hang("label").await;
        Ok(self.label.clone())
    }

    async fn software_profile(&self) -> std::result::Result<String, ChildCallError> {
        self.maybe_hang("software_profile").await;
        if self.software_profile.is_empty() {
            Err(ChildCallError::Transport("no profile".to_string()))
        } else {
            Ok(self.software_profile.clone())
        }
    }

    async fn initialize_properties(
        &self,
        _properties: &[PropertyValue],
    ) -> std::result::Result<(), ChildCallError> {
        self.record("initialize_properties");
        self.maybe_hang("initialize_properties").await;
        match &self.behavior.fail_initialize_properties {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    async fn initialize(&self) -> std::result::Result<(), ChildCallError> {
        self.record("initialize");
        self.maybe_hang("initialize").await;
        match &self.behavior.fail_initialize {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    async fn configure(
        &self,
        _properties: &[PropertyValue],
    ) -> std::result::Result<(), ChildCallError> {
        self.record("configure");
        self.maybe_hang("configure").await;
        match &self.behavior.fail_configure {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    async fn release_object(&self) -> std::result::Result<(), ChildCallError> {
        self.record("release_object");
        if self.behavior.ignore_release {
            // Outlive any reasonable caller timeout
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        Ok(())
    }
}

// ===== Mock launcher =====

/// Launcher that fakes processes; exits are driven by signals the test marks
/// as lethal for each pid
pub struct MockLauncher {
    next_pid: AtomicU32,
    pub spawned: Mutex<Vec<(u32, SpawnRequest)>>,
    pub signals: Mutex<Vec<(u32, i32)>>,
    live: Mutex<HashSet<u32>>,
    /// Signals each pid dies from; empty set = dies from SIGKILL only
    lethal: Mutex<HashMap<u32, HashSet<i32>>>,
    reap_tx: mpsc::UnboundedSender<ReapEvent>,
}

impl MockLauncher {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<ReapEvent>) {
        let (reap_tx, reap_rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                next_pid: AtomicU32::new(1000),
                spawned: Mutex::new(Vec::new()),
                signals: Mutex::new(Vec::new()),
                live: Mutex::new(HashSet::new()),
                lethal: Mutex::new(HashMap::new()),
                reap_tx,
            }),
            reap_rx,
        )
    }

    /// Pid of the n-th spawned child
    pub fn pid_of(&self, index: usize) -> u32 {
        self.spawned.lock().unwrap()[index].0
    }

    pub fn spawn_count(&self) -> usize {
        self.spawned.lock().unwrap().len()
    }

    pub fn request_of(&self, index: usize) -> SpawnRequest {
        self.spawned.lock().unwrap()[index].1.clone()
    }

    pub fn signals_for(&self, pid: u32) -> Vec<i32> {
        self.signals
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| *p == pid)
            .map(|(_, s)| *s)
            .collect()
    }

    /// Declare which signals terminate the given pid (SIGKILL always does)
    pub fn set_lethal_signals(&self, pid: u32, signals: &[i32]) {
        self.lethal
            .lock()
            .unwrap()
            .insert(pid, signals.iter().copied().collect());
    }

    /// Simulate a spontaneous child exit
    pub fn exit_child(&self, pid: u32, code: i32) {
        self.live.lock().unwrap().remove(&pid);
        let _ = self.reap_tx.send(ReapEvent::exited(pid, code));
    }

    /// Simulate a child crash (terminated by signal)
    pub fn crash_child(&self, pid: u32, signal: i32) {
        self.live.lock().unwrap().remove(&pid);
        let _ = self.reap_tx.send(ReapEvent::signalled(pid, signal));
    }
}

#[async_trait]
impl Launcher for MockLauncher {
    async fn spawn(&self, request: SpawnRequest) -> Result<ChildHandle> {
        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
        self.live.lock().unwrap().insert(pid);
        self.spawned.lock().unwrap().push((pid, request));
        Ok(ChildHandle { pid })
    }

    fn signal(&self, pid: u32, signal: i32) {
        self.signals.lock().unwrap().push((pid, signal));

        let lethal = self
            .lethal
            .lock()
            .unwrap()
            .get(&pid)
            .map(|set| set.contains(&signal))
            .unwrap_or(false);
        if signal == libc::SIGKILL || lethal {
            if self.live.lock().unwrap().remove(&pid) {
                let _ = self.reap_tx.send(ReapEvent::signalled(pid, signal));
            }
        }
    }

    fn is_alive(&self, pid: u32) -> bool {
        self.live.lock().unwrap().contains(&pid)
    }
}

// ===== Mock registry =====

/// Domain registry double recording every upstream call
#[derive(Default)]
pub struct MockRegistry {
    pub managers: Mutex<Vec<ManagerRegistration>>,
    pub devices: Mutex<Vec<DeviceRegistration>>,
    pub services: Mutex<Vec<ServiceRegistration>>,
    pub unregistered_managers: Mutex<Vec<String>>,
    pub unregistered_devices: Mutex<Vec<String>>,
    pub unregistered_services: Mutex<Vec<String>>,
}

impl MockRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn manager_count(&self) -> usize {
        self.managers.lock().unwrap().len()
    }

    pub fn device_count(&self) -> usize {
        self.devices.lock().unwrap().len()
    }
}

#[async_trait]
impl RemoteRegistry for MockRegistry {
    async fn register_manager(
        &self,
        manager: ManagerRegistration,
    ) -> std::result::Result<(), RegistryError> {
        self.managers.lock().unwrap().push(manager);
        Ok(())
    }

    async fn unregister_manager(
        &self,
        identifier: &str,
    ) -> std::result::Result<(), RegistryError> {
        self.unregistered_managers
            .lock()
            .unwrap()
            .push(identifier.to_string());
        Ok(())
    }

    async fn register_device(
        &self,
        device: DeviceRegistration,
    ) -> std::result::Result<(), RegistryError> {
        self.devices.lock().unwrap().push(device);
        Ok(())
    }

    async fn unregister_device(&self, ior: &str) -> std::result::Result<(), RegistryError> {
        self.unregistered_devices
            .lock()
            .unwrap()
            .push(ior.to_string());
        Ok(())
    }

    async fn register_service(
        &self,
        service: ServiceRegistration,
    ) -> std::result::Result<(), RegistryError> {
        self.services.lock().unwrap().push(service);
        Ok(())
    }

    async fn unregister_service(&self, name: &str) -> std::result::Result<(), RegistryError> {
        self.unregistered_services
            .lock()
            .unwrap()
            .push(name.to_string());
        Ok(())
    }

    async fn event_channel(
        &self,
        name: &str,
    ) -> std::result::Result<Arc<dyn EventSink>, RegistryError> {
        Err(RegistryError::Failure(format!("no channel: {}", name)))
    }

    fn set_reconnect_policy(&self, _retries: u32) {}
}

// ===== Mock file view =====

/// File view over maps; all view paths exist unless marked missing
pub struct MockFileView {
    pub profiles: Mutex<HashMap<String, ProgramProfile>>,
    pub property_sets: Mutex<HashMap<String, PropertySet>>,
}

impl MockFileView {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            profiles: Mutex::new(HashMap::new()),
            property_sets: Mutex::new(HashMap::new()),
        })
    }

    pub fn add_profile(&self, path: &str, profile: ProgramProfile) {
        self.profiles
            .lock()
            .unwrap()
            .insert(path.to_string(), profile);
    }
}

impl FileView for MockFileView {
    fn exists(&self, _path: &str) -> bool {
        true
    }

    fn load_node_profile(&self, path: &str) -> Result<NodeProfile> {
        Err(DomainError::InternalFailure(format!(
            "no node profile: {}",
            path
        )))
    }

    fn load_program_profile(&self, path: &str) -> Result<ProgramProfile> {
        self.profiles
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| DomainError::InternalFailure(format!("no profile: {}", path)))
    }

    fn load_property_set(&self, path: &str) -> Result<PropertySet> {
        self.property_sets
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| DomainError::InternalFailure(format!("no PRF: {}", path)))
    }

    fn local_path(&self, path: &str) -> PathBuf {
        PathBuf::from(path)
    }
}

// ===== Profile builders =====

pub fn host_facts() -> HostFacts {
    HostFacts::new("x86_64", "Linux", "node-1")
}

pub fn implementation(id: &str, processor: &str, code_type: CodeType) -> ImplementationVariant {
    ImplementationVariant {
        id: id.to_string(),
        processor: processor.to_string(),
        os_name: "Linux".to_string(),
        entry_point: "bin/run".to_string(),
        code_type,
        property_file: None,
        softpkg_dependencies: vec![],
    }
}

pub fn program_profile(
    id: &str,
    component_type: &str,
    implementations: Vec<ImplementationVariant>,
) -> ProgramProfile {
    ProgramProfile {
        id: id.to_string(),
        name: id.to_string(),
        component_type: component_type.to_string(),
        configurable: true,
        implementations,
        properties: PropertySet::default(),
        spd_path: "/dev".to_string(),
    }
}

pub fn configure_property(id: &str, value: &str) -> Property {
    Property {
        id: id.to_string(),
        name: id.to_string(),
        kind: PropertyKind::Configure,
        mode: PropertyMode::ReadWrite,
        command_line: false,
        value: Some(value.to_string()),
    }
}

pub fn placement(file_ref: &str, instance_id: &str, usage_name: &str) -> Placement {
    Placement {
        file_ref: file_ref.to_string(),
        instantiations: vec![Instantiation {
            id: instance_id.to_string(),
            usage_name: usage_name.to_string(),
            naming_service_name: String::new(),
            affinity: vec![],
            logging_config: None,
            property_overrides: vec![],
        }],
        composite_part_of: None,
    }
}

pub fn composite_placement(
    file_ref: &str,
    instance_id: &str,
    usage_name: &str,
    parent: &str,
) -> Placement {
    let mut p = placement(file_ref, instance_id, usage_name);
    p.composite_part_of = Some(parent.to_string());
    p
}

pub fn node_profile(placements: Vec<Placement>) -> NodeProfile {
    NodeProfile {
        id: "DCE:node-1".to_string(),
        name: "DevMgr_node-1".to_string(),
        domain_name: "REDHAWK_DEV".to_string(),
        manager_soft_pkg: "/dev/mgr/DeviceManager.spd.json".to_string(),
        placements,
    }
}

// ===== Harness =====

pub struct Harness {
    pub supervisor: Arc<Supervisor>,
    pub launcher: Arc<MockLauncher>,
    pub registry: Arc<MockRegistry>,
    pub directory: Arc<InMemoryNameDirectory>,
    pub file_view: Arc<MockFileView>,
    pub reap_rx: Option<mpsc::UnboundedReceiver<ReapEvent>>,
}

impl Harness {
    /// Build a supervisor over mock ports with the registry reachable under
    /// the domain's well-known path
    pub fn new(node: NodeProfile, manager_profile: ProgramProfile) -> Self {
        let (launcher, reap_rx) = MockLauncher::new();
        let registry = MockRegistry::new();
        let directory = Arc::new(InMemoryNameDirectory::new());
        directory.install_registry("REDHAWK_DEV/REDHAWK_DEV", registry.clone());
        let file_view = MockFileView::new();

        let supervisor = Supervisor::new(
            SupervisorConfig {
                node_profile: node,
                manager_profile,
                host_facts: host_facts(),
                manager_ior: "devmgr:DevMgr_node-1@node-1".to_string(),
                dcd_path: "/dev/nodes/node-1/dcd.json".to_string(),
                cache_root: std::env::temp_dir().join(format!(
                    "devmgr-test-{}",
                    std::process::id()
                )),
                logging_config_uri: None,
                release_timeout: Duration::from_secs(3),
            },
            launcher.clone(),
            directory.clone(),
            file_view.clone(),
        );

        Self {
            supervisor,
            launcher,
            registry,
            directory,
            file_view,
            reap_rx: Some(reap_rx),
        }
    }

    /// Start the supervisor and wait for deployment to finish
    pub async fn start(&mut self) -> Result<()> {
        let reap_rx = self.reap_rx.take().expect("start called twice");
        self.supervisor.run(reap_rx).await
    }

    /// Find a key/value pair in a spawn request's argument list
    pub fn arg_value(request: &SpawnRequest, key: &str) -> Option<String> {
        request
            .args
            .iter()
            .position(|a| a == key)
            .and_then(|i| request.args.get(i + 1).cloned())
    }
}

/// Poll until `predicate` holds or the timeout fires
pub async fn wait_until<F: Fn() -> bool>(predicate: F, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if predicate() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    predicate()
}
