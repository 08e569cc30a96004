//! Deployment Ledger
//! Records what the planner deployed, for registration-time profile lookup
//! and implementation-id queries

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::domain::profile::{Instantiation, Placement, ProgramProfile};
use crate::domain::value_objects::ComponentType;

/// One planned child: a placement instance with its selected implementation
#[derive(Debug, Clone)]
pub struct DeploymentSpec {
    pub placement: Placement,
    pub instantiation: Instantiation,
    /// Profile with implementation PRF joined and overrides applied
    pub profile: ProgramProfile,
    pub implementation_id: String,
    /// Resolved local path of the executable entry point
    pub code_path: PathBuf,
    pub component_type: ComponentType,
}

impl DeploymentSpec {
    /// The stable child identifier, the instantiation id
    pub fn identifier(&self) -> &str {
        &self.instantiation.id
    }

    /// Label a spawned child starts with; the child may override it at
    /// registration time
    pub fn label(&self) -> &str {
        if self.instantiation.usage_name.is_empty() {
            &self.instantiation.id
        } else {
            &self.instantiation.usage_name
        }
    }
}

#[derive(Default)]
struct LedgerInner {
    deployed: Vec<DeploymentSpec>,
    implementation_ids: HashMap<String, String>,
}

/// Shared record of deployed children
pub struct DeploymentLedger {
    inner: Mutex<LedgerInner>,
}

impl DeploymentLedger {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(LedgerInner::default()),
        }
    }

    /// Record a spec at launch time
    pub fn record_deployed(&self, spec: &DeploymentSpec) {
        let mut inner = self.inner.lock().unwrap();
        inner.implementation_ids.insert(
            spec.instantiation.id.clone(),
            spec.implementation_id.clone(),
        );
        inner.deployed.push(spec.clone());
    }

    /// Profile of a deployed child, looked up by instantiation identifier
    pub fn profile_by_identifier(&self, identifier: &str) -> Option<ProgramProfile> {
        let inner = self.inner.lock().unwrap();
        inner
            .deployed
            .iter()
            .find(|s| s.instantiation.id == identifier)
            .map(|s| s.profile.clone())
    }

    /// Profile of a deployed service, looked up by usage name
    pub fn profile_by_usage_name(&self, usage_name: &str) -> Option<ProgramProfile> {
        let inner = self.inner.lock().unwrap();
        inner
            .deployed
            .iter()
            .find(|s| s.instantiation.usage_name == usage_name)
            .map(|s| s.profile.clone())
    }

    /// Instantiation identifier of a deployed service, by usage name
    pub fn identifier_by_usage_name(&self, usage_name: &str) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        inner
            .deployed
            .iter()
            .find(|s| s.instantiation.usage_name == usage_name)
            .map(|s| s.instantiation.id.clone())
    }

    /// Selected implementation id for an instantiation; empty when unknown
    pub fn implementation_id(&self, instantiation_id: &str) -> String {
        let inner = self.inner.lock().unwrap();
        inner
            .implementation_ids
            .get(instantiation_id)
            .cloned()
            .unwrap_or_default()
    }
}

impl Default for DeploymentLedger {
    fn default() -> Self {
        Self::new()
    }
}
