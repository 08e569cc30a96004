//! Child Registry
//! Single serialization point for all child bucket transitions
//!
//! One map keyed by identifier holds every known child; the bucket is a tag
//! on the record, so an identifier can never occupy two buckets at once.
//! All mutations run under one mutex which is never held across await points.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::domain::entities::{Bucket, ChildRecord};
use crate::domain::ports::ChildObject;
use crate::domain::value_objects::ChildKind;

/// Thread-safe registry of all children known to the manager
pub struct ChildRegistry {
    children: Mutex<HashMap<String, ChildRecord>>,
    /// Signalled on every removal so bounded shutdown waits wake promptly
    reaped: Notify,
}

impl ChildRegistry {
    pub fn new() -> Self {
        Self {
            children: Mutex::new(HashMap::new()),
            reaped: Notify::new(),
        }
    }

    /// Notified whenever a record leaves the registry
    pub fn reap_signal(&self) -> &Notify {
        &self.reaped
    }

    /// Insert a freshly spawned child into *pending*
    ///
    /// A duplicate identifier is a planning error; the existing record wins.
    pub fn insert_pending(&self, record: ChildRecord) -> bool {
        let mut children = self.children.lock().unwrap();
        if children.contains_key(&record.identifier) {
            warn!(
                identifier = %record.identifier,
                "Ignoring duplicate pending insert"
            );
            return false;
        }
        debug!(
            identifier = %record.identifier,
            pid = ?record.pid,
            "Child inserted as pending"
        );
        children.insert(record.identifier.clone(), record);
        true
    }

    /// Move a *pending* child to *registered*, filling in the fields learned
    /// at registration time. Returns false when the identifier is not
    /// currently pending; the caller then tries `insert_external`.
    ///
    /// The label reported by the registering child is authoritative.
    pub fn promote_to_registered(
        &self,
        identifier: &str,
        label: &str,
        ior: &str,
        object: Arc<dyn ChildObject>,
    ) -> bool {
        let mut children = self.children.lock().unwrap();
        match children.get_mut(identifier) {
            Some(record) if record.bucket == Bucket::Pending => {
                record.bucket = Bucket::Registered;
                record.label = label.to_string();
                record.ior = Some(ior.to_string());
                record.object = Some(object);
                true
            }
            _ => false,
        }
    }

    /// Insert a child that registered without a prior spawn
    pub fn insert_external(&self, record: ChildRecord) -> bool {
        let mut children = self.children.lock().unwrap();
        if children.contains_key(&record.identifier) {
            return false;
        }
        info!(
            identifier = %record.identifier,
            label = %record.label,
            "Registering child was not launched by this manager"
        );
        children.insert(record.identifier.clone(), record);
        true
    }

    /// Take a registered child out of the registered buckets. A child with a
    /// live process moves back to *pending* (awaiting reap); one without is
    /// dropped. Returns the record as it was before the transition.
    pub fn demote(&self, identifier: &str) -> Option<ChildRecord> {
        let mut children = self.children.lock().unwrap();
        let record = children.get(identifier)?;
        if !matches!(record.bucket, Bucket::Registered | Bucket::ExternalRegistered) {
            return None;
        }
        let before = record.clone();
        if before.has_live_process() {
            let entry = children.get_mut(identifier).unwrap();
            entry.bucket = Bucket::Pending;
            entry.ior = None;
            entry.object = None;
        } else {
            children.remove(identifier);
            self.reaped.notify_waiters();
        }
        Some(before)
    }

    /// Delete a record outright, whichever bucket holds it
    pub fn remove(&self, identifier: &str) -> Option<ChildRecord> {
        let mut children = self.children.lock().unwrap();
        let removed = children.remove(identifier);
        if removed.is_some() {
            self.reaped.notify_waiters();
        }
        removed
    }

    pub fn find_by_pid(&self, pid: u32) -> Option<ChildRecord> {
        let children = self.children.lock().unwrap();
        children.values().find(|r| r.pid == Some(pid)).cloned()
    }

    pub fn find_by_ior(&self, ior: &str) -> Option<ChildRecord> {
        let children = self.children.lock().unwrap();
        children
            .values()
            .find(|r| r.ior.as_deref() == Some(ior))
            .cloned()
    }

    /// Registered service looked up by its usage name
    pub fn find_registered_service(&self, name: &str) -> Option<ChildRecord> {
        let children = self.children.lock().unwrap();
        children
            .values()
            .find(|r| {
                r.kind == ChildKind::Service
                    && r.label == name
                    && matches!(r.bucket, Bucket::Registered | Bucket::ExternalRegistered)
            })
            .cloned()
    }

    /// IOR of a registered child, used for composite parent resolution
    pub fn ior_of(&self, identifier: &str) -> Option<String> {
        let children = self.children.lock().unwrap();
        children.get(identifier).and_then(|r| r.ior.clone())
    }

    /// True when the identifier occupies *pending* or a registered bucket
    pub fn is_deployed(&self, identifier: &str) -> bool {
        let children = self.children.lock().unwrap();
        children
            .get(identifier)
            .map(|r| r.bucket != Bucket::Terminated)
            .unwrap_or(false)
    }

    /// By-value snapshot of all registered devices (launched or external)
    pub fn snapshot_devices(&self) -> Vec<ChildRecord> {
        self.snapshot(ChildKind::Device)
    }

    /// By-value snapshot of all registered services (launched or external)
    pub fn snapshot_services(&self) -> Vec<ChildRecord> {
        self.snapshot(ChildKind::Service)
    }

    fn snapshot(&self, kind: ChildKind) -> Vec<ChildRecord> {
        let children = self.children.lock().unwrap();
        children
            .values()
            .filter(|r| {
                r.kind == kind
                    && matches!(r.bucket, Bucket::Registered | Bucket::ExternalRegistered)
            })
            .cloned()
            .collect()
    }

    /// First registered device (launched or external), if any; shutdown
    /// releases devices one at a time because releasing an aggregate may
    /// release its children too
    pub fn any_registered_device(&self) -> Option<ChildRecord> {
        let children = self.children.lock().unwrap();
        children
            .values()
            .find(|r| {
                r.kind == ChildKind::Device
                    && matches!(r.bucket, Bucket::Registered | Bucket::ExternalRegistered)
            })
            .cloned()
    }

    /// Pids of pending children of the given kind
    pub fn pending_pids(&self, kind: ChildKind) -> Vec<u32> {
        let children = self.children.lock().unwrap();
        children
            .values()
            .filter(|r| r.kind == kind && r.bucket == Bucket::Pending)
            .filter_map(|r| r.pid)
            .collect()
    }

    /// Pids of registered children of the given kind that were launched here
    pub fn registered_live_pids(&self, kind: ChildKind) -> Vec<u32> {
        let children = self.children.lock().unwrap();
        children
            .values()
            .filter(|r| r.kind == kind && r.bucket == Bucket::Registered)
            .filter_map(|r| r.pid)
            .collect()
    }

    /// Registered services without a process of their own
    pub fn external_services(&self) -> Vec<ChildRecord> {
        let children = self.children.lock().unwrap();
        children
            .values()
            .filter(|r| {
                r.kind == ChildKind::Service
                    && r.bucket == Bucket::ExternalRegistered
                    && r.pid.is_none()
            })
            .cloned()
            .collect()
    }

    /// True once every bucket is empty
    pub fn all_children_gone(&self) -> bool {
        self.children.lock().unwrap().is_empty()
    }
}

impl Default for ChildRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::ChildCallError;
    use crate::domain::profile::PropertyValue;
    use async_trait::async_trait;

    struct StubChild(String);

    #[async_trait]
    impl ChildObject for StubChild {
        fn stringified(&self) -> String {
            self.0.clone()
        }
        async fn identifier(&self) -> Result<String, ChildCallError> {
            Ok("id".into())
        }
        async fn label(&self) -> Result<String, ChildCallError> {
            Ok("label".into())
        }
        async fn software_profile(&self) -> Result<String, ChildCallError> {
            Ok("profile".into())
        }
        async fn initialize_properties(
            &self,
            _properties: &[PropertyValue],
        ) -> Result<(), ChildCallError> {
            Ok(())
        }
        async fn initialize(&self) -> Result<(), ChildCallError> {
            Ok(())
        }
        async fn configure(&self, _properties: &[PropertyValue]) -> Result<(), ChildCallError> {
            Ok(())
        }
        async fn release_object(&self) -> Result<(), ChildCallError> {
            Ok(())
        }
    }

    fn stub(ior: &str) -> Arc<dyn ChildObject> {
        Arc::new(StubChild(ior.to_string()))
    }

    #[test]
    fn test_pending_then_promote() {
        let registry = ChildRegistry::new();
        assert!(registry.insert_pending(ChildRecord::spawned(
            "DCE:dev-1",
            "dev_1",
            100,
            ChildKind::Device
        )));

        assert!(registry.promote_to_registered("DCE:dev-1", "dev_one", "IOR:1", stub("IOR:1")));

        let devices = registry.snapshot_devices();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].label, "dev_one");
        assert_eq!(devices[0].ior.as_deref(), Some("IOR:1"));
        assert_eq!(devices[0].pid, Some(100));
    }

    #[test]
    fn test_promote_requires_pending() {
        let registry = ChildRegistry::new();
        assert!(!registry.promote_to_registered("DCE:missing", "x", "IOR:x", stub("IOR:x")));

        registry.insert_pending(ChildRecord::spawned("DCE:d", "d", 1, ChildKind::Device));
        assert!(registry.promote_to_registered("DCE:d", "d", "IOR:d", stub("IOR:d")));
        // Second promote fails: no longer pending
        assert!(!registry.promote_to_registered("DCE:d", "d", "IOR:d", stub("IOR:d")));
    }

    #[test]
    fn test_no_identifier_in_two_buckets() {
        let registry = ChildRegistry::new();
        registry.insert_pending(ChildRecord::spawned("DCE:d", "d", 1, ChildKind::Device));
        assert!(!registry.insert_pending(ChildRecord::spawned("DCE:d", "d", 2, ChildKind::Device)));
        assert!(!registry.insert_external(ChildRecord::external(
            "DCE:d",
            "d",
            "IOR:d",
            stub("IOR:d"),
            ChildKind::Device
        )));
    }

    #[test]
    fn test_demote_with_live_process_returns_to_pending() {
        let registry = ChildRegistry::new();
        registry.insert_pending(ChildRecord::spawned("DCE:d", "d", 7, ChildKind::Device));
        registry.promote_to_registered("DCE:d", "d", "IOR:d", stub("IOR:d"));

        let before = registry.demote("DCE:d").unwrap();
        assert_eq!(before.bucket, Bucket::Registered);

        assert!(registry.snapshot_devices().is_empty());
        assert_eq!(registry.pending_pids(ChildKind::Device), vec![7]);
        // Back in pending the reference fields are gone
        assert!(registry.ior_of("DCE:d").is_none());
    }

    #[test]
    fn test_demote_external_drops_record() {
        let registry = ChildRegistry::new();
        registry.insert_external(ChildRecord::external(
            "svc-1",
            "ext",
            "IOR:s",
            stub("IOR:s"),
            ChildKind::Service,
        ));

        assert!(registry.demote("svc-1").is_some());
        assert!(registry.all_children_gone());
    }

    #[test]
    fn test_remove_after_reap() {
        let registry = ChildRegistry::new();
        registry.insert_pending(ChildRecord::spawned("DCE:d", "d", 9, ChildKind::Device));

        let record = registry.find_by_pid(9).unwrap();
        assert_eq!(record.identifier, "DCE:d");

        registry.remove(&record.identifier);
        assert!(registry.find_by_pid(9).is_none());
        assert!(registry.all_children_gone());
    }

    #[test]
    fn test_find_registered_service_by_name() {
        let registry = ChildRegistry::new();
        registry.insert_external(ChildRecord::external(
            "ext",
            "ext",
            "IOR:s",
            stub("IOR:s"),
            ChildKind::Service,
        ));

        assert!(registry.find_registered_service("ext").is_some());
        assert!(registry.find_registered_service("other").is_none());
    }

    #[tokio::test]
    async fn test_reap_signal_wakes_waiter() {
        let registry = Arc::new(ChildRegistry::new());
        registry.insert_pending(ChildRecord::spawned("DCE:d", "d", 3, ChildKind::Device));

        let waiter = {
            let registry = registry.clone();
            tokio::spawn(async move {
                registry.reap_signal().notified().await;
            })
        };
        // Give the waiter a chance to park before removing
        tokio::task::yield_now().await;
        registry.remove("DCE:d");
        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .expect("waiter should be woken by removal")
            .unwrap();
    }
}
