//! ChildRecord entity
//!
//! The authoritative record of one known child. The identifier is stable from
//! launch and is the join key between "this manager spawned it" and
//! "something registered with this manager".

use std::fmt;
use std::sync::Arc;

use crate::domain::ports::ChildObject;
use crate::domain::value_objects::ChildKind;

/// Which lifecycle bucket a record currently occupies. A child appears in
/// exactly one bucket at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    /// Launched here, not yet registered
    Pending,
    /// Launched here and registered
    Registered,
    /// Registered but not launched here
    ExternalRegistered,
    /// Reaped; the record is deleted on entering this bucket
    Terminated,
}

/// Record of one child known to the manager
#[derive(Clone)]
pub struct ChildRecord {
    pub identifier: String,
    pub label: String,
    /// Present iff this manager launched the child
    pub pid: Option<u32>,
    /// Stringified reference; absent while pending
    pub ior: Option<String>,
    /// Live reference to the child; absent while pending
    pub object: Option<Arc<dyn ChildObject>>,
    pub kind: ChildKind,
    pub bucket: Bucket,
}

impl ChildRecord {
    /// A record for a child this manager just spawned
    pub fn spawned(
        identifier: impl Into<String>,
        label: impl Into<String>,
        pid: u32,
        kind: ChildKind,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            label: label.into(),
            pid: Some(pid),
            ior: None,
            object: None,
            kind,
            bucket: Bucket::Pending,
        }
    }

    /// A record for a child that registered without a prior spawn
    pub fn external(
        identifier: impl Into<String>,
        label: impl Into<String>,
        ior: impl Into<String>,
        object: Arc<dyn ChildObject>,
        kind: ChildKind,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            label: label.into(),
            pid: None,
            ior: Some(ior.into()),
            object: Some(object),
            kind,
            bucket: Bucket::ExternalRegistered,
        }
    }

    /// True while a process launched by this manager may still be running
    pub fn has_live_process(&self) -> bool {
        self.pid.is_some()
    }
}

impl fmt::Debug for ChildRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildRecord")
            .field("identifier", &self.identifier)
            .field("label", &self.label)
            .field("pid", &self.pid)
            .field("ior", &self.ior)
            .field("object", &self.object.is_some())
            .field("kind", &self.kind)
            .field("bucket", &self.bucket)
            .finish()
    }
}
