//! FileView port
//! File-system façade through which profiles and code artifacts are reached

use crate::domain::profile::{NodeProfile, ProgramProfile, PropertySet};
use crate::domain::DomainError;
use std::path::PathBuf;

/// Port for profile and code-artifact access
///
/// Profile documents are consumed as already-parsed data; the view hides
/// where and in which serialization they live.
pub trait FileView: Send + Sync {
    fn exists(&self, path: &str) -> bool;

    /// Load the parsed node profile (DCD)
    fn load_node_profile(&self, path: &str) -> Result<NodeProfile, DomainError>;

    /// Load the parsed program profile referenced by an SPD path
    fn load_program_profile(&self, path: &str) -> Result<ProgramProfile, DomainError>;

    /// Load a parsed property-definition document
    fn load_property_set(&self, path: &str) -> Result<PropertySet, DomainError>;

    /// Map a view path to a local filesystem path suitable for exec
    fn local_path(&self, path: &str) -> PathBuf;
}
