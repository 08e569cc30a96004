//! Program profile (parsed SPD) and implementation variants

use serde::{Deserialize, Serialize};

use super::properties::PropertySet;
use crate::domain::value_objects::HostFacts;

/// How an implementation's code artifact is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodeType {
    Executable,
    SharedLibrary,
}

/// A package this implementation depends on; resolution picks one of its
/// implementations matching the host, recursively
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftpkgDependency {
    pub name: String,
    pub implementations: Vec<ImplementationVariant>,
}

/// One alternative build of a program, tagged with its supported platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImplementationVariant {
    pub id: String,
    pub processor: String,
    pub os_name: String,
    pub entry_point: String,
    pub code_type: CodeType,
    #[serde(default)]
    pub property_file: Option<String>,
    #[serde(default)]
    pub softpkg_dependencies: Vec<SoftpkgDependency>,
}

impl ImplementationVariant {
    /// An implementation is matched against a host iff its processor equals
    /// the host machine and its OS name equals the host sysname.
    pub fn matches(&self, host: &HostFacts) -> bool {
        self.processor == host.machine && self.os_name == host.sysname
    }
}

/// A parsed software package: one deployable program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramProfile {
    pub id: String,
    pub name: String,
    /// Raw component type string from the descriptor ("device",
    /// "executabledevice", "service", ...)
    pub component_type: String,
    /// Whether the program accepts property initialization
    #[serde(default)]
    pub configurable: bool,
    pub implementations: Vec<ImplementationVariant>,
    #[serde(default)]
    pub properties: PropertySet,
    /// Directory of the SPD document; relative entry points resolve here
    #[serde(default)]
    pub spd_path: String,
}

impl ProgramProfile {
    /// First implementation matching the host, if any
    pub fn matching_implementation(&self, host: &HostFacts) -> Option<&ImplementationVariant> {
        self.implementations.iter().find(|i| i.matches(host))
    }
}
