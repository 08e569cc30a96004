//! ManagerIdentity Value Object
//!
//! Identity of this manager as registered with the domain, plus the naming
//! paths derived from it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerIdentity {
    /// Node profile id
    pub identifier: String,
    /// Node profile name; names the manager's naming context
    pub label: String,
    pub domain_name: String,
    /// This manager's own stringified reference
    pub ior: String,
    /// Path of the node profile document
    pub profile_path: String,
    pub hostname: String,
}

impl ManagerIdentity {
    /// Directory path of the domain registry: `<domain>/<domain>`
    pub fn registry_path(&self) -> String {
        format!("{}/{}", self.domain_name, self.domain_name)
    }

    /// Directory path of this manager's naming context
    pub fn naming_context(&self) -> String {
        format!("{}/{}", self.domain_name, self.label)
    }

    /// Directory path of a child bound under this manager's context
    pub fn child_path(&self, name: &str) -> String {
        format!("{}/{}/{}", self.domain_name, self.label, name)
    }
}
