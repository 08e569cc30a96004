//! Node profile (parsed DCD): what this host must run

use serde::{Deserialize, Serialize};

use super::properties::PropertyValue;

/// A single run of a placement with its own identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instantiation {
    pub id: String,
    #[serde(default)]
    pub usage_name: String,
    #[serde(default)]
    pub naming_service_name: String,
    #[serde(default)]
    pub affinity: Vec<PropertyValue>,
    #[serde(default)]
    pub logging_config: Option<String>,
    #[serde(default)]
    pub property_overrides: Vec<PropertyValue>,
}

/// A node-profile entry naming one program to run and its instances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// Reference to the program's SPD document
    pub file_ref: String,
    pub instantiations: Vec<Instantiation>,
    /// Instance id of the parent device when this placement runs inside
    /// another device's address space
    #[serde(default)]
    pub composite_part_of: Option<String>,
}

impl Placement {
    pub fn is_composite_part(&self) -> bool {
        self.composite_part_of.is_some()
    }
}

/// The parsed node profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeProfile {
    pub id: String,
    pub name: String,
    pub domain_name: String,
    /// SPD reference for the manager's own program profile
    pub manager_soft_pkg: String,
    pub placements: Vec<Placement>,
}
