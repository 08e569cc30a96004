//! ComponentType Value Object
//!
//! The launch classification of a deployment. Loadable and executable device
//! variants are normalized to `Device`; existing profiles depend on this.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ChildKind;

/// How a planned child is launched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentType {
    Device,
    Service,
    /// A composite child loaded into its parent device's address space
    SharedLibrary,
}

impl ComponentType {
    /// Normalize a profile's component-type string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "device" | "loadabledevice" | "executabledevice" => Some(Self::Device),
            "service" => Some(Self::Service),
            "sharedlibrary" | "sharedLibrary" => Some(Self::SharedLibrary),
            _ => None,
        }
    }

    /// The registration kind a child of this type will use
    pub fn child_kind(&self) -> ChildKind {
        match self {
            Self::Service => ChildKind::Service,
            // Composite children register as devices through their parent
            Self::Device | Self::SharedLibrary => ChildKind::Device,
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Device => "device",
            Self::Service => "service",
            Self::SharedLibrary => "sharedLibrary",
        };
        write!(f, "{}", s)
    }
}
