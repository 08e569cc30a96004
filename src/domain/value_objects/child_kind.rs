//! ChildKind Value Object

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a registered child is a device or an auxiliary service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChildKind {
    Device,
    Service,
}

impl fmt::Display for ChildKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Device => "device",
            Self::Service => "service",
        };
        write!(f, "{}", s)
    }
}
