//! HostFacts Value Object
//!
//! Processor and OS identity of the host, used to match implementation
//! variants. Injected into the resolver rather than read ambiently.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostFacts {
    /// `uname` machine field, e.g. "x86_64"
    pub machine: String,
    /// `uname` sysname field, e.g. "Linux"
    pub sysname: String,
    /// Host name reported to the domain manager
    pub hostname: String,
}

impl HostFacts {
    pub fn new(
        machine: impl Into<String>,
        sysname: impl Into<String>,
        hostname: impl Into<String>,
    ) -> Self {
        Self {
            machine: machine.into(),
            sysname: sysname.into(),
            hostname: hostname.into(),
        }
    }
}
