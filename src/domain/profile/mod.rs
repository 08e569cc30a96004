//! Parsed profile documents
//!
//! The profile parsers themselves live outside this crate; these are the
//! already-parsed data structures the planner and registration protocol
//! consume.

pub mod node_profile;
pub mod program_profile;
pub mod properties;

pub use node_profile::{Instantiation, NodeProfile, Placement};
pub use program_profile::{CodeType, ImplementationVariant, ProgramProfile, SoftpkgDependency};
pub use properties::{Property, PropertyKind, PropertyMode, PropertySet, PropertyValue};
