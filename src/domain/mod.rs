pub mod entities;
pub mod error;
pub mod ports;
pub mod profile;
pub mod services;
pub mod value_objects;

pub use entities::{Bucket, ChildRecord};
pub use error::{DomainError, Result};
pub use profile::{
    CodeType, ImplementationVariant, Instantiation, NodeProfile, Placement, ProgramProfile,
    Property, PropertyKind, PropertyMode, PropertySet, PropertyValue, SoftpkgDependency,
};
pub use value_objects::{AdminState, ChildKind, ComponentType, HostFacts};
