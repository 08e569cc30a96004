pub mod admin_state;
pub mod child_kind;
pub mod component_type;
pub mod host_facts;
pub mod manager_identity;

pub use admin_state::{AdminState, AdminStateCell};
pub use child_kind::ChildKind;
pub use component_type::ComponentType;
pub use host_facts::HostFacts;
pub use manager_identity::ManagerIdentity;
