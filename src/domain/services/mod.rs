pub mod cache_directory;
pub mod child_registry;
pub mod deployment_ledger;
pub mod domain_binder;
pub mod profile_resolver;
pub mod registration_service;
pub mod shutdown_engine;

pub use cache_directory::prepare_cache_directory;
pub use child_registry::ChildRegistry;
pub use deployment_ledger::{DeploymentLedger, DeploymentSpec};
pub use domain_binder::{DomainBinder, DomainLink};
pub use profile_resolver::{DeploymentPlan, ProfileResolver};
pub use registration_service::{ManagerSettings, RegistrationService};
pub use shutdown_engine::ShutdownEngine;
