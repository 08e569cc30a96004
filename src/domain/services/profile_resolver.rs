//! Profile Resolver
//! Turns the parsed node profile into a deployment plan: per placement, the
//! implementation variant matching this host, the resolved dependency
//! closure, and the launch classification.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::domain::ports::FileView;
use crate::domain::profile::{
    CodeType, ImplementationVariant, NodeProfile, Placement, ProgramProfile, SoftpkgDependency,
};
use crate::domain::services::DeploymentSpec;
use crate::domain::value_objects::{ComponentType, HostFacts};
use crate::domain::{DomainError, Result};

/// Output of planning: standalone specs launch first, in input order;
/// composite specs launch after their parents are live.
#[derive(Debug, Default)]
pub struct DeploymentPlan {
    pub manager_implementation_id: String,
    pub standalone: Vec<DeploymentSpec>,
    pub composite: Vec<DeploymentSpec>,
}

/// Deployment planner
pub struct ProfileResolver {
    file_view: Arc<dyn FileView>,
}

impl ProfileResolver {
    pub fn new(file_view: Arc<dyn FileView>) -> Self {
        Self { file_view }
    }

    /// Build the deployment plan
    ///
    /// A per-placement failure is logged and skipped and never aborts the
    /// plan. The only fatal condition is no matching implementation for the
    /// manager itself.
    pub fn plan(
        &self,
        node: &NodeProfile,
        manager_profile: &ProgramProfile,
        host: &HostFacts,
    ) -> Result<DeploymentPlan> {
        if manager_profile.implementations.is_empty() {
            return Err(DomainError::FatalInit(
                "Manager program profile has no implementations to match against".to_string(),
            ));
        }

        let manager_impl = manager_profile.matching_implementation(host).ok_or_else(|| {
            DomainError::FatalInit(format!(
                "Unable to find manager implementation to match processor: {}",
                host.machine
            ))
        })?;
        debug!(
            implementation = %manager_impl.id,
            "Using manager implementation"
        );

        let mut plan = DeploymentPlan {
            manager_implementation_id: manager_impl.id.clone(),
            ..DeploymentPlan::default()
        };

        for placement in &node.placements {
            match self.resolve_placement(placement, host) {
                Ok(specs) => {
                    for spec in specs {
                        if spec.component_type == ComponentType::SharedLibrary {
                            plan.composite.push(spec);
                        } else {
                            plan.standalone.push(spec);
                        }
                    }
                }
                Err(e) => {
                    let placement_id = placement
                        .instantiations
                        .first()
                        .map(|i| i.id.as_str())
                        .unwrap_or(placement.file_ref.as_str());
                    error!(error = %e, "Placement resolution failed");
                    error!(placement = %placement_id, "Skipping instantiation");
                }
            }
        }

        info!(
            standalone = plan.standalone.len(),
            composite = plan.composite.len(),
            "Deployment plan ready"
        );
        Ok(plan)
    }

    /// Resolve one placement into a spec per instantiation
    fn resolve_placement(
        &self,
        placement: &Placement,
        host: &HostFacts,
    ) -> Result<Vec<DeploymentSpec>> {
        let profile = self.file_view.load_program_profile(&placement.file_ref)?;

        let implementation = profile
            .matching_implementation(host)
            .ok_or_else(|| {
                DomainError::InternalFailure(format!(
                    "'{}': no available implementation matches this host",
                    profile.id
                ))
            })?
            .clone();

        let mut resolved = HashSet::new();
        if !self.resolve_softpkg_dependencies(&implementation.softpkg_dependencies, host, &mut resolved)
        {
            return Err(DomainError::InternalFailure(format!(
                "'{}': no available softpkg dependencies match this host",
                profile.id
            )));
        }

        // Join the implementation-specific property file into the component set
        let mut joined_profile = profile;
        if let Some(prf) = &implementation.property_file {
            let impl_props = self.file_view.load_property_set(prf)?;
            joined_profile.properties.join(&impl_props);
        }

        let code_path = self.code_file_path(&joined_profile, &implementation)?;

        let component_type = self.classify(placement, &joined_profile, &implementation)?;

        let mut specs = Vec::new();
        for instantiation in &placement.instantiations {
            let mut instance_profile = joined_profile.clone();
            for value in &instantiation.property_overrides {
                instance_profile.properties.override_value(value);
            }
            debug!(
                instantiation = %instantiation.id,
                implementation = %implementation.id,
                "Placing component"
            );
            specs.push(DeploymentSpec {
                placement: placement.clone(),
                instantiation: instantiation.clone(),
                profile: instance_profile,
                implementation_id: implementation.id.clone(),
                code_path: code_path.clone(),
                component_type,
            });
        }
        Ok(specs)
    }

    /// Depth-first dependency resolution; a package revisited on the current
    /// path counts as unresolved, which breaks cycles.
    fn resolve_softpkg_dependencies(
        &self,
        dependencies: &[SoftpkgDependency],
        host: &HostFacts,
        visited: &mut HashSet<String>,
    ) -> bool {
        for dependency in dependencies {
            if !visited.insert(dependency.name.clone()) {
                warn!(
                    package = %dependency.name,
                    "Dependency cycle detected; treating as unresolved"
                );
                return false;
            }
            let matched = dependency.implementations.iter().any(|implementation| {
                implementation.matches(host)
                    && self.resolve_softpkg_dependencies(
                        &implementation.softpkg_dependencies,
                        host,
                        visited,
                    )
            });
            visited.remove(&dependency.name);
            if !matched {
                debug!(
                    package = %dependency.name,
                    "No implementation match for softpkg dependency"
                );
                return false;
            }
        }
        true
    }

    /// Resolve the executable path for the selected implementation. Relative
    /// entry points resolve against the SPD directory; the result must exist
    /// on the file view.
    fn code_file_path(
        &self,
        profile: &ProgramProfile,
        implementation: &ImplementationVariant,
    ) -> Result<PathBuf> {
        if implementation.entry_point.is_empty() {
            return Err(DomainError::InternalFailure(format!(
                "'{}': not instantiating; no entry point provided",
                profile.id
            )));
        }

        let entry = Path::new(&implementation.entry_point);
        let view_path = if entry.is_absolute() {
            entry.to_path_buf()
        } else {
            Path::new(&profile.spd_path).join(entry)
        };
        let view_path = view_path.to_string_lossy().to_string();

        if !self.file_view.exists(&view_path) {
            return Err(DomainError::InternalFailure(format!(
                "Unable to access executable for '{}': {}",
                profile.id, view_path
            )));
        }

        Ok(self.file_view.local_path(&view_path))
    }

    /// Launch classification. Composite placements with shared-library code
    /// are deferred because they need their parent device live.
    fn classify(
        &self,
        placement: &Placement,
        profile: &ProgramProfile,
        implementation: &ImplementationVariant,
    ) -> Result<ComponentType> {
        if placement.is_composite_part() && implementation.code_type == CodeType::SharedLibrary {
            return Ok(ComponentType::SharedLibrary);
        }
        ComponentType::parse(&profile.component_type).ok_or_else(|| {
            DomainError::InternalFailure(format!(
                "Attempt to launch unsupported component type {}",
                profile.component_type
            ))
        })
    }

}
