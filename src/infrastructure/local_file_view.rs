//! Local File View
//! FileView adapter over a directory tree of already-parsed profile documents

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domain::ports::FileView;
use crate::domain::profile::{NodeProfile, ProgramProfile, PropertySet};
use crate::domain::{DomainError, Result};

/// File view rooted at a local directory
///
/// View paths are resolved relative to the root; leading slashes denote the
/// view root, not the host filesystem root.
pub struct LocalFileView {
    root: PathBuf,
}

impl LocalFileView {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }

    fn read(&self, path: &str) -> Result<String> {
        let local = self.resolve(path);
        fs::read_to_string(&local).map_err(|e| {
            DomainError::InternalFailure(format!("Unable to read {}: {}", local.display(), e))
        })
    }
}

impl FileView for LocalFileView {
    fn exists(&self, path: &str) -> bool {
        self.resolve(path).exists()
    }

    fn load_node_profile(&self, path: &str) -> Result<NodeProfile> {
        debug!(path = path, "Loading node profile");
        let raw = self.read(path)?;
        serde_json::from_str(&raw).map_err(|e| {
            DomainError::FatalInit(format!("Failure parsing node profile {}: {}", path, e))
        })
    }

    fn load_program_profile(&self, path: &str) -> Result<ProgramProfile> {
        debug!(path = path, "Loading program profile");
        let raw = self.read(path)?;
        let mut profile: ProgramProfile = serde_json::from_str(&raw).map_err(|e| {
            DomainError::InternalFailure(format!("Failure parsing profile {}: {}", path, e))
        })?;
        if profile.spd_path.is_empty() {
            profile.spd_path = Path::new(path)
                .parent()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default();
        }
        Ok(profile)
    }

    fn load_property_set(&self, path: &str) -> Result<PropertySet> {
        debug!(path = path, "Loading property definitions");
        let raw = self.read(path)?;
        serde_json::from_str(&raw).map_err(|e| {
            DomainError::InternalFailure(format!("Failure parsing properties {}: {}", path, e))
        })
    }

    fn local_path(&self, path: &str) -> PathBuf {
        self.resolve(path)
    }
}
