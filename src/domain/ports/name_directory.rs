//! NameDirectory port
//! Hierarchical naming surface used for registration visibility

use crate::domain::ports::RemoteRegistry;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Failures raised by the naming directory
#[derive(Debug, Error, Clone)]
pub enum DirectoryError {
    #[error("name not found: {0}")]
    NotFound(String),

    #[error("name already bound: {0}")]
    AlreadyBound(String),

    #[error("directory failure: {0}")]
    Backend(String),
}

impl DirectoryError {
    pub fn is_already_bound(&self) -> bool {
        matches!(self, Self::AlreadyBound(_))
    }
}

/// Port for the naming directory
///
/// Paths are slash-separated, rooted at the domain context
/// (e.g. `REDHAWK_DEV/DevMgr_node-1/gpp_1`).
#[async_trait]
pub trait NameDirectory: Send + Sync {
    /// Resolve the domain manager's registry under its configured name and
    /// narrow it to a typed handle
    async fn resolve_registry(&self, path: &str) -> Result<Arc<dyn RemoteRegistry>, DirectoryError>;

    /// Create a new (empty) naming context
    async fn bind_new_context(&self, path: &str) -> Result<(), DirectoryError>;

    /// Bind a stringified reference; fails on collision
    async fn bind(&self, path: &str, ior: &str) -> Result<(), DirectoryError>;

    /// Bind a stringified reference, replacing any existing binding
    async fn rebind(&self, path: &str, ior: &str) -> Result<(), DirectoryError>;

    /// Remove a binding or context
    async fn unbind(&self, path: &str) -> Result<(), DirectoryError>;
}
