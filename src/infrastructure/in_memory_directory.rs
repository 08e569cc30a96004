//! In-Memory Name Directory
//! Thread-safe NameDirectory adapter for single-process deployments and tests

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::debug;

use crate::domain::ports::{DirectoryError, NameDirectory, RemoteRegistry};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Entry {
    Context,
    Binding(String),
}

/// In-memory naming directory
///
/// Registries are installed out of band (there is no transport to narrow
/// through); name bindings hold stringified references.
pub struct InMemoryNameDirectory {
    entries: Mutex<HashMap<String, Entry>>,
    registries: Mutex<HashMap<String, Arc<dyn RemoteRegistry>>>,
}

impl InMemoryNameDirectory {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            registries: Mutex::new(HashMap::new()),
        }
    }

    /// Make a registry resolvable under `path`
    pub fn install_registry(&self, path: &str, registry: Arc<dyn RemoteRegistry>) {
        self.registries
            .lock()
            .unwrap()
            .insert(path.to_string(), registry);
    }

    /// Current binding under `path`, if any
    pub fn binding(&self, path: &str) -> Option<String> {
        match self.entries.lock().unwrap().get(path) {
            Some(Entry::Binding(ior)) => Some(ior.clone()),
            _ => None,
        }
    }
}

impl Default for InMemoryNameDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NameDirectory for InMemoryNameDirectory {
    async fn resolve_registry(
        &self,
        path: &str,
    ) -> Result<Arc<dyn RemoteRegistry>, DirectoryError> {
        self.registries
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| DirectoryError::NotFound(path.to_string()))
    }

    async fn bind_new_context(&self, path: &str) -> Result<(), DirectoryError> {
        let mut entries = self.entries.lock().unwrap();
        if entries.contains_key(path) {
            return Err(DirectoryError::AlreadyBound(path.to_string()));
        }
        debug!(path = path, "Created naming context");
        entries.insert(path.to_string(), Entry::Context);
        Ok(())
    }

    async fn bind(&self, path: &str, ior: &str) -> Result<(), DirectoryError> {
        let mut entries = self.entries.lock().unwrap();
        if entries.contains_key(path) {
            return Err(DirectoryError::AlreadyBound(path.to_string()));
        }
        entries.insert(path.to_string(), Entry::Binding(ior.to_string()));
        Ok(())
    }

    async fn rebind(&self, path: &str, ior: &str) -> Result<(), DirectoryError> {
        self.entries
            .lock()
            .unwrap()
            .insert(path.to_string(), Entry::Binding(ior.to_string()));
        Ok(())
    }

    async fn unbind(&self, path: &str) -> Result<(), DirectoryError> {
        let mut entries = self.entries.lock().unwrap();
        let removed = entries.remove(path);
        // Unbinding a context removes everything under it
        if matches!(removed, Some(Entry::Context)) {
            let prefix = format!("{}/", path);
            entries.retain(|key, _| !key.starts_with(&prefix));
        }
        match removed {
            Some(_) => Ok(()),
            None => Err(DirectoryError::NotFound(path.to_string())),
        }
    }
}
