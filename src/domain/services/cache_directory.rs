//! Manager cache directory
//! Creates `<cacheRoot>/.<label>` and verifies that every file under it can
//! be overwritten by this process or its children

use std::ffi::CString;
use std::fs;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::domain::{DomainError, Result};

/// Create the cache directory and audit write access under it.
///
/// An unwritable cache is fatal: children unpack their code artifacts here.
pub fn prepare_cache_directory(cache_root: &Path, label: &str) -> Result<PathBuf> {
    let cache_dir = cache_root.join(format!(".{}", label));
    debug!(path = ?cache_dir, "Creating manager cache");

    fs::create_dir_all(&cache_dir).map_err(|e| {
        DomainError::FatalInit(format!(
            "Unable to create the manager cache {}: {}",
            cache_dir.display(),
            e
        ))
    })?;
    if let Err(e) = fs::set_permissions(&cache_dir, fs::Permissions::from_mode(0o775)) {
        warn!(path = ?cache_dir, error = %e, "Failed to set cache directory permissions");
    }

    check_write_access(&cache_dir)?;
    Ok(cache_dir)
}

/// Recursive write-access audit; any entry this process cannot overwrite
/// fails the whole check.
fn check_write_access(path: &Path) -> Result<()> {
    let entries = fs::read_dir(path).map_err(|e| {
        DomainError::FatalInit(format!(
            "Unable to read the manager cache {}: {}",
            path.display(),
            e
        ))
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| {
            DomainError::FatalInit(format!(
                "Unable to read the manager cache {}: {}",
                path.display(),
                e
            ))
        })?;
        let entry_path = entry.path();

        if !is_writable(&entry_path) {
            return Err(DomainError::FatalInit(format!(
                "The file '{}' cannot be overwritten by the manager process (or one of its children)",
                entry_path.display()
            )));
        }

        if entry_path.is_dir() {
            check_write_access(&entry_path)?;
        }
    }
    Ok(())
}

fn is_writable(path: &Path) -> bool {
    let Ok(c_path) = CString::new(path.as_os_str().as_bytes()) else {
        return false;
    };
    // access(2) evaluates against the real uid, matching what a forked child
    // will experience
    unsafe { libc::access(c_path.as_ptr(), libc::W_OK) == 0 }
}
