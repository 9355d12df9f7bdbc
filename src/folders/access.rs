//! Scoped, reference-counted access to grant-backed directories.
//!
//! Every filesystem operation touching a reference-backed directory brackets
//! its work in an [`AccessGuard`]. Guards nest: a process-wide per-reference
//! count is incremented on start and decremented on drop, and the underlying
//! access is released only when the count reaches zero. Dropping on every
//! path (including early returns) is what the RAII guard buys us.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use uuid::Uuid;

use crate::shared::errors::{CoreError, CoreResult};

/// Per-reference count of currently active access holders.
static ACCESS_REGISTRY: Lazy<Mutex<HashMap<Uuid, usize>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// A durable grant to a directory chosen once by the user. Persisted as an
/// opaque blob; resolved to a live path on demand, which may fail once the
/// directory has been moved away or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessGrant {
    path: PathBuf,
    canonical: PathBuf,
}

impl AccessGrant {
    /// Captures a grant for an existing directory.
    pub fn capture(dir: &Path) -> CoreResult<Self> {
        let canonical = dir.canonicalize()?;
        if !canonical.is_dir() {
            return Err(CoreError::validation(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
        Ok(Self {
            path: dir.to_path_buf(),
            canonical,
        })
    }

    /// Resolves the grant to a live directory path.
    ///
    /// The canonical path survives renames of the path the user originally
    /// picked through (symlinks, relabeled mounts); when both forms are gone
    /// the grant is stale and callers must surface that, not swallow it.
    pub fn resolve(&self) -> CoreResult<PathBuf> {
        if self.canonical.is_dir() {
            return Ok(self.canonical.clone());
        }
        if self.path.is_dir() {
            return Ok(self.path.clone());
        }
        Err(CoreError::stale(format!(
            "directory {} no longer exists",
            self.path.display()
        )))
    }
}

/// RAII guard for scoped access to a reference-backed directory.
/// Inactive guards (failed start) decrement nothing on drop.
pub struct AccessGuard {
    reference_id: Uuid,
    active: bool,
}

impl AccessGuard {
    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl Drop for AccessGuard {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        if let Ok(mut registry) = ACCESS_REGISTRY.lock() {
            let release = match registry.get_mut(&self.reference_id) {
                Some(count) if *count > 1 => {
                    *count -= 1;
                    false
                }
                Some(_) => {
                    registry.remove(&self.reference_id);
                    true
                }
                None => false,
            };
            if release {
                tracing::trace!(
                    target: "folders::access",
                    reference = %self.reference_id,
                    "Released folder access"
                );
            }
        }
    }
}

/// Starts scoped access for a reference. Returns an inactive guard when the
/// grant can no longer be resolved; callers check [`AccessGuard::is_active`]
/// before touching the directory.
pub fn start_access(reference_id: Uuid, grant: &AccessGrant) -> AccessGuard {
    if grant.resolve().is_err() {
        return AccessGuard {
            reference_id,
            active: false,
        };
    }

    if let Ok(mut registry) = ACCESS_REGISTRY.lock() {
        *registry.entry(reference_id).or_insert(0) += 1;
    }
    AccessGuard {
        reference_id,
        active: true,
    }
}

/// Whether any holder currently has access to the reference.
pub fn is_access_active(reference_id: Uuid) -> bool {
    ACCESS_REGISTRY
        .lock()
        .map(|registry| registry.contains_key(&reference_id))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_and_resolve() {
        let tmp = tempfile::tempdir().unwrap();
        let grant = AccessGrant::capture(tmp.path()).unwrap();
        assert_eq!(grant.resolve().unwrap(), tmp.path().canonicalize().unwrap());
    }

    #[test]
    fn test_resolve_deleted_directory_is_stale() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("gone");
        std::fs::create_dir(&dir).unwrap();
        let grant = AccessGrant::capture(&dir).unwrap();

        std::fs::remove_dir(&dir).unwrap();
        assert!(matches!(grant.resolve(), Err(CoreError::Stale(_))));
    }

    #[test]
    fn test_nested_guards_release_at_zero() {
        let tmp = tempfile::tempdir().unwrap();
        let grant = AccessGrant::capture(tmp.path()).unwrap();
        let id = Uuid::new_v4();

        let outer = start_access(id, &grant);
        let inner = start_access(id, &grant);
        assert!(outer.is_active() && inner.is_active());
        assert!(is_access_active(id));

        drop(inner);
        assert!(is_access_active(id), "outer holder must keep access alive");

        drop(outer);
        assert!(!is_access_active(id));
    }

    #[test]
    fn test_failed_start_yields_inactive_guard() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("gone");
        std::fs::create_dir(&dir).unwrap();
        let grant = AccessGrant::capture(&dir).unwrap();
        std::fs::remove_dir(&dir).unwrap();

        let id = Uuid::new_v4();
        let guard = start_access(id, &grant);
        assert!(!guard.is_active());
        assert!(!is_access_active(id));
        drop(guard); // must not underflow the registry
        assert!(!is_access_active(id));
    }
}
