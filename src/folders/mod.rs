//! Registered root folders and their durable access grants.

pub mod access;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::prefs::PrefStore;
use crate::shared::errors::{CoreError, CoreResult};
use access::{start_access, AccessGrant, AccessGuard};

/// Preference key holding the folder registry.
pub const FOLDERS_KEY: &str = "projectFolders";
/// Pre-registry versions stored a single folder path under this key.
pub const LEGACY_BOOKMARK_KEY: &str = "projectsFolderBookmark";

/// A named, durable reference to a root folder holding project directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderReference {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "bookmark")]
    pub grant: AccessGrant,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl FolderReference {
    /// Captures a reference for a directory, deriving the display name from
    /// the directory name when none is given.
    pub fn capture(dir: &Path, name: Option<String>, is_default: bool) -> CoreResult<Self> {
        let grant = AccessGrant::capture(dir)?;
        let name = name.unwrap_or_else(|| {
            dir.file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("Dossier")
                .to_string()
        });
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            grant,
            is_default,
            created_at: Utc::now(),
        })
    }

    pub fn resolve(&self) -> CoreResult<PathBuf> {
        self.grant.resolve()
    }

    /// Scoped access bracket; hold the returned guard for the duration of
    /// any filesystem work under this folder.
    pub fn start_access(&self) -> AccessGuard {
        start_access(self.id, &self.grant)
    }
}

/// The set of configured root folders, exactly one of which is default
/// whenever the set is non-empty. Persisted in the preference store.
pub struct FolderRegistry {
    prefs: Arc<PrefStore>,
    folders: Mutex<Vec<FolderReference>>,
}

impl FolderRegistry {
    /// Loads the registry, running the one-time legacy migration if an old
    /// single-folder key is present and no registry exists yet.
    pub fn load(prefs: Arc<PrefStore>) -> CoreResult<Self> {
        let mut folders: Vec<FolderReference> = prefs.get(FOLDERS_KEY)?.unwrap_or_default();

        if folders.is_empty() && !prefs.contains(FOLDERS_KEY)? {
            if let Some(legacy_path) = prefs.get::<PathBuf>(LEGACY_BOOKMARK_KEY)? {
                match FolderReference::capture(&legacy_path, None, true) {
                    Ok(reference) => {
                        tracing::info!(
                            target: "folders",
                            path = %legacy_path.display(),
                            "Migrated legacy folder bookmark"
                        );
                        folders.push(reference);
                        prefs.set(FOLDERS_KEY, &folders)?;
                    }
                    Err(e) => {
                        tracing::warn!(
                            target: "folders",
                            path = %legacy_path.display(),
                            "Legacy folder bookmark no longer resolves: {e}"
                        );
                    }
                }
                prefs.remove(LEGACY_BOOKMARK_KEY)?;
            }
        }

        Ok(Self {
            prefs,
            folders: Mutex::new(folders),
        })
    }

    fn persist(&self, folders: &[FolderReference]) -> CoreResult<()> {
        self.prefs.set(FOLDERS_KEY, &folders)
    }

    /// Registers a folder. The first registered folder is always default;
    /// `set_as_default` moves the default flag off every other folder.
    pub fn add_folder(
        &self,
        dir: &Path,
        name: Option<String>,
        set_as_default: bool,
    ) -> CoreResult<FolderReference> {
        let mut folders = self.folders.lock().unwrap();

        let make_default = folders.is_empty() || set_as_default;
        let reference = FolderReference::capture(dir, name, make_default)?;

        let mut next = folders.clone();
        if make_default {
            for f in &mut next {
                f.is_default = false;
            }
        }
        next.push(reference.clone());

        self.persist(&next)?;
        *folders = next;
        tracing::info!(target: "folders", name = %reference.name, "Registered folder");
        Ok(reference)
    }

    /// Removes a folder. The last remaining folder is protected: the call
    /// succeeds but returns `false` and leaves the registry untouched.
    /// Removing the default folder promotes the first remaining one.
    pub fn remove_folder(&self, id: Uuid) -> CoreResult<bool> {
        let mut folders = self.folders.lock().unwrap();

        if folders.len() <= 1 {
            tracing::warn!(target: "folders", "Refusing to remove the last registered folder");
            return Ok(false);
        }
        let position = folders
            .iter()
            .position(|f| f.id == id)
            .ok_or_else(|| CoreError::not_found(format!("folder reference {id}")))?;

        let mut next = folders.clone();
        let removed = next.remove(position);
        if removed.is_default {
            if let Some(first) = next.first_mut() {
                first.is_default = true;
            }
        }

        self.persist(&next)?;
        *folders = next;
        Ok(true)
    }

    pub fn set_default(&self, id: Uuid) -> CoreResult<()> {
        let mut folders = self.folders.lock().unwrap();
        if !folders.iter().any(|f| f.id == id) {
            return Err(CoreError::not_found(format!("folder reference {id}")));
        }

        let mut next = folders.clone();
        for f in &mut next {
            f.is_default = f.id == id;
        }

        self.persist(&next)?;
        *folders = next;
        Ok(())
    }

    pub fn rename(&self, id: Uuid, new_name: &str) -> CoreResult<()> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(CoreError::validation("folder name cannot be empty"));
        }
        let mut folders = self.folders.lock().unwrap();
        let mut next = folders.clone();
        let folder = next
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or_else(|| CoreError::not_found(format!("folder reference {id}")))?;
        folder.name = new_name.to_string();

        self.persist(&next)?;
        *folders = next;
        Ok(())
    }

    pub fn lookup(&self, id: Uuid) -> Option<FolderReference> {
        self.folders.lock().unwrap().iter().find(|f| f.id == id).cloned()
    }

    pub fn default_folder(&self) -> Option<FolderReference> {
        self.folders.lock().unwrap().iter().find(|f| f.is_default).cloned()
    }

    pub fn all(&self) -> Vec<FolderReference> {
        self.folders.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.folders.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.folders.lock().unwrap().is_empty()
    }
}
