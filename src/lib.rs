//! Core of a folder-backed project tracker for motion design studios.
//!
//! Projects live in a central JSON registry; each one maps to a directory
//! with a fixed subfolder skeleton under a user-registered root folder. The
//! [`store::ProjectStore`] mediates every mutation, keeps the registry and
//! the on-disk folders consistent, and merges background scans without ever
//! pruning a project whose folder went missing.

pub mod folders;
pub mod fsops;
pub mod logging;
pub mod metafile;
pub mod model;
pub mod persistence;
pub mod prefs;
pub mod shared;
pub mod store;

use std::sync::Arc;

use folders::FolderRegistry;
use persistence::PersistenceStore;
use prefs::PrefStore;
use shared::errors::CoreResult;
use store::ProjectStore;

pub use shared::errors::CoreError;

/// Wires the default services (preference store, folder registry, registry
/// persistence) and loads the project store. Called once per process; the UI
/// layer holds the returned handle.
pub fn init_store() -> CoreResult<Arc<ProjectStore>> {
    let prefs = Arc::new(PrefStore::open_default());
    let registry = FolderRegistry::load(Arc::clone(&prefs))?;
    let persistence = PersistenceStore::open_default();
    ProjectStore::init(persistence, registry, prefs)
}
