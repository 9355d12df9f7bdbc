//! The project store: canonical in-memory registry of projects, categories
//! and statuses, and the single mediator for every mutation.
//!
//! State lives behind one `RwLock`; taking the write lock is what serializes
//! user mutations against background scan merges. Filesystem side effects run
//! before the lock is taken (or off-thread for scans), and every mutation
//! persists explicitly after the in-memory change.

pub mod debounce;
mod scan;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};
use std::time::Duration;
use uuid::Uuid;

use crate::folders::{FolderReference, FolderRegistry};
use crate::fsops;
use crate::metafile::{self, ProjectMeta};
use crate::model::{status::normalize_color_hex, Category, Project, ProjectTag, Status};
use crate::persistence::PersistenceStore;
use crate::prefs::PrefStore;
use crate::shared::errors::{CoreError, CoreResult};
use debounce::Debouncer;
use scan::ScannedDir;

pub const CATEGORIES_KEY: &str = "projectCategories";
pub const STATUSES_KEY: &str = "projectStatuses";

/// Quiet period before a notes edit is committed and persisted.
const NOTES_DEBOUNCE_MS: u64 = 600;

/// Result of a background scan merge.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScanReport {
    pub added: usize,
    pub refreshed: usize,
}

/// Result of a discovery run.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscoveryReport {
    pub imported: usize,
    pub skipped: usize,
}

struct StoreState {
    projects: Vec<Project>,
    categories: Vec<Category>,
    statuses: Vec<Status>,
    selected_category_id: Uuid,
    selection: Option<Uuid>,
    /// categoryID -> member project ids; the "Tous" bucket lists everything.
    index: HashMap<Uuid, Vec<Uuid>>,
}

pub struct ProjectStore {
    state: RwLock<StoreState>,
    persistence: PersistenceStore,
    registry: FolderRegistry,
    prefs: Arc<PrefStore>,
    /// Bumped when a new scan starts; a scan whose generation is no longer
    /// current discards its results instead of applying them.
    scan_generation: AtomicU64,
    notes_debouncer: Debouncer,
    me: Weak<ProjectStore>,
}

impl ProjectStore {
    /// Builds the store from its injected services, loading persisted state
    /// and repairing referential invariants (dangling status/category ids,
    /// missing fixed category, empty status list).
    pub fn init(
        persistence: PersistenceStore,
        registry: FolderRegistry,
        prefs: Arc<PrefStore>,
    ) -> CoreResult<Arc<Self>> {
        let mut categories: Vec<Category> = prefs.get(CATEGORIES_KEY)?.unwrap_or_default();
        let mut categories_changed = false;
        match categories.iter().position(|c| c.is_fixed) {
            Some(0) => {}
            Some(pos) => {
                let fixed = categories.remove(pos);
                categories.insert(0, fixed);
                categories_changed = true;
            }
            None => {
                categories.insert(0, Category::all());
                categories_changed = true;
            }
        }

        let mut statuses: Vec<Status> = prefs.get(STATUSES_KEY)?.unwrap_or_default();
        let mut statuses_changed = false;
        if statuses.is_empty() {
            statuses = Status::defaults();
            statuses_changed = true;
        }
        statuses.sort_by_key(|s| s.order);

        let mut projects = persistence.load()?;
        for project in &mut projects {
            project.is_editing = false;
            project.is_fully_loaded = true;
            if !statuses.iter().any(|s| s.id == project.status_id) {
                project.status_id = fallback_status_id(&statuses);
            }
            if let Some(category_id) = project.category_id {
                if !categories.iter().any(|c| c.id == category_id) {
                    project.category_id = None;
                }
            }
        }

        if categories_changed {
            prefs.set(CATEGORIES_KEY, &categories)?;
        }
        if statuses_changed {
            prefs.set(STATUSES_KEY, &statuses)?;
        }

        tracing::info!(
            target: "store",
            projects = projects.len(),
            categories = categories.len(),
            statuses = statuses.len(),
            "Project store initialized"
        );

        let mut state = StoreState {
            projects,
            categories,
            statuses,
            selected_category_id: Category::ALL_ID,
            selection: None,
            index: HashMap::new(),
        };
        rebuild_index(&mut state);

        Ok(Arc::new_cyclic(|me| Self {
            state: RwLock::new(state),
            persistence,
            registry,
            prefs,
            scan_generation: AtomicU64::new(0),
            notes_debouncer: Debouncer::new(Duration::from_millis(NOTES_DEBOUNCE_MS)),
            me: me.clone(),
        }))
    }

    pub fn folder_registry(&self) -> &FolderRegistry {
        &self.registry
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn projects(&self) -> Vec<Project> {
        self.state.read().unwrap().projects.clone()
    }

    pub fn categories(&self) -> Vec<Category> {
        self.state.read().unwrap().categories.clone()
    }

    pub fn statuses(&self) -> Vec<Status> {
        self.state.read().unwrap().statuses.clone()
    }

    pub fn project(&self, id: Uuid) -> Option<Project> {
        self.state
            .read()
            .unwrap()
            .projects
            .iter()
            .find(|p| p.id == id)
            .cloned()
    }

    pub fn selection(&self) -> Option<Uuid> {
        self.state.read().unwrap().selection
    }

    pub fn set_selection(&self, id: Option<Uuid>) {
        let mut state = self.state.write().unwrap();
        match id {
            Some(id) if state.projects.iter().any(|p| p.id == id) => state.selection = Some(id),
            Some(_) => {}
            None => state.selection = None,
        }
    }

    pub fn selected_category(&self) -> Uuid {
        self.state.read().unwrap().selected_category_id
    }

    pub fn select_category(&self, id: Uuid) -> CoreResult<()> {
        let mut state = self.state.write().unwrap();
        if !state.categories.iter().any(|c| c.id == id) {
            return Err(CoreError::not_found(format!("category {id}")));
        }
        state.selected_category_id = id;
        Ok(())
    }

    /// Member projects of a category, via the derived index.
    pub fn projects_in_category(&self, category_id: Uuid) -> Vec<Project> {
        let state = self.state.read().unwrap();
        state
            .index
            .get(&category_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| state.projects.iter().find(|p| p.id == *id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Project lifecycle
    // ------------------------------------------------------------------

    /// Creates a new project, assigned to the selected category, and selects
    /// it. When `create_folder_structure` is set, the on-disk skeleton is
    /// created under `target_folder` (or the default folder); a failure there
    /// is reported in the log but never blocks the in-memory creation.
    pub fn add_project(
        &self,
        create_folder_structure: bool,
        target_folder: Option<Uuid>,
    ) -> CoreResult<Project> {
        let mut project = Project::new();
        {
            let state = self.state.read().unwrap();
            if state.selected_category_id != Category::ALL_ID {
                project.category_id = Some(state.selected_category_id);
            }
        }

        if create_folder_structure {
            match self.target_reference(target_folder) {
                Ok(reference) => {
                    let guard = reference.start_access();
                    if guard.is_active() {
                        if let Err(e) = realize_folder(&reference, &mut project) {
                            tracing::warn!(
                                target: "store",
                                title = %project.title,
                                "Project folder creation failed, keeping project anyway: {e}"
                            );
                        }
                    } else {
                        tracing::warn!(target: "store", folder = %reference.name, "Folder inaccessible");
                    }
                }
                Err(e) => {
                    tracing::warn!(target: "store", "No usable root folder: {e}");
                }
            }
        }

        let mut state = self.state.write().unwrap();
        let mut next = state.projects.clone();
        next.push(project.clone());
        self.persistence.save(&next)?;
        state.projects = next;
        state.selection = Some(project.id);
        rebuild_index(&mut state);
        Ok(project)
    }

    /// Removes a project from the registry. Deleting the backing folder is
    /// attempted separately when requested; a failure there orphans the
    /// folder but never blocks the removal.
    pub fn remove_project(&self, id: Uuid, delete_folder_on_disk: bool) -> CoreResult<()> {
        let project = self
            .project(id)
            .ok_or_else(|| CoreError::not_found(format!("project {id}")))?;

        if delete_folder_on_disk {
            if let Some(root) = project.root_folder() {
                let _guard = self.reference_containing(root).map(|r| r.start_access());
                match fsops::delete_directory(root) {
                    Ok(()) => {
                        tracing::info!(target: "store", dir = %root.display(), "Deleted project folder")
                    }
                    Err(e) => tracing::warn!(
                        target: "store",
                        dir = %root.display(),
                        "Could not delete project folder, leaving it orphaned: {e}"
                    ),
                }
            }
        }

        let mut state = self.state.write().unwrap();
        let mut next = state.projects.clone();
        next.retain(|p| p.id != id);
        self.persistence.save(&next)?;
        state.projects = next;
        if state.selection == Some(id) {
            state.selection = None;
        }
        rebuild_index(&mut state);
        Ok(())
    }

    /// Renames a project and its backing folder (metadata file included).
    /// Disk failures abort the rename; the in-memory title stays untouched.
    pub fn rename_project(&self, id: Uuid, new_title: &str) -> CoreResult<()> {
        let new_title = new_title.trim();
        if new_title.is_empty() {
            return Err(CoreError::validation("project title cannot be empty"));
        }
        let project = self
            .project(id)
            .ok_or_else(|| CoreError::not_found(format!("project {id}")))?;

        let mut new_root: Option<PathBuf> = None;
        if let Some(root) = project.root_folder().filter(|p| p.is_dir()) {
            let _guard = self.reference_containing(root).map(|r| r.start_access());
            let renamed = fsops::rename_folder(root, &fsops::sanitize_folder_name(new_title))?;
            new_root = Some(renamed);
        }

        let mut state = self.state.write().unwrap();
        let mut next = state.projects.clone();
        let entry = next
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| CoreError::not_found(format!("project {id}")))?;
        entry.title = new_title.to_string();
        if let Some(root) = new_root {
            entry.root_folder_path = Some(root);
        }
        entry.touch();

        if let Some(dir) = entry.root_folder_path.clone() {
            if let Err(e) = metafile::write_meta(&dir, &ProjectMeta::from_project(entry)) {
                tracing::warn!(target: "store", "Could not refresh project metadata file: {e}");
            }
        }

        self.persistence.save(&next)?;
        state.projects = next;
        Ok(())
    }

    /// Moves a project to another category (or back to "Tous" with `None`).
    pub fn assign_category(&self, id: Uuid, category_id: Option<Uuid>) -> CoreResult<()> {
        self.update_project(id, |project, state| {
            if let Some(category_id) = category_id {
                if !state.categories.iter().any(|c| c.id == category_id) {
                    return Err(CoreError::not_found(format!("category {category_id}")));
                }
            }
            project.category_id = category_id.filter(|c| *c != Category::ALL_ID);
            Ok(())
        })
    }

    pub fn set_status(&self, id: Uuid, status_id: Uuid) -> CoreResult<()> {
        self.update_project(id, |project, state| {
            if !state.statuses.iter().any(|s| s.id == status_id) {
                return Err(CoreError::not_found(format!("status {status_id}")));
            }
            project.status_id = status_id;
            Ok(())
        })
    }

    pub fn set_details(&self, id: Uuid, details: &str) -> CoreResult<()> {
        let details = details.to_string();
        self.update_project(id, move |project, _| {
            project.details = details;
            Ok(())
        })
    }

    pub fn toggle_tag(&self, id: Uuid, tag: ProjectTag) -> CoreResult<()> {
        self.update_project(id, move |project, _| {
            project.toggle_tag(tag);
            Ok(())
        })
    }

    /// Transient UI flag: browsing vs. editing. Not persisted.
    pub fn set_editing(&self, id: Uuid, editing: bool) {
        let mut state = self.state.write().unwrap();
        if let Some(project) = state.projects.iter_mut().find(|p| p.id == id) {
            project.is_editing = editing;
        }
    }

    /// Updates the notes draft immediately and schedules the durable commit
    /// behind the debounce quiet period; each keystroke replaces the pending
    /// commit. Requires a tokio runtime.
    pub fn set_notes(&self, id: Uuid, notes: &str) {
        {
            let mut state = self.state.write().unwrap();
            if let Some(project) = state.projects.iter_mut().find(|p| p.id == id) {
                project.notes = notes.to_string();
                project.touch();
            } else {
                return;
            }
        }

        let me = self.me.clone();
        self.notes_debouncer.schedule(move || {
            if let Some(store) = me.upgrade() {
                let state = store.state.read().unwrap();
                if let Err(e) = store.persistence.save(&state.projects) {
                    tracing::warn!(target: "store", "Debounced notes save failed: {e}");
                }
            }
        });
    }

    /// Backfill: creates the on-disk skeleton for a project that exists only
    /// in the registry. User-initiated, so every failure propagates.
    pub fn create_folder_structure(&self, id: Uuid) -> CoreResult<()> {
        let mut project = self
            .project(id)
            .ok_or_else(|| CoreError::not_found(format!("project {id}")))?;
        let reference = self.target_reference(None)?;
        let guard = reference.start_access();
        if !guard.is_active() {
            return Err(CoreError::stale(format!("folder {} is inaccessible", reference.name)));
        }
        realize_folder(&reference, &mut project)?;

        let mut state = self.state.write().unwrap();
        let mut next = state.projects.clone();
        let entry = next
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| CoreError::not_found(format!("project {id}")))?;
        entry.root_folder_path = project.root_folder_path.clone();
        entry.has_folder_structure = true;
        entry.touch();
        self.persistence.save(&next)?;
        state.projects = next;
        Ok(())
    }

    /// Most relevant After Effects file of a project, by dated filename.
    pub fn latest_aep(&self, id: Uuid) -> CoreResult<Option<PathBuf>> {
        let project = self
            .project(id)
            .ok_or_else(|| CoreError::not_found(format!("project {id}")))?;
        let Some(aep_dir) = project.aep_folder() else {
            return Ok(None);
        };
        if !fsops::directory_exists(&aep_dir) {
            return Ok(None);
        }
        let _guard = self.reference_containing(&aep_dir).map(|r| r.start_access());
        fsops::latest_dated_file(&aep_dir, "aep")
    }

    // ------------------------------------------------------------------
    // Categories
    // ------------------------------------------------------------------

    pub fn add_category(&self, name: &str, system_image: &str) -> CoreResult<Category> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::validation("category name cannot be empty"));
        }
        let category = Category::new(name, system_image);

        let mut state = self.state.write().unwrap();
        let mut next = state.categories.clone();
        next.push(category.clone());
        self.prefs.set(CATEGORIES_KEY, &next)?;
        state.categories = next;
        rebuild_index(&mut state);
        Ok(category)
    }

    pub fn rename_category(&self, id: Uuid, new_name: &str) -> CoreResult<()> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(CoreError::validation("category name cannot be empty"));
        }
        let mut state = self.state.write().unwrap();
        let mut next = state.categories.clone();
        let category = next
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| CoreError::not_found(format!("category {id}")))?;
        if category.is_fixed {
            return Err(CoreError::protected("the fixed category cannot be renamed"));
        }
        category.name = new_name.to_string();
        self.prefs.set(CATEGORIES_KEY, &next)?;
        state.categories = next;
        Ok(())
    }

    /// Deletes a category; every member project moves back to "Tous".
    pub fn remove_category(&self, id: Uuid) -> CoreResult<()> {
        let mut state = self.state.write().unwrap();
        let category = state
            .categories
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| CoreError::not_found(format!("category {id}")))?;
        if category.is_fixed {
            return Err(CoreError::protected("the fixed category cannot be deleted"));
        }

        let mut next_projects = state.projects.clone();
        for project in &mut next_projects {
            if project.category_id == Some(id) {
                project.category_id = None;
                project.touch();
            }
        }
        let mut next_categories = state.categories.clone();
        next_categories.retain(|c| c.id != id);

        self.persistence.save(&next_projects)?;
        self.prefs.set(CATEGORIES_KEY, &next_categories)?;
        state.projects = next_projects;
        state.categories = next_categories;
        if state.selected_category_id == id {
            state.selected_category_id = Category::ALL_ID;
        }
        rebuild_index(&mut state);
        Ok(())
    }

    /// Reorders categories. Index 0 belongs to the fixed category: nothing
    /// moves to or from it.
    pub fn move_category(&self, from: usize, to: usize) -> CoreResult<()> {
        let mut state = self.state.write().unwrap();
        if from == 0 || to == 0 {
            return Err(CoreError::protected("the fixed category stays at the first position"));
        }
        if from >= state.categories.len() || to >= state.categories.len() {
            return Err(CoreError::validation("category index out of bounds"));
        }
        let mut next = state.categories.clone();
        let category = next.remove(from);
        next.insert(to, category);
        self.prefs.set(CATEGORIES_KEY, &next)?;
        state.categories = next;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Statuses
    // ------------------------------------------------------------------

    pub fn add_status(&self, name: &str, color_hex: &str) -> CoreResult<Status> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::validation("status name cannot be empty"));
        }
        let mut state = self.state.write().unwrap();
        let order = state.statuses.iter().map(|s| s.order).max().unwrap_or(-1) + 1;
        let status = Status::new(name, color_hex, order);

        let mut next = state.statuses.clone();
        next.push(status.clone());
        self.prefs.set(STATUSES_KEY, &next)?;
        state.statuses = next;
        Ok(status)
    }

    /// System statuses are renameable (policy: rename and recolor allowed,
    /// deletion never).
    pub fn rename_status(&self, id: Uuid, new_name: &str) -> CoreResult<()> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(CoreError::validation("status name cannot be empty"));
        }
        let mut state = self.state.write().unwrap();
        let mut next = state.statuses.clone();
        let status = next
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| CoreError::not_found(format!("status {id}")))?;
        status.name = new_name.to_string();
        self.prefs.set(STATUSES_KEY, &next)?;
        state.statuses = next;
        Ok(())
    }

    pub fn change_status_color(&self, id: Uuid, color_hex: &str) -> CoreResult<()> {
        let mut state = self.state.write().unwrap();
        let mut next = state.statuses.clone();
        let status = next
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| CoreError::not_found(format!("status {id}")))?;
        status.color_hex = normalize_color_hex(color_hex);
        self.prefs.set(STATUSES_KEY, &next)?;
        state.statuses = next;
        Ok(())
    }

    /// Deletes a user status; every referencing project falls back to the
    /// default "not started" status. System statuses are never deletable.
    pub fn remove_status(&self, id: Uuid) -> CoreResult<()> {
        let mut state = self.state.write().unwrap();
        let status = state
            .statuses
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| CoreError::not_found(format!("status {id}")))?;
        if status.is_system {
            return Err(CoreError::protected("system statuses cannot be deleted"));
        }
        if state.statuses.len() <= 1 {
            return Err(CoreError::protected("the last status cannot be deleted"));
        }

        let mut next_statuses = state.statuses.clone();
        next_statuses.retain(|s| s.id != id);
        let fallback = fallback_status_id(&next_statuses);

        let mut next_projects = state.projects.clone();
        for project in &mut next_projects {
            if project.status_id == id {
                project.status_id = fallback;
                project.touch();
            }
        }

        self.persistence.save(&next_projects)?;
        self.prefs.set(STATUSES_KEY, &next_statuses)?;
        state.projects = next_projects;
        state.statuses = next_statuses;
        Ok(())
    }

    /// Reorders statuses and recomputes every `order` field to match the new
    /// positions.
    pub fn move_status(&self, from: usize, to: usize) -> CoreResult<()> {
        let mut state = self.state.write().unwrap();
        if from >= state.statuses.len() || to >= state.statuses.len() {
            return Err(CoreError::validation("status index out of bounds"));
        }
        let mut next = state.statuses.clone();
        let status = next.remove(from);
        next.insert(to, status);
        for (position, status) in next.iter_mut().enumerate() {
            status.order = position as i32;
        }
        self.prefs.set(STATUSES_KEY, &next)?;
        state.statuses = next;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Scan, discovery, import/export
    // ------------------------------------------------------------------

    /// Scans a root folder's subdirectories and merges their lightweight
    /// metadata into the registry: unknown projects are added (not fully
    /// loaded), known projects may regain a lost folder path, and nothing is
    /// ever pruned — a project whose folder disappeared stays visible.
    pub async fn scan_folder(&self, folder_override: Option<Uuid>) -> CoreResult<ScanReport> {
        let (entries, generation) = self.run_walk(folder_override).await?;
        Ok(self.merge_scan(&entries, generation))
    }

    /// Applies walk results under the write lock. A walk whose generation was
    /// superseded by a later one contributes nothing.
    fn merge_scan(&self, entries: &[ScannedDir], generation: u64) -> ScanReport {
        let mut state = self.state.write().unwrap();
        if self.scan_generation.load(Ordering::SeqCst) != generation {
            tracing::info!(target: "store::scan", "Scan superseded, discarding results");
            return ScanReport::default();
        }

        let mut report = ScanReport::default();
        let mut next = state.projects.clone();
        for entry in entries {
            let Some(meta) = &entry.meta else { continue };
            if let Some(existing) = next.iter_mut().find(|p| p.id == meta.id) {
                if existing.root_folder_path.is_none() {
                    existing.root_folder_path = Some(entry.path.clone());
                    existing.has_folder_structure |= entry.qualifies_as_project();
                    report.refreshed += 1;
                }
            } else {
                next.push(lightweight_project(&state.statuses, &state.categories, meta, entry));
                report.added += 1;
            }
        }

        if report.added + report.refreshed > 0 {
            if let Err(e) = self.persistence.save(&next) {
                tracing::warn!(target: "store::scan", "Could not persist scan results: {e}");
            }
            state.projects = next;
            rebuild_index(&mut state);
        }
        tracing::info!(
            target: "store::scan",
            added = report.added,
            refreshed = report.refreshed,
            "Scan merged"
        );
        report
    }

    /// Looks for qualifying directories not referenced by any known project
    /// and imports them as new projects.
    pub async fn discover_and_import(
        &self,
        folder_override: Option<Uuid>,
    ) -> CoreResult<DiscoveryReport> {
        let (entries, generation) = self.run_walk(folder_override).await?;
        Ok(self.merge_discovery(&entries, generation))
    }

    fn merge_discovery(&self, entries: &[ScannedDir], generation: u64) -> DiscoveryReport {
        let mut state = self.state.write().unwrap();
        if self.scan_generation.load(Ordering::SeqCst) != generation {
            tracing::info!(target: "store::scan", "Discovery superseded, discarding results");
            return DiscoveryReport::default();
        }

        let mut report = DiscoveryReport::default();
        let mut next = state.projects.clone();
        for entry in entries {
            let tracked = next.iter().any(|p| {
                p.root_folder_path.as_deref() == Some(entry.path.as_path())
                    || entry.meta.as_ref().is_some_and(|m| m.id == p.id)
            });
            if tracked || !entry.qualifies_as_project() {
                report.skipped += 1;
                continue;
            }
            let project = match &entry.meta {
                Some(meta) => lightweight_project(&state.statuses, &state.categories, meta, entry),
                None => {
                    let mut project = Project::new();
                    project.is_editing = false;
                    project.is_fully_loaded = false;
                    project.title = entry
                        .path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or("Projet")
                        .to_string();
                    project.root_folder_path = Some(entry.path.clone());
                    project.has_folder_structure = true;
                    project
                }
            };
            next.push(project);
            report.imported += 1;
        }

        if report.imported > 0 {
            if let Err(e) = self.persistence.save(&next) {
                tracing::warn!(target: "store::scan", "Could not persist discovered projects: {e}");
            }
            state.projects = next;
            rebuild_index(&mut state);
        }
        tracing::info!(
            target: "store::scan",
            imported = report.imported,
            skipped = report.skipped,
            "Discovery merged"
        );
        report
    }

    /// Resolves the target folder, bumps the scan generation (superseding any
    /// in-flight scan) and walks the directory off-thread under an access
    /// guard.
    async fn run_walk(
        &self,
        folder_override: Option<Uuid>,
    ) -> CoreResult<(Vec<ScannedDir>, u64)> {
        let reference = self.target_reference(folder_override)?;
        let guard = reference.start_access();
        if !guard.is_active() {
            return Err(CoreError::stale(format!("folder {} is inaccessible", reference.name)));
        }
        let root = reference.resolve()?;
        let generation = self.scan_generation.fetch_add(1, Ordering::SeqCst) + 1;

        let entries = tokio::task::spawn_blocking(move || scan::scan_directory(&root))
            .await
            .map_err(|e| CoreError::Io(std::io::Error::other(e)))?;
        drop(guard);
        Ok((entries, generation))
    }

    pub fn export_all(&self, destination: &Path) -> CoreResult<()> {
        let state = self.state.read().unwrap();
        self.persistence.export_to(&state.projects, destination)
    }

    /// Imports projects from a file, skipping any whose id already exists.
    /// Returns how many were added.
    pub fn import_merge(&self, source: &Path) -> CoreResult<usize> {
        let imported = self.persistence.import_from(source)?;

        let mut state = self.state.write().unwrap();
        let mut next = state.projects.clone();
        let mut added = 0;
        for mut project in imported {
            if next.iter().any(|p| p.id == project.id) {
                continue;
            }
            normalize_references(&mut project, &state.statuses, &state.categories);
            next.push(project);
            added += 1;
        }
        self.persistence.save(&next)?;
        state.projects = next;
        rebuild_index(&mut state);
        Ok(added)
    }

    /// Replaces the whole registry with the file's contents.
    pub fn import_replace(&self, source: &Path) -> CoreResult<usize> {
        let mut imported = self.persistence.import_from(source)?;

        let mut state = self.state.write().unwrap();
        for project in &mut imported {
            normalize_references(project, &state.statuses, &state.categories);
        }
        self.persistence.save(&imported)?;
        let count = imported.len();
        state.projects = imported;
        if let Some(selected) = state.selection {
            if !state.projects.iter().any(|p| p.id == selected) {
                state.selection = None;
            }
        }
        rebuild_index(&mut state);
        Ok(count)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn target_reference(&self, id: Option<Uuid>) -> CoreResult<FolderReference> {
        match id {
            Some(id) => self
                .registry
                .lookup(id)
                .ok_or_else(|| CoreError::not_found(format!("folder reference {id}"))),
            None => self
                .registry
                .default_folder()
                .ok_or_else(|| CoreError::validation("no root folder configured")),
        }
    }

    /// The registered folder whose root contains `path`, if any.
    fn reference_containing(&self, path: &Path) -> Option<FolderReference> {
        self.registry.all().into_iter().find(|reference| {
            reference
                .resolve()
                .map(|root| path.starts_with(&root))
                .unwrap_or(false)
        })
    }

    /// Shared write path for simple persisted project mutations: mutate a
    /// draft, bump `updated_at`, save, then commit.
    fn update_project<F>(&self, id: Uuid, mutate: F) -> CoreResult<()>
    where
        F: FnOnce(&mut Project, &StoreState) -> CoreResult<()>,
    {
        let mut state = self.state.write().unwrap();
        let mut next = state.projects.clone();
        let project = next
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| CoreError::not_found(format!("project {id}")))?;
        mutate(project, &state)?;
        project.touch();
        self.persistence.save(&next)?;
        state.projects = next;
        rebuild_index(&mut state);
        Ok(())
    }
}

/// Creates the on-disk skeleton and metadata file for a project, filling in
/// its folder fields.
fn realize_folder(reference: &FolderReference, project: &mut Project) -> CoreResult<()> {
    let root = reference.resolve()?;
    let name = fsops::sanitize_folder_name(&project.title);
    let dir = fsops::create_project_skeleton(&root, &name)?;
    metafile::write_meta(&dir, &ProjectMeta::from_project(project))?;
    project.root_folder_path = Some(dir);
    project.has_folder_structure = true;
    Ok(())
}

/// Builds a registry entry from a scanned directory's metadata, resolving
/// dangling status/category references.
fn lightweight_project(
    statuses: &[Status],
    categories: &[Category],
    meta: &ProjectMeta,
    entry: &ScannedDir,
) -> Project {
    let mut project = Project::new();
    project.id = meta.id;
    project.title = meta.title.clone();
    project.status_id = if statuses.iter().any(|s| s.id == meta.status_id) {
        meta.status_id
    } else {
        fallback_status_id(statuses)
    };
    project.category_id = meta
        .category_id
        .filter(|id| categories.iter().any(|c| c.id == *id && !c.is_fixed));
    project.root_folder_path = Some(entry.path.clone());
    project.has_folder_structure = entry.qualifies_as_project();
    project.is_editing = false;
    project.is_fully_loaded = false;
    project
}

fn normalize_references(project: &mut Project, statuses: &[Status], categories: &[Category]) {
    project.is_editing = false;
    project.is_fully_loaded = true;
    if !statuses.iter().any(|s| s.id == project.status_id) {
        project.status_id = fallback_status_id(statuses);
    }
    if let Some(category_id) = project.category_id {
        if !categories.iter().any(|c| c.id == category_id && !c.is_fixed) {
            project.category_id = None;
        }
    }
}

fn fallback_status_id(statuses: &[Status]) -> Uuid {
    if statuses.iter().any(|s| s.id == Status::NOT_STARTED_ID) {
        Status::NOT_STARTED_ID
    } else {
        statuses.first().map(|s| s.id).unwrap_or(Status::NOT_STARTED_ID)
    }
}

fn rebuild_index(state: &mut StoreState) {
    let mut index: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for category in &state.categories {
        index.entry(category.id).or_default();
    }
    for project in &state.projects {
        index.entry(Category::ALL_ID).or_default().push(project.id);
        if let Some(category_id) = project.category_id {
            if category_id != Category::ALL_ID {
                index.entry(category_id).or_default().push(project.id);
            }
        }
    }
    state.index = index;
}
