//! Central project registry persistence.
//!
//! The full project list is one JSON document at a fixed app-private path.
//! Writes go through a sibling temp file renamed over the target, so a crash
//! mid-write leaves the previous file intact. The same format serves
//! export/import at user-chosen paths.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::model::Project;
use crate::shared::errors::CoreResult;
use crate::shared::paths::{ensure_dir, get_storage_dir};

pub const PROJECTS_FILE_NAME: &str = "projects.json";

pub struct PersistenceStore {
    path: PathBuf,
}

impl PersistenceStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Registry file at the app-private default location.
    pub fn open_default() -> Self {
        Self::new(get_storage_dir().join(PROJECTS_FILE_NAME))
    }

    fn write_atomic(path: &Path, projects: &[Project]) -> CoreResult<()> {
        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }
        let content = serde_json::to_string_pretty(projects)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Saves the full project list, atomically replacing the previous file.
    pub fn save(&self, projects: &[Project]) -> CoreResult<()> {
        Self::write_atomic(&self.path, projects)?;
        tracing::debug!(target: "persistence", count = projects.len(), "Saved project registry");
        Ok(())
    }

    /// Loads the project list. First run (no file) yields an empty list;
    /// an existing but malformed file yields a `Decode` error so the caller
    /// decides whether to start empty or abort.
    pub fn load(&self) -> CoreResult<Vec<Project>> {
        if !self.path.exists() {
            tracing::info!(target: "persistence", "No registry file yet, starting empty");
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        let projects: Vec<Project> = serde_json::from_str(&content)?;
        Ok(projects)
    }

    /// Writes the given projects to an arbitrary user-chosen path.
    pub fn export_to(&self, projects: &[Project], destination: &Path) -> CoreResult<()> {
        Self::write_atomic(destination, projects)
    }

    /// Reads projects from an arbitrary user-chosen path. Duplicate ids
    /// within the file are dropped (first occurrence wins).
    pub fn import_from(&self, source: &Path) -> CoreResult<Vec<Project>> {
        let content = std::fs::read_to_string(source)?;
        let projects: Vec<Project> = serde_json::from_str(&content)?;

        let mut seen: HashSet<Uuid> = HashSet::new();
        let deduped: Vec<Project> = projects
            .into_iter()
            .filter(|p| seen.insert(p.id))
            .collect();
        Ok(deduped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ProjectTag, Status};

    fn store_in(dir: &Path) -> PersistenceStore {
        PersistenceStore::new(dir.join(PROJECTS_FILE_NAME))
    }

    fn sample_projects() -> Vec<Project> {
        let mut a = Project::new();
        a.title = "Spot TV".to_string();
        a.tags = vec![ProjectTag::TwoD, ProjectTag::Freelance];
        a.status_id = Status::IN_PROGRESS_ID;
        a.root_folder_path = Some(PathBuf::from("/mnt/projets/Spot TV"));

        let mut b = Project::new();
        b.title = "Générique".to_string();
        b.notes = "client à relancer".to_string();
        // b keeps null category and null root folder path.
        vec![a, b]
    }

    #[test]
    fn test_load_without_file_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(store_in(tmp.path()).load().unwrap().is_empty());
    }

    #[test]
    fn test_save_load_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        let projects = sample_projects();

        store.save(&projects).unwrap();
        let loaded = store.load().unwrap();

        assert_eq!(loaded.len(), projects.len());
        for (saved, loaded) in projects.iter().zip(&loaded) {
            assert_eq!(saved.id, loaded.id);
            assert_eq!(saved.title, loaded.title);
            assert_eq!(saved.notes, loaded.notes);
            assert_eq!(saved.tags, loaded.tags);
            assert_eq!(saved.status_id, loaded.status_id);
            assert_eq!(saved.category_id, loaded.category_id);
            assert_eq!(saved.root_folder_path, loaded.root_folder_path);
            assert_eq!(saved.has_folder_structure, loaded.has_folder_structure);
            assert_eq!(saved.created_at, loaded.created_at);
            assert_eq!(saved.updated_at, loaded.updated_at);
        }
    }

    #[test]
    fn test_load_malformed_file_is_decode_error() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        std::fs::write(tmp.path().join(PROJECTS_FILE_NAME), "[{broken").unwrap();
        assert!(matches!(
            store.load(),
            Err(crate::shared::errors::CoreError::Decode(_))
        ));
    }

    #[test]
    fn test_save_leaves_no_temp_file_behind() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());
        store.save(&sample_projects()).unwrap();

        let names: Vec<String> = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![PROJECTS_FILE_NAME.to_string()]);
    }

    #[test]
    fn test_import_drops_duplicate_ids() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_in(tmp.path());

        let mut projects = sample_projects();
        let mut dup = projects[0].clone();
        dup.title = "Doublon".to_string();
        projects.push(dup);

        let export_path = tmp.path().join("export.json");
        store.export_to(&projects, &export_path).unwrap();
        let imported = store.import_from(&export_path).unwrap();

        assert_eq!(imported.len(), 2);
        assert_eq!(imported[0].title, "Spot TV");
    }
}
