//! Lightweight per-project metadata file (`project.json`).
//!
//! Written inside each project's backing directory so a directory scan can
//! identify projects without touching the central registry. Only minimal
//! fields live here; full detail stays in the registry.

use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use crate::model::Project;
use crate::shared::errors::{CoreError, CoreResult};

pub const META_FILE_NAME: &str = "project.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMeta {
    pub id: Uuid,
    pub title: String,
    #[serde(rename = "status")]
    pub status_id: Uuid,
    #[serde(rename = "categoryID", default)]
    pub category_id: Option<Uuid>,
}

impl ProjectMeta {
    pub fn from_project(project: &Project) -> Self {
        Self {
            id: project.id,
            title: project.title.clone(),
            status_id: project.status_id,
            category_id: project.category_id,
        }
    }
}

/// Reads the metadata file from a project directory.
/// `NotFound` when the file is absent, `Decode` when it is malformed.
pub fn read_meta(project_dir: &Path) -> CoreResult<ProjectMeta> {
    let path = project_dir.join(META_FILE_NAME);
    if !path.exists() {
        return Err(CoreError::not_found(format!(
            "no {} in {}",
            META_FILE_NAME,
            project_dir.display()
        )));
    }
    let content = std::fs::read_to_string(&path)?;
    let meta = serde_json::from_str(&content)?;
    Ok(meta)
}

/// Writes the metadata file into a project directory. Goes through a
/// temporary file plus rename so a crash mid-write never leaves a
/// half-written file for the next scan to choke on.
pub fn write_meta(project_dir: &Path, meta: &ProjectMeta) -> CoreResult<()> {
    let content = serde_json::to_string_pretty(meta)?;
    let path = project_dir.join(META_FILE_NAME);
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, &path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let mut project = Project::new();
        project.title = "Teaser".to_string();

        let meta = ProjectMeta::from_project(&project);
        write_meta(tmp.path(), &meta).unwrap();

        let loaded = read_meta(tmp.path()).unwrap();
        assert_eq!(loaded.id, project.id);
        assert_eq!(loaded.title, "Teaser");
        assert_eq!(loaded.status_id, project.status_id);
    }

    #[test]
    fn test_read_meta_missing_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(matches!(read_meta(tmp.path()), Err(CoreError::NotFound(_))));
    }

    #[test]
    fn test_write_meta_replaces_and_leaves_no_temp_file() {
        let tmp = tempfile::tempdir().unwrap();
        let mut project = Project::new();
        project.title = "Avant".to_string();
        write_meta(tmp.path(), &ProjectMeta::from_project(&project)).unwrap();

        project.title = "Après".to_string();
        write_meta(tmp.path(), &ProjectMeta::from_project(&project)).unwrap();

        assert_eq!(read_meta(tmp.path()).unwrap().title, "Après");
        assert!(!tmp.path().join("project.json.tmp").exists());
    }

    #[test]
    fn test_read_meta_malformed_is_decode() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(META_FILE_NAME), "{not json").unwrap();
        assert!(matches!(read_meta(tmp.path()), Err(CoreError::Decode(_))));
    }
}
