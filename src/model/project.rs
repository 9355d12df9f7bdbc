use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::status::Status;

/// Enumerated labels a project can carry. Membership only, no ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectTag {
    #[serde(rename = "2D")]
    TwoD,
    #[serde(rename = "3D")]
    ThreeD,
    #[serde(rename = "FREELANCE")]
    Freelance,
}

/// A tracked project. The central registry is the source of truth; the
/// backing directory on disk is a satellite resource that may be missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub tags: Vec<ProjectTag>,
    #[serde(rename = "statusID", default = "default_status_id")]
    pub status_id: Uuid,
    #[serde(rename = "categoryID", default)]
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub root_folder_path: Option<PathBuf>,
    #[serde(default)]
    pub has_folder_structure: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,

    /// Transient UI flag, reset to browsing on load.
    #[serde(skip)]
    pub is_editing: bool,
    /// False for entries populated from a lightweight directory scan, true
    /// once full metadata has been read.
    #[serde(skip)]
    pub is_fully_loaded: bool,
}

fn default_status_id() -> Uuid {
    Status::NOT_STARTED_ID
}

impl Project {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: "Nouveau projet".to_string(),
            details: String::new(),
            notes: String::new(),
            tags: Vec::new(),
            status_id: Status::NOT_STARTED_ID,
            category_id: None,
            root_folder_path: None,
            has_folder_structure: false,
            created_at: now,
            updated_at: now,
            is_editing: true,
            is_fully_loaded: true,
        }
    }

    pub fn root_folder(&self) -> Option<&Path> {
        self.root_folder_path.as_deref()
    }

    pub fn aep_folder(&self) -> Option<PathBuf> {
        self.root_folder().map(|r| r.join("05 AEP"))
    }

    pub fn assets_folder(&self) -> Option<PathBuf> {
        self.root_folder().map(|r| r.join("01 ASSETS"))
    }

    pub fn outputs_folder(&self) -> Option<PathBuf> {
        self.root_folder().map(|r| r.join("07 SORTIES"))
    }

    /// Adds the tag if absent, removes it if present.
    pub fn toggle_tag(&mut self, tag: ProjectTag) {
        if let Some(pos) = self.tags.iter().position(|t| *t == tag) {
            self.tags.remove(pos);
        } else {
            self.tags.push(tag);
        }
    }

    pub fn has_tag(&self, tag: ProjectTag) -> bool {
        self.tags.contains(&tag)
    }

    /// Bumps the modification timestamp.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Default for Project {
    fn default() -> Self {
        Self::new()
    }
}
