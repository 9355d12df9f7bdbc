//! Blocking directory walks backing scan and discovery.
//!
//! These run under `spawn_blocking`, off the store lock; per-directory
//! failures are logged and skipped so one unreadable folder never aborts a
//! whole scan. The store applies the collected results in a single
//! write-locked merge.

use std::path::{Path, PathBuf};

use crate::fsops::{self, MIN_MARKERS_PRESENT, REQUIRED_MARKERS};
use crate::metafile::{self, ProjectMeta};
use crate::shared::errors::CoreError;

/// One candidate subdirectory of a scanned root.
pub(super) struct ScannedDir {
    pub path: PathBuf,
    /// Parsed metadata file, when present and readable.
    pub meta: Option<ProjectMeta>,
    /// How many of the required skeleton markers exist under this directory.
    pub markers_present: usize,
}

impl ScannedDir {
    /// A directory counts as a valid project skeleton when at least 3 of the
    /// 4 required subfolders exist.
    pub fn qualifies_as_project(&self) -> bool {
        self.markers_present >= MIN_MARKERS_PRESENT
    }
}

/// Enumerates the immediate subdirectories of `root` and reads each one's
/// lightweight metadata file.
pub(super) fn scan_directory(root: &Path) -> Vec<ScannedDir> {
    let subdirs = match fsops::list_subdirectories(root) {
        Ok(dirs) => dirs,
        Err(e) => {
            tracing::warn!(
                target: "store::scan",
                root = %root.display(),
                "Could not enumerate folder: {e}"
            );
            return Vec::new();
        }
    };

    subdirs
        .into_iter()
        .map(|path| {
            let meta = match metafile::read_meta(&path) {
                Ok(meta) => Some(meta),
                Err(CoreError::NotFound(_)) => None,
                Err(e) => {
                    tracing::warn!(
                        target: "store::scan",
                        dir = %path.display(),
                        "Skipping unreadable metadata file: {e}"
                    );
                    None
                }
            };
            let markers_present = REQUIRED_MARKERS
                .iter()
                .filter(|marker| path.join(marker).is_dir())
                .count();
            ScannedDir {
                path,
                meta,
                markers_present,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metafile::write_meta;
    use crate::model::Project;

    #[test]
    fn test_scan_reads_meta_and_counts_markers() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = fsops::create_project_skeleton(tmp.path(), "Spot").unwrap();
        let project = Project::new();
        write_meta(&dir, &ProjectMeta::from_project(&project)).unwrap();

        let scanned = scan_directory(tmp.path());
        assert_eq!(scanned.len(), 1);
        assert_eq!(scanned[0].meta.as_ref().unwrap().id, project.id);
        assert_eq!(scanned[0].markers_present, REQUIRED_MARKERS.len());
        assert!(scanned[0].qualifies_as_project());
    }

    #[test]
    fn test_scan_tolerates_malformed_meta() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("broken");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join(metafile::META_FILE_NAME), "{nope").unwrap();

        let scanned = scan_directory(tmp.path());
        assert_eq!(scanned.len(), 1);
        assert!(scanned[0].meta.is_none());
        assert!(!scanned[0].qualifies_as_project());
    }

    #[test]
    fn test_three_of_four_markers_qualify() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("partial");
        for marker in &REQUIRED_MARKERS[..3] {
            std::fs::create_dir_all(dir.join(marker)).unwrap();
        }

        let scanned = scan_directory(tmp.path());
        assert_eq!(scanned[0].markers_present, 3);
        assert!(scanned[0].qualifies_as_project());
    }
}
