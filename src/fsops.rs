//! Stateless filesystem operations for project folders.
//!
//! Everything here surfaces I/O failures to the caller and never panics;
//! the store decides whether a failure blocks the user action or is merely
//! logged (background scans, best-effort folder creation).

use chrono::NaiveDate;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use unicode_normalization::UnicodeNormalization;

use crate::metafile::META_FILE_NAME;
use crate::shared::errors::{CoreError, CoreResult};

/// The fixed subfolder skeleton created under every project directory,
/// in creation order.
pub const SKELETON_SUBFOLDERS: [&str; 9] = [
    "00 IN",
    "01 ASSETS",
    "02 AI",
    "03 3D",
    "04 AUDIO",
    "05 AEP",
    "06 CAVALRY",
    "07 SORTIES",
    "08 LIVRABLE",
];

/// The markers discovery uses to recognize a project directory: a candidate
/// qualifies when at least [`MIN_MARKERS_PRESENT`] of these subfolders exist.
pub const REQUIRED_MARKERS: [&str; 4] = ["00 IN", "01 ASSETS", "05 AEP", "07 SORTIES"];
pub const MIN_MARKERS_PRESENT: usize = 3;

const ILLEGAL_CHARS: [char; 10] = ['/', '\\', '?', '%', '*', '|', '"', '<', '>', ':'];

/// Sanitizes a project title into a directory name.
///
/// Characters illegal in folder names are replaced by hyphens, accents are
/// stripped (NFD decomposition minus combining marks), surrounding whitespace
/// is trimmed, and an empty result falls back to `"Projet"`.
pub fn sanitize_folder_name(title: &str) -> String {
    let decomposed: String = title
        .nfd()
        .filter(|c| !('\u{0300}'..='\u{036f}').contains(c))
        .collect();

    let replaced: String = decomposed
        .chars()
        .map(|c| if ILLEGAL_CHARS.contains(&c) { '-' } else { c })
        .collect();

    let trimmed = replaced.trim();
    if trimmed.is_empty() {
        "Projet".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Creates the project directory `root/name` and its subfolder skeleton.
/// Create-if-missing: re-running on an existing skeleton is a no-op.
/// Returns the project directory path.
pub fn create_project_skeleton(root: &Path, name: &str) -> CoreResult<PathBuf> {
    let project_dir = root.join(name);
    if !project_dir.exists() {
        std::fs::create_dir_all(&project_dir)?;
    }

    for sub in SKELETON_SUBFOLDERS {
        let sub_dir = project_dir.join(sub);
        if !sub_dir.exists() {
            std::fs::create_dir_all(&sub_dir)?;
        }
    }

    Ok(project_dir)
}

/// Renames (moves) a project directory to `new_name` under the same parent.
///
/// The directory is renamed first; if a stray metadata file is still sitting
/// at the old location afterwards, it is moved into the new directory so a
/// crash mid-rename cannot silently lose it.
pub fn rename_folder(dir: &Path, new_name: &str) -> CoreResult<PathBuf> {
    let parent = dir
        .parent()
        .ok_or_else(|| CoreError::validation(format!("no parent directory for {}", dir.display())))?;
    let new_dir = parent.join(new_name);

    std::fs::rename(dir, &new_dir)?;

    let stray_meta = dir.join(META_FILE_NAME);
    if stray_meta.exists() {
        std::fs::rename(&stray_meta, new_dir.join(META_FILE_NAME))?;
    }

    Ok(new_dir)
}

/// Finds the most relevant file with `extension` among the immediate children
/// of `folder`.
///
/// Filenames carrying a standalone 6-digit `YYMMDD` token are compared by that
/// date (newest first, ties broken by reverse lexicographic filename); when no
/// filename carries a parseable date, the newest modification time wins.
/// Returns `None` when the folder holds no matching file.
pub fn latest_dated_file(folder: &Path, extension: &str) -> CoreResult<Option<PathBuf>> {
    let wanted = extension.trim_start_matches('.').to_lowercase();
    let mut matches: Vec<PathBuf> = Vec::new();

    for entry in std::fs::read_dir(folder)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() || is_hidden(&path) {
            continue;
        }
        let ext_ok = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase() == wanted)
            .unwrap_or(false);
        if ext_ok {
            matches.push(path);
        }
    }

    if matches.is_empty() {
        return Ok(None);
    }

    let mut labeled: Vec<(PathBuf, Option<NaiveDate>)> = matches
        .into_iter()
        .map(|path| {
            let date = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(parse_yymmdd);
            (path, date)
        })
        .collect();

    if labeled.iter().any(|(_, date)| date.is_some()) {
        labeled.sort_by(|a, b| match (a.1, b.1) {
            (Some(l), Some(r)) => r
                .cmp(&l)
                .then_with(|| b.0.file_name().cmp(&a.0.file_name())),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => b.0.file_name().cmp(&a.0.file_name()),
        });
        return Ok(labeled.into_iter().next().map(|(path, _)| path));
    }

    // No parseable date anywhere: fall back to modification time.
    let newest = labeled
        .into_iter()
        .map(|(path, _)| {
            let mtime = std::fs::metadata(&path)
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (path, mtime)
        })
        .max_by_key(|(_, mtime)| *mtime)
        .map(|(path, _)| path);

    Ok(newest)
}

/// Extracts the first standalone 6-digit token from a filename stem and
/// parses it as `YYMMDD`. Tokens embedded in longer digit runs are ignored.
fn parse_yymmdd(stem: &str) -> Option<NaiveDate> {
    let chars: Vec<char> = stem.chars().collect();
    let n = chars.len();
    let mut i = 0;

    while i < n {
        if chars[i].is_ascii_digit() {
            let start = i;
            while i < n && chars[i].is_ascii_digit() {
                i += 1;
            }
            if i - start == 6 {
                let token: String = chars[start..i].iter().collect();
                if let Ok(date) = NaiveDate::parse_from_str(&token, "%y%m%d") {
                    return Some(date);
                }
            }
        } else {
            i += 1;
        }
    }
    None
}

pub fn directory_exists(path: &Path) -> bool {
    path.is_dir()
}

/// Lists the immediate subdirectories of `path`, skipping hidden entries.
pub fn list_subdirectories(path: &Path) -> CoreResult<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        let child = entry.path();
        if child.is_dir() && !is_hidden(&child) {
            dirs.push(child);
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Deletes a directory and everything inside it.
pub fn delete_directory(path: &Path) -> CoreResult<()> {
    std::fs::remove_dir_all(path)?;
    Ok(())
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}
