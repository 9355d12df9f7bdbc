//! End-to-end scenarios for the project store: folder-backed project
//! creation, discovery of existing project directories, scan merging, and
//! import/export semantics. Everything runs against tempdir-backed services.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use atelier::folders::FolderRegistry;
use atelier::fsops::{SKELETON_SUBFOLDERS, REQUIRED_MARKERS};
use atelier::metafile::{write_meta, ProjectMeta};
use atelier::model::Project;
use atelier::persistence::PersistenceStore;
use atelier::prefs::PrefStore;
use atelier::store::ProjectStore;

fn build_store(dir: &Path) -> Arc<ProjectStore> {
    let prefs = Arc::new(PrefStore::new(dir.join("preferences.json")));
    let registry = FolderRegistry::load(Arc::clone(&prefs)).unwrap();
    let persistence = PersistenceStore::new(dir.join("projects.json"));
    ProjectStore::init(persistence, registry, prefs).unwrap()
}

/// Registers a fresh root directory and returns its reference id.
fn register_root(store: &ProjectStore, base: &Path, name: &str) -> uuid::Uuid {
    let root = base.join(name);
    std::fs::create_dir_all(&root).unwrap();
    store
        .folder_registry()
        .add_folder(&root, None, false)
        .unwrap()
        .id
}

#[test]
fn creating_a_project_builds_the_skeleton_under_the_registered_root() {
    let tmp = tempfile::tempdir().unwrap();
    let store = build_store(tmp.path());
    let folder_id = register_root(&store, tmp.path(), "roots");

    let project = store.add_project(true, Some(folder_id)).unwrap();
    store.rename_project(project.id, "Spot Été").unwrap();

    let project = store.project(project.id).unwrap();
    assert!(project.has_folder_structure);

    let root = store.folder_registry().lookup(folder_id).unwrap().resolve().unwrap();
    let project_dir = root.join("Spot Ete");
    assert!(project_dir.is_dir(), "sanitized project directory must exist");
    assert!(project.root_folder_path.as_ref().unwrap().starts_with(&root));

    for sub in SKELETON_SUBFOLDERS {
        assert!(project_dir.join(sub).is_dir(), "missing subfolder {sub}");
    }
    // The metadata file moved along with the rename.
    assert_eq!(
        atelier::metafile::read_meta(&project_dir).unwrap().title,
        "Spot Été"
    );
}

#[test]
fn folder_creation_failure_still_creates_the_project() {
    let tmp = tempfile::tempdir().unwrap();
    let store = build_store(tmp.path());
    // No folder registered at all: the folder step cannot run.
    let project = store.add_project(true, None).unwrap();

    assert_eq!(store.projects().len(), 1);
    assert!(!project.has_folder_structure);
    assert!(project.root_folder_path.is_none());
}

#[tokio::test]
async fn discovery_imports_only_untracked_qualifying_directories() {
    let tmp = tempfile::tempdir().unwrap();
    let store = build_store(tmp.path());
    let folder_id = register_root(&store, tmp.path(), "archive");
    let root = store.folder_registry().lookup(folder_id).unwrap().resolve().unwrap();

    // Three qualifying candidates (>= 3 of the 4 required markers).
    for name in ["Pub A", "Pub B", "Pub C"] {
        let dir = root.join(name);
        for marker in &REQUIRED_MARKERS[..3] {
            std::fs::create_dir_all(dir.join(marker)).unwrap();
        }
    }
    // Two non-qualifying candidates.
    std::fs::create_dir_all(root.join("divers").join("00 IN")).unwrap();
    std::fs::create_dir_all(root.join("notes")).unwrap();

    let report = store.discover_and_import(Some(folder_id)).await.unwrap();
    assert_eq!(report.imported, 3);
    assert_eq!(report.skipped, 2);

    let titles: HashSet<String> = store.projects().into_iter().map(|p| p.title).collect();
    assert_eq!(
        titles,
        HashSet::from(["Pub A".to_string(), "Pub B".to_string(), "Pub C".to_string()])
    );
    assert!(store.projects().iter().all(|p| p.has_folder_structure));

    // Re-running discovers nothing new.
    let again = store.discover_and_import(Some(folder_id)).await.unwrap();
    assert_eq!(again.imported, 0);
}

#[tokio::test]
async fn scan_adds_unknown_projects_from_metadata_files() {
    let tmp = tempfile::tempdir().unwrap();
    let store = build_store(tmp.path());
    let folder_id = register_root(&store, tmp.path(), "roots");
    let root = store.folder_registry().lookup(folder_id).unwrap().resolve().unwrap();

    let mut foreign = Project::new();
    foreign.title = "Générique 2025".to_string();
    let dir = root.join("Generique 2025");
    std::fs::create_dir_all(&dir).unwrap();
    write_meta(&dir, &ProjectMeta::from_project(&foreign)).unwrap();

    let report = store.scan_folder(Some(folder_id)).await.unwrap();
    assert_eq!(report.added, 1);

    let scanned = store.project(foreign.id).unwrap();
    assert_eq!(scanned.title, "Générique 2025");
    assert!(!scanned.is_fully_loaded, "scan entries are lightweight");
    assert_eq!(scanned.root_folder_path.as_deref(), Some(dir.as_path()));
}

#[tokio::test]
async fn scan_never_prunes_projects_with_missing_folders() {
    let tmp = tempfile::tempdir().unwrap();
    let store = build_store(tmp.path());
    let folder_id = register_root(&store, tmp.path(), "roots");

    let kept = store.add_project(true, Some(folder_id)).unwrap();
    std::fs::remove_dir_all(kept.root_folder_path.as_ref().unwrap()).unwrap();

    let report = store.scan_folder(Some(folder_id)).await.unwrap();
    assert_eq!(report.added, 0);
    assert!(
        store.project(kept.id).is_some(),
        "a project with a lost folder must stay visible"
    );
}

#[test]
fn merge_import_skips_existing_ids() {
    let tmp = tempfile::tempdir().unwrap();
    let store = build_store(tmp.path());

    let existing = store.add_project(false, None).unwrap();
    let mut incoming = Project::new();
    incoming.title = "Importé".to_string();

    let file = tmp.path().join("export.json");
    store.export_all(&file).unwrap();
    // Rewrite the export with one known and one new project.
    let both = vec![existing.clone(), incoming.clone()];
    std::fs::write(&file, serde_json::to_string(&both).unwrap()).unwrap();

    let added = store.import_merge(&file).unwrap();
    assert_eq!(added, 1);

    let ids: Vec<_> = store.projects().iter().map(|p| p.id).collect();
    let unique: HashSet<_> = ids.iter().copied().collect();
    assert_eq!(ids.len(), unique.len(), "merge must never duplicate ids");
    assert_eq!(store.projects().len(), 2);
}

#[test]
fn replace_import_yields_exactly_the_imported_set() {
    let tmp = tempfile::tempdir().unwrap();
    let store = build_store(tmp.path());

    let replaced = store.add_project(false, None).unwrap();
    store.set_selection(Some(replaced.id));

    let mut incoming = Project::new();
    incoming.title = "Seul survivant".to_string();
    let file = tmp.path().join("import.json");
    std::fs::write(&file, serde_json::to_string(&vec![incoming.clone()]).unwrap()).unwrap();

    let count = store.import_replace(&file).unwrap();
    assert_eq!(count, 1);

    let projects = store.projects();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].id, incoming.id);
    assert!(
        store.selection().is_none(),
        "selection pointing at a replaced project must clear"
    );
}

#[tokio::test]
async fn notes_edits_commit_after_the_quiet_period() {
    let tmp = tempfile::tempdir().unwrap();
    let store = build_store(tmp.path());
    let project = store.add_project(false, None).unwrap();

    store.set_notes(project.id, "brouillon");
    store.set_notes(project.id, "version finale");
    // Draft is visible immediately.
    assert_eq!(store.project(project.id).unwrap().notes, "version finale");

    tokio::time::sleep(std::time::Duration::from_millis(900)).await;

    // Only the final text reached disk.
    let persistence = PersistenceStore::new(tmp.path().join("projects.json"));
    let saved = persistence.load().unwrap();
    assert_eq!(saved[0].notes, "version finale");
}

#[test]
fn export_then_reimport_round_trips_every_field() {
    let tmp = tempfile::tempdir().unwrap();
    let store = build_store(tmp.path());

    let clients = store.add_category("Clients", "briefcase").unwrap();
    let project = store.add_project(false, None).unwrap();
    store.assign_category(project.id, Some(clients.id)).unwrap();
    store.rename_project(project.id, "Habillage antenne").unwrap();
    store
        .toggle_tag(project.id, atelier::model::ProjectTag::ThreeD)
        .unwrap();

    let file = tmp.path().join("roundtrip.json");
    store.export_all(&file).unwrap();
    let count = store.import_replace(&file).unwrap();
    assert_eq!(count, 1);

    let restored = store.project(project.id).unwrap();
    assert_eq!(restored.title, "Habillage antenne");
    assert_eq!(restored.category_id, Some(clients.id));
    assert_eq!(restored.tags, vec![atelier::model::ProjectTag::ThreeD]);
}
