// SPDX-FileCopyrightText: 2026 The Neurostore Authors
// SPDX-License-Identifier: MIT

//! Project root discovery and project creation.

use std::path::{Path, PathBuf};

use chrono::Utc;
use neurostore_db::{Project, ProjectParams, StoreDb};
use neurostore_format::metadata::{self, optional, require};
use neurostore_format::{FormatUpgrader, PROJECT_FILE, PROJECT_STRUCTURE_VERSION};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::context::{ImportContext, UndoAction};
use crate::error::{ImportError, IoContext, walk_error};
use crate::layout::{StorageLayout, is_plain_name, move_file};

/// Directories under `staging` that directly contain a `Project.xml`.
///
/// The walk is sorted by file name, so the result is deterministic.
pub fn discover_project_roots(staging: &Path) -> Result<Vec<PathBuf>, ImportError> {
    let mut roots = Vec::new();
    for entry in WalkDir::new(staging).sort_by_file_name() {
        let entry = entry.map_err(|e| walk_error(staging, e))?;
        if entry.file_type().is_dir() && entry.path().join(PROJECT_FILE).is_file() {
            debug!("Found project root {}", entry.path().display());
            roots.push(entry.into_path());
        }
    }
    Ok(roots)
}

/// Upgrade the root, store its project and move the marker into storage.
pub(crate) fn create_project(
    db: &StoreDb,
    layout: &StorageLayout,
    upgrader: &dyn FormatUpgrader,
    ctx: &mut ImportContext<'_>,
    root: &Path,
) -> Result<Project, ImportError> {
    upgrader
        .upgrade_root(root)
        .map_err(ImportError::IncompatibleFormat)?;

    let marker = root.join(PROJECT_FILE);
    let map = metadata::read_metadata(&marker)?;
    let name = require(&map, "name", &marker)?.trim().to_string();
    if !is_plain_name(&name) {
        return Err(ImportError::invalid_metadata(
            &marker,
            format!("'{name}' cannot be used as a project directory name"),
        ));
    }
    let gid = optional(&map, "gid")
        .ok_or_else(|| ImportError::invalid_metadata(&marker, "missing gid"))?
        .to_string();
    let version = match optional(&map, "version") {
        Some(v) => v
            .parse()
            .map_err(|_| ImportError::invalid_metadata(&marker, format!("bad version '{v}'")))?,
        None => PROJECT_STRUCTURE_VERSION as i32,
    };

    let params = ProjectParams {
        gid: gid.clone(),
        name: name.clone(),
        description: optional(&map, "description").map(str::to_string),
        fk_admin: ctx.user.id,
        last_updated: metadata::timestamp(&map, "last_updated")?
            .unwrap_or_else(|| Utc::now().naive_utc()),
        version,
    };
    let project = db.insert_project(&params).map_err(|e| {
        if e.is_duplicate() {
            ImportError::DuplicateProject {
                name: name.clone(),
                gid: gid.clone(),
            }
        } else {
            e.into()
        }
    })?;

    let projects_dir = layout.projects_dir();
    std::fs::create_dir_all(&projects_dir)
        .io_context(|| format!("Failed to create {}", projects_dir.display()))?;
    let project_dir = layout.project_dir(&name);
    // An existing directory is not ours to remove on rollback.
    std::fs::create_dir(&project_dir)
        .io_context(|| format!("Failed to create project directory {}", project_dir.display()))?;
    ctx.compensation
        .record(UndoAction::RemoveDir(project_dir.clone()));
    ctx.summary.projects.push(project.clone());

    move_file(&marker, &project_dir.join(PROJECT_FILE))?;
    info!("Created project {name} ({gid}) as {}", project.id);
    Ok(project)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CompensationLog;
    use neurostore_format::ContainerUpgrader;
    use neurostore_format::metadata::MetadataMap;
    use neurostore_utils_test::{CanonicalTempDir, ProjectTree};

    #[test]
    fn test_roots_sorted_and_nested() {
        let tmp = CanonicalTempDir::new().unwrap();
        ProjectTree::new(tmp.path().join("b_project"), "B").unwrap();
        ProjectTree::new(tmp.path().join("a_project"), "A").unwrap();
        ProjectTree::new(tmp.path().join("a_project/sub/inner"), "Inner").unwrap();
        std::fs::create_dir_all(tmp.path().join("c_not_a_project")).unwrap();

        let roots = discover_project_roots(tmp.path()).unwrap();
        assert_eq!(
            roots,
            vec![
                tmp.path().join("a_project"),
                tmp.path().join("a_project/sub/inner"),
                tmp.path().join("b_project"),
            ]
        );
    }

    #[test]
    fn test_create_project_moves_marker() {
        let tmp = CanonicalTempDir::new().unwrap();
        let tree = ProjectTree::new(tmp.path().join("staged"), "Default_Project").unwrap();
        let layout = StorageLayout::new(tmp.path().join("storage"));
        let db = StoreDb::open_memory().unwrap();
        let user = db.get_or_create_user("alice").unwrap();
        let mut log = CompensationLog::default();
        let mut ctx = ImportContext::new(user.clone(), &mut log);

        let project =
            create_project(&db, &layout, &ContainerUpgrader, &mut ctx, tree.root()).unwrap();

        assert_eq!(project.name, "Default_Project");
        assert_eq!(project.fk_admin, user.id);
        assert!(!tree.root().join(PROJECT_FILE).exists());
        assert!(layout.project_dir("Default_Project").join(PROJECT_FILE).is_file());
        assert_eq!(ctx.created_projects().len(), 1);
        assert_eq!(
            ctx.compensation.actions(),
            &[UndoAction::RemoveDir(layout.project_dir("Default_Project"))]
        );
    }

    #[test]
    fn test_duplicate_project() {
        let tmp = CanonicalTempDir::new().unwrap();
        let layout = StorageLayout::new(tmp.path().join("storage"));
        let db = StoreDb::open_memory().unwrap();
        let user = db.get_or_create_user("alice").unwrap();
        let mut log = CompensationLog::default();
        let mut ctx = ImportContext::new(user, &mut log);

        let first = ProjectTree::new(tmp.path().join("one"), "Same").unwrap();
        create_project(&db, &layout, &ContainerUpgrader, &mut ctx, first.root()).unwrap();
        let second = ProjectTree::new(tmp.path().join("two"), "Same").unwrap();
        let err =
            create_project(&db, &layout, &ContainerUpgrader, &mut ctx, second.root()).unwrap_err();
        assert!(matches!(err, ImportError::DuplicateProject { ref name, .. } if name == "Same"));
        // the failed project never got a directory of its own
        assert_eq!(ctx.compensation.actions().len(), 1);
    }

    #[test]
    fn test_legacy_marker_upgraded() {
        let tmp = CanonicalTempDir::new().unwrap();
        let mut marker = MetadataMap::new();
        marker.insert("name".into(), "Legacy".into());
        marker.insert("desc".into(), "old description key".into());
        let tree = ProjectTree::with_marker(tmp.path().join("legacy"), &marker).unwrap();
        let layout = StorageLayout::new(tmp.path().join("storage"));
        let db = StoreDb::open_memory().unwrap();
        let user = db.get_or_create_user("alice").unwrap();
        let mut log = CompensationLog::default();
        let mut ctx = ImportContext::new(user, &mut log);

        let project =
            create_project(&db, &layout, &ContainerUpgrader, &mut ctx, tree.root()).unwrap();
        assert_eq!(project.description.as_deref(), Some("old description key"));
        assert_eq!(project.version, PROJECT_STRUCTURE_VERSION as i32);
        assert_eq!(project.gid.len(), 32);
    }

    #[test]
    fn test_incompatible_root() {
        let tmp = CanonicalTempDir::new().unwrap();
        let mut marker = MetadataMap::new();
        marker.insert("name".into(), "Future".into());
        marker.insert("version".into(), "42".into());
        let tree = ProjectTree::with_marker(tmp.path().join("future"), &marker).unwrap();
        let db = StoreDb::open_memory().unwrap();
        let user = db.get_or_create_user("alice").unwrap();
        let mut log = CompensationLog::default();
        let mut ctx = ImportContext::new(user, &mut log);

        let err = create_project(
            &db,
            &StorageLayout::new(tmp.path().join("storage")),
            &ContainerUpgrader,
            &mut ctx,
            tree.root(),
        )
        .unwrap_err();
        assert!(matches!(err, ImportError::IncompatibleFormat(_)));
        assert_eq!(db.count_projects().unwrap(), 0);
    }

    #[test]
    fn test_unsafe_project_name() {
        let tmp = CanonicalTempDir::new().unwrap();
        let tree = ProjectTree::new(tmp.path().join("evil"), "../../etc").unwrap();
        let db = StoreDb::open_memory().unwrap();
        let user = db.get_or_create_user("alice").unwrap();
        let mut log = CompensationLog::default();
        let mut ctx = ImportContext::new(user, &mut log);

        let err = create_project(
            &db,
            &StorageLayout::new(tmp.path().join("storage")),
            &ContainerUpgrader,
            &mut ctx,
            tree.root(),
        )
        .unwrap_err();
        assert!(matches!(err, ImportError::InvalidMetadata { .. }));
    }
}
