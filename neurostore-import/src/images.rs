// SPDX-FileCopyrightText: 2026 The Neurostore Authors
// SPDX-License-Identifier: MIT

//! Result figure import.

use std::path::{Path, PathBuf};

use chrono::Utc;
use neurostore_db::{FigureParams, Project, StoreDb};
use neurostore_format::metadata::{self, MetadataMap, optional};
use neurostore_format::{METADATA_FILE_EXTENSION, timestamp};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::context::ImportContext;
use crate::error::{ImportError, IoContext, walk_error};
use crate::layout::{IMAGES_FOLDER, StorageLayout, move_file};

/// Import every figure described under `<root>/IMAGES`.
pub(crate) fn import_images(
    db: &StoreDb,
    layout: &StorageLayout,
    ctx: &mut ImportContext<'_>,
    project: &Project,
    root: &Path,
) -> Result<(), ImportError> {
    let images_root = root.join(IMAGES_FOLDER);
    if !images_root.is_dir() {
        return Ok(());
    }
    let target_dir = layout.images_dir(&project.name);

    for entry in WalkDir::new(&images_root).sort_by_file_name() {
        let entry = entry.map_err(|e| walk_error(&images_root, e))?;
        let path = entry.path();
        if entry.file_type().is_file()
            && path
                .extension()
                .is_some_and(|ext| ext == METADATA_FILE_EXTENSION)
        {
            import_image(db, ctx, project, path, &target_dir)?;
        }
    }
    Ok(())
}

/// A path in `dir` for `file_name` whose image and metadata file are both
/// free, with the stem used for the metadata file.
///
/// Taken names get a numeric suffix: `fig.png`, `fig_1.png`, `fig_2.png`.
fn free_target(dir: &Path, file_name: &Path) -> (PathBuf, String) {
    let stem = file_name
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = file_name
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let taken = |candidate: &str| {
        dir.join(format!("{candidate}{extension}")).exists()
            || dir
                .join(format!("{candidate}.{METADATA_FILE_EXTENSION}"))
                .exists()
    };

    let mut candidate = stem.clone();
    let mut n = 0;
    while taken(&candidate) {
        n += 1;
        candidate = format!("{stem}_{n}");
    }
    (dir.join(format!("{candidate}{extension}")), candidate)
}

fn import_image(
    db: &StoreDb,
    ctx: &mut ImportContext<'_>,
    project: &Project,
    metadata_file: &Path,
    target_dir: &Path,
) -> Result<(), ImportError> {
    let mut figure = match metadata::read_metadata(metadata_file) {
        Ok(figure) => figure,
        Err(e) => {
            warn!("Unreadable figure metadata will be ignored: {e}");
            ctx.skip_file(metadata_file);
            return Ok(());
        }
    };
    let Some(file_name) = optional(&figure, "file_path")
        .and_then(|p| Path::new(p).file_name())
        .map(|n| n.to_owned())
    else {
        warn!("{} names no image file. Skipping", metadata_file.display());
        ctx.skip_file(metadata_file);
        return Ok(());
    };
    let folder = metadata_file.parent().unwrap_or(Path::new("."));
    let actual = folder.join(&file_name);
    if !actual.is_file() {
        warn!("Expected to find image path {}. Skipping", actual.display());
        ctx.skip_file(&actual);
        return Ok(());
    }

    let operation = match optional(&figure, "fk_from_operation") {
        Some(gid) => db.query_operation_by_gid(gid)?,
        None => None,
    };
    if operation.is_none() {
        debug!("Figure {} has no known operation", actual.display());
    }

    std::fs::create_dir_all(target_dir)
        .io_context(|| format!("Failed to create {}", target_dir.display()))?;
    let (target, stem) = free_target(target_dir, Path::new(&file_name));
    let text = |map: &MetadataMap, key: &str| optional(map, key).map(str::to_string);
    let params = FigureParams {
        fk_for_user: ctx.user.id,
        fk_in_project: project.id,
        fk_from_operation: operation.as_ref().map(|op| op.id),
        name: text(&figure, "name").unwrap_or_else(|| {
            Path::new(&file_name)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        }),
        session_name: text(&figure, "session_name"),
        file_format: text(&figure, "file_format").unwrap_or_else(|| {
            Path::new(&file_name)
                .extension()
                .map(|e| e.to_string_lossy().to_uppercase())
                .unwrap_or_default()
        }),
        file_path: target.to_string_lossy().into_owned(),
        create_date: metadata::timestamp(&figure, "create_date")
            .ok()
            .flatten()
            .unwrap_or_else(|| Utc::now().naive_utc()),
    };
    let stored = db.insert_figure(&params)?;
    move_file(&actual, &target)?;

    figure.insert("id".into(), stored.id.to_string());
    figure.insert("file_path".into(), stored.file_path.clone());
    figure.insert("fk_in_project".into(), project.gid.clone());
    figure.insert("fk_for_user".into(), ctx.user.username.clone());
    figure.insert("create_date".into(), timestamp::format(stored.create_date));
    match &operation {
        Some(op) => figure.insert("fk_from_operation".into(), op.gid.clone()),
        None => figure.remove("fk_from_operation"),
    };
    metadata::write_metadata(
        &target_dir.join(format!("{stem}.{METADATA_FILE_EXTENSION}")),
        &figure,
    )?;
    ctx.summary.figures += 1;
    debug!("Imported figure {} as {}", stored.name, stored.id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CompensationLog;
    use neurostore_db::{OperationParams, ProjectParams};
    use neurostore_utils_test::{CanonicalTempDir, ProjectTree, at, new_gid};

    #[test_log::test]
    fn test_images_imported_and_missing_skipped() {
        let tmp = CanonicalTempDir::new().unwrap();
        let db = StoreDb::open_memory().unwrap();
        let user = db.get_or_create_user("alice").unwrap();
        let project = db
            .insert_project(&ProjectParams {
                gid: new_gid(),
                name: "P".into(),
                description: None,
                fk_admin: user.id,
                last_updated: at(0),
                version: 3,
            })
            .unwrap();
        let algo = db.register_algorithm("m", "C").unwrap();
        let op_gid = new_gid();
        let op = db
            .insert_operation(&OperationParams {
                gid: op_gid.clone(),
                fk_launched_by: user.id,
                fk_launched_in: project.id,
                fk_from_algo: algo,
                ..Default::default()
            })
            .unwrap();

        let tree = ProjectTree::new(tmp.path().join("staged"), "P").unwrap();
        tree.image("brain.png", Some(&op_gid)).unwrap();
        tree.image("orphan.png", Some(&new_gid())).unwrap();
        let missing = tree.image("missing.png", None).unwrap();
        std::fs::remove_file(&missing).unwrap();

        let layout = StorageLayout::new(tmp.path().join("storage"));
        let mut log = CompensationLog::default();
        let mut ctx = ImportContext::new(user.clone(), &mut log);
        import_images(&db, &layout, &mut ctx, &project, tree.root()).unwrap();

        assert_eq!(ctx.summary.figures, 2);
        assert_eq!(ctx.summary.skipped_files, vec![missing]);

        let figures = db.query_project_figures(project.id).unwrap();
        assert_eq!(figures.len(), 2);
        let brain = figures.iter().find(|f| f.name == "brain").unwrap();
        assert_eq!(brain.fk_from_operation, Some(op.id));
        assert_eq!(brain.fk_for_user, user.id);
        assert_eq!(brain.file_format, "PNG");
        let images = layout.images_dir("P");
        assert_eq!(brain.file_path, images.join("brain.png").to_string_lossy());
        assert!(images.join("brain.png").is_file());

        let orphan = figures.iter().find(|f| f.name == "orphan").unwrap();
        assert_eq!(orphan.fk_from_operation, None);

        let written = metadata::read_metadata(&images.join("brain.xml")).unwrap();
        assert_eq!(written["id"], brain.id.to_string());
        assert_eq!(written["fk_in_project"], project.gid);
        assert_eq!(written["file_path"], brain.file_path);
    }

    #[test]
    fn test_same_image_name_in_two_folders() {
        let tmp = CanonicalTempDir::new().unwrap();
        let db = StoreDb::open_memory().unwrap();
        let user = db.get_or_create_user("alice").unwrap();
        let project = db
            .insert_project(&ProjectParams {
                gid: new_gid(),
                name: "P".into(),
                description: None,
                fk_admin: user.id,
                last_updated: at(0),
                version: 3,
            })
            .unwrap();

        let tree = ProjectTree::new(tmp.path().join("staged"), "P").unwrap();
        for (folder, content) in [("a", "FIRST"), ("b", "SECOND")] {
            let dir = tree.folder(&format!("IMAGES/{folder}")).unwrap();
            std::fs::write(dir.join("fig.png"), content).unwrap();
            let mut map = MetadataMap::new();
            map.insert("file_path".into(), "/exported/fig.png".into());
            metadata::write_metadata(&dir.join("fig.xml"), &map).unwrap();
        }

        let layout = StorageLayout::new(tmp.path().join("storage"));
        let mut log = CompensationLog::default();
        let mut ctx = ImportContext::new(user, &mut log);
        import_images(&db, &layout, &mut ctx, &project, tree.root()).unwrap();
        assert_eq!(ctx.summary.figures, 2);

        let images = layout.images_dir("P");
        assert_eq!(std::fs::read_to_string(images.join("fig.png")).unwrap(), "FIRST");
        assert_eq!(std::fs::read_to_string(images.join("fig_1.png")).unwrap(), "SECOND");
        let mut paths: Vec<_> = db
            .query_project_figures(project.id)
            .unwrap()
            .into_iter()
            .map(|f| f.file_path)
            .collect();
        paths.sort();
        assert_eq!(
            paths,
            [
                images.join("fig.png").to_string_lossy().into_owned(),
                images.join("fig_1.png").to_string_lossy().into_owned(),
            ]
        );
        let second = metadata::read_metadata(&images.join("fig_1.xml")).unwrap();
        assert_eq!(second["file_path"], paths[1]);
        assert!(images.join("fig.xml").is_file());
    }

    #[test]
    fn test_no_images_folder() {
        let tmp = CanonicalTempDir::new().unwrap();
        let db = StoreDb::open_memory().unwrap();
        let user = db.get_or_create_user("alice").unwrap();
        let project = db
            .insert_project(&ProjectParams {
                gid: new_gid(),
                name: "P".into(),
                description: None,
                fk_admin: user.id,
                last_updated: at(0),
                version: 3,
            })
            .unwrap();
        let mut log = CompensationLog::default();
        let mut ctx = ImportContext::new(user, &mut log);
        import_images(
            &db,
            &StorageLayout::new(tmp.path().join("storage")),
            &mut ctx,
            &project,
            tmp.path(),
        )
        .unwrap();
        assert_eq!(ctx.summary.figures, 0);
        assert!(!tmp.path().join("storage").exists());
    }
}
