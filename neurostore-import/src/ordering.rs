// SPDX-FileCopyrightText: 2026 The Neurostore Authors
// SPDX-License-Identifier: MIT

//! Operation folder ordering.
//!
//! Every folder of a project tree that describes an operation is keyed by
//! the operation's recovered creation time: the `create_date` of a legacy
//! `Operation.xml`, or else the `create_date` of the first view-model
//! container found in it. Folders are imported in ascending key order.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use neurostore_format::metadata;
use neurostore_format::{
    FormatKind, OPERATION_FILE, PROJECT_FILE, classify_header, is_storage_file, read_header,
};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{ImportError, IoContext, walk_error};

/// How an operation folder describes its operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderSource {
    /// Legacy `Operation.xml`
    LegacyXml,
    /// Serialized view-model containers
    ViewModel,
}

/// An operation folder with its ordering key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationFolder {
    pub path: PathBuf,
    pub created: NaiveDateTime,
    pub source: FolderSource,
}

/// Storage files directly inside `dir`, sorted by name.
pub(crate) fn storage_files(dir: &Path) -> Result<Vec<PathBuf>, ImportError> {
    let mut files = Vec::new();
    let entries =
        std::fs::read_dir(dir).io_context(|| format!("Failed to read {}", dir.display()))?;
    for entry in entries {
        let path = entry
            .io_context(|| format!("Failed to read {}", dir.display()))?
            .path();
        if path.is_file() && is_storage_file(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn legacy_key(dir: &Path) -> Result<NaiveDateTime, ImportError> {
    let file = dir.join(OPERATION_FILE);
    let map = metadata::read_metadata(&file)?;
    metadata::timestamp(&map, "create_date")?
        .ok_or_else(|| ImportError::invalid_metadata(&file, "missing create_date"))
}

fn view_model_key(dir: &Path) -> Result<Option<NaiveDateTime>, ImportError> {
    for file in storage_files(dir)? {
        let header = match read_header(&file) {
            Ok(header) => header,
            Err(e) => {
                warn!("Unreadable storage file will be ignored: {} ({e})", file.display());
                continue;
            }
        };
        if classify_header(&header) != FormatKind::ViewModel {
            continue;
        }
        match header.created_at() {
            Some(created) => return Ok(Some(created)),
            None => debug!("View model {} has no create_date", file.display()),
        }
    }
    Ok(None)
}

/// Operation folders of the project tree at `root`, oldest first.
///
/// Nested project roots are not descended into. Ties are broken by path.
pub fn order_operation_folders(root: &Path) -> Result<Vec<OperationFolder>, ImportError> {
    let mut folders = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0 || !(e.file_type().is_dir() && e.path().join(PROJECT_FILE).is_file())
        });

    for entry in walker {
        let entry = entry.map_err(|e| walk_error(root, e))?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let dir = entry.path();
        if dir.join(OPERATION_FILE).is_file() {
            folders.push(OperationFolder {
                path: dir.to_owned(),
                created: legacy_key(dir)?,
                source: FolderSource::LegacyXml,
            });
        } else if let Some(created) = view_model_key(dir)? {
            folders.push(OperationFolder {
                path: dir.to_owned(),
                created,
                source: FolderSource::ViewModel,
            });
        }
    }

    folders.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.path.cmp(&b.path)));
    Ok(folders)
}
