// SPDX-FileCopyrightText: 2026 The Neurostore Authors
// SPDX-License-Identifier: MIT

//! Final storage layout.
//!
//! ```text
//! <root>/PROJECTS/<project>/Project.xml
//! <root>/PROJECTS/<project>/<operation id>/<Type>_<gid>.nsf
//! <root>/PROJECTS/<project>/IMAGES/
//! ```

use std::io;
use std::path::{Component, Path, PathBuf};

use neurostore_format::STORAGE_FILE_EXTENSION;

use crate::error::{ImportError, IoContext};

pub const PROJECTS_FOLDER: &str = "PROJECTS";
pub const IMAGES_FOLDER: &str = "IMAGES";

#[derive(Debug, Clone)]
pub struct StorageLayout {
    root: PathBuf,
}

impl StorageLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn projects_dir(&self) -> PathBuf {
        self.root.join(PROJECTS_FOLDER)
    }

    pub fn project_dir(&self, project: &str) -> PathBuf {
        self.projects_dir().join(project)
    }

    pub fn operation_dir(&self, project: &str, operation_id: i64) -> PathBuf {
        self.project_dir(project).join(operation_id.to_string())
    }

    pub fn images_dir(&self, project: &str) -> PathBuf {
        self.project_dir(project).join(IMAGES_FOLDER)
    }

    /// Canonical path of a storage file inside an operation directory.
    pub fn storage_path(operation_dir: &Path, type_name: &str, gid: &str) -> PathBuf {
        let type_name: String = type_name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .collect();
        operation_dir.join(format!("{type_name}_{gid}.{STORAGE_FILE_EXTENSION}"))
    }
}

/// Whether `name` can be used as a single directory name.
pub fn is_plain_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}

/// Move a file, falling back to copy and delete across filesystems.
pub fn move_file(src: &Path, dst: &Path) -> Result<(), ImportError> {
    match std::fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            std::fs::copy(src, dst).io_context(|| {
                format!("Failed to copy {} to {}", src.display(), dst.display())
            })?;
            std::fs::remove_file(src)
                .io_context(|| format!("Failed to remove {}", src.display()))
        }
        Err(e) => Err(ImportError::io(
            format!("Failed to move {} to {}", src.display(), dst.display()),
            e,
        )),
    }
}
