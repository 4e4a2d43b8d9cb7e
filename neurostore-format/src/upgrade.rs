// SPDX-FileCopyrightText: 2026 The Neurostore Authors
// SPDX-License-Identifier: MIT

//! In-place format upgrades.
//!
//! Storage containers and project roots both carry a version. Each version
//! step has one migration; a file is upgraded by applying every step from its
//! version to the current one and writing the result back in place.

use std::path::Path;

use tracing::{debug, info};

use crate::PROJECT_FILE;
use crate::container::{ContainerHeader, read_header, rewrite_header};
use crate::error::UpgradeError;
use crate::metadata::{self, MetadataMap};
use crate::timestamp;

/// Current storage container version.
pub const CURRENT_DATA_VERSION: u32 = 3;

/// Current project structure version.
pub const PROJECT_STRUCTURE_VERSION: u32 = 3;

/// Rewrites on-disk data to the current schema version.
pub trait FormatUpgrader {
    /// Upgrade the project rooted at `root` (its marker metadata).
    fn upgrade_root(&self, root: &Path) -> Result<(), UpgradeError>;

    /// Upgrade a single storage container.
    fn upgrade_file(&self, path: &Path) -> Result<(), UpgradeError>;
}

/// The built-in upgrader for `.nsf` containers and `Project.xml` roots.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContainerUpgrader;

type HeaderMigration = fn(&mut ContainerHeader);
type ProjectMigration = fn(&mut MetadataMap);

/// `CONTAINER_MIGRATIONS[n - 1]` upgrades a container from version `n`.
const CONTAINER_MIGRATIONS: [HeaderMigration; (CURRENT_DATA_VERSION - 1) as usize] =
    [normalize_gids, normalize_create_date];

/// `PROJECT_MIGRATIONS[n - 1]` upgrades project metadata from version `n`.
const PROJECT_MIGRATIONS: [ProjectMigration; (PROJECT_STRUCTURE_VERSION - 1) as usize] =
    [rename_legacy_description, ensure_project_gid];

/// `urn:uuid:0f3c-...` becomes `0f3c...` (32 lowercase hex digits).
fn normalize_gid(gid: &str) -> String {
    gid.trim()
        .trim_start_matches("urn:uuid:")
        .chars()
        .filter(|c| *c != '-')
        .collect::<String>()
        .to_ascii_lowercase()
}

fn normalize_gids(header: &mut ContainerHeader) {
    if let Some(gid) = header.gid.as_mut() {
        *gid = normalize_gid(gid);
    }
    if let Some(serde_json::Value::String(burst)) = header.attributes.get_mut("parent_burst") {
        *burst = normalize_gid(burst);
    }
}

fn normalize_create_date(header: &mut ContainerHeader) {
    header.create_date = header.create_date.take().and_then(|value| {
        match timestamp::parse(&value) {
            Ok(time) => Some(timestamp::format(time)),
            Err(e) => {
                debug!("Dropping unreadable create_date: {e}");
                None
            }
        }
    });
}

fn rename_legacy_description(metadata: &mut MetadataMap) {
    if let Some(description) = metadata.remove("desc") {
        metadata.entry("description".into()).or_insert(description);
    }
}

fn ensure_project_gid(metadata: &mut MetadataMap) {
    let missing = metadata::optional(metadata, "gid").is_none();
    if missing {
        metadata.insert("gid".into(), uuid::Uuid::new_v4().simple().to_string());
    }
}

impl FormatUpgrader for ContainerUpgrader {
    fn upgrade_root(&self, root: &Path) -> Result<(), UpgradeError> {
        let marker = root.join(PROJECT_FILE);
        let mut project = metadata::read_metadata(&marker)
            .map_err(|e| UpgradeError::incompatible(&marker, e.to_string()))?;

        let version = match metadata::optional(&project, "version") {
            None => 1,
            Some(v) => v.parse::<u32>().map_err(|_| {
                UpgradeError::incompatible(&marker, format!("invalid project version '{v}'"))
            })?,
        };
        if version == 0 || version > PROJECT_STRUCTURE_VERSION {
            return Err(UpgradeError::incompatible(
                &marker,
                format!(
                    "project version {version} is not supported (current is {PROJECT_STRUCTURE_VERSION})"
                ),
            ));
        }
        if version == PROJECT_STRUCTURE_VERSION {
            return Ok(());
        }

        for migration in &PROJECT_MIGRATIONS[(version - 1) as usize..] {
            migration(&mut project);
        }
        project.insert("version".into(), PROJECT_STRUCTURE_VERSION.to_string());
        metadata::write_metadata(&marker, &project).map_err(|source| UpgradeError::Write {
            path: marker.clone(),
            source,
        })?;
        info!(
            "Upgraded project {} from version {version} to {PROJECT_STRUCTURE_VERSION}",
            root.display()
        );
        Ok(())
    }

    fn upgrade_file(&self, path: &Path) -> Result<(), UpgradeError> {
        let mut header =
            read_header(path).map_err(|e| UpgradeError::incompatible(path, e.to_string()))?;
        let version = header.data_version;
        if version == CURRENT_DATA_VERSION {
            return Ok(());
        }
        if version == 0 || version > CURRENT_DATA_VERSION {
            return Err(UpgradeError::incompatible(
                path,
                format!("data version {version} has no migration path"),
            ));
        }

        for migration in &CONTAINER_MIGRATIONS[(version - 1) as usize..] {
            migration(&mut header);
        }
        header.data_version = CURRENT_DATA_VERSION;
        rewrite_header(path, &header).map_err(|source| UpgradeError::Write {
            path: path.to_owned(),
            source,
        })?;
        debug!(
            "Upgraded {} from version {version} to {CURRENT_DATA_VERSION}",
            path.display()
        );
        Ok(())
    }
}
