// SPDX-FileCopyrightText: 2026 The Neurostore Authors
// SPDX-License-Identifier: MIT

//! Loading data files into index entities.

use std::path::{Path, PathBuf};

use neurostore_db::{BurstParams, DataTypeParams};
use neurostore_format::{ContainerHeader, FormatKind, FormatUpgrader, classify_header, read_header, timestamp};
use tracing::{debug, warn};

use crate::context::ImportContext;
use crate::error::{ImportError, IoContext};
use crate::layout::{StorageLayout, is_plain_name, move_file};

/// Where loaded files end up.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Target<'a> {
    pub project_id: i64,
    pub operation_id: i64,
    pub datatype_group: Option<i64>,
    pub operation_dir: &'a Path,
}

/// A data product ready to be stored or linked.
#[derive(Debug, Clone)]
pub(crate) struct LoadedDataType {
    pub params: DataTypeParams,
    /// Location of the file in final storage
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub(crate) enum Loaded {
    DataType(LoadedDataType),
    Burst { params: BurstParams, path: PathBuf },
}

fn datatype_params(header: &ContainerHeader, gid: &str, target: &Target<'_>, size: u64) -> DataTypeParams {
    let tag = |i: usize| header.attribute(&format!("user_tag_{i}")).map(str::to_string);
    DataTypeParams {
        gid: gid.to_string(),
        type_name: header.type_name.clone(),
        subject: header.attribute("subject").map(str::to_string),
        title: header.attribute("title").map(str::to_string),
        state: header.attribute("state").map(str::to_string),
        visible: header.flag("visible").unwrap_or(true),
        fk_from_operation: target.operation_id,
        fk_datatype_group: target.datatype_group,
        fk_parent_burst: header.attribute("parent_burst").map(str::to_string),
        disk_size: Some(size),
        create_date: header.created_at(),
        data_version: header.data_version,
        user_tags: [tag(1), tag(2), tag(3), tag(4), tag(5)],
    }
}

fn burst_params(header: &ContainerHeader, gid: &str, target: &Target<'_>) -> BurstParams {
    let text = |key: &str| header.attribute(key).map(str::to_string);
    let time = |key: &str| header.attribute(key).and_then(|v| timestamp::parse(v).ok());
    BurstParams {
        gid: gid.to_string(),
        name: text("name"),
        fk_project: target.project_id,
        fk_simulation: Some(target.operation_id),
        status: text("status").unwrap_or_else(|| "finished".to_string()),
        simulator_gid: text("simulator_gid"),
        range1: text("range1"),
        range2: text("range2"),
        start_time: time("start_time"),
        finish_time: time("finish_time"),
    }
}

/// Upgrade one data file, relocate it into the operation directory and
/// build its index entity.
///
/// Files that cannot be upgraded are deleted. Those and files that do not
/// hold a data product are skipped, yielding `Ok(None)`.
pub(crate) fn load_data_file(
    upgrader: &dyn FormatUpgrader,
    ctx: &mut ImportContext<'_>,
    path: &Path,
    target: &Target<'_>,
) -> Result<Option<Loaded>, ImportError> {
    if let Err(e) = upgrader.upgrade_file(path) {
        warn!("Incompatible file will be removed: {} ({e})", path.display());
        if let Err(e) = std::fs::remove_file(path) {
            warn!("Failed to remove {}: {e}", path.display());
        }
        ctx.skip_file(path);
        return Ok(None);
    }

    let header = read_header(path)?;
    let kind = classify_header(&header);
    if !matches!(kind, FormatKind::DataProduct | FormatKind::BurstConfig) {
        warn!("{} holds a {kind}, not data; ignoring it", path.display());
        ctx.skip_file(path);
        return Ok(None);
    }
    let Some(gid) = header.gid.as_deref().filter(|g| !g.is_empty()) else {
        warn!("{} has no gid; ignoring it", path.display());
        ctx.skip_file(path);
        return Ok(None);
    };
    if !is_plain_name(gid) {
        warn!("{} has gid '{gid}', which cannot name a file; ignoring it", path.display());
        ctx.skip_file(path);
        return Ok(None);
    }

    let final_path = StorageLayout::storage_path(target.operation_dir, &header.type_name, gid);
    if final_path != path {
        move_file(path, &final_path)?;
        debug!("Relocated {} to {}", path.display(), final_path.display());
    }
    let size = std::fs::metadata(&final_path)
        .io_context(|| format!("Failed to stat {}", final_path.display()))?
        .len();

    Ok(Some(match kind {
        FormatKind::BurstConfig => Loaded::Burst {
            params: burst_params(&header, gid, target),
            path: final_path,
        },
        _ => Loaded::DataType(LoadedDataType {
            params: datatype_params(&header, gid, target, size),
            path: final_path,
        }),
    }))
}
