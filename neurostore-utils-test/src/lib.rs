// SPDX-FileCopyrightText: 2026 The Neurostore Authors
// SPDX-License-Identifier: MIT

//! Test utilities for Neurostore.
//!
//! This crate builds exported project trees and archives on disk, and
//! provides proptest strategies for the values those trees carry.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime};
use neurostore_format::metadata::{self, MetadataMap};
use neurostore_format::{
    BURST_WRITER, CURRENT_DATA_VERSION, ContainerHeader, OPERATION_FILE, PROJECT_FILE,
    PROJECT_STRUCTURE_VERSION, VIEW_MODEL_WRITER, timestamp, write_container,
};
use proptest::prelude::*;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

/// A wrapper around TempDir that provides a canonicalized path.
/// This resolves symlinks like /var -> /private/var on macOS, so paths
/// recorded by the pipeline compare equal to the ones the test built.
pub struct CanonicalTempDir {
    _inner: TempDir,
    path: PathBuf,
}

impl CanonicalTempDir {
    /// Create a new temporary directory with a canonicalized path.
    pub fn new() -> io::Result<Self> {
        let inner = TempDir::new()?;
        let path = inner.path().canonicalize()?;
        Ok(Self {
            _inner: inner,
            path,
        })
    }

    /// Get the canonicalized path to the temporary directory.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn other<E: std::error::Error + Send + Sync + 'static>(e: E) -> io::Error {
    io::Error::other(e)
}

/// A fresh global id in the stored (32 hex digit) form.
pub fn new_gid() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// A timestamp `secs` seconds after 2020-01-01 00:00:00.
pub fn at(secs: i64) -> NaiveDateTime {
    DateTime::from_timestamp(1_577_836_800 + secs, 0)
        .map(|t| t.naive_utc())
        .unwrap_or_default()
}

/// Header of a view-model container declaring `kind`.
pub fn view_model(kind: &str, gid: &str, created: NaiveDateTime) -> ContainerHeader {
    let mut header = ContainerHeader::new(VIEW_MODEL_WRITER, kind);
    header.gid = Some(gid.to_string());
    header.data_version = CURRENT_DATA_VERSION;
    header.create_date = Some(timestamp::format(created));
    header
}

/// Header of a data product container.
pub fn data_product(type_name: &str, gid: &str, created: NaiveDateTime) -> ContainerHeader {
    let mut header = ContainerHeader::new(type_name, type_name);
    header.gid = Some(gid.to_string());
    header.data_version = CURRENT_DATA_VERSION;
    header.create_date = Some(timestamp::format(created));
    header
        .attributes
        .insert("subject".into(), serde_json::json!("John Doe"));
    header
}

/// Header of a burst configuration container.
pub fn burst(gid: &str, name: &str) -> ContainerHeader {
    let mut header = ContainerHeader::new(BURST_WRITER, BURST_WRITER);
    header.gid = Some(gid.to_string());
    header.data_version = CURRENT_DATA_VERSION;
    header
        .attributes
        .insert("name".into(), serde_json::json!(name));
    header
        .attributes
        .insert("status".into(), serde_json::json!("finished"));
    header
}

/// Metadata of a legacy `Operation.xml`.
pub fn operation_metadata(
    gid: &str,
    module: &str,
    classname: &str,
    created: NaiveDateTime,
) -> MetadataMap {
    let mut map = MetadataMap::new();
    map.insert("gid".into(), gid.to_string());
    map.insert("algorithm_module".into(), module.to_string());
    map.insert("algorithm_classname".into(), classname.to_string());
    map.insert("parameters".into(), "{}".into());
    map.insert("status".into(), "5-FINISHED".into());
    map.insert("create_date".into(), timestamp::format(created));
    map
}

/// An exported project tree under construction.
#[derive(Debug, Clone)]
pub struct ProjectTree {
    root: PathBuf,
}

impl ProjectTree {
    /// Create `dir` with a current-version `Project.xml` for `name`.
    pub fn new(dir: impl Into<PathBuf>, name: &str) -> io::Result<Self> {
        let mut marker = MetadataMap::new();
        marker.insert("name".into(), name.to_string());
        marker.insert("description".into(), format!("{name} exported for tests"));
        marker.insert("gid".into(), new_gid());
        marker.insert("last_updated".into(), timestamp::format(at(0)));
        marker.insert("version".into(), PROJECT_STRUCTURE_VERSION.to_string());
        Self::with_marker(dir, &marker)
    }

    /// Create `dir` with the given `Project.xml` metadata.
    pub fn with_marker(dir: impl Into<PathBuf>, marker: &MetadataMap) -> io::Result<Self> {
        let root = dir.into();
        std::fs::create_dir_all(&root)?;
        metadata::write_metadata(&root.join(PROJECT_FILE), marker).map_err(other)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of (and create) an operation folder.
    pub fn folder(&self, name: &str) -> io::Result<PathBuf> {
        let dir = self.root.join(name);
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Write a container file into `folder`.
    pub fn container(
        &self,
        folder: &str,
        file_name: &str,
        header: &ContainerHeader,
    ) -> io::Result<PathBuf> {
        let path = self.folder(folder)?.join(file_name);
        write_container(&path, header, b"opaque payload").map_err(other)?;
        Ok(path)
    }

    /// Write raw bytes into `folder`.
    pub fn raw(&self, folder: &str, file_name: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        let path = self.folder(folder)?.join(file_name);
        std::fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Write a legacy `Operation.xml` into `folder`.
    pub fn operation(&self, folder: &str, operation: &MetadataMap) -> io::Result<PathBuf> {
        let path = self.folder(folder)?.join(OPERATION_FILE);
        metadata::write_metadata(&path, operation).map_err(other)?;
        Ok(path)
    }

    /// Write an image and its metadata into `IMAGES`.
    ///
    /// `operation_gid` becomes the figure's `fk_from_operation`.
    pub fn image(&self, file_name: &str, operation_gid: Option<&str>) -> io::Result<PathBuf> {
        let dir = self.folder("IMAGES")?;
        let image = dir.join(file_name);
        std::fs::write(&image, b"\x89PNG\r\n\x1a\nnot really")?;

        let stem = Path::new(file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut map = MetadataMap::new();
        map.insert("name".into(), stem.clone());
        map.insert("session_name".into(), "Default".into());
        map.insert("file_format".into(), "PNG".into());
        // exporting machine's path; only the basename is significant
        map.insert(
            "file_path".into(),
            format!("/exported/IMAGES/{file_name}"),
        );
        map.insert("create_date".into(), timestamp::format(at(3600)));
        map.insert(
            "fk_from_operation".into(),
            operation_gid.unwrap_or("None").to_string(),
        );
        metadata::write_metadata(&dir.join(format!("{stem}.xml")), &map).map_err(other)?;
        Ok(image)
    }
}

/// Zip the contents of `src` (relative paths) into `archive`.
pub fn zip_dir(src: &Path, archive: &Path) -> io::Result<()> {
    let file = File::create(archive)?;
    let mut zip = zip::ZipWriter::new(file);
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for entry in walkdir::WalkDir::new(src).sort_by_file_name() {
        let entry = entry.map_err(other)?;
        let relative = entry.path().strip_prefix(src).map_err(other)?;
        if relative.as_os_str().is_empty() {
            continue;
        }
        let name = relative.to_string_lossy().replace('\\', "/");
        if entry.file_type().is_dir() {
            zip.add_directory(name, options).map_err(other)?;
        } else {
            zip.start_file(name, options).map_err(other)?;
            zip.write_all(&std::fs::read(entry.path())?)?;
        }
    }
    zip.finish().map_err(other)?;
    Ok(())
}

/// Zip a single entry with an arbitrary (possibly hostile) name.
pub fn zip_single(archive: &Path, name: &str, bytes: &[u8]) -> io::Result<()> {
    let mut zip = zip::ZipWriter::new(File::create(archive)?);
    zip.start_file(name, SimpleFileOptions::default())
        .map_err(other)?;
    zip.write_all(bytes)?;
    zip.finish().map_err(other)?;
    Ok(())
}

pub fn arb_gid() -> impl Strategy<Value = String> {
    "[0-9a-f]{32}"
}

prop_compose! {
    /// Timestamps spread over roughly thirty years, at second resolution.
    pub fn arb_timestamp()(secs in 0i64..1_000_000_000) -> NaiveDateTime {
        at(secs)
    }
}

pub fn arb_folder_name() -> impl Strategy<Value = String> {
    "[a-z0-9_]{1,12}".prop_filter("Reserved folder name", |s| s != "IMAGES")
}
