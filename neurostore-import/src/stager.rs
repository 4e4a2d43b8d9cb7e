// SPDX-FileCopyrightText: 2026 The Neurostore Authors
// SPDX-License-Identifier: MIT

//! Archive staging.
//!
//! An archive is copied to a raw file inside the temp directory and
//! extracted into a sibling staging directory. Both are removed when the
//! [`StagedArchive`] is dropped, unless it was kept.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{Datelike, Local, Timelike};
use tracing::{debug, info, warn};

use crate::error::ArchiveError;

static STAGING_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Where an archive comes from.
pub enum ArchiveSource<'a> {
    /// A zip file on the local filesystem
    Path(&'a Path),
    /// An uploaded byte stream
    Upload(&'a mut dyn Read),
}

impl<'a> From<&'a Path> for ArchiveSource<'a> {
    fn from(path: &'a Path) -> Self {
        ArchiveSource::Path(path)
    }
}

impl std::fmt::Debug for ArchiveSource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArchiveSource::Path(path) => f.debug_tuple("Path").field(path).finish(),
            ArchiveSource::Upload(_) => f.write_str("Upload"),
        }
    }
}

/// A raw archive file and the directory it is extracted into.
#[derive(Debug)]
pub struct StagedArchive {
    raw: PathBuf,
    dir: PathBuf,
    keep: bool,
}

impl StagedArchive {
    /// Path of the copied archive.
    pub fn raw(&self) -> &Path {
        &self.raw
    }

    /// Directory the archive is extracted into.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Keep the staging directory and hand it to the caller.
    ///
    /// The raw archive is still removed.
    pub fn keep(mut self) -> PathBuf {
        self.keep = true;
        remove_file_quiet(&self.raw);
        std::mem::take(&mut self.dir)
    }
}

impl Drop for StagedArchive {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        remove_file_quiet(&self.raw);
        if !self.dir.exists() {
            return;
        }
        if let Err(e) = fs::remove_dir_all(&self.dir) {
            warn!(
                "Failed to remove staging directory {}: {e}",
                self.dir.display()
            );
        }
    }
}

fn remove_file_quiet(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {}: {e}", path.display()),
    }
}

/// Stages archives under a temp directory.
#[derive(Debug, Clone)]
pub struct Stager {
    temp_dir: PathBuf,
}

impl Stager {
    pub fn new(temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            temp_dir: temp_dir.into(),
        }
    }

    /// Reserve a unique raw file and staging directory name.
    ///
    /// Nothing is created besides the temp directory itself.
    pub fn reserve(&self) -> Result<StagedArchive, ArchiveError> {
        fs::create_dir_all(&self.temp_dir).map_err(|source| ArchiveError::Io {
            message: format!("Failed to create {}", self.temp_dir.display()),
            source,
        })?;

        let now = Local::now();
        let name = format!(
            "{}-{}-{}_{}-{}-{}_{}-ImportProject-{}",
            now.year(),
            now.month(),
            now.day(),
            now.hour(),
            now.minute(),
            now.second(),
            now.timestamp_subsec_micros(),
            STAGING_COUNTER.fetch_add(1, Ordering::Relaxed),
        );
        let dir = self.temp_dir.join(&name);
        let raw = self.temp_dir.join(format!("{name}.zip"));
        Ok(StagedArchive {
            raw,
            dir,
            keep: false,
        })
    }

    /// Copy `source` into the reserved raw file and extract it.
    pub fn fill(&self, staged: &StagedArchive, source: ArchiveSource<'_>) -> Result<(), ArchiveError> {
        match source {
            ArchiveSource::Path(path) => {
                fs::copy(path, &staged.raw).map_err(|source| ArchiveError::Read {
                    path: path.to_owned(),
                    source,
                })?;
            }
            ArchiveSource::Upload(reader) => {
                let mut file = File::create(&staged.raw).map_err(|source| ArchiveError::Io {
                    message: format!("Failed to create {}", staged.raw.display()),
                    source,
                })?;
                let written = io::copy(reader, &mut file).map_err(|source| ArchiveError::Read {
                    path: staged.raw.clone(),
                    source,
                })?;
                if written == 0 {
                    return Err(ArchiveError::Empty);
                }
            }
        }
        extract_zip(&staged.raw, &staged.dir)?;
        info!("Staged archive into {}", staged.dir.display());
        Ok(())
    }

    /// Reserve, copy and extract in one step.
    pub fn stage(&self, source: ArchiveSource<'_>) -> Result<StagedArchive, ArchiveError> {
        let staged = self.reserve()?;
        self.fill(&staged, source)?;
        Ok(staged)
    }
}

fn io_error(message: String) -> impl FnOnce(io::Error) -> ArchiveError {
    move |source| ArchiveError::Io { message, source }
}

/// Extract `archive` into `dest`, refusing entries that would land outside.
pub fn extract_zip(archive: &Path, dest: &Path) -> Result<(), ArchiveError> {
    let file = File::open(archive).map_err(|source| ArchiveError::Read {
        path: archive.to_owned(),
        source,
    })?;
    let mut zip = zip::ZipArchive::new(file).map_err(|source| ArchiveError::Invalid {
        path: archive.to_owned(),
        source,
    })?;

    fs::create_dir_all(dest).map_err(io_error(format!("Failed to create {}", dest.display())))?;
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).map_err(|source| ArchiveError::Invalid {
            path: archive.to_owned(),
            source,
        })?;
        let relative = entry
            .enclosed_name()
            .ok_or_else(|| ArchiveError::UnsafeEntry(entry.name().to_string()))?;
        let target = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target)
                .map_err(io_error(format!("Failed to create {}", target.display())))?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .map_err(io_error(format!("Failed to create {}", parent.display())))?;
        }
        let mut out = File::create(&target)
            .map_err(io_error(format!("Failed to create {}", target.display())))?;
        io::copy(&mut entry, &mut out)
            .map_err(io_error(format!("Failed to extract {}", target.display())))?;
    }
    debug!("Extracted {} entries from {}", zip.len(), archive.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use neurostore_utils_test::{zip_dir, zip_single};

    fn sample_archive(dir: &Path) -> PathBuf {
        let src = dir.join("src");
        fs::create_dir_all(src.join("Default_Project/7")).unwrap();
        fs::write(src.join("Default_Project/Project.xml"), "<p/>").unwrap();
        fs::write(src.join("Default_Project/7/a.nsf"), b"data").unwrap();
        let archive = dir.join("export.zip");
        zip_dir(&src, &archive).unwrap();
        archive
    }

    #[test]
    fn test_stage_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let archive = sample_archive(dir.path());
        let stager = Stager::new(dir.path().join("tmp"));

        let staged = stager.stage(ArchiveSource::Path(&archive)).unwrap();
        assert!(staged.raw().is_file());
        assert!(staged.dir().join("Default_Project/Project.xml").is_file());
        assert_eq!(
            fs::read(staged.dir().join("Default_Project/7/a.nsf")).unwrap(),
            b"data"
        );
        assert!(
            staged
                .dir()
                .file_name()
                .unwrap()
                .to_string_lossy()
                .contains("-ImportProject-")
        );

        let (raw, staged_dir) = (staged.raw().to_owned(), staged.dir().to_owned());
        drop(staged);
        assert!(!raw.exists());
        assert!(!staged_dir.exists());
    }

    #[test]
    fn test_stage_from_upload_and_keep() {
        let dir = tempfile::tempdir().unwrap();
        let archive = sample_archive(dir.path());
        let bytes = fs::read(&archive).unwrap();
        let stager = Stager::new(dir.path().join("tmp"));

        let mut reader = bytes.as_slice();
        let staged = stager.stage(ArchiveSource::Upload(&mut reader)).unwrap();
        let raw = staged.raw().to_owned();
        let kept = staged.keep();
        assert!(kept.join("Default_Project/Project.xml").is_file());
        assert!(!raw.exists());
    }

    #[test]
    fn test_names_never_collide() {
        let dir = tempfile::tempdir().unwrap();
        let stager = Stager::new(dir.path());
        let a = stager.reserve().unwrap();
        let b = stager.reserve().unwrap();
        assert_ne!(a.dir(), b.dir());
        assert_ne!(a.raw(), b.raw());
    }

    #[test]
    fn test_empty_upload() {
        let dir = tempfile::tempdir().unwrap();
        let stager = Stager::new(dir.path());
        let mut empty: &[u8] = &[];
        assert!(matches!(
            stager.stage(ArchiveSource::Upload(&mut empty)),
            Err(ArchiveError::Empty)
        ));
        // failed staging leaves nothing behind
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_not_a_zip() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("bogus.zip");
        fs::write(&bogus, b"plain text").unwrap();
        let stager = Stager::new(dir.path().join("tmp"));
        assert!(matches!(
            stager.stage(ArchiveSource::Path(&bogus)),
            Err(ArchiveError::Invalid { .. })
        ));
    }

    #[test]
    fn test_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let stager = Stager::new(dir.path().join("tmp"));
        assert!(matches!(
            stager.stage(ArchiveSource::Path(&dir.path().join("nope.zip"))),
            Err(ArchiveError::Read { .. })
        ));
    }

    #[test]
    fn test_escaping_entry_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("evil.zip");
        zip_single(&archive, "../../escaped.txt", b"gotcha").unwrap();
        let stager = Stager::new(dir.path().join("tmp"));
        assert!(matches!(
            stager.stage(ArchiveSource::Path(&archive)),
            Err(ArchiveError::UnsafeEntry(_))
        ));
        assert!(!dir.path().join("escaped.txt").exists());
    }
}
