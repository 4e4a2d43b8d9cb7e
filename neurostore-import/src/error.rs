// SPDX-FileCopyrightText: 2026 The Neurostore Authors
// SPDX-License-Identifier: MIT

use std::path::PathBuf;

use neurostore_format::{FormatError, UpgradeError};
use thiserror::Error;

/// The archive could not be staged.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Cannot read archive source {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Uploaded archive is empty")]
    Empty,

    #[error("{path} is not a valid archive: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Archive entry '{0}' escapes the staging directory")]
    UnsafeEntry(String),

    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// A fatal error aborting an import.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("Incompatible project format: {0}")]
    IncompatibleFormat(#[source] UpgradeError),

    #[error(
        "Could not import project {name} with gid {gid}: a project with the same name or gid already exists"
    )]
    DuplicateProject { name: String, gid: String },

    #[error("Store database error: {0}")]
    Database(#[from] neurostore_db::Error),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("Unknown algorithm {module}.{classname} referenced by {path}")]
    UnknownAlgorithm {
        module: String,
        classname: String,
        path: PathBuf,
    },

    #[error("Invalid metadata in {path}: {reason}")]
    InvalidMetadata { path: PathBuf, reason: String },

    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

impl ImportError {
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    pub fn invalid_metadata(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidMetadata {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub(crate) fn walk_error(root: &std::path::Path, e: walkdir::Error) -> ImportError {
    let message = format!("Failed to walk {}", root.display());
    let source = e
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::other("filesystem loop"));
    ImportError::io(message, source)
}

/// The single failure returned by an import call.
#[derive(Error, Debug)]
#[error("Project import failed: {source}")]
pub struct ImportFailure {
    /// Whether database writes and created project directories were undone
    pub rolled_back: bool,
    #[source]
    pub source: ImportError,
}

impl ImportFailure {
    pub(crate) fn new(rolled_back: bool, source: impl Into<ImportError>) -> Self {
        Self {
            rolled_back,
            source: source.into(),
        }
    }
}

/// Configuration could not be loaded or is inconsistent.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Invalid(String),

    #[error("Store database error: {0}")]
    Database(#[from] neurostore_db::Error),
}

impl ConfigError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

/// Helper trait for adding context to IO errors
pub trait IoContext<T> {
    fn io_context<F>(self, f: F) -> Result<T, ImportError>
    where
        F: FnOnce() -> String;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn io_context<F>(self, f: F) -> Result<T, ImportError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| ImportError::io(f(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_context_message() {
        let err = std::fs::read("/definitely/not/here")
            .io_context(|| "Failed to read marker".to_string())
            .unwrap_err();
        assert!(matches!(err, ImportError::Io { ref message, .. } if message == "Failed to read marker"));
        assert_eq!(err.to_string(), "IO error: Failed to read marker");
    }

    #[test]
    fn test_failure_keeps_cause() {
        let failure = ImportFailure::new(true, ArchiveError::Empty);
        assert!(failure.rolled_back);
        assert!(matches!(
            failure.source,
            ImportError::Archive(ArchiveError::Empty)
        ));
        assert_eq!(
            failure.to_string(),
            "Project import failed: Uploaded archive is empty"
        );
    }
}
