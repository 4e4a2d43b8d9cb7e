// SPDX-FileCopyrightText: 2026 The Neurostore Authors
// SPDX-License-Identifier: MIT

//! Error types for format handling.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for format operations.
pub type Result<T> = std::result::Result<T, FormatError>;

/// Errors raised while reading or writing on-disk formats.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{0}: not a storage container (bad magic)")]
    BadMagic(PathBuf),

    #[error("{path}: header of {len} bytes exceeds the limit")]
    HeaderTooLarge { path: PathBuf, len: u32 },

    #[error("{path}: invalid container header: {source}")]
    Header {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path}: invalid XML metadata: {source}")]
    XmlRead {
        path: PathBuf,
        #[source]
        source: quick_xml::DeError,
    },

    #[error("failed to serialize XML metadata: {0}")]
    XmlWrite(#[from] quick_xml::SeError),

    #[error("{path}: missing metadata key '{key}'")]
    MissingKey { path: PathBuf, key: String },

    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),
}

impl FormatError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors raised by a [`FormatUpgrader`](crate::FormatUpgrader).
#[derive(Error, Debug)]
pub enum UpgradeError {
    /// The file cannot be brought to the current version.
    #[error("incompatible format in {path}: {reason}")]
    Incompatible { path: PathBuf, reason: String },

    /// The upgrade itself failed to write its result.
    #[error("failed to upgrade {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: FormatError,
    },
}

impl UpgradeError {
    pub(crate) fn incompatible(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Incompatible {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether the failure means the file cannot be used at all.
    pub fn is_incompatible(&self) -> bool {
        matches!(self, UpgradeError::Incompatible { .. })
    }
}
