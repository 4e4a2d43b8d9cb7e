// SPDX-FileCopyrightText: 2026 The Neurostore Authors
// SPDX-License-Identifier: MIT

//! On-disk formats of exported research projects.
//!
//! **Architecture**: This is the Format Layer of the import workspace. It is
//! concerned only with file structure, never with persistence.
//!
//! # Key Features
//!
//! - Storage container (`.nsf`) header codec that reads metadata without
//!   touching the payload
//! - Explicit [`FormatKind`] classification of storage files
//! - In-place format upgrades of storage files and project roots
//!   ([`FormatUpgrader`])
//! - Flat XML metadata documents (`Project.xml`, `Operation.xml`, figures)
//! - Timestamp codec shared by all metadata
//!
//! # Container layout
//!
//! ```text
//! offset 0   8 bytes   magic  \x89NSF\r\n\x1a\n
//! offset 8   4 bytes   header length N (u32 little endian)
//! offset 12  N bytes   JSON header
//! offset 12+N          payload
//! ```

mod classify;
mod container;
mod error;
pub mod metadata;
pub mod timestamp;
mod upgrade;

pub use classify::{FormatKind, classify, classify_header};
pub use container::{
    BURST_WRITER, ContainerHeader, MAGIC, MAX_HEADER_LEN, VIEW_MODEL_WRITER, read_container,
    read_header, rewrite_header, write_container,
};
pub use error::{FormatError, Result, UpgradeError};
pub use metadata::MetadataMap;
pub use upgrade::{
    ContainerUpgrader, CURRENT_DATA_VERSION, FormatUpgrader, PROJECT_STRUCTURE_VERSION,
};

/// Marker file identifying a project root.
pub const PROJECT_FILE: &str = "Project.xml";

/// Legacy per-operation metadata file.
pub const OPERATION_FILE: &str = "Operation.xml";

/// Extension of storage container files.
pub const STORAGE_FILE_EXTENSION: &str = "nsf";

/// Extension of XML metadata files.
pub const METADATA_FILE_EXTENSION: &str = "xml";

/// Whether `path` names a storage container file (by extension).
pub fn is_storage_file(path: &std::path::Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == STORAGE_FILE_EXTENSION)
}
