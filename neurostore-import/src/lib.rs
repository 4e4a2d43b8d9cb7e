// SPDX-FileCopyrightText: 2026 The Neurostore Authors
// SPDX-License-Identifier: MIT

//! Project archive import.
//!
//! An exported project archive is staged into a temp directory, every
//! project root inside it is upgraded to the current format, and its
//! operations, data types, bursts and figures are stored. One call imports
//! all projects of an archive inside a single database transaction.
//!
//! # Pipeline
//!
//! 1. [`Stager`] copies the archive and extracts it
//! 2. [`discover_project_roots`] finds every `Project.xml`
//! 3. the project is created and its marker moved into storage
//! 4. [`order_operation_folders`] orders operation folders by creation time
//! 5. each folder becomes an operation; its data types are stored, or
//!    linked when the same global id is already stored elsewhere
//! 6. figures under `IMAGES/` are attached last
//!
//! Any fatal error rolls back the transaction and removes the project
//! directories created so far. The staging area is always removed.
//!
//! # Example
//!
//! ```ignore
//! use neurostore_db::{OpenMode, StoreDb};
//! use neurostore_import::{ArchiveSource, ImportConfig, ImportService};
//!
//! let config = ImportConfig::load(None)?;
//! let db = StoreDb::open(&config.db_path, OpenMode::ReadWrite)?;
//! let service = ImportService::new(db, config)?;
//! let summary = service.import_project_structure(
//!     ArchiveSource::Path(Path::new("export.zip")),
//!     "alice",
//! )?;
//! println!("imported {} projects", summary.projects.len());
//! ```

mod algorithms;
mod config;
mod context;
mod dedup;
mod discover;
mod error;
mod images;
mod layout;
mod loader;
mod operation;
mod ordering;
mod service;
mod stager;

pub use algorithms::AlgorithmRegistry;
pub use config::{CONFIG_ENV, DEFAULT_DATATYPE_GROUP_STATE, ImportConfig, ViewModelMapping};
pub use context::{CompensationLog, ImportContext, ImportSummary, UndoAction};
pub use discover::discover_project_roots;
pub use error::{ArchiveError, ConfigError, ImportError, ImportFailure, IoContext};
pub use layout::{IMAGES_FOLDER, PROJECTS_FOLDER, StorageLayout};
pub use ordering::{FolderSource, OperationFolder, order_operation_folders};
pub use service::ImportService;
pub use stager::{ArchiveSource, StagedArchive, Stager, extract_zip};

/// A fresh global id: 32 lowercase hex digits.
pub(crate) fn new_gid() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
