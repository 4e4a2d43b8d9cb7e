// SPDX-FileCopyrightText: 2026 The Neurostore Authors
// SPDX-License-Identifier: MIT

//! SQLite persistence layer for imported research projects.
//!
//! This crate stores the entities produced by the project import pipeline:
//! users, algorithms, projects, operations and their groups, data type
//! indexes, links, burst configurations and result figures.
//!
//! **Architecture**: This is the Database Layer of the import workspace. It
//! knows nothing about archives or on-disk file formats.
//!
//! # Key Features
//!
//! - Full schema with unique global ids (the deduplication key)
//! - Lookup by row id and by global id
//! - A closure-scoped transaction boundary ([`StoreDb::transaction`])
//! - A typed duplicate-key signal ([`Error::Duplicate`])
//! - In-memory database for testing
//!
//! # Example
//!
//! ```ignore
//! use neurostore_db::StoreDb;
//!
//! let db = StoreDb::open_memory()?;
//! let user = db.get_or_create_user("alice")?;
//! if let Some(dt) = db.query_datatype_by_gid("0f3c...")? {
//!     println!("already stored in operation {}", dt.fk_from_operation);
//! }
//! ```

mod connection;
mod error;
mod query;
mod schema;
mod types;
mod write;

pub use connection::{OpenMode, StoreDb};
pub use error::{Error, Result};
pub use schema::SCHEMA_VERSION;
pub use types::*;
pub use write::*;
