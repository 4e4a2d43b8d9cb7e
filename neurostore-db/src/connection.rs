// SPDX-FileCopyrightText: 2026 The Neurostore Authors
// SPDX-License-Identifier: MIT

//! Opening the store and scoping transactions.

use std::path::Path;

use rusqlite::{Connection, OpenFlags};
use tracing::debug;

use crate::error::{Error, Result};
use crate::schema::{SCHEMA_SQL, SCHEMA_VERSION};

const PRAGMAS: &str = "
    PRAGMA journal_mode = WAL;
    PRAGMA synchronous = NORMAL;
    PRAGMA foreign_keys = ON;
    PRAGMA temp_store = MEMORY;
";

/// How [`StoreDb::open`] treats the database file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Existing, initialized store; no writes
    ReadOnly,
    /// Existing, initialized store
    ReadWrite,
    /// Create the file and the schema when missing
    Create,
}

impl OpenMode {
    fn flags(self) -> OpenFlags {
        match self {
            OpenMode::ReadOnly => OpenFlags::SQLITE_OPEN_READ_ONLY,
            OpenMode::ReadWrite => OpenFlags::SQLITE_OPEN_READ_WRITE,
            OpenMode::Create => OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        }
    }
}

/// The project store.
pub struct StoreDb {
    pub(crate) conn: Connection,
}

impl StoreDb {
    pub fn open<P: AsRef<Path>>(path: P, mode: OpenMode) -> Result<Self> {
        let path = path.as_ref();
        if mode != OpenMode::Create && !path.exists() {
            return Err(Error::DatabaseNotFound(path.to_owned()));
        }

        let conn =
            Connection::open_with_flags(path, mode.flags()).map_err(|source| Error::DatabaseOpen {
                path: path.to_owned(),
                source,
            })?;
        let db = Self { conn };
        match mode {
            OpenMode::Create => db.initialize()?,
            OpenMode::ReadWrite => {
                db.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
                db.expect_current_schema()?;
            }
            OpenMode::ReadOnly => db.expect_current_schema()?,
        }
        debug!("Opened store {} ({mode:?})", path.display());
        Ok(db)
    }

    /// A fresh in-memory store with the full schema.
    pub fn open_memory() -> Result<Self> {
        let db = Self {
            conn: Connection::open_in_memory()?,
        };
        db.initialize()?;
        Ok(db)
    }

    fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(PRAGMAS)?;
        self.create_schema()
    }

    /// Create missing tables and stamp [`SCHEMA_VERSION`].
    pub fn create_schema(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA_SQL)?;
        self.conn
            .pragma_update(None, "user_version", SCHEMA_VERSION)?;
        Ok(())
    }

    fn expect_current_schema(&self) -> Result<()> {
        match self.schema_version()? {
            SCHEMA_VERSION => Ok(()),
            found => Err(Error::SchemaVersionMismatch {
                expected: SCHEMA_VERSION,
                found,
            }),
        }
    }

    pub fn schema_version(&self) -> Result<i32> {
        Ok(self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?)
    }

    pub fn has_schema(&self) -> Result<bool> {
        let tables: i32 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'Projects'",
            [],
            |row| row.get(0),
        )?;
        Ok(tables > 0)
    }

    /// Run `f` inside a single transaction.
    ///
    /// The transaction commits when `f` returns `Ok` and rolls back when it
    /// returns `Err` (or panics). Nested calls are not supported.
    pub fn transaction<T, E, F>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&Self) -> std::result::Result<T, E>,
        E: From<Error>,
    {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| E::from(Error::from(e)))?;
        let value = f(self)?;
        tx.commit().map_err(|e| E::from(Error::from(e)))?;
        debug!("Committed transaction");
        Ok(value)
    }
}
