// SPDX-FileCopyrightText: 2026 The Neurostore Authors
// SPDX-License-Identifier: MIT

//! Per-call import state.

use std::path::{Path, PathBuf};

use neurostore_db::{Project, User};
use tracing::{debug, warn};

/// A filesystem side effect to undo when an import fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoAction {
    /// Remove a directory created by the import, with its contents
    RemoveDir(PathBuf),
}

impl UndoAction {
    fn undo(&self) -> std::io::Result<()> {
        match self {
            UndoAction::RemoveDir(dir) => match std::fs::remove_dir_all(dir) {
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                other => other,
            },
        }
    }
}

/// Filesystem side effects recorded during an import.
#[derive(Debug, Default)]
pub struct CompensationLog {
    actions: Vec<UndoAction>,
}

impl CompensationLog {
    pub fn record(&mut self, action: UndoAction) {
        debug!("Recorded compensation {action:?}");
        self.actions.push(action);
    }

    pub fn actions(&self) -> &[UndoAction] {
        &self.actions
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Undo every recorded action, most recent first.
    ///
    /// Failures are logged and do not stop the remaining actions. Returns the
    /// number of actions that succeeded.
    pub fn execute(&mut self) -> usize {
        let mut done = 0;
        while let Some(action) = self.actions.pop() {
            match action.undo() {
                Ok(()) => done += 1,
                Err(e) => warn!("Failed to undo {action:?}: {e}"),
            }
        }
        done
    }
}

/// What an import produced and what it left out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub projects: Vec<Project>,
    pub operations: usize,
    pub datatypes_stored: usize,
    pub links_created: usize,
    pub bursts: usize,
    pub figures: usize,
    /// Storage files and images that were not imported
    pub skipped_files: Vec<PathBuf>,
    /// Operation folders that were not imported
    pub skipped_folders: Vec<PathBuf>,
}

/// State of one import call, passed explicitly through the pipeline.
#[derive(Debug)]
pub struct ImportContext<'a> {
    pub user: User,
    pub compensation: &'a mut CompensationLog,
    pub summary: ImportSummary,
}

impl<'a> ImportContext<'a> {
    pub fn new(user: User, compensation: &'a mut CompensationLog) -> Self {
        Self {
            user,
            compensation,
            summary: ImportSummary::default(),
        }
    }

    pub fn created_projects(&self) -> &[Project] {
        &self.summary.projects
    }

    pub(crate) fn skip_file(&mut self, path: &Path) {
        self.summary.skipped_files.push(path.to_owned());
    }

    pub(crate) fn skip_folder(&mut self, path: &Path) {
        self.summary.skipped_folders.push(path.to_owned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_executes_in_reverse() {
        let dir = tempfile::tempdir().unwrap();
        let outer = dir.path().join("outer");
        let inner = outer.join("inner");
        std::fs::create_dir_all(&inner).unwrap();
        std::fs::write(inner.join("file"), b"x").unwrap();

        let mut log = CompensationLog::default();
        log.record(UndoAction::RemoveDir(outer.clone()));
        log.record(UndoAction::RemoveDir(inner.clone()));
        assert_eq!(
            log.actions(),
            &[
                UndoAction::RemoveDir(outer.clone()),
                UndoAction::RemoveDir(inner.clone())
            ]
        );

        // inner goes first, so removing outer afterwards still succeeds
        assert_eq!(log.execute(), 2);
        assert!(!outer.exists());
        assert!(log.is_empty());
    }

    #[test]
    fn test_missing_dir_counts_as_undone() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = CompensationLog::default();
        log.record(UndoAction::RemoveDir(dir.path().join("never-created")));
        assert_eq!(log.execute(), 1);
    }
}
