// SPDX-FileCopyrightText: 2026 The Neurostore Authors
// SPDX-License-Identifier: MIT

use std::path::{Path, PathBuf};

use neurostore_db::StoreDb;
use neurostore_format::{ContainerUpgrader, FormatUpgrader};
use tracing::{error, info, warn};

use crate::algorithms::AlgorithmRegistry;
use crate::config::ImportConfig;
use crate::context::{CompensationLog, ImportContext, ImportSummary};
use crate::discover::{create_project, discover_project_roots};
use crate::error::{ArchiveError, ConfigError, ImportError, ImportFailure};
use crate::images::import_images;
use crate::layout::StorageLayout;
use crate::operation::OperationImporter;
use crate::ordering::order_operation_folders;
use crate::stager::{ArchiveSource, Stager};

/// Entry point of the import pipeline.
pub struct ImportService {
    db: StoreDb,
    config: ImportConfig,
    layout: StorageLayout,
    stager: Stager,
    registry: AlgorithmRegistry,
    upgrader: Box<dyn FormatUpgrader>,
}

impl ImportService {
    /// Validate `config` and register its view-model algorithms in `db`.
    pub fn new(db: StoreDb, config: ImportConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let registry = AlgorithmRegistry::load(&db, &config.view_models)?;
        info!(
            "Import service ready: storage at {}, {} view-model mappings",
            config.storage_root.display(),
            registry.len()
        );
        Ok(Self {
            layout: StorageLayout::new(&config.storage_root),
            stager: Stager::new(&config.temp_dir),
            db,
            config,
            registry,
            upgrader: Box::new(ContainerUpgrader),
        })
    }

    /// Replace the format upgrader.
    pub fn with_upgrader(mut self, upgrader: Box<dyn FormatUpgrader>) -> Self {
        self.upgrader = upgrader;
        self
    }

    pub fn db(&self) -> &StoreDb {
        &self.db
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// Import every project found in the archive on behalf of `username`.
    ///
    /// Either all projects of the archive are stored or none are. On a fatal
    /// error the database transaction is rolled back and the project
    /// directories created so far are removed; the returned
    /// [`ImportFailure`] carries the cause. The staging area is removed in
    /// every case.
    pub fn import_project_structure(
        &self,
        source: ArchiveSource<'_>,
        username: &str,
    ) -> Result<ImportSummary, ImportFailure> {
        let staged = self
            .stager
            .reserve()
            .map_err(|e| ImportFailure::new(false, e))?;
        self.stager
            .fill(&staged, source)
            .map_err(|e| ImportFailure::new(false, e))?;

        let mut compensation = CompensationLog::default();
        let result = self
            .db
            .transaction(|db| self.import_staged(db, staged.dir(), username, &mut compensation));

        match result {
            Ok(summary) => {
                info!(
                    "Imported {} projects: {} operations, {} data types stored, {} linked",
                    summary.projects.len(),
                    summary.operations,
                    summary.datatypes_stored,
                    summary.links_created
                );
                Ok(summary)
            }
            Err(e) => {
                error!("Project import failed, rolling back: {e}");
                let undone = compensation.execute();
                info!("Removed {undone} directories created by the failed import");
                Err(ImportFailure::new(true, e))
            }
        }
    }

    fn import_staged(
        &self,
        db: &StoreDb,
        staging: &Path,
        username: &str,
        compensation: &mut CompensationLog,
    ) -> Result<ImportSummary, ImportError> {
        let user = db.get_or_create_user(username)?;
        let mut ctx = ImportContext::new(user, compensation);

        let roots = discover_project_roots(staging)?;
        if roots.is_empty() {
            warn!("No project found in {}", staging.display());
            return Ok(ctx.summary);
        }

        let importer = OperationImporter {
            db,
            layout: &self.layout,
            upgrader: self.upgrader.as_ref(),
            registry: &self.registry,
            group_state: &self.config.default_datatype_group_state,
        };
        for root in roots {
            let project = create_project(db, &self.layout, self.upgrader.as_ref(), &mut ctx, &root)?;
            for folder in order_operation_folders(&root)? {
                importer.import_folder(&mut ctx, &project, &folder)?;
            }
            import_images(db, &self.layout, &mut ctx, &project, &root)?;
        }
        Ok(ctx.summary)
    }

    /// Stage a simulator configuration archive and return its directory.
    ///
    /// The raw archive copy is removed; the extracted directory is left for
    /// the caller, who owns it from then on.
    pub fn import_simulator_configuration_zip(
        &self,
        source: ArchiveSource<'_>,
    ) -> Result<PathBuf, ArchiveError> {
        let staged = self.stager.stage(source)?;
        Ok(staged.keep())
    }
}
