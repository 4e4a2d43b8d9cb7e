// SPDX-FileCopyrightText: 2026 The Neurostore Authors
// SPDX-License-Identifier: MIT

//! Operation import.
//!
//! A legacy folder carries its operation as `Operation.xml`; the operation
//! is rebuilt from it. A modern folder only carries view-model containers;
//! an operation is synthesized around the first view-model that maps to a
//! registered algorithm.

use std::path::{Path, PathBuf};

use chrono::{NaiveDateTime, Utc};
use neurostore_db::{
    DataTypeGroup, DataTypeGroupParams, Operation, OperationGroup, OperationGroupParams,
    OperationParams, Project, STATUS_FINISHED, StoreDb,
};
use neurostore_format::metadata::{self, MetadataMap, optional, require};
use neurostore_format::{
    FormatKind, FormatUpgrader, OPERATION_FILE, classify, classify_header, read_header,
};
use tracing::{debug, info, warn};

use crate::algorithms::AlgorithmRegistry;
use crate::context::ImportContext;
use crate::dedup::store_or_link;
use crate::error::{ImportError, IoContext};
use crate::layout::{StorageLayout, move_file};
use crate::loader::{Loaded, LoadedDataType, Target, load_data_file};
use crate::new_gid;
use crate::ordering::{FolderSource, OperationFolder, storage_files};

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

struct MainViewModel {
    gid: String,
    algorithm: i64,
    created: Option<NaiveDateTime>,
}

pub(crate) struct OperationImporter<'a> {
    pub db: &'a StoreDb,
    pub layout: &'a StorageLayout,
    pub upgrader: &'a dyn FormatUpgrader,
    pub registry: &'a AlgorithmRegistry,
    pub group_state: &'a str,
}

impl OperationImporter<'_> {
    pub fn import_folder(
        &self,
        ctx: &mut ImportContext<'_>,
        project: &Project,
        folder: &OperationFolder,
    ) -> Result<(), ImportError> {
        match folder.source {
            FolderSource::LegacyXml => self.import_legacy(ctx, project, &folder.path),
            FolderSource::ViewModel => self.import_modern(ctx, project, &folder.path),
        }
    }

    fn operation_dir(&self, project: &Project, operation: &Operation) -> Result<PathBuf, ImportError> {
        let dir = self.layout.operation_dir(&project.name, operation.id);
        std::fs::create_dir_all(&dir)
            .io_context(|| format!("Failed to create operation directory {}", dir.display()))?;
        Ok(dir)
    }

    fn operation_group(&self, map: &MetadataMap) -> Result<Option<OperationGroup>, ImportError> {
        let Some(gid) = optional(map, "operation_group_gid") else {
            return Ok(None);
        };
        if let Some(group) = self.db.query_operation_group_by_gid(gid)? {
            return Ok(Some(group));
        }
        let text = |key: &str| optional(map, key).map(str::to_string);
        let group = self.db.insert_operation_group(&OperationGroupParams {
            gid: gid.to_string(),
            name: text("operation_group_name").unwrap_or_else(|| gid.to_string()),
            range1: text("operation_group_range1"),
            range2: text("operation_group_range2"),
            range3: text("operation_group_range3"),
        })?;
        debug!("Created operation group {} ({})", group.name, group.id);
        Ok(Some(group))
    }

    /// The data type group of `group`, created on first use.
    fn datatype_group(
        &self,
        group: &OperationGroup,
        operation_id: i64,
    ) -> Result<DataTypeGroup, ImportError> {
        if let Some(existing) = self.db.query_datatype_group_by_operation_group(group.id)? {
            return Ok(existing);
        }
        let created = self.db.insert_datatype_group(&DataTypeGroupParams {
            gid: new_gid(),
            fk_operation_group: group.id,
            fk_from_operation: operation_id,
            state: self.group_state.to_string(),
            create_date: Utc::now().naive_utc(),
        })?;
        debug!("Created data type group {} for group {}", created.id, group.id);
        Ok(created)
    }

    fn legacy_operation(
        &self,
        ctx: &ImportContext<'_>,
        project: &Project,
        file: &Path,
        map: &MetadataMap,
        group: Option<&OperationGroup>,
    ) -> Result<OperationParams, ImportError> {
        let module = require(map, "algorithm_module", file)?;
        let classname = require(map, "algorithm_classname", file)?;
        let algorithm = self.db.query_algorithm(module, classname)?.ok_or_else(|| {
            ImportError::UnknownAlgorithm {
                module: module.to_string(),
                classname: classname.to_string(),
                path: file.to_owned(),
            }
        })?;
        let text = |key: &str| optional(map, key).map(str::to_string);

        Ok(OperationParams {
            gid: text("gid").unwrap_or_else(new_gid),
            fk_launched_by: ctx.user.id,
            fk_launched_in: project.id,
            fk_from_algo: algorithm.id,
            fk_operation_group: group.map(|g| g.id),
            parameters: text("parameters").unwrap_or_else(|| "{}".to_string()),
            meta: text("meta"),
            status: text("status").unwrap_or_else(|| STATUS_FINISHED.to_string()),
            user_group: text("user_group"),
            range_values: text("range_values"),
            visible: optional(map, "visible")
                .and_then(parse_flag)
                .unwrap_or(true),
            create_date: metadata::timestamp(map, "create_date")?
                .ok_or_else(|| ImportError::invalid_metadata(file, "missing create_date"))?,
            start_date: metadata::timestamp(map, "start_date")?,
            completion_date: metadata::timestamp(map, "completion_date")?,
        })
    }

    fn import_legacy(
        &self,
        ctx: &mut ImportContext<'_>,
        project: &Project,
        dir: &Path,
    ) -> Result<(), ImportError> {
        let file = dir.join(OPERATION_FILE);
        let map = metadata::read_metadata(&file)?;
        let group = self.operation_group(&map)?;
        let params = self.legacy_operation(ctx, project, &file, &map, group.as_ref())?;

        let operation = self.db.insert_operation(&params)?;
        ctx.summary.operations += 1;
        let datatype_group = match &group {
            Some(group) => Some(self.datatype_group(group, operation.id)?),
            None => None,
        };
        let operation_dir = self.operation_dir(project, &operation)?;
        info!(
            "Imported operation {} from {} as {}",
            operation.gid,
            file.display(),
            operation.id
        );

        let target = Target {
            project_id: project.id,
            operation_id: operation.id,
            datatype_group: datatype_group.map(|g| g.id),
            operation_dir: &operation_dir,
        };
        let mut batch = Vec::new();
        for path in storage_files(dir)? {
            if classify(&path) == FormatKind::ViewModel {
                move_into(&path, &operation_dir)?;
                continue;
            }
            self.load(ctx, &path, &target, &mut batch)?;
        }
        store_or_link(self.db, project, batch, ctx)
    }

    fn import_modern(
        &self,
        ctx: &mut ImportContext<'_>,
        project: &Project,
        dir: &Path,
    ) -> Result<(), ImportError> {
        let mut main: Option<MainViewModel> = None;
        let mut view_models = Vec::new();
        let mut data_files = Vec::new();

        for path in storage_files(dir)? {
            let header = match read_header(&path) {
                Ok(header) => header,
                Err(e) => {
                    warn!("Unreadable storage file will be ignored: {} ({e})", path.display());
                    ctx.skip_file(&path);
                    continue;
                }
            };
            match classify_header(&header) {
                FormatKind::ViewModel => {
                    if main.is_none()
                        && let (Some(algorithm), Some(gid)) =
                            (self.registry.algorithm_for(&header.type_name), header.gid.as_deref())
                    {
                        main = Some(MainViewModel {
                            gid: gid.to_string(),
                            algorithm,
                            created: header.created_at(),
                        });
                    }
                    view_models.push(path);
                }
                FormatKind::DataProduct | FormatKind::BurstConfig => data_files.push(path),
                FormatKind::Unknown => {
                    warn!("Unrecognized storage file will be ignored: {}", path.display());
                    ctx.skip_file(&path);
                }
            }
        }

        let Some(main) = main else {
            warn!(
                "Folder {} will be ignored, as no main view model was found in it",
                dir.display()
            );
            ctx.skip_folder(dir);
            return Ok(());
        };

        let now = Utc::now().naive_utc();
        let operation = self.db.insert_operation(&OperationParams {
            gid: new_gid(),
            fk_launched_by: ctx.user.id,
            fk_launched_in: project.id,
            fk_from_algo: main.algorithm,
            parameters: serde_json::json!({ "gid": main.gid }).to_string(),
            meta: Some(serde_json::json!({ "from": "Import" }).to_string()),
            status: STATUS_FINISHED.to_string(),
            create_date: main.created.unwrap_or(now),
            start_date: Some(now),
            completion_date: Some(now),
            ..Default::default()
        })?;
        ctx.summary.operations += 1;
        let operation_dir = self.operation_dir(project, &operation)?;
        info!(
            "Synthesized operation {} for view model {} from {}",
            operation.id,
            main.gid,
            dir.display()
        );

        for path in &view_models {
            move_into(path, &operation_dir)?;
        }

        let target = Target {
            project_id: project.id,
            operation_id: operation.id,
            datatype_group: None,
            operation_dir: &operation_dir,
        };
        let mut batch = Vec::new();
        for path in data_files {
            self.load(ctx, &path, &target, &mut batch)?;
        }
        store_or_link(self.db, project, batch, ctx)
    }

    /// Load one file; data types go to `batch`, bursts are stored directly.
    fn load(
        &self,
        ctx: &mut ImportContext<'_>,
        path: &Path,
        target: &Target<'_>,
        batch: &mut Vec<LoadedDataType>,
    ) -> Result<(), ImportError> {
        match load_data_file(self.upgrader, ctx, path, target)? {
            Some(Loaded::DataType(loaded)) => batch.push(loaded),
            Some(Loaded::Burst { params, path }) => {
                if let Some(existing) = self.db.query_burst_by_gid(&params.gid)? {
                    debug!("Burst {} already stored", params.gid);
                    // same operation means same canonical path, which is the stored file
                    if existing.fk_simulation != Some(target.operation_id)
                        && let Err(e) = std::fs::remove_file(&path)
                    {
                        warn!("Failed to remove duplicate {}: {e}", path.display());
                    }
                } else {
                    self.db.insert_burst(&params)?;
                    ctx.summary.bursts += 1;
                }
            }
            None => {}
        }
        Ok(())
    }
}

fn move_into(path: &Path, dir: &Path) -> Result<(), ImportError> {
    let name = path
        .file_name()
        .ok_or_else(|| ImportError::invalid_metadata(path, "not a file"))?;
    move_file(path, &dir.join(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CompensationLog;
    use crate::ordering::order_operation_folders;
    use neurostore_format::{BURST_WRITER, ContainerUpgrader};
    use neurostore_utils_test::{
        CanonicalTempDir, ProjectTree, at, burst, data_product, new_gid as gid, operation_metadata,
        view_model,
    };

    struct Fixture {
        _tmp: CanonicalTempDir,
        db: StoreDb,
        layout: StorageLayout,
        registry: AlgorithmRegistry,
        project: Project,
        tree: ProjectTree,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = CanonicalTempDir::new().unwrap();
            let db = StoreDb::open_memory().unwrap();
            let user = db.get_or_create_user("alice").unwrap();
            let registry = AlgorithmRegistry::load(
                &db,
                &[crate::config::ViewModelMapping::new(
                    "SimModel",
                    "adapters.sim",
                    "Simulator",
                )],
            )
            .unwrap();
            db.register_algorithm("adapters.legacy", "Legacy").unwrap();
            let project = db
                .insert_project(&neurostore_db::ProjectParams {
                    gid: gid(),
                    name: "P".into(),
                    description: None,
                    fk_admin: user.id,
                    last_updated: at(0),
                    version: 3,
                })
                .unwrap();
            let tree = ProjectTree::new(tmp.path().join("staged"), "P").unwrap();
            let layout = StorageLayout::new(tmp.path().join("storage"));
            Self {
                _tmp: tmp,
                db,
                layout,
                registry,
                project,
                tree,
            }
        }

        fn run(&self) -> crate::context::ImportSummary {
            let user = self.db.get_or_create_user("alice").unwrap();
            let mut log = CompensationLog::default();
            let mut ctx = ImportContext::new(user, &mut log);
            let importer = OperationImporter {
                db: &self.db,
                layout: &self.layout,
                upgrader: &ContainerUpgrader,
                registry: &self.registry,
                group_state: "INTERMEDIATE",
            };
            for folder in order_operation_folders(self.tree.root()).unwrap() {
                importer
                    .import_folder(&mut ctx, &self.project, &folder)
                    .unwrap();
            }
            ctx.summary
        }
    }

    #[test]
    fn test_modern_folder() {
        let fx = Fixture::new();
        let (vm, dt, b) = (gid(), gid(), gid());
        fx.tree
            .container("op", "vm.nsf", &view_model("SimModel", &vm, at(10)))
            .unwrap();
        fx.tree
            .container("op", "dt.nsf", &data_product("Connectivity", &dt, at(11)))
            .unwrap();
        fx.tree.container("op", "burst.nsf", &burst(&b, "run")).unwrap();

        let summary = fx.run();
        assert_eq!(summary.operations, 1);
        assert_eq!(summary.datatypes_stored, 1);
        assert_eq!(summary.bursts, 1);

        let ops = fx.db.query_project_operations(fx.project.id).unwrap();
        let op = &ops[0];
        assert_eq!(op.parameters, format!("{{\"gid\":\"{vm}\"}}"));
        assert_eq!(op.meta.as_deref(), Some("{\"from\":\"Import\"}"));
        assert_eq!(op.status, STATUS_FINISHED);
        assert_eq!(op.create_date, at(10));
        assert_eq!(op.start_date, op.completion_date);
        let algo = fx.db.query_algorithm("adapters.sim", "Simulator").unwrap().unwrap();
        assert_eq!(op.fk_from_algo, algo.id);

        let op_dir = fx.layout.operation_dir("P", op.id);
        assert!(op_dir.join("vm.nsf").is_file());
        assert!(op_dir.join(format!("Connectivity_{dt}.nsf")).is_file());
        let stored = fx.db.query_datatype_by_gid(&dt).unwrap().unwrap();
        assert_eq!(stored.fk_from_operation, op.id);
        let burst = fx.db.query_burst_by_gid(&b).unwrap().unwrap();
        assert_eq!(burst.fk_simulation, Some(op.id));
    }

    #[test]
    fn test_repeated_burst_keeps_stored_file() {
        let fx = Fixture::new();
        let b = gid();
        fx.tree
            .container("op", "vm.nsf", &view_model("SimModel", &gid(), at(10)))
            .unwrap();
        fx.tree.container("op", "b1.nsf", &burst(&b, "run")).unwrap();
        fx.tree.container("op", "b2.nsf", &burst(&b, "run")).unwrap();

        let summary = fx.run();
        assert_eq!(summary.bursts, 1);
        let ops = fx.db.query_project_operations(fx.project.id).unwrap();
        let op_dir = fx.layout.operation_dir("P", ops[0].id);
        let stored = fx.db.query_burst_by_gid(&b).unwrap().unwrap();
        assert_eq!(stored.fk_simulation, Some(ops[0].id));
        assert!(StorageLayout::storage_path(&op_dir, BURST_WRITER, &b).is_file());
    }

    #[test_log::test]
    fn test_folder_without_main_view_model_skipped() {
        let fx = Fixture::new();
        fx.tree
            .container("op", "vm.nsf", &view_model("UnmappedModel", &gid(), at(10)))
            .unwrap();
        fx.tree
            .container("op", "dt.nsf", &data_product("Connectivity", &gid(), at(11)))
            .unwrap();

        let summary = fx.run();
        assert_eq!(summary.operations, 0);
        assert_eq!(summary.skipped_folders, vec![fx.tree.root().join("op")]);
        assert_eq!(fx.db.count_datatypes().unwrap(), 0);
    }

    #[test]
    fn test_only_first_mapped_view_model_is_main() {
        let fx = Fixture::new();
        let (first, second) = (gid(), gid());
        fx.tree
            .container("op", "a_other.nsf", &view_model("UnmappedModel", &gid(), at(5)))
            .unwrap();
        fx.tree
            .container("op", "b_vm.nsf", &view_model("SimModel", &first, at(6)))
            .unwrap();
        fx.tree
            .container("op", "c_vm.nsf", &view_model("SimModel", &second, at(7)))
            .unwrap();

        fx.run();
        let ops = fx.db.query_project_operations(fx.project.id).unwrap();
        assert_eq!(ops.len(), 1);
        assert!(ops[0].parameters.contains(&first));
        let op_dir = fx.layout.operation_dir("P", ops[0].id);
        for name in ["a_other.nsf", "b_vm.nsf", "c_vm.nsf"] {
            assert!(op_dir.join(name).is_file(), "{name} not moved");
        }
    }

    #[test]
    fn test_legacy_folder_with_group() {
        let fx = Fixture::new();
        let (group_gid, dt1, dt2) = (gid(), gid(), gid());
        for (folder, dt, secs) in [("op1", &dt1, 1), ("op2", &dt2, 2)] {
            let mut op = operation_metadata(&gid(), "adapters.legacy", "Legacy", at(secs));
            op.insert("operation_group_gid".into(), group_gid.clone());
            op.insert("operation_group_name".into(), "sweep".into());
            op.insert("range_values".into(), format!("{{\"a\": {secs}}}"));
            fx.tree.operation(folder, &op).unwrap();
            fx.tree
                .container(folder, "dt.nsf", &data_product("TimeSeries", dt, at(secs)))
                .unwrap();
        }

        let summary = fx.run();
        assert_eq!(summary.operations, 2);
        assert_eq!(summary.datatypes_stored, 2);

        let group = fx.db.query_operation_group_by_gid(&group_gid).unwrap().unwrap();
        assert_eq!(group.name, "sweep");
        let dt_group = fx
            .db
            .query_datatype_group_by_operation_group(group.id)
            .unwrap()
            .unwrap();
        assert_eq!(dt_group.state, "INTERMEDIATE");
        let ops = fx.db.query_project_operations(fx.project.id).unwrap();
        assert_eq!(dt_group.fk_from_operation, ops[0].id);
        for dt in [&dt1, &dt2] {
            let stored = fx.db.query_datatype_by_gid(dt).unwrap().unwrap();
            assert_eq!(stored.fk_datatype_group, Some(dt_group.id));
        }
        assert!(ops.iter().all(|op| op.fk_operation_group == Some(group.id)));
    }

    #[test]
    fn test_legacy_unknown_algorithm_is_fatal() {
        let fx = Fixture::new();
        fx.tree
            .operation("op", &operation_metadata(&gid(), "nowhere", "Nothing", at(1)))
            .unwrap();

        let user = fx.db.get_or_create_user("alice").unwrap();
        let mut log = CompensationLog::default();
        let mut ctx = ImportContext::new(user, &mut log);
        let importer = OperationImporter {
            db: &fx.db,
            layout: &fx.layout,
            upgrader: &ContainerUpgrader,
            registry: &fx.registry,
            group_state: "INTERMEDIATE",
        };
        let folders = order_operation_folders(fx.tree.root()).unwrap();
        let err = importer
            .import_folder(&mut ctx, &fx.project, &folders[0])
            .unwrap_err();
        assert!(matches!(err, ImportError::UnknownAlgorithm { .. }));
    }
}
