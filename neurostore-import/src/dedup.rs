// SPDX-FileCopyrightText: 2026 The Neurostore Authors
// SPDX-License-Identifier: MIT

//! Store new data types, link known ones.

use chrono::Utc;
use neurostore_db::{Project, StoreDb};
use tracing::{debug, warn};

use crate::context::ImportContext;
use crate::error::ImportError;
use crate::loader::LoadedDataType;

/// Store every data type of `batch` whose gid is unknown and link the rest
/// into `project`, oldest first.
///
/// A data type already stored by another operation keeps its original file;
/// the freshly relocated copy is deleted.
pub(crate) fn store_or_link(
    db: &StoreDb,
    project: &Project,
    mut batch: Vec<LoadedDataType>,
    ctx: &mut ImportContext<'_>,
) -> Result<(), ImportError> {
    let now = Utc::now().naive_utc();
    batch.sort_by_key(|dt| dt.params.create_date.unwrap_or(now));

    for loaded in batch {
        let Some(existing) = db.query_datatype_by_gid(&loaded.params.gid)? else {
            let stored = db.insert_datatype(&loaded.params)?;
            debug!("Stored {} {} as {}", stored.type_name, stored.gid, stored.id);
            ctx.summary.datatypes_stored += 1;
            continue;
        };

        if db.query_datatype_project(existing.id)? == Some(project.id) {
            debug!("{} is already part of project {}", existing.gid, project.name);
        } else if db.insert_link(existing.id, project.id)? {
            debug!("Linked {} into project {}", existing.gid, project.name);
            ctx.summary.links_created += 1;
        }

        // same operation means same canonical path, which is the stored file
        if existing.fk_from_operation != loaded.params.fk_from_operation
            && let Err(e) = std::fs::remove_file(&loaded.path)
        {
            warn!("Failed to remove duplicate {}: {e}", loaded.path.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CompensationLog;
    use neurostore_db::{DataTypeParams, OperationParams, ProjectParams};
    use neurostore_utils_test::{CanonicalTempDir, at, new_gid};
    use std::path::Path;

    fn project(db: &StoreDb, name: &str, admin: i64) -> Project {
        db.insert_project(&ProjectParams {
            gid: new_gid(),
            name: name.to_string(),
            description: None,
            fk_admin: admin,
            last_updated: at(0),
            version: 3,
        })
        .unwrap()
    }

    fn operation(db: &StoreDb, project: &Project) -> i64 {
        let algo = db.register_algorithm("m", "C").unwrap();
        db.insert_operation(&OperationParams {
            gid: new_gid(),
            fk_launched_by: project.fk_admin,
            fk_launched_in: project.id,
            fk_from_algo: algo,
            ..Default::default()
        })
        .unwrap()
        .id
    }

    fn loaded(dir: &Path, gid: &str, operation: i64, created: Option<i64>) -> LoadedDataType {
        let path = dir.join(format!("{gid}-{operation}.nsf"));
        std::fs::write(&path, b"x").unwrap();
        LoadedDataType {
            params: DataTypeParams {
                gid: gid.to_string(),
                type_name: "Connectivity".into(),
                fk_from_operation: operation,
                create_date: created.map(at),
                ..Default::default()
            },
            path,
        }
    }

    #[test]
    fn test_stored_in_creation_order() {
        let tmp = CanonicalTempDir::new().unwrap();
        let db = StoreDb::open_memory().unwrap();
        let user = db.get_or_create_user("alice").unwrap();
        let p = project(&db, "P", user.id);
        let op = operation(&db, &p);
        let mut log = CompensationLog::default();
        let mut ctx = ImportContext::new(user, &mut log);

        let (late, early, undated) = (new_gid(), new_gid(), new_gid());
        let batch = vec![
            loaded(tmp.path(), &undated, op, None),
            loaded(tmp.path(), &late, op, Some(200)),
            loaded(tmp.path(), &early, op, Some(100)),
        ];
        store_or_link(&db, &p, batch, &mut ctx).unwrap();

        let ids: Vec<_> = [&early, &late, &undated]
            .iter()
            .map(|gid| db.query_datatype_by_gid(gid).unwrap().unwrap().id)
            .collect();
        assert!(ids[0] < ids[1] && ids[1] < ids[2]);
        assert_eq!(ctx.summary.datatypes_stored, 3);
    }

    #[test]
    fn test_known_gid_linked_not_duplicated() {
        let tmp = CanonicalTempDir::new().unwrap();
        let db = StoreDb::open_memory().unwrap();
        let user = db.get_or_create_user("alice").unwrap();
        let a = project(&db, "A", user.id);
        let b = project(&db, "B", user.id);
        let op_a = operation(&db, &a);
        let op_b = operation(&db, &b);
        let mut log = CompensationLog::default();
        let mut ctx = ImportContext::new(user, &mut log);

        let gid = new_gid();
        store_or_link(&db, &a, vec![loaded(tmp.path(), &gid, op_a, Some(1))], &mut ctx).unwrap();
        let copy = loaded(tmp.path(), &gid, op_b, Some(1));
        let copy_path = copy.path.clone();
        store_or_link(&db, &b, vec![copy], &mut ctx).unwrap();
        // a second encounter of the same link is a no-op
        let again = loaded(tmp.path(), &gid, op_b, Some(1));
        store_or_link(&db, &b, vec![again], &mut ctx).unwrap();

        assert_eq!(db.count_datatypes().unwrap(), 1);
        assert_eq!(db.count_links().unwrap(), 1);
        assert_eq!(ctx.summary.links_created, 1);
        assert!(!copy_path.exists());
        let links = db.query_project_links(b.id).unwrap();
        assert_eq!(links[0].fk_to_project, b.id);
    }

    #[test]
    fn test_same_project_not_linked() {
        let tmp = CanonicalTempDir::new().unwrap();
        let db = StoreDb::open_memory().unwrap();
        let user = db.get_or_create_user("alice").unwrap();
        let p = project(&db, "P", user.id);
        let op1 = operation(&db, &p);
        let op2 = operation(&db, &p);
        let mut log = CompensationLog::default();
        let mut ctx = ImportContext::new(user, &mut log);

        let gid = new_gid();
        let first = loaded(tmp.path(), &gid, op1, None);
        let second = loaded(tmp.path(), &gid, op2, None);
        let first_path = first.path.clone();
        store_or_link(&db, &p, vec![first, second], &mut ctx).unwrap();

        assert_eq!(db.count_datatypes().unwrap(), 1);
        assert_eq!(db.count_links().unwrap(), 0);
        assert!(first_path.exists());
    }
}
