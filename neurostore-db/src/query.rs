// SPDX-FileCopyrightText: 2026 The Neurostore Authors
// SPDX-License-Identifier: MIT

//! Read query operations for the store database.

use rusqlite::{OptionalExtension, Row, params};

use crate::connection::StoreDb;
use crate::error::Result;
use crate::types::{
    Algorithm, BurstConfiguration, DataTypeGroup, DataTypeIndex, Link, Operation,
    OperationGroup, Project, ResultFigure, micros_to_datetime,
};

const PROJECT_COLUMNS: &str = "id, gid, name, description, fkAdmin, lastUpdated, version";

const OPERATION_COLUMNS: &str = "id, gid, fkLaunchedBy, fkLaunchedIn, fkFromAlgo, \
     fkOperationGroup, parameters, meta, status, userGroup, rangeValues, visible, createDate, \
     startDate, completionDate";

const DATATYPE_COLUMNS: &str = "id, gid, type, subject, title, state, visible, \
     fkFromOperation, fkDataTypeGroup, fkParentBurst, diskSize, createDate, dataVersion, \
     userTag1, userTag2, userTag3, userTag4, userTag5";

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        gid: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        fk_admin: row.get(4)?,
        last_updated: micros_to_datetime(row.get(5)?),
        version: row.get(6)?,
    })
}

fn operation_from_row(row: &Row<'_>) -> rusqlite::Result<Operation> {
    Ok(Operation {
        id: row.get(0)?,
        gid: row.get(1)?,
        fk_launched_by: row.get(2)?,
        fk_launched_in: row.get(3)?,
        fk_from_algo: row.get(4)?,
        fk_operation_group: row.get(5)?,
        parameters: row.get(6)?,
        meta: row.get(7)?,
        status: row.get(8)?,
        user_group: row.get(9)?,
        range_values: row.get(10)?,
        visible: row.get(11)?,
        create_date: micros_to_datetime(row.get(12)?),
        start_date: row.get::<_, Option<i64>>(13)?.map(micros_to_datetime),
        completion_date: row.get::<_, Option<i64>>(14)?.map(micros_to_datetime),
    })
}

fn datatype_from_row(row: &Row<'_>) -> rusqlite::Result<DataTypeIndex> {
    Ok(DataTypeIndex {
        id: row.get(0)?,
        gid: row.get(1)?,
        type_name: row.get(2)?,
        subject: row.get(3)?,
        title: row.get(4)?,
        state: row.get(5)?,
        visible: row.get(6)?,
        fk_from_operation: row.get(7)?,
        fk_datatype_group: row.get(8)?,
        fk_parent_burst: row.get(9)?,
        disk_size: row.get::<_, Option<i64>>(10)?.map(|n| n as u64),
        create_date: row.get::<_, Option<i64>>(11)?.map(micros_to_datetime),
        data_version: row.get(12)?,
        user_tags: [
            row.get(13)?,
            row.get(14)?,
            row.get(15)?,
            row.get(16)?,
            row.get(17)?,
        ],
    })
}

impl StoreDb {
    /// Query an algorithm by module and class name.
    pub fn query_algorithm(&self, module: &str, classname: &str) -> Result<Option<Algorithm>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT id, module, classname FROM Algorithms WHERE module = ?1 AND classname = ?2",
        )?;
        let algorithm = stmt
            .query_row(params![module, classname], |row| {
                Ok(Algorithm {
                    id: row.get(0)?,
                    module: row.get(1)?,
                    classname: row.get(2)?,
                })
            })
            .optional()?;
        Ok(algorithm)
    }

    /// Query a project by database ID.
    pub fn query_project(&self, id: i64) -> Result<Option<Project>> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("SELECT {PROJECT_COLUMNS} FROM Projects WHERE id = ?1"))?;
        Ok(stmt.query_row(params![id], project_from_row).optional()?)
    }

    /// Query a project by global id.
    pub fn query_project_by_gid(&self, gid: &str) -> Result<Option<Project>> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("SELECT {PROJECT_COLUMNS} FROM Projects WHERE gid = ?1"))?;
        Ok(stmt.query_row(params![gid], project_from_row).optional()?)
    }

    /// Query a project by its unique name.
    pub fn query_project_by_name(&self, name: &str) -> Result<Option<Project>> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("SELECT {PROJECT_COLUMNS} FROM Projects WHERE name = ?1"))?;
        Ok(stmt.query_row(params![name], project_from_row).optional()?)
    }

    /// Count the number of projects.
    pub fn count_projects(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM Projects", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Query an operation group by global id.
    pub fn query_operation_group_by_gid(&self, gid: &str) -> Result<Option<OperationGroup>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT id, gid, name, range1, range2, range3 FROM OperationGroups WHERE gid = ?1",
        )?;
        let group = stmt
            .query_row(params![gid], |row| {
                Ok(OperationGroup {
                    id: row.get(0)?,
                    gid: row.get(1)?,
                    name: row.get(2)?,
                    range1: row.get(3)?,
                    range2: row.get(4)?,
                    range3: row.get(5)?,
                })
            })
            .optional()?;
        Ok(group)
    }

    /// Query an operation by database ID.
    pub fn query_operation(&self, id: i64) -> Result<Option<Operation>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {OPERATION_COLUMNS} FROM Operations WHERE id = ?1"
        ))?;
        Ok(stmt.query_row(params![id], operation_from_row).optional()?)
    }

    /// Query an operation by global id.
    pub fn query_operation_by_gid(&self, gid: &str) -> Result<Option<Operation>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {OPERATION_COLUMNS} FROM Operations WHERE gid = ?1"
        ))?;
        Ok(stmt.query_row(params![gid], operation_from_row).optional()?)
    }

    /// All operations of a project, in insertion order.
    pub fn query_project_operations(&self, project_id: i64) -> Result<Vec<Operation>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {OPERATION_COLUMNS} FROM Operations WHERE fkLaunchedIn = ?1 ORDER BY id"
        ))?;
        let operations = stmt
            .query_map(params![project_id], operation_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(operations)
    }

    /// Count the number of operations.
    pub fn count_operations(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM Operations", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Query the data type group belonging to an operation group.
    pub fn query_datatype_group_by_operation_group(
        &self,
        operation_group_id: i64,
    ) -> Result<Option<DataTypeGroup>> {
        let mut stmt = self.conn.prepare_cached(
            r#"
            SELECT id, gid, fkOperationGroup, fkFromOperation, state, createDate
            FROM DataTypeGroups
            WHERE fkOperationGroup = ?1
            "#,
        )?;
        let group = stmt
            .query_row(params![operation_group_id], |row| {
                Ok(DataTypeGroup {
                    id: row.get(0)?,
                    gid: row.get(1)?,
                    fk_operation_group: row.get(2)?,
                    fk_from_operation: row.get(3)?,
                    state: row.get(4)?,
                    create_date: micros_to_datetime(row.get(5)?),
                })
            })
            .optional()?;
        Ok(group)
    }

    /// Query a data type by global id.
    ///
    /// Returns `None` if no data type with that gid is stored.
    pub fn query_datatype_by_gid(&self, gid: &str) -> Result<Option<DataTypeIndex>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {DATATYPE_COLUMNS} FROM DataTypes WHERE gid = ?1"
        ))?;
        Ok(stmt.query_row(params![gid], datatype_from_row).optional()?)
    }

    /// Data types produced by the operations of a project, in insertion order.
    pub fn query_project_datatypes(&self, project_id: i64) -> Result<Vec<DataTypeIndex>> {
        let mut stmt = self.conn.prepare_cached(
            r#"
            SELECT d.id, d.gid, d.type, d.subject, d.title, d.state, d.visible,
                   d.fkFromOperation, d.fkDataTypeGroup, d.fkParentBurst, d.diskSize,
                   d.createDate, d.dataVersion, d.userTag1, d.userTag2, d.userTag3,
                   d.userTag4, d.userTag5
            FROM DataTypes d
            JOIN Operations o ON d.fkFromOperation = o.id
            WHERE o.fkLaunchedIn = ?1
            ORDER BY d.id
            "#,
        )?;
        let datatypes = stmt
            .query_map(params![project_id], datatype_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(datatypes)
    }

    /// Project that owns the operation which produced a data type.
    pub fn query_datatype_project(&self, datatype_id: i64) -> Result<Option<i64>> {
        let mut stmt = self.conn.prepare_cached(
            r#"
            SELECT o.fkLaunchedIn
            FROM DataTypes d
            JOIN Operations o ON d.fkFromOperation = o.id
            WHERE d.id = ?1
            "#,
        )?;
        Ok(stmt
            .query_row(params![datatype_id], |row| row.get(0))
            .optional()?)
    }

    /// Count the number of stored data types.
    pub fn count_datatypes(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM DataTypes", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Links pointing into a project.
    pub fn query_project_links(&self, project_id: i64) -> Result<Vec<Link>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT id, fkFromDataType, fkToProject FROM Links WHERE fkToProject = ?1 ORDER BY id",
        )?;
        let links = stmt
            .query_map(params![project_id], |row| {
                Ok(Link {
                    id: row.get(0)?,
                    fk_from_datatype: row.get(1)?,
                    fk_to_project: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(links)
    }

    /// Count the number of links.
    pub fn count_links(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM Links", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Query a burst configuration by global id.
    pub fn query_burst_by_gid(&self, gid: &str) -> Result<Option<BurstConfiguration>> {
        let mut stmt = self.conn.prepare_cached(
            r#"
            SELECT id, gid, name, fkProject, fkSimulation, status, simulatorGid, range1, range2,
                   startTime, finishTime
            FROM BurstConfigurations
            WHERE gid = ?1
            "#,
        )?;
        let burst = stmt
            .query_row(params![gid], |row| {
                Ok(BurstConfiguration {
                    id: row.get(0)?,
                    gid: row.get(1)?,
                    name: row.get(2)?,
                    fk_project: row.get(3)?,
                    fk_simulation: row.get(4)?,
                    status: row.get(5)?,
                    simulator_gid: row.get(6)?,
                    range1: row.get(7)?,
                    range2: row.get(8)?,
                    start_time: row.get::<_, Option<i64>>(9)?.map(micros_to_datetime),
                    finish_time: row.get::<_, Option<i64>>(10)?.map(micros_to_datetime),
                })
            })
            .optional()?;
        Ok(burst)
    }

    /// Figures stored in a project.
    pub fn query_project_figures(&self, project_id: i64) -> Result<Vec<ResultFigure>> {
        let mut stmt = self.conn.prepare_cached(
            r#"
            SELECT id, fkForUser, fkInProject, fkFromOperation, name, sessionName, fileFormat,
                   filePath, createDate
            FROM ResultFigures
            WHERE fkInProject = ?1
            ORDER BY id
            "#,
        )?;
        let figures = stmt
            .query_map(params![project_id], |row| {
                Ok(ResultFigure {
                    id: row.get(0)?,
                    fk_for_user: row.get(1)?,
                    fk_in_project: row.get(2)?,
                    fk_from_operation: row.get(3)?,
                    name: row.get(4)?,
                    session_name: row.get(5)?,
                    file_format: row.get(6)?,
                    file_path: row.get(7)?,
                    create_date: micros_to_datetime(row.get(8)?),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(figures)
    }
}
