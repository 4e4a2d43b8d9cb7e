// SPDX-FileCopyrightText: 2026 The Neurostore Authors
// SPDX-License-Identifier: MIT

//! Write operations for the store database.
//!
//! None of these open their own transaction; callers that need atomicity
//! wrap them in [`StoreDb::transaction`].

use chrono::{NaiveDateTime, Utc};
use rusqlite::params;
use tracing::debug;

use crate::connection::StoreDb;
use crate::error::{Result, unique_violation};
use crate::types::{
    BurstConfiguration, DataTypeGroup, DataTypeIndex, Operation, OperationGroup, Project,
    ResultFigure, STATUS_FINISHED, User, datetime_to_micros,
};

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Parameters for storing a new project.
#[derive(Debug, Clone)]
pub struct ProjectParams {
    pub gid: String,
    pub name: String,
    pub description: Option<String>,
    pub fk_admin: i64,
    pub last_updated: NaiveDateTime,
    pub version: i32,
}

/// Parameters for storing a new operation group.
#[derive(Debug, Clone, Default)]
pub struct OperationGroupParams {
    pub gid: String,
    pub name: String,
    pub range1: Option<String>,
    pub range2: Option<String>,
    pub range3: Option<String>,
}

/// Parameters for storing a new operation.
#[derive(Debug, Clone)]
pub struct OperationParams {
    pub gid: String,
    pub fk_launched_by: i64,
    pub fk_launched_in: i64,
    pub fk_from_algo: i64,
    pub fk_operation_group: Option<i64>,
    pub parameters: String,
    pub meta: Option<String>,
    pub status: String,
    pub user_group: Option<String>,
    pub range_values: Option<String>,
    pub visible: bool,
    pub create_date: NaiveDateTime,
    pub start_date: Option<NaiveDateTime>,
    pub completion_date: Option<NaiveDateTime>,
}

impl Default for OperationParams {
    fn default() -> Self {
        Self {
            gid: String::new(),
            fk_launched_by: 0,
            fk_launched_in: 0,
            fk_from_algo: 0,
            fk_operation_group: None,
            parameters: "{}".to_string(),
            meta: None,
            status: STATUS_FINISHED.to_string(),
            user_group: None,
            range_values: None,
            visible: true,
            create_date: now(),
            start_date: None,
            completion_date: None,
        }
    }
}

/// Parameters for storing a new data type group.
#[derive(Debug, Clone)]
pub struct DataTypeGroupParams {
    pub gid: String,
    pub fk_operation_group: i64,
    pub fk_from_operation: i64,
    pub state: String,
    pub create_date: NaiveDateTime,
}

/// Parameters for storing a new data type index.
#[derive(Debug, Clone)]
pub struct DataTypeParams {
    pub gid: String,
    pub type_name: String,
    pub subject: Option<String>,
    pub title: Option<String>,
    pub state: Option<String>,
    pub visible: bool,
    pub fk_from_operation: i64,
    pub fk_datatype_group: Option<i64>,
    pub fk_parent_burst: Option<String>,
    pub disk_size: Option<u64>,
    pub create_date: Option<NaiveDateTime>,
    pub data_version: u32,
    pub user_tags: [Option<String>; 5],
}

impl Default for DataTypeParams {
    fn default() -> Self {
        Self {
            gid: String::new(),
            type_name: String::new(),
            subject: None,
            title: None,
            state: None,
            visible: true,
            fk_from_operation: 0,
            fk_datatype_group: None,
            fk_parent_burst: None,
            disk_size: None,
            create_date: None,
            data_version: 0,
            user_tags: Default::default(),
        }
    }
}

/// Parameters for storing a new burst configuration.
#[derive(Debug, Clone, Default)]
pub struct BurstParams {
    pub gid: String,
    pub name: Option<String>,
    pub fk_project: i64,
    pub fk_simulation: Option<i64>,
    pub status: String,
    pub simulator_gid: Option<String>,
    pub range1: Option<String>,
    pub range2: Option<String>,
    pub start_time: Option<NaiveDateTime>,
    pub finish_time: Option<NaiveDateTime>,
}

/// Parameters for storing a new result figure.
#[derive(Debug, Clone)]
pub struct FigureParams {
    pub fk_for_user: i64,
    pub fk_in_project: i64,
    pub fk_from_operation: Option<i64>,
    pub name: String,
    pub session_name: Option<String>,
    pub file_format: String,
    pub file_path: String,
    pub create_date: NaiveDateTime,
}

impl StoreDb {
    /// Look up a user by name, creating it on first use.
    pub fn get_or_create_user(&self, username: &str) -> Result<User> {
        self.conn.execute(
            "INSERT OR IGNORE INTO Users (username) VALUES (?1)",
            params![username],
        )?;
        let id = self.conn.query_row(
            "SELECT id FROM Users WHERE username = ?1",
            params![username],
            |row| row.get(0),
        )?;
        Ok(User {
            id,
            username: username.to_string(),
        })
    }

    /// Register an algorithm, returning the existing row id if already known.
    pub fn register_algorithm(&self, module: &str, classname: &str) -> Result<i64> {
        self.conn.execute(
            "INSERT OR IGNORE INTO Algorithms (module, classname) VALUES (?1, ?2)",
            params![module, classname],
        )?;
        let id = self.conn.query_row(
            "SELECT id FROM Algorithms WHERE module = ?1 AND classname = ?2",
            params![module, classname],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Store a new project.
    ///
    /// Fails with [`Error::Duplicate`](crate::Error::Duplicate) when the gid
    /// or the name is already taken.
    pub fn insert_project(&self, params: &ProjectParams) -> Result<Project> {
        self.conn
            .execute(
                r#"
                INSERT INTO Projects (gid, name, description, fkAdmin, lastUpdated, version)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    params.gid,
                    params.name,
                    params.description,
                    params.fk_admin,
                    datetime_to_micros(params.last_updated),
                    params.version,
                ],
            )
            .map_err(unique_violation("project", params.name.as_str()))?;

        let id = self.conn.last_insert_rowid();
        debug!("Stored project {} ({}) as {id}", params.name, params.gid);
        Ok(Project {
            id,
            gid: params.gid.clone(),
            name: params.name.clone(),
            description: params.description.clone(),
            fk_admin: params.fk_admin,
            last_updated: params.last_updated,
            version: params.version,
        })
    }

    /// Store a new operation group.
    pub fn insert_operation_group(&self, params: &OperationGroupParams) -> Result<OperationGroup> {
        self.conn
            .execute(
                r#"
                INSERT INTO OperationGroups (gid, name, range1, range2, range3)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    params.gid,
                    params.name,
                    params.range1,
                    params.range2,
                    params.range3
                ],
            )
            .map_err(unique_violation("operation group", params.gid.as_str()))?;

        Ok(OperationGroup {
            id: self.conn.last_insert_rowid(),
            gid: params.gid.clone(),
            name: params.name.clone(),
            range1: params.range1.clone(),
            range2: params.range2.clone(),
            range3: params.range3.clone(),
        })
    }

    /// Store a new operation.
    pub fn insert_operation(&self, params: &OperationParams) -> Result<Operation> {
        self.conn
            .execute(
                r#"
                INSERT INTO Operations (gid, fkLaunchedBy, fkLaunchedIn, fkFromAlgo, fkOperationGroup,
                                        parameters, meta, status, userGroup, rangeValues, visible,
                                        createDate, startDate, completionDate)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                "#,
                params![
                    params.gid,
                    params.fk_launched_by,
                    params.fk_launched_in,
                    params.fk_from_algo,
                    params.fk_operation_group,
                    params.parameters,
                    params.meta,
                    params.status,
                    params.user_group,
                    params.range_values,
                    params.visible,
                    datetime_to_micros(params.create_date),
                    params.start_date.map(datetime_to_micros),
                    params.completion_date.map(datetime_to_micros),
                ],
            )
            .map_err(unique_violation("operation", params.gid.as_str()))?;

        let id = self.conn.last_insert_rowid();
        debug!("Stored operation {} as {id}", params.gid);
        Ok(Operation {
            id,
            gid: params.gid.clone(),
            fk_launched_by: params.fk_launched_by,
            fk_launched_in: params.fk_launched_in,
            fk_from_algo: params.fk_from_algo,
            fk_operation_group: params.fk_operation_group,
            parameters: params.parameters.clone(),
            meta: params.meta.clone(),
            status: params.status.clone(),
            user_group: params.user_group.clone(),
            range_values: params.range_values.clone(),
            visible: params.visible,
            create_date: params.create_date,
            start_date: params.start_date,
            completion_date: params.completion_date,
        })
    }

    /// Store a new data type group.
    pub fn insert_datatype_group(&self, params: &DataTypeGroupParams) -> Result<DataTypeGroup> {
        self.conn
            .execute(
                r#"
                INSERT INTO DataTypeGroups (gid, fkOperationGroup, fkFromOperation, state, createDate)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    params.gid,
                    params.fk_operation_group,
                    params.fk_from_operation,
                    params.state,
                    datetime_to_micros(params.create_date),
                ],
            )
            .map_err(unique_violation("datatype group", params.gid.as_str()))?;

        Ok(DataTypeGroup {
            id: self.conn.last_insert_rowid(),
            gid: params.gid.clone(),
            fk_operation_group: params.fk_operation_group,
            fk_from_operation: params.fk_from_operation,
            state: params.state.clone(),
            create_date: params.create_date,
        })
    }

    /// Store a new data type index.
    ///
    /// Fails with [`Error::Duplicate`](crate::Error::Duplicate) when the gid
    /// is already stored.
    pub fn insert_datatype(&self, params: &DataTypeParams) -> Result<DataTypeIndex> {
        let [tag1, tag2, tag3, tag4, tag5] = &params.user_tags;
        self.conn
            .execute(
                r#"
                INSERT INTO DataTypes (gid, type, subject, title, state, visible, fkFromOperation,
                                       fkDataTypeGroup, fkParentBurst, diskSize, createDate,
                                       dataVersion, userTag1, userTag2, userTag3, userTag4, userTag5)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
                "#,
                params![
                    params.gid,
                    params.type_name,
                    params.subject,
                    params.title,
                    params.state,
                    params.visible,
                    params.fk_from_operation,
                    params.fk_datatype_group,
                    params.fk_parent_burst,
                    params.disk_size.map(|n| n as i64),
                    params.create_date.map(datetime_to_micros),
                    params.data_version,
                    tag1,
                    tag2,
                    tag3,
                    tag4,
                    tag5,
                ],
            )
            .map_err(unique_violation("datatype", params.gid.as_str()))?;

        let id = self.conn.last_insert_rowid();
        debug!(
            "Stored datatype {} with gid {} as {id}",
            params.type_name, params.gid
        );
        Ok(DataTypeIndex {
            id,
            gid: params.gid.clone(),
            type_name: params.type_name.clone(),
            subject: params.subject.clone(),
            title: params.title.clone(),
            state: params.state.clone(),
            visible: params.visible,
            fk_from_operation: params.fk_from_operation,
            fk_datatype_group: params.fk_datatype_group,
            fk_parent_burst: params.fk_parent_burst.clone(),
            disk_size: params.disk_size,
            create_date: params.create_date,
            data_version: params.data_version,
            user_tags: params.user_tags.clone(),
        })
    }

    /// Make a stored data type visible in a project.
    ///
    /// Returns `false` if the link already existed.
    pub fn insert_link(&self, datatype_id: i64, project_id: i64) -> Result<bool> {
        let rows = self.conn.execute(
            "INSERT OR IGNORE INTO Links (fkFromDataType, fkToProject) VALUES (?1, ?2)",
            params![datatype_id, project_id],
        )?;
        Ok(rows > 0)
    }

    /// Store a new burst configuration.
    pub fn insert_burst(&self, params: &BurstParams) -> Result<BurstConfiguration> {
        self.conn
            .execute(
                r#"
                INSERT INTO BurstConfigurations (gid, name, fkProject, fkSimulation, status,
                                                 simulatorGid, range1, range2, startTime, finishTime)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
                params![
                    params.gid,
                    params.name,
                    params.fk_project,
                    params.fk_simulation,
                    params.status,
                    params.simulator_gid,
                    params.range1,
                    params.range2,
                    params.start_time.map(datetime_to_micros),
                    params.finish_time.map(datetime_to_micros),
                ],
            )
            .map_err(unique_violation("burst configuration", params.gid.as_str()))?;

        Ok(BurstConfiguration {
            id: self.conn.last_insert_rowid(),
            gid: params.gid.clone(),
            name: params.name.clone(),
            fk_project: params.fk_project,
            fk_simulation: params.fk_simulation,
            status: params.status.clone(),
            simulator_gid: params.simulator_gid.clone(),
            range1: params.range1.clone(),
            range2: params.range2.clone(),
            start_time: params.start_time,
            finish_time: params.finish_time,
        })
    }

    /// Store a new result figure.
    pub fn insert_figure(&self, params: &FigureParams) -> Result<ResultFigure> {
        self.conn.execute(
            r#"
            INSERT INTO ResultFigures (fkForUser, fkInProject, fkFromOperation, name, sessionName,
                                       fileFormat, filePath, createDate)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                params.fk_for_user,
                params.fk_in_project,
                params.fk_from_operation,
                params.name,
                params.session_name,
                params.file_format,
                params.file_path,
                datetime_to_micros(params.create_date),
            ],
        )?;

        Ok(ResultFigure {
            id: self.conn.last_insert_rowid(),
            fk_for_user: params.fk_for_user,
            fk_in_project: params.fk_in_project,
            fk_from_operation: params.fk_from_operation,
            name: params.name.clone(),
            session_name: params.session_name.clone(),
            file_format: params.file_format.clone(),
            file_path: params.file_path.clone(),
            create_date: params.create_date,
        })
    }
}
