// SPDX-FileCopyrightText: 2026 The Neurostore Authors
// SPDX-License-Identifier: MIT

//! Database row types for the project store.

use chrono::{DateTime, NaiveDateTime};

/// Operation finished successfully.
pub const STATUS_FINISHED: &str = "5-FINISHED";
/// Operation waiting to be launched.
pub const STATUS_PENDING: &str = "4-PENDING";
/// Operation currently running.
pub const STATUS_STARTED: &str = "3-STARTED";
/// Operation canceled by the user.
pub const STATUS_CANCELED: &str = "2-CANCELED";
/// Operation failed.
pub const STATUS_ERROR: &str = "1-ERROR";

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
}

/// An algorithm that operations can be launched with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Algorithm {
    pub id: i64,
    /// Module the algorithm lives in
    pub module: String,
    /// Class name inside the module
    pub classname: String,
}

/// A project: the top-level unit grouping operations and data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    /// Database row ID
    pub id: i64,
    /// Global id
    pub gid: String,
    /// Unique project name, also the name of its storage directory
    pub name: String,
    pub description: Option<String>,
    /// Owner (admin) user
    pub fk_admin: i64,
    pub last_updated: NaiveDateTime,
    /// Project structure version
    pub version: i32,
}

/// A batch of sibling operations produced by one parameterized run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationGroup {
    pub id: i64,
    pub gid: String,
    pub name: String,
    pub range1: Option<String>,
    pub range2: Option<String>,
    pub range3: Option<String>,
}

/// One executed unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub id: i64,
    pub gid: String,
    /// User who launched the operation
    pub fk_launched_by: i64,
    /// Project the operation belongs to
    pub fk_launched_in: i64,
    /// Algorithm the operation ran
    pub fk_from_algo: i64,
    pub fk_operation_group: Option<i64>,
    /// Serialized launch parameters
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

/// Grouping of the data types produced by an [`OperationGroup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataTypeGroup {
    pub id: i64,
    pub gid: String,
    pub fk_operation_group: i64,
    /// Operation whose import created this group
    pub fk_from_operation: i64,
    pub state: String,
    pub create_date: NaiveDateTime,
}

/// Index row for one stored scientific data product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataTypeIndex {
    pub id: i64,
    /// Global id, the deduplication key
    pub gid: String,
    /// Class/kind of the data product
    pub type_name: String,
    pub subject: Option<String>,
    pub title: Option<String>,
    pub state: Option<String>,
    pub visible: bool,
    pub fk_from_operation: i64,
    pub fk_datatype_group: Option<i64>,
    /// Global id of the burst the data type was produced by
    pub fk_parent_burst: Option<String>,
    /// Size of the storage file in bytes
    pub disk_size: Option<u64>,
    pub create_date: Option<NaiveDateTime>,
    pub data_version: u32,
    pub user_tags: [Option<String>; 5],
}

/// A link making a data type visible in another project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub id: i64,
    pub fk_from_datatype: i64,
    pub fk_to_project: i64,
}

/// A simulation burst run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BurstConfiguration {
    pub id: i64,
    pub gid: String,
    pub name: Option<String>,
    pub fk_project: i64,
    /// Simulation operation
    pub fk_simulation: Option<i64>,
    pub status: String,
    pub simulator_gid: Option<String>,
    pub range1: Option<String>,
    pub range2: Option<String>,
    pub start_time: Option<NaiveDateTime>,
    pub finish_time: Option<NaiveDateTime>,
}

/// A stored result figure (image).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultFigure {
    pub id: i64,
    pub fk_for_user: i64,
    pub fk_in_project: i64,
    /// Originating operation, `None` when it could not be resolved
    pub fk_from_operation: Option<i64>,
    pub name: String,
    pub session_name: Option<String>,
    pub file_format: String,
    /// Path of the image file in final storage
    pub file_path: String,
    pub create_date: NaiveDateTime,
}

/// Convert a timestamp to microseconds since the Unix epoch.
pub(crate) fn datetime_to_micros(time: NaiveDateTime) -> i64 {
    time.and_utc().timestamp_micros()
}

/// Convert microseconds since the Unix epoch to a timestamp.
pub(crate) fn micros_to_datetime(micros: i64) -> NaiveDateTime {
    DateTime::from_timestamp_micros(micros)
        .map(|t| t.naive_utc())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_micros_roundtrip() {
        let time = NaiveDate::from_ymd_opt(2019, 11, 3)
            .unwrap()
            .and_hms_micro_opt(14, 7, 9, 123_456)
            .unwrap();
        assert_eq!(micros_to_datetime(datetime_to_micros(time)), time);
    }

    #[test]
    fn test_pre_epoch_micros() {
        let time = NaiveDate::from_ymd_opt(1969, 12, 31)
            .unwrap()
            .and_hms_opt(23, 59, 59)
            .unwrap();
        assert_eq!(datetime_to_micros(time), -1_000_000);
        assert_eq!(micros_to_datetime(-1_000_000), time);
    }
}
