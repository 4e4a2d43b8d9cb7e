// SPDX-FileCopyrightText: 2026 The Neurostore Authors
// SPDX-License-Identifier: MIT

//! Database schema definitions for the project store.
//!
//! Timestamps are stored as integer microseconds since the Unix epoch.

/// Core schema SQL
pub const SCHEMA_SQL: &str = r#"
create table if not exists Users (
    id       integer primary key autoincrement not null,
    username text unique not null
);

create table if not exists Algorithms (
    id        integer primary key autoincrement not null,
    module    text not null,
    classname text not null,
    unique (module, classname)
);

create table if not exists Projects (
    id          integer primary key autoincrement not null,
    gid         text unique not null,
    name        text unique not null,
    description text,
    fkAdmin     integer not null,
    lastUpdated integer not null,
    version     integer not null,
    foreign key (fkAdmin) references Users(id) on delete restrict
);

create table if not exists OperationGroups (
    id     integer primary key autoincrement not null,
    gid    text unique not null,
    name   text not null,
    range1 text,
    range2 text,
    range3 text
);

create table if not exists Operations (
    id               integer primary key autoincrement not null,
    gid              text unique not null,
    fkLaunchedBy     integer not null,
    fkLaunchedIn     integer not null,
    fkFromAlgo       integer not null,
    fkOperationGroup integer,
    parameters       text not null,
    meta             text,
    status           text not null,
    userGroup        text,
    rangeValues      text,
    visible          integer not null default 1,
    createDate       integer not null,
    startDate        integer,
    completionDate   integer,
    foreign key (fkLaunchedBy) references Users(id) on delete restrict,
    foreign key (fkLaunchedIn) references Projects(id) on delete cascade,
    foreign key (fkFromAlgo) references Algorithms(id) on delete restrict,
    foreign key (fkOperationGroup) references OperationGroups(id) on delete set null
);

create index if not exists IndexOperationsProject on Operations(fkLaunchedIn);

create table if not exists DataTypeGroups (
    id               integer primary key autoincrement not null,
    gid              text unique not null,
    fkOperationGroup integer unique not null,
    fkFromOperation  integer not null,
    state            text not null,
    createDate       integer not null,
    foreign key (fkOperationGroup) references OperationGroups(id) on delete cascade,
    foreign key (fkFromOperation) references Operations(id) on delete cascade
);

create table if not exists DataTypes (
    id              integer primary key autoincrement not null,
    gid             text unique not null,
    type            text not null,
    subject         text,
    title           text,
    state           text,
    visible         integer not null default 1,
    fkFromOperation integer not null,
    fkDataTypeGroup integer,
    fkParentBurst   text,
    diskSize        integer,
    createDate      integer,
    dataVersion     integer not null,
    userTag1        text,
    userTag2        text,
    userTag3        text,
    userTag4        text,
    userTag5        text,
    foreign key (fkFromOperation) references Operations(id) on delete cascade,
    foreign key (fkDataTypeGroup) references DataTypeGroups(id) on delete set null
);

create index if not exists IndexDataTypesOperation on DataTypes(fkFromOperation);

create table if not exists Links (
    id             integer primary key autoincrement not null,
    fkFromDataType integer not null,
    fkToProject    integer not null,
    unique (fkFromDataType, fkToProject),
    foreign key (fkFromDataType) references DataTypes(id) on delete cascade,
    foreign key (fkToProject) references Projects(id) on delete cascade
);

create index if not exists IndexLinksProject on Links(fkToProject);

create table if not exists BurstConfigurations (
    id           integer primary key autoincrement not null,
    gid          text unique not null,
    name         text,
    fkProject    integer not null,
    fkSimulation integer,
    status       text not null,
    simulatorGid text,
    range1       text,
    range2       text,
    startTime    integer,
    finishTime   integer,
    foreign key (fkProject) references Projects(id) on delete cascade,
    foreign key (fkSimulation) references Operations(id) on delete set null
);

create table if not exists ResultFigures (
    id              integer primary key autoincrement not null,
    fkForUser       integer not null,
    fkInProject     integer not null,
    fkFromOperation integer,
    name            text not null,
    sessionName     text,
    fileFormat      text not null,
    filePath        text not null,
    createDate      integer not null,
    foreign key (fkForUser) references Users(id) on delete restrict,
    foreign key (fkInProject) references Projects(id) on delete cascade,
    foreign key (fkFromOperation) references Operations(id) on delete set null
);
"#;

/// Schema version, recorded in `PRAGMA user_version`
pub const SCHEMA_VERSION: i32 = 1;
