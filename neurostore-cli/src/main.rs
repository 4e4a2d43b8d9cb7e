// SPDX-FileCopyrightText: 2026 The Neurostore Authors
// SPDX-License-Identifier: MIT

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use neurostore_db::{OpenMode, StoreDb};
use neurostore_import::{
    ArchiveError, ArchiveSource, ConfigError, ImportConfig, ImportFailure, ImportService,
    ImportSummary,
};
use thiserror::Error;

#[derive(Parser, Debug)]
#[command(name = "neurostore", version, about = "Import exported research projects")]
struct Cli {
    /// Configuration file (defaults to $NEUROSTORE_CONFIG, then built-in defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the store database and its schema
    InitDb,
    /// Import every project of an exported archive
    Import {
        archive: PathBuf,
        /// User the imported projects are assigned to
        #[arg(long)]
        user: String,
    },
    /// Stage a simulator configuration archive and print its directory
    StageSimulator { archive: PathBuf },
}

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Store database error: {0}")]
    Database(#[from] neurostore_db::Error),

    #[error(transparent)]
    Import(#[from] ImportFailure),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("Failed to create {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn init_db(config: &ImportConfig) -> Result<(), CliError> {
    if let Some(parent) = config.db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| CliError::CreateDir {
            path: parent.to_owned(),
            source,
        })?;
    }
    let db = StoreDb::open(&config.db_path, OpenMode::Create)?;
    log::info!(
        "Initialized store database {} (schema version {})",
        config.db_path.display(),
        db.schema_version()?
    );
    Ok(())
}

fn service(config: ImportConfig) -> Result<ImportService, CliError> {
    let db = StoreDb::open(&config.db_path, OpenMode::ReadWrite)?;
    Ok(ImportService::new(db, config)?)
}

fn print_summary(summary: &ImportSummary) {
    for project in &summary.projects {
        println!("project {} ({})", project.name, project.gid);
    }
    println!(
        "operations: {}, data types stored: {}, linked: {}, bursts: {}, figures: {}",
        summary.operations,
        summary.datatypes_stored,
        summary.links_created,
        summary.bursts,
        summary.figures
    );
    for path in &summary.skipped_files {
        println!("skipped file {}", path.display());
    }
    for path in &summary.skipped_folders {
        println!("skipped folder {}", path.display());
    }
}

fn import(config: ImportConfig, archive: &Path, user: &str) -> Result<(), CliError> {
    let summary = service(config)?.import_project_structure(ArchiveSource::Path(archive), user)?;
    print_summary(&summary);
    Ok(())
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = ImportConfig::load(cli.config.as_deref())?;
    match cli.command {
        Command::InitDb => init_db(&config),
        Command::Import { archive, user } => import(config, &archive, &user),
        Command::StageSimulator { archive } => {
            let dir = service(config)?
                .import_simulator_configuration_zip(ArchiveSource::Path(&archive))?;
            println!("{}", dir.display());
            Ok(())
        }
    }
}

fn main() -> std::process::ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            if let CliError::Import(failure) = &e
                && failure.rolled_back
            {
                log::error!("No project of the archive was stored");
            }
            std::process::ExitCode::FAILURE
        }
    }
}
