// SPDX-FileCopyrightText: 2026 The Neurostore Authors
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "NEUROSTORE_CONFIG";

/// State given to data type groups created during import.
pub const DEFAULT_DATATYPE_GROUP_STATE: &str = "INTERMEDIATE";

/// Maps a view-model kind to the algorithm that consumes it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ViewModelMapping {
    /// Declared type of the view-model container
    pub kind: String,
    pub module: String,
    pub classname: String,
}

impl ViewModelMapping {
    pub fn new(kind: &str, module: &str, classname: &str) -> Self {
        Self {
            kind: kind.to_string(),
            module: module.to_string(),
            classname: classname.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Root of final storage; projects live under `PROJECTS/`
    pub storage_root: PathBuf,

    /// Where archives are staged
    pub temp_dir: PathBuf,

    /// Path to the store database
    pub db_path: PathBuf,

    /// State of data type groups created on import
    pub default_datatype_group_state: String,

    /// View-model kinds that can drive an operation
    pub view_models: Vec<ViewModelMapping>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from("/var/lib/neurostore"),
            temp_dir: std::env::temp_dir().join("neurostore"),
            db_path: PathBuf::from("/var/lib/neurostore/neurostore.db"),
            default_datatype_group_state: DEFAULT_DATATYPE_GROUP_STATE.to_string(),
            view_models: vec![
                ViewModelMapping::new(
                    "SimulatorAdapterModel",
                    "neurostore.adapters.simulator.simulator_adapter",
                    "SimulatorAdapter",
                ),
                ViewModelMapping::new(
                    "ZIPConnectivityImporterModel",
                    "neurostore.adapters.uploaders.zip_connectivity_importer",
                    "ZIPConnectivityImporter",
                ),
                ViewModelMapping::new(
                    "RegionMappingImporterModel",
                    "neurostore.adapters.uploaders.region_mapping_importer",
                    "RegionMappingImporter",
                ),
            ],
        }
    }
}

impl ImportConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            message: format!("Failed to read config file at {}", path.display()),
            source,
        })?;
        let config: ImportConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `explicit`, else from `$NEUROSTORE_CONFIG`, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match std::env::var_os(CONFIG_ENV) {
                Some(path) => Self::from_file(Path::new(&path)),
                None => Ok(Self::default()),
            },
        }
    }

    /// Check settings that do not need the database.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_datatype_group_state.trim().is_empty() {
            return Err(ConfigError::invalid(
                "default_datatype_group_state must not be empty",
            ));
        }
        if self.storage_root.as_os_str().is_empty() {
            return Err(ConfigError::invalid("storage_root must not be empty"));
        }
        Ok(())
    }
}
