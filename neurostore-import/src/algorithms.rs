// SPDX-FileCopyrightText: 2026 The Neurostore Authors
// SPDX-License-Identifier: MIT

//! View-model kind to algorithm registry.

use std::collections::HashMap;

use neurostore_db::StoreDb;
use tracing::debug;

use crate::config::ViewModelMapping;
use crate::error::ConfigError;

/// Resolved mapping from view-model kind to algorithm row id.
#[derive(Debug, Clone, Default)]
pub struct AlgorithmRegistry {
    by_kind: HashMap<String, i64>,
}

impl AlgorithmRegistry {
    /// Validate `mappings` and resolve every descriptor to an algorithm row.
    ///
    /// Unknown algorithms are registered. Empty fields and repeated kinds are
    /// configuration errors.
    pub fn load(db: &StoreDb, mappings: &[ViewModelMapping]) -> Result<Self, ConfigError> {
        let mut by_kind = HashMap::with_capacity(mappings.len());
        for mapping in mappings {
            if mapping.kind.trim().is_empty() {
                return Err(ConfigError::invalid("view model kind must not be empty"));
            }
            if mapping.module.trim().is_empty() || mapping.classname.trim().is_empty() {
                return Err(ConfigError::invalid(format!(
                    "view model {} needs both module and classname",
                    mapping.kind
                )));
            }
            if by_kind.contains_key(&mapping.kind) {
                return Err(ConfigError::invalid(format!(
                    "view model {} is mapped more than once",
                    mapping.kind
                )));
            }
            let id = db.register_algorithm(&mapping.module, &mapping.classname)?;
            debug!(
                "View model {} drives {}.{} ({id})",
                mapping.kind, mapping.module, mapping.classname
            );
            by_kind.insert(mapping.kind.clone(), id);
        }
        Ok(Self { by_kind })
    }

    /// Algorithm consuming view-models of `kind`, if any.
    pub fn algorithm_for(&self, kind: &str) -> Option<i64> {
        self.by_kind.get(kind).copied()
    }

    pub fn len(&self) -> usize {
        self.by_kind.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_kind.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_resolves_and_reuses_rows() {
        let db = StoreDb::open_memory().unwrap();
        let existing = db.register_algorithm("adapters.sim", "Simulator").unwrap();

        let registry = AlgorithmRegistry::load(
            &db,
            &[
                ViewModelMapping::new("SimModel", "adapters.sim", "Simulator"),
                ViewModelMapping::new("ImportModel", "adapters.up", "Importer"),
            ],
        )
        .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.algorithm_for("SimModel"), Some(existing));
        let importer = db.query_algorithm("adapters.up", "Importer").unwrap().unwrap();
        assert_eq!(registry.algorithm_for("ImportModel"), Some(importer.id));
        assert_eq!(registry.algorithm_for("Unmapped"), None);
    }

    #[rstest]
    #[case::empty_kind(vec![ViewModelMapping::new(" ", "m", "C")])]
    #[case::empty_module(vec![ViewModelMapping::new("K", "", "C")])]
    #[case::duplicate(vec![
        ViewModelMapping::new("K", "m", "C"),
        ViewModelMapping::new("K", "m2", "C2"),
    ])]
    fn test_invalid_mappings(#[case] mappings: Vec<ViewModelMapping>) {
        let db = StoreDb::open_memory().unwrap();
        assert!(matches!(
            AlgorithmRegistry::load(&db, &mappings),
            Err(ConfigError::Invalid(_))
        ));
    }
}
