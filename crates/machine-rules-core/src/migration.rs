//! Save format version migration framework.
//!
//! Provides a registry of migration functions that transform a save
//! document from one format version to the next, so toggle state written by
//! older releases still loads.

use serde_json::Value;
use std::collections::BTreeMap;

/// Errors that can occur during migration.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("no migration path from version {from} to version {to}")]
    NoMigrationPath { from: u32, to: u32 },
    #[error("migration from version {from} to version {to} failed: {reason}")]
    MigrationFailed { from: u32, to: u32, reason: String },
}

/// A function that transforms a save document from one version to the next.
pub type MigrationFn = fn(Value) -> Result<Value, MigrationError>;

/// Registry of migration functions keyed by source version.
///
/// Each registered function migrates data from `version N` to `version N+1`.
/// The registry chains these steps to migrate across multiple versions.
pub struct MigrationRegistry {
    migrations: BTreeMap<u32, MigrationFn>,
}

impl MigrationRegistry {
    /// Create an empty migration registry.
    pub fn new() -> Self {
        Self {
            migrations: BTreeMap::new(),
        }
    }

    /// The migrations every release ships with.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(1, migrate_v1_to_v2);
        registry
    }

    /// Register a migration function from `from_version` to `from_version + 1`.
    pub fn register(&mut self, from_version: u32, migrate: MigrationFn) {
        self.migrations.insert(from_version, migrate);
    }

    /// Check whether a complete migration path exists from `from` to `to`.
    pub fn can_migrate(&self, from: u32, to: u32) -> bool {
        if from >= to {
            return from == to;
        }
        (from..to).all(|v| self.migrations.contains_key(&v))
    }

    /// Migrate a document from version `from` to version `to`.
    ///
    /// Chains registered migration functions sequentially and stamps the
    /// resulting `version` field. Returns the input unchanged if `from == to`.
    pub fn migrate(&self, doc: Value, from: u32, to: u32) -> Result<Value, MigrationError> {
        if from == to {
            return Ok(doc);
        }
        if from > to {
            return Err(MigrationError::NoMigrationPath { from, to });
        }

        let mut current = doc;
        for version in from..to {
            let migrate_fn = self
                .migrations
                .get(&version)
                .ok_or(MigrationError::NoMigrationPath { from, to })?;
            current = migrate_fn(current)?;
            if let Value::Object(map) = &mut current {
                map.insert("version".to_string(), Value::from(version + 1));
            }
        }
        Ok(current)
    }

    /// Number of registered migration steps.
    pub fn step_count(&self) -> usize {
        self.migrations.len()
    }
}

impl Default for MigrationRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Version 1 stored one `disabled` rule list per machine and had no input
/// overrides. Version 2 names it `rules` and adds `inputs`.
fn migrate_v1_to_v2(mut doc: Value) -> Result<Value, MigrationError> {
    let failed = |reason: &str| MigrationError::MigrationFailed {
        from: 1,
        to: 2,
        reason: reason.to_string(),
    };
    let Some(machines) = doc.get_mut("machines") else {
        return Ok(doc);
    };
    let machines = machines
        .as_object_mut()
        .ok_or_else(|| failed("`machines` is not an object"))?;
    for (machine, entry) in machines.iter_mut() {
        let rules = match entry {
            Value::Object(map) => map.remove("disabled").unwrap_or(Value::Array(Vec::new())),
            Value::Array(list) => Value::Array(std::mem::take(list)),
            _ => return Err(failed(&format!("entry for {machine} is malformed"))),
        };
        *entry = serde_json::json!({ "rules": rules, "inputs": [] });
    }
    Ok(doc)
}

// ===========================================================================
// Tests
// ===========================================================================
