//! Persistence for toggle state.
//!
//! Save data is JSON via `serde_json` with a `version` field. Older versions
//! are upgraded through the [`MigrationRegistry`] before decoding; newer
//! ones are rejected.

use crate::id::MachineId;
use crate::migration::{MigrationError, MigrationRegistry};
use crate::toggle::{DisabledSet, ToggleState};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Current save format version. Increment when breaking the layout and
/// register a migration from the previous version.
pub const SAVE_FORMAT_VERSION: u32 = 2;

/// Version assumed for documents that carry no `version` field.
const UNVERSIONED: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("json encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("json decoding failed: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("save data is not a json object")]
    NotAnObject,
    #[error("invalid version field: {0}")]
    InvalidVersion(Value),
    #[error("save data from future version {0} (this build supports up to {SAVE_FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error(transparent)]
    Migration(#[from] MigrationError),
}

// ---------------------------------------------------------------------------
// Save document
// ---------------------------------------------------------------------------

/// On-disk shape of the toggle state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveData {
    pub version: u32,
    #[serde(default)]
    pub machines: BTreeMap<MachineId, DisabledSet>,
}

impl SaveData {
    pub fn from_state(state: &ToggleState) -> Self {
        Self {
            version: SAVE_FORMAT_VERSION,
            machines: state.machines().clone(),
        }
    }

    pub fn into_state(self) -> ToggleState {
        ToggleState::from_machines(self.machines)
    }
}

/// Read the `version` field of a save document.
pub fn read_version(doc: &Value) -> Result<u32, DeserializeError> {
    let map = doc.as_object().ok_or(DeserializeError::NotAnObject)?;
    match map.get("version") {
        None => Ok(UNVERSIONED),
        Some(value) => value
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| DeserializeError::InvalidVersion(value.clone())),
    }
}

/// Serialize toggle state as pretty-printed JSON.
pub fn save_to_json(state: &ToggleState) -> Result<String, SerializeError> {
    Ok(serde_json::to_string_pretty(&SaveData::from_state(state))?)
}

/// Decode toggle state, migrating older versions with `migrations`.
pub fn load_from_json(
    json: &str,
    migrations: &MigrationRegistry,
) -> Result<ToggleState, DeserializeError> {
    let doc: Value = serde_json::from_str(json)?;
    let version = read_version(&doc)?;
    if version > SAVE_FORMAT_VERSION {
        return Err(DeserializeError::FutureVersion(version));
    }
    let doc = if version < SAVE_FORMAT_VERSION {
        debug!(from = version, to = SAVE_FORMAT_VERSION, "migrating save data");
        migrations.migrate(doc, version, SAVE_FORMAT_VERSION)?
    } else {
        doc
    };
    let data: SaveData = serde_json::from_value(doc)?;
    Ok(data.into_state())
}

// ===========================================================================
// Tests
// ===========================================================================
