//! Panel configuration file.
//!
//! `config.{ron,json,toml}` in a content pack directory. Every field is
//! optional; a missing file means all defaults.

use crate::loader::{DataLoadError, deserialize_file, find_data_file};
use machine_rules_core::panel::PanelOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelConfig {
    /// Allow disabling individual input items.
    #[serde(default = "default_true")]
    pub per_item_overrides: bool,
    /// Consult the extra machine config integration.
    #[serde(default = "default_true")]
    pub extra_machine_config: bool,
    /// Prune stale toggle state when a save loads.
    #[serde(default = "default_true")]
    pub prune_on_load: bool,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            per_item_overrides: true,
            extra_machine_config: true,
            prune_on_load: true,
        }
    }
}

impl From<PanelConfig> for PanelOptions {
    fn from(config: PanelConfig) -> Self {
        PanelOptions {
            per_item_overrides: config.per_item_overrides,
            extra_machine_config: config.extra_machine_config,
            prune_on_load: config.prune_on_load,
        }
    }
}

/// Load `config.*` from `dir`, falling back to defaults when absent.
pub fn load_panel_config(dir: &Path) -> Result<PanelConfig, DataLoadError> {
    match find_data_file(dir, "config")? {
        Some(path) => deserialize_file(&path),
        None => {
            debug!(dir = %dir.display(), "no panel config, using defaults");
            Ok(PanelConfig::default())
        }
    }
}
