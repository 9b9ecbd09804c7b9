//! Serde data file structs for content pack definitions.
//!
//! These structs define the on-disk format for items, machines and extra
//! machine config. They are deserialized from RON, JSON, or TOML data files
//! and then converted into core types by the loader.

use machine_rules_core::catalog::Color;
use serde::Deserialize;

fn default_one() -> u32 {
    1
}

fn default_unset() -> i32 {
    -1
}

// ===========================================================================
// Items
// ===========================================================================

/// An item definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemData {
    /// Qualified or unqualified item id.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub category: i32,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub color: Option<Color>,
}

// ===========================================================================
// Machines
// ===========================================================================

/// A machine definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct MachineData {
    pub id: String,
    #[serde(default)]
    pub output_rules: Vec<OutputRuleData>,
    #[serde(default)]
    pub additional_consumed: Vec<ConsumedData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputRuleData {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub triggers: Vec<TriggerData>,
    #[serde(default)]
    pub outputs: Vec<OutputItemData>,
    #[serde(default)]
    pub minutes_until_ready: Option<u32>,
    #[serde(default)]
    pub days_until_ready: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TriggerData {
    #[serde(default)]
    pub id: String,
    /// Comma separated trigger kinds. Defaults to `ItemPlacedInMachine`.
    #[serde(default)]
    pub trigger: Option<String>,
    #[serde(default)]
    pub required_item_id: Option<String>,
    #[serde(default)]
    pub required_tags: Vec<String>,
    #[serde(default = "default_one")]
    pub required_count: u32,
    #[serde(default)]
    pub condition: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputItemData {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub random_item_ids: Vec<String>,
    /// Method reference for complex outputs, e.g. `"...: OutputTapper"`.
    #[serde(default)]
    pub output_method: Option<String>,
    #[serde(default)]
    pub preserve_id: Option<String>,
    #[serde(default)]
    pub copy_color: bool,
    #[serde(default = "default_unset")]
    pub quality: i32,
    #[serde(default = "default_unset")]
    pub min_stack: i32,
    #[serde(default = "default_unset")]
    pub max_stack: i32,
    #[serde(default)]
    pub condition: Option<String>,
}

/// Fuel consumed alongside every input of a machine.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsumedData {
    pub item_id: String,
    #[serde(default = "default_one")]
    pub required_count: u32,
}

// ===========================================================================
// Extra machine config
// ===========================================================================

/// Extra fuel an integration requires for one machine's outputs.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtraFuelData {
    pub machine: String,
    /// Output id the fuel applies to. Applies to every output when absent.
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub fuel: Vec<FuelData>,
}

/// One extra fuel item. Exactly one of `item_id` and `tags` must be set.
#[derive(Debug, Clone, Deserialize)]
pub struct FuelData {
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_one")]
    pub count: u32,
}

// ===========================================================================
// Tests
// ===========================================================================
