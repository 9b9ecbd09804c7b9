//! Content pack loading: reads data files, converts them, builds the catalog
//! and machine table.
//!
//! Provides format detection (RON/JSON/TOML), file discovery, and
//! deserialization helpers used by [`load_content_pack`].

use crate::config::{PanelConfig, load_panel_config};
use crate::extra_fuel::FileFuelProvider;
use crate::schema::*;
use machine_rules_core::catalog::{CatalogError, ItemCatalog, ItemCatalogBuilder, ItemRecord};
use machine_rules_core::machine::{
    ConsumedItem, MachineDef, MachineTable, OutputItem, OutputMethod, OutputRule, TriggerKinds,
    TriggerRule,
};
use machine_rules_core::id::{MachineId, qualify_item_id};
use machine_rules_core::panel::ControlPanel;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A named value could not be resolved.
    #[error("unresolved {expected_kind} '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    /// A duplicate name was found.
    #[error("duplicate name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    /// The item catalog rejected the loaded items.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for a data file with the given base name (without extension).
///
/// Looks for `{base_name}.ron`, `{base_name}.toml`, and `{base_name}.json`.
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// multiple formats exist for the same base name.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;

    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(existing) = found {
                return Err(DataLoadError::ConflictingFormats {
                    a: existing,
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }

    Ok(found)
}

/// Like [`find_data_file`], but returns an error if no file is found.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_error(path: &Path, detail: impl ToString) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: detail.to_string(),
    }
}

/// Read a file and deserialize it according to its format (detected from extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(path, e)),
    }
}

/// Deserialize a list from a file. For TOML files, extracts the array at the
/// given `toml_key` from a top-level table. For RON and JSON, deserializes
/// directly as `Vec<T>`.
pub fn deserialize_list<T: DeserializeOwned>(
    path: &Path,
    toml_key: &str,
) -> Result<Vec<T>, DataLoadError> {
    if detect_format(path)? != Format::Toml {
        return deserialize_file(path);
    }
    let content = std::fs::read_to_string(path)?;
    let table: toml::Value = toml::from_str(&content).map_err(|e| parse_error(path, e))?;
    let array = table
        .get(toml_key)
        .ok_or_else(|| parse_error(path, format!("missing key '{toml_key}' in TOML file")))?
        .clone();
    array
        .try_into()
        .map_err(|e: toml::de::Error| parse_error(path, e))
}

/// Record `name` in `seen`, returning a `DuplicateName` error if it was
/// already there.
pub fn check_duplicate(
    seen: &mut HashSet<String>,
    name: &str,
    file: &Path,
) -> Result<(), DataLoadError> {
    if seen.insert(name.to_string()) {
        Ok(())
    } else {
        Err(DataLoadError::DuplicateName {
            file: file.to_path_buf(),
            name: name.to_string(),
        })
    }
}

// ===========================================================================
// Conversion
// ===========================================================================

fn to_item_record(data: ItemData) -> ItemRecord {
    let mut record = ItemRecord::new(&data.id, &data.name)
        .with_category(data.category)
        .with_tags(&data.tags);
    if let Some(display_name) = &data.display_name {
        record = record.with_display_name(display_name);
    }
    if let Some(color) = data.color {
        record = record.with_color(color);
    }
    record
}

fn to_trigger(data: TriggerData, path: &Path) -> Result<TriggerRule, DataLoadError> {
    let kinds = match &data.trigger {
        Some(raw) => TriggerKinds::parse(raw).ok_or_else(|| DataLoadError::UnresolvedRef {
            file: path.to_path_buf(),
            name: raw.clone(),
            expected_kind: "trigger kind",
        })?,
        None => TriggerKinds::default(),
    };
    Ok(TriggerRule {
        id: data.id,
        kinds,
        required_item_id: data.required_item_id.as_deref().map(qualify_item_id),
        required_tags: data.required_tags,
        required_count: data.required_count,
        condition: data.condition,
    })
}

fn to_output(data: OutputItemData) -> OutputItem {
    OutputItem {
        id: data.id,
        item_id: data.item_id,
        random_item_ids: data.random_item_ids,
        output_method: data.output_method.as_deref().map(OutputMethod::from_reference),
        preserve_id: data.preserve_id,
        copy_color: data.copy_color,
        quality: data.quality,
        min_stack: data.min_stack,
        max_stack: data.max_stack,
        condition: data.condition,
    }
}

fn to_machine_def(data: MachineData, path: &Path) -> Result<MachineDef, DataLoadError> {
    let output_rules = data
        .output_rules
        .into_iter()
        .map(|rule| -> Result<OutputRule, DataLoadError> {
            Ok(OutputRule {
                id: rule.id,
                triggers: rule
                    .triggers
                    .into_iter()
                    .map(|t| to_trigger(t, path))
                    .collect::<Result<_, _>>()?,
                outputs: rule.outputs.into_iter().map(to_output).collect(),
                minutes_until_ready: rule.minutes_until_ready,
                days_until_ready: rule.days_until_ready,
            })
        })
        .collect::<Result<_, DataLoadError>>()?;
    Ok(MachineDef {
        id: MachineId::new(&data.id),
        output_rules,
        additional_consumed: data
            .additional_consumed
            .into_iter()
            .map(|c| ConsumedItem {
                item_id: qualify_item_id(&c.item_id),
                required_count: c.required_count,
            })
            .collect(),
    })
}

// ===========================================================================
// Loading
// ===========================================================================

/// Load an item catalog from `path`.
pub fn load_items(path: &Path) -> Result<ItemCatalog, DataLoadError> {
    let items: Vec<ItemData> = deserialize_list(path, "items")?;
    let mut builder = ItemCatalogBuilder::new();
    for item in items {
        builder.register(to_item_record(item));
    }
    Ok(builder.build()?)
}

/// Load a machine table from `path`. Machine ids must be unique; colliding
/// rule and trigger ids are suffixed by the table.
pub fn load_machines(path: &Path) -> Result<MachineTable, DataLoadError> {
    let machines: Vec<MachineData> = deserialize_list(path, "machines")?;
    let mut seen = HashSet::new();
    let mut table = MachineTable::new();
    for data in machines {
        check_duplicate(&mut seen, &qualify_item_id(&data.id), path)?;
        table.insert(to_machine_def(data, path)?);
    }
    Ok(table)
}

/// Everything read from a content pack directory.
pub struct ContentPack {
    pub catalog: ItemCatalog,
    pub machines: MachineTable,
    pub extra_fuel: Option<FileFuelProvider>,
    pub config: PanelConfig,
}

impl ContentPack {
    /// A control panel over this pack's content, configured by its config.
    pub fn into_panel(self) -> ControlPanel {
        let panel = ControlPanel::new(self.catalog, self.machines).with_options(self.config.into());
        match self.extra_fuel {
            Some(provider) => panel.with_fuel_provider(Box::new(provider)),
            None => panel,
        }
    }
}

/// Load a content pack from `dir`.
///
/// Requires `items` and `machines` data files; `extra_machine_config` and
/// `config` are optional.
pub fn load_content_pack(dir: &Path) -> Result<ContentPack, DataLoadError> {
    let catalog = load_items(&require_data_file(dir, "items")?)?;
    let machines = load_machines(&require_data_file(dir, "machines")?)?;
    for machine in machines.iter() {
        if !catalog.contains(machine.id.as_str()) {
            warn!(machine = %machine.id, "machine has no item in the catalog");
        }
    }

    let extra_fuel = find_data_file(dir, "extra_machine_config")?
        .map(|path| FileFuelProvider::load(&path))
        .transpose()?;
    let config = load_panel_config(dir)?;

    info!(
        dir = %dir.display(),
        items = catalog.len(),
        machines = machines.len(),
        extra_fuel = extra_fuel.is_some(),
        "loaded content pack"
    );
    Ok(ContentPack {
        catalog,
        machines,
        extra_fuel,
        config,
    })
}

// ===========================================================================
// Tests
// ===========================================================================
