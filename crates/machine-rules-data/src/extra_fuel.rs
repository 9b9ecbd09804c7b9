//! File-backed extra fuel provider.
//!
//! Reads `extra_machine_config.{ron,json,toml}` and answers
//! [`ExtraFuelProvider`] queries from it. Entries are checked when asked
//! for, so one malformed entry only fails the machine it belongs to.

use crate::loader::{DataLoadError, deserialize_list};
use crate::schema::{ExtraFuelData, FuelData};
use machine_rules_core::fuel::{ExtraFuel, ExtraFuelProvider, FuelProviderError, FuelRequirement};
use machine_rules_core::id::{MachineId, qualify_item_id};
use machine_rules_core::machine::OutputItem;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct FileFuelProvider {
    entries: HashMap<MachineId, Vec<ExtraFuelData>>,
}

impl FileFuelProvider {
    pub fn load(path: &Path) -> Result<Self, DataLoadError> {
        let entries: Vec<ExtraFuelData> = deserialize_list(path, "extra_fuel")?;
        Ok(Self::from_entries(entries))
    }

    pub fn from_entries(entries: Vec<ExtraFuelData>) -> Self {
        let mut by_machine: HashMap<MachineId, Vec<ExtraFuelData>> = HashMap::new();
        for entry in entries {
            by_machine
                .entry(MachineId::new(&entry.machine))
                .or_default()
                .push(entry);
        }
        Self {
            entries: by_machine,
        }
    }

    pub fn machine_count(&self) -> usize {
        self.entries.len()
    }
}

fn to_extra_fuel(machine: &MachineId, data: &FuelData) -> Result<ExtraFuel, FuelProviderError> {
    let requirement = match (&data.item_id, data.tags.is_empty()) {
        (Some(id), true) => FuelRequirement::Item(qualify_item_id(id)),
        (None, false) => FuelRequirement::Tags(data.tags.clone()),
        (Some(_), false) => {
            return Err(FuelProviderError {
                machine: machine.clone(),
                reason: "fuel entry sets both item_id and tags".to_string(),
            });
        }
        (None, true) => {
            return Err(FuelProviderError {
                machine: machine.clone(),
                reason: "fuel entry sets neither item_id nor tags".to_string(),
            });
        }
    };
    Ok(ExtraFuel {
        requirement,
        count: data.count,
    })
}

impl ExtraFuelProvider for FileFuelProvider {
    fn extra_fuel(
        &self,
        machine: &MachineId,
        output: &OutputItem,
    ) -> Result<Vec<ExtraFuel>, FuelProviderError> {
        let Some(entries) = self.entries.get(machine) else {
            return Ok(Vec::new());
        };
        entries
            .iter()
            .filter(|entry| entry.output.as_deref().is_none_or(|id| id == output.id))
            .flat_map(|entry| &entry.fuel)
            .map(|fuel| to_extra_fuel(machine, fuel))
            .collect()
    }
}
