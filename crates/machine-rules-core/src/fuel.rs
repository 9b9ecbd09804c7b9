//! Extra fuel requirements supplied by an external integration.
//!
//! Some content packs ask for additional consumed items per output (for
//! example "two coal on top of the usual input"). The integration is
//! optional; without a provider the builder behaves as if none were declared.

use crate::id::MachineId;
use crate::machine::OutputItem;

/// What an extra fuel entry asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FuelRequirement {
    /// A specific item id.
    Item(String),
    /// A tag expression, resolved like trigger tags.
    Tags(Vec<String>),
}

/// One extra consumed item for an output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtraFuel {
    pub requirement: FuelRequirement,
    pub count: u32,
}

impl ExtraFuel {
    pub fn item(id: &str, count: u32) -> Self {
        Self {
            requirement: FuelRequirement::Item(id.to_string()),
            count,
        }
    }

    pub fn tags(tags: &[&str], count: u32) -> Self {
        Self {
            requirement: FuelRequirement::Tags(tags.iter().map(|t| t.to_string()).collect()),
            count,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("extra fuel provider failed for {machine}: {reason}")]
pub struct FuelProviderError {
    pub machine: MachineId,
    pub reason: String,
}

/// Source of per-output extra fuel requirements.
pub trait ExtraFuelProvider {
    /// Extra fuel for one output of `machine`. An empty list means none.
    fn extra_fuel(
        &self,
        machine: &MachineId,
        output: &OutputItem,
    ) -> Result<Vec<ExtraFuel>, FuelProviderError>;
}
