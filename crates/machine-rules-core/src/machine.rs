//! Resolved machine definitions: output rules, triggers and declared outputs.
//!
//! These are the engine-side types the builder walks. The on-disk format
//! lives in `machine-rules-data`, which produces a [`MachineTable`] after
//! enforcing id uniqueness.

use crate::id::{MachineId, qualify_item_id};
use bitflags::bitflags;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

bitflags! {
    /// When a trigger fires. A trigger may name several kinds.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TriggerKinds: u8 {
        const ITEM_PLACED_IN_MACHINE = 1 << 0;
        const OUTPUT_COLLECTED = 1 << 1;
        const MACHINE_PUT_DOWN = 1 << 2;
        const DAY_UPDATE = 1 << 3;
    }
}

impl Default for TriggerKinds {
    fn default() -> Self {
        TriggerKinds::ITEM_PLACED_IN_MACHINE
    }
}

impl TriggerKinds {
    /// Parse a comma separated list such as `"ItemPlacedInMachine, DayUpdate"`.
    /// Returns `None` on an unknown name.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut kinds = TriggerKinds::empty();
        for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            kinds |= match part.to_ascii_lowercase().as_str() {
                "itemplacedinmachine" => TriggerKinds::ITEM_PLACED_IN_MACHINE,
                "outputcollected" => TriggerKinds::OUTPUT_COLLECTED,
                "machineputdown" => TriggerKinds::MACHINE_PUT_DOWN,
                "dayupdate" => TriggerKinds::DAY_UPDATE,
                _ => return None,
            };
        }
        if kinds.is_empty() {
            Some(TriggerKinds::default())
        } else {
            Some(kinds)
        }
    }

    pub fn is_item_placement(self) -> bool {
        self.contains(TriggerKinds::ITEM_PLACED_IN_MACHINE)
    }
}

impl fmt::Display for TriggerKinds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (TriggerKinds::ITEM_PLACED_IN_MACHINE, "ItemPlacedInMachine"),
            (TriggerKinds::OUTPUT_COLLECTED, "OutputCollected"),
            (TriggerKinds::MACHINE_PUT_DOWN, "MachinePutDown"),
            (TriggerKinds::DAY_UPDATE, "DayUpdate"),
        ];
        let mut first = true;
        for (flag, name) in names {
            if self.contains(flag) {
                if !first {
                    f.write_str(", ")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// A condition under which a rule's outputs are produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerRule {
    pub id: String,
    pub kinds: TriggerKinds,
    pub required_item_id: Option<String>,
    /// Context tags, each optionally prefixed with `!`.
    pub required_tags: Vec<String>,
    pub required_count: u32,
    /// Displayed verbatim, never evaluated.
    pub condition: Option<String>,
}

impl TriggerRule {
    pub fn item_placed(id: &str) -> Self {
        Self {
            id: id.to_string(),
            kinds: TriggerKinds::ITEM_PLACED_IN_MACHINE,
            required_item_id: None,
            required_tags: Vec::new(),
            required_count: 1,
            condition: None,
        }
    }

    pub fn with_item(mut self, item_id: &str) -> Self {
        self.required_item_id = Some(qualify_item_id(item_id));
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.required_count = count;
        self
    }

    pub fn with_condition(mut self, condition: &str) -> Self {
        self.condition = Some(condition.to_string());
        self
    }

    pub fn with_kinds(mut self, kinds: TriggerKinds) -> Self {
        self.kinds = kinds;
        self
    }
}

/// A known complex production method, which cannot be resolved to a
/// concrete item and is shown as a placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OutputMethod {
    Deconstructor,
    GeodeCrusher,
    SolarPanel,
    Tapper,
    WormBin,
    Unknown(String),
}

impl OutputMethod {
    /// Classify a method reference such as
    /// `StardewValley.Object, Stardew Valley: OutputDeconstructor`.
    pub fn from_reference(reference: &str) -> Self {
        let name = reference
            .rsplit([':', '.'])
            .next()
            .unwrap_or(reference)
            .trim();
        match name {
            "OutputDeconstructor" => OutputMethod::Deconstructor,
            "OutputGeodeCrusher" => OutputMethod::GeodeCrusher,
            "OutputSolarPanel" => OutputMethod::SolarPanel,
            "OutputTapper" => OutputMethod::Tapper,
            "OutputWormBin" => OutputMethod::WormBin,
            _ => OutputMethod::Unknown(reference.trim().to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            OutputMethod::Deconstructor => "Deconstructed parts",
            OutputMethod::GeodeCrusher => "Geode contents",
            OutputMethod::SolarPanel => "Battery pack",
            OutputMethod::Tapper => "Tree product",
            OutputMethod::WormBin => "Bait",
            OutputMethod::Unknown(reference) => reference,
        }
    }
}

/// One declared output of a rule.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputItem {
    pub id: String,
    /// May contain dynamic slot tokens such as `DROP_IN_ID`.
    pub item_id: Option<String>,
    pub random_item_ids: Vec<String>,
    pub output_method: Option<OutputMethod>,
    pub preserve_id: Option<String>,
    /// Tint the output with the color of the item placed in.
    pub copy_color: bool,
    /// `-1` when unset.
    pub quality: i32,
    /// `-1` when unset.
    pub min_stack: i32,
    /// `-1` when unset.
    pub max_stack: i32,
    pub condition: Option<String>,
}

impl OutputItem {
    pub fn item(id: &str, item_id: &str) -> Self {
        Self {
            id: id.to_string(),
            item_id: Some(item_id.to_string()),
            random_item_ids: Vec::new(),
            output_method: None,
            preserve_id: None,
            copy_color: false,
            quality: -1,
            min_stack: -1,
            max_stack: -1,
            condition: None,
        }
    }

    pub fn method(id: &str, method: OutputMethod) -> Self {
        Self {
            item_id: None,
            output_method: Some(method),
            ..Self::item(id, "")
        }
    }

    pub fn with_quality(mut self, quality: i32) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_stack(mut self, min: i32, max: i32) -> Self {
        self.min_stack = min;
        self.max_stack = max;
        self
    }

    pub fn with_condition(mut self, condition: &str) -> Self {
        self.condition = Some(condition.to_string());
        self
    }

    pub fn with_preserve(mut self, preserve_id: &str) -> Self {
        self.preserve_id = Some(preserve_id.to_string());
        self
    }

    pub fn with_random(mut self, ids: &[&str]) -> Self {
        self.random_item_ids = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn copying_color(mut self) -> Self {
        self.copy_color = true;
        self
    }
}

/// A shared fuel requirement consumed alongside every input.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumedItem {
    pub item_id: String,
    pub required_count: u32,
}

/// One recipe-like entry on a machine.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRule {
    pub id: String,
    pub triggers: Vec<TriggerRule>,
    pub outputs: Vec<OutputItem>,
    /// Processing time, shown on the outputs. Days take precedence.
    pub minutes_until_ready: Option<u32>,
    pub days_until_ready: Option<u32>,
}

impl OutputRule {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            triggers: Vec::new(),
            outputs: Vec::new(),
            minutes_until_ready: None,
            days_until_ready: None,
        }
    }

    pub fn trigger(mut self, trigger: TriggerRule) -> Self {
        self.triggers.push(trigger);
        self
    }

    pub fn output(mut self, output: OutputItem) -> Self {
        self.outputs.push(output);
        self
    }

    pub fn ready_in_minutes(mut self, minutes: u32) -> Self {
        self.minutes_until_ready = Some(minutes);
        self
    }

    pub fn ready_in_days(mut self, days: u32) -> Self {
        self.days_until_ready = Some(days);
        self
    }
}

/// A machine type and its output rules.
#[derive(Debug, Clone, PartialEq)]
pub struct MachineDef {
    pub id: MachineId,
    pub output_rules: Vec<OutputRule>,
    pub additional_consumed: Vec<ConsumedItem>,
}

impl MachineDef {
    pub fn new(id: &str) -> Self {
        Self {
            id: MachineId::new(id),
            output_rules: Vec::new(),
            additional_consumed: Vec::new(),
        }
    }

    pub fn rule(mut self, rule: OutputRule) -> Self {
        self.output_rules.push(rule);
        self
    }

    pub fn consumes(mut self, item_id: &str, required_count: u32) -> Self {
        self.additional_consumed.push(ConsumedItem {
            item_id: qualify_item_id(item_id),
            required_count,
        });
        self
    }

    /// Suffix colliding rule ids and trigger ids so every pairing has a
    /// distinct identity. Empty trigger ids take their trigger-kind name.
    ///
    /// The first occurrence keeps its id; later ones become `Id_1`, `Id_2`...
    /// Stable for a given declaration order.
    pub fn ensure_unique_ids(&mut self) {
        let mut rule_seen = HashSet::new();
        for rule in &mut self.output_rules {
            rule.id = unique_id(&mut rule_seen, &rule.id, "Rule");
            let mut trigger_seen = HashSet::new();
            for trigger in &mut rule.triggers {
                let fallback = trigger.kinds.to_string();
                trigger.id = unique_id(&mut trigger_seen, &trigger.id, &fallback);
            }
        }
    }
}

fn unique_id(seen: &mut HashSet<String>, id: &str, fallback: &str) -> String {
    let base = if id.trim().is_empty() {
        fallback.to_string()
    } else {
        id.trim().to_string()
    };
    if seen.insert(base.clone()) {
        return base;
    }
    // A suffixed candidate may itself collide with a declared id.
    let mut n = 1;
    loop {
        let candidate = format!("{base}_{n}");
        if seen.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// Read-only table of machine definitions, keyed by machine id.
#[derive(Debug, Clone, Default)]
pub struct MachineTable {
    machines: BTreeMap<MachineId, MachineDef>,
}

impl MachineTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a machine, enforcing id uniqueness on its rules and triggers.
    /// Returns the previous definition for the same id, if any.
    pub fn insert(&mut self, mut machine: MachineDef) -> Option<MachineDef> {
        machine.ensure_unique_ids();
        self.machines.insert(machine.id.clone(), machine)
    }

    pub fn get(&self, id: &MachineId) -> Option<&MachineDef> {
        self.machines.get(id)
    }

    pub fn remove(&mut self, id: &MachineId) -> Option<MachineDef> {
        self.machines.remove(id)
    }

    pub fn contains(&self, id: &MachineId) -> bool {
        self.machines.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MachineDef> {
        self.machines.values()
    }

    pub fn len(&self) -> usize {
        self.machines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }
}

impl FromIterator<MachineDef> for MachineTable {
    fn from_iter<T: IntoIterator<Item = MachineDef>>(iter: T) -> Self {
        let mut table = MachineTable::new();
        for machine in iter {
            table.insert(machine);
        }
        table
    }
}
