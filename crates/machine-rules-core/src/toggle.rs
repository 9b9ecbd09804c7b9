//! Persisted enable/disable state per rule and per input item.
//!
//! Only disabled identities are stored, so an empty store means "everything
//! enabled". Entries that stop resolving after a content change are pruned
//! by [`ToggleState::reconcile`].

use crate::builder::derive_rule_idents;
use crate::catalog::ItemCatalog;
use crate::id::{MachineId, RuleIdent, qualify_item_id};
use crate::machine::MachineTable;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Disabled rules and input items for one machine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisabledSet {
    #[serde(default)]
    pub rules: BTreeSet<RuleIdent>,
    /// Qualified item ids disabled in per-item override mode.
    #[serde(default)]
    pub inputs: BTreeSet<String>,
}

impl DisabledSet {
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.inputs.is_empty()
    }
}

/// Summary of a reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub rules_pruned: usize,
    pub inputs_pruned: usize,
    pub machines_dropped: usize,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        *self == ReconcileReport::default()
    }
}

/// Disabled state for every machine, keyed by machine id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToggleState {
    machines: BTreeMap<MachineId, DisabledSet>,
}

impl ToggleState {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_machines(machines: BTreeMap<MachineId, DisabledSet>) -> Self {
        let mut state = Self { machines };
        state.machines.retain(|_, set| !set.is_empty());
        state
    }

    pub(crate) fn machines(&self) -> &BTreeMap<MachineId, DisabledSet> {
        &self.machines
    }

    pub fn is_enabled(&self, ident: &RuleIdent) -> bool {
        self.machines
            .get(&ident.machine)
            .is_none_or(|set| !set.rules.contains(ident))
    }

    pub fn is_input_enabled(&self, machine: &MachineId, item_id: &str) -> bool {
        self.machines
            .get(machine)
            .is_none_or(|set| !set.inputs.contains(&qualify_item_id(item_id)))
    }

    pub fn disabled(&self, machine: &MachineId) -> Option<&DisabledSet> {
        self.machines.get(machine)
    }

    pub fn machine_ids(&self) -> impl Iterator<Item = &MachineId> {
        self.machines.keys()
    }

    pub fn len(&self) -> usize {
        self.machines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }

    /// Apply a toggle edit for one machine: `enabled` idents are removed from
    /// the disabled set, then `disabled` idents are added. Idents belonging
    /// to another machine are ignored.
    pub fn set_disabled(
        &mut self,
        machine: &MachineId,
        enabled: &BTreeSet<RuleIdent>,
        disabled: &BTreeSet<RuleIdent>,
    ) {
        let set = self.machines.entry(machine.clone()).or_default();
        set.rules.retain(|ident| !enabled.contains(ident));
        for ident in disabled {
            if ident.machine == *machine {
                set.rules.insert(ident.clone());
            } else {
                debug!(machine = %machine, ident = %ident, "ignoring ident for another machine");
            }
        }
        self.drop_if_empty(machine);
    }

    /// Same as [`set_disabled`](Self::set_disabled), for input item ids.
    pub fn set_disabled_inputs(
        &mut self,
        machine: &MachineId,
        enabled: &BTreeSet<String>,
        disabled: &BTreeSet<String>,
    ) {
        let enabled: BTreeSet<String> = enabled.iter().map(|id| qualify_item_id(id)).collect();
        let set = self.machines.entry(machine.clone()).or_default();
        set.inputs.retain(|id| !enabled.contains(id));
        set.inputs
            .extend(disabled.iter().map(|id| qualify_item_id(id)));
        self.drop_if_empty(machine);
    }

    pub fn clear_machine(&mut self, machine: &MachineId) -> Option<DisabledSet> {
        self.machines.remove(machine)
    }

    fn drop_if_empty(&mut self, machine: &MachineId) {
        if self.machines.get(machine).is_some_and(DisabledSet::is_empty) {
            self.machines.remove(machine);
        }
    }

    /// Prune state that no longer matches the loaded content.
    ///
    /// Machines missing from `table` are dropped outright. For the rest,
    /// disabled rules are intersected with the idents derivable from the
    /// live definition and disabled inputs must still resolve in `catalog`.
    /// Machines left with nothing disabled are dropped.
    pub fn reconcile(&mut self, table: &MachineTable, catalog: &ItemCatalog) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        self.machines.retain(|machine, set| {
            let Some(def) = table.get(machine) else {
                report.rules_pruned += set.rules.len();
                report.inputs_pruned += set.inputs.len();
                report.machines_dropped += 1;
                return false;
            };

            let legal = derive_rule_idents(def);
            let before = set.rules.len();
            set.rules.retain(|ident| legal.contains(ident));
            report.rules_pruned += before - set.rules.len();

            let before = set.inputs.len();
            set.inputs.retain(|id| catalog.contains(id));
            report.inputs_pruned += before - set.inputs.len();

            if set.is_empty() {
                report.machines_dropped += 1;
                false
            } else {
                true
            }
        });
        if !report.is_clean() {
            info!(
                rules = report.rules_pruned,
                inputs = report.inputs_pruned,
                machines = report.machines_dropped,
                "pruned stale toggle state"
            );
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    fn keg() -> MachineId {
        MachineId::new(KEG)
    }

    fn wine_ident() -> RuleIdent {
        RuleIdent::new(keg(), "Wine", "ItemPlacedInMachine", 0)
    }

    fn set(idents: &[RuleIdent]) -> BTreeSet<RuleIdent> {
        idents.iter().cloned().collect()
    }

    #[test]
    fn everything_enabled_by_default() {
        let state = ToggleState::new();
        assert!(state.is_enabled(&wine_ident()));
        assert!(state.is_input_enabled(&keg(), WHEAT));
        assert!(state.is_empty());
    }

    #[test]
    fn disable_then_enable() {
        let mut state = ToggleState::new();
        state.set_disabled(&keg(), &BTreeSet::new(), &set(&[wine_ident()]));
        assert!(!state.is_enabled(&wine_ident()));

        state.set_disabled(&keg(), &set(&[wine_ident()]), &BTreeSet::new());
        assert!(state.is_enabled(&wine_ident()));
        assert!(state.is_empty(), "empty machines are dropped");
    }

    #[test]
    fn set_disabled_ignores_foreign_idents() {
        let mut state = ToggleState::new();
        let foreign = RuleIdent::new(MachineId::new(FURNACE), "Copper", "ItemPlacedInMachine", 0);
        state.set_disabled(&keg(), &BTreeSet::new(), &set(&[foreign.clone()]));
        assert!(state.is_enabled(&foreign));
        assert!(state.is_empty());
    }

    #[test]
    fn input_overrides_are_qualified() {
        let mut state = ToggleState::new();
        let disabled: BTreeSet<String> = ["262".to_string()].into_iter().collect();
        state.set_disabled_inputs(&keg(), &BTreeSet::new(), &disabled);
        assert!(!state.is_input_enabled(&keg(), WHEAT));
        assert!(!state.is_input_enabled(&keg(), "262"));
        assert!(state.is_input_enabled(&keg(), GRAPE));
    }

    #[test]
    fn reconcile_keeps_live_idents() {
        let table = sample_machines();
        let catalog = sample_catalog();
        let mut state = ToggleState::new();
        state.set_disabled(&keg(), &BTreeSet::new(), &set(&[wine_ident()]));
        let report = state.reconcile(&table, &catalog);
        assert!(report.is_clean());
        assert!(!state.is_enabled(&wine_ident()));
    }

    #[test]
    fn reconcile_prunes_stale_idents() {
        let table = sample_machines();
        let catalog = sample_catalog();
        let mut state = ToggleState::new();
        let stale = RuleIdent::new(keg(), "Removed", "ItemPlacedInMachine", 0);
        state.set_disabled(&keg(), &BTreeSet::new(), &set(&[wine_ident(), stale.clone()]));
        let report = state.reconcile(&table, &catalog);
        assert_eq!(report.rules_pruned, 1);
        assert_eq!(report.machines_dropped, 0);
        assert!(state.is_enabled(&stale));
        assert!(!state.is_enabled(&wine_ident()));
    }

    #[test]
    fn reconcile_prunes_missing_inputs() {
        let table = sample_machines();
        let catalog = sample_catalog();
        let mut state = ToggleState::new();
        let disabled: BTreeSet<String> =
            [WHEAT.to_string(), "(O)Deleted".to_string()].into_iter().collect();
        state.set_disabled_inputs(&keg(), &BTreeSet::new(), &disabled);
        let report = state.reconcile(&table, &catalog);
        assert_eq!(report.inputs_pruned, 1);
        assert!(!state.is_input_enabled(&keg(), WHEAT));
    }

    #[test]
    fn reconcile_drops_removed_machine() {
        let mut table = sample_machines();
        let catalog = sample_catalog();
        let mut state = ToggleState::new();
        state.set_disabled(&keg(), &BTreeSet::new(), &set(&[wine_ident()]));
        let disabled: BTreeSet<String> = [WHEAT.to_string()].into_iter().collect();
        state.set_disabled_inputs(&keg(), &BTreeSet::new(), &disabled);

        table.remove(&keg());
        let report = state.reconcile(&table, &catalog);
        assert_eq!(report.machines_dropped, 1);
        assert!(state.disabled(&keg()).is_none());
    }

    #[test]
    fn reconcile_drops_machine_emptied_by_pruning() {
        let table = sample_machines();
        let catalog = sample_catalog();
        let mut state = ToggleState::new();
        let stale = RuleIdent::new(keg(), "Removed", "ItemPlacedInMachine", 0);
        state.set_disabled(&keg(), &BTreeSet::new(), &set(&[stale]));
        let report = state.reconcile(&table, &catalog);
        assert_eq!(report.machines_dropped, 1);
        assert!(state.is_empty());
    }
}
