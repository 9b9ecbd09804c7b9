//! Rule entry construction.
//!
//! Walks one machine's output rules and pairs every trigger with the rule's
//! resolved outputs, producing the flat list of [`RuleEntry`] values the
//! control panel displays and toggles.
//!
//! # Pipeline (per machine)
//!
//! 1. Resolve the machine's shared fuel once.
//! 2. Fold declared outputs that would look identical.
//! 3. Resolve each retained output to visuals (or a "special" placeholder).
//! 4. Ask the extra fuel provider, forking outputs that need extra fuel.
//! 5. Resolve each trigger's inputs.
//! 6. Pair triggers with plain outputs and with each extra fuel variant.
//! 7. Drop rules where nothing resolved.
//!
//! Individual resolution misses never fail the build; they only leave a slot
//! out. Only an unknown machine or a failing fuel provider is an error.

use crate::catalog::Color;
use crate::fuel::{ExtraFuel, ExtraFuelProvider, FuelProviderError, FuelRequirement};
use crate::id::{MachineId, RuleIdent};
use crate::machine::{MachineDef, MachineTable, OutputItem, OutputRule, TriggerRule};
use crate::preserve::{PreserveType, preserve_ingredient, resolve_flavored};
use crate::query::{ItemQueryResolver, ResolvedItem, substitute_slot_tokens};
use crate::tags::TagMatcher;
use crate::visual::{IconOverlay, RuleItem, SimilarityKey};
use std::collections::BTreeSet;
use tracing::debug;

/// One displayable, toggleable trigger/output pairing.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleEntry {
    pub ident: RuleIdent,
    /// False when the trigger is not item placement; such rules can't be toggled.
    pub can_check: bool,
    pub inputs: Vec<RuleItem>,
    pub outputs: Vec<RuleItem>,
    /// Set on the variant that needs extra fuel from an integration.
    pub extra_fuel: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("unknown machine: {0}")]
    UnknownMachine(MachineId),
    #[error(transparent)]
    Integration(#[from] FuelProviderError),
}

/// An output visual, remembering whether it takes its tint from the input.
#[derive(Debug, Clone)]
struct OutputVisual {
    visual: RuleItem,
    copy_color: bool,
}

/// Outputs of one rule that need extra fuel, with the fuel visuals.
#[derive(Debug, Clone)]
struct FuelVariant {
    outputs: Vec<OutputVisual>,
    fuel: Vec<RuleItem>,
}

/// Final output visuals for one trigger. Outputs flagged `copy_color` take
/// `tint`, the color of the trigger's first input.
fn paint_outputs(outputs: &[OutputVisual], tint: Option<Color>) -> Vec<RuleItem> {
    outputs
        .iter()
        .map(|output| match tint {
            Some(tint) if output.copy_color => output.visual.clone().with_tint(tint),
            _ => output.visual.clone(),
        })
        .collect()
}

/// Tooltip line for a rule's processing time. Days win over minutes.
fn ready_line(rule: &OutputRule) -> Option<String> {
    match (rule.days_until_ready, rule.minutes_until_ready) {
        (Some(1), _) => Some("Ready in 1 day".to_string()),
        (Some(days), _) => Some(format!("Ready in {days} days")),
        (None, Some(minutes)) => Some(format!("Ready in {minutes} minutes")),
        (None, None) => None,
    }
}

/// Fold outputs that would render identically. A later duplicate replaces
/// the content of the earlier slot but keeps that slot's position.
pub fn prune_outputs(outputs: &[OutputItem]) -> Vec<&OutputItem> {
    let mut retained: Vec<(SimilarityKey, &OutputItem)> = Vec::with_capacity(outputs.len());
    for output in outputs {
        let key = SimilarityKey::of_output(output);
        match retained.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = output,
            None => retained.push((key, output)),
        }
    }
    retained.into_iter().map(|(_, output)| output).collect()
}

/// Every identity a machine's rules can produce, without resolving items.
///
/// A superset of the identities in [`RuleEntryBuilder::build`]'s output,
/// since the build drops rules whose items all fail to resolve.
pub fn derive_rule_idents(machine: &MachineDef) -> BTreeSet<RuleIdent> {
    machine
        .output_rules
        .iter()
        .flat_map(|rule| {
            rule.triggers.iter().enumerate().map(|(index, trigger)| {
                RuleIdent::new(machine.id.clone(), &rule.id, &trigger.id, index)
            })
        })
        .collect()
}

/// Map a `quality_*` context tag to a quality level.
fn quality_from_tags<S: AsRef<str>>(tags: &[S]) -> Option<i32> {
    tags.iter().find_map(|tag| match tag.as_ref().trim().to_lowercase().as_str() {
        "quality_none" => Some(0),
        "quality_silver" => Some(1),
        "quality_gold" => Some(2),
        "quality_iridium" => Some(4),
        _ => None,
    })
}

/// Builds [`RuleEntry`] lists for machines.
pub struct RuleEntryBuilder<'a> {
    resolver: &'a dyn ItemQueryResolver,
    matcher: &'a TagMatcher,
    fuel_provider: Option<&'a dyn ExtraFuelProvider>,
}

impl<'a> RuleEntryBuilder<'a> {
    pub fn new(resolver: &'a dyn ItemQueryResolver, matcher: &'a TagMatcher) -> Self {
        Self {
            resolver,
            matcher,
            fuel_provider: None,
        }
    }

    pub fn with_fuel_provider(mut self, provider: &'a dyn ExtraFuelProvider) -> Self {
        self.fuel_provider = Some(provider);
        self
    }

    /// Look the machine up in `table` and build its entries.
    pub fn build_for(
        &self,
        table: &MachineTable,
        machine: &MachineId,
    ) -> Result<Vec<RuleEntry>, BuildError> {
        let def = table
            .get(machine)
            .ok_or_else(|| BuildError::UnknownMachine(machine.clone()))?;
        self.build(def)
    }

    /// Build every entry for one machine, in declaration order.
    pub fn build(&self, machine: &MachineDef) -> Result<Vec<RuleEntry>, BuildError> {
        let shared_fuel = self.shared_fuel(machine);
        let mut entries = Vec::new();
        for rule in &machine.output_rules {
            self.build_rule(machine, rule, &shared_fuel, &mut entries)?;
        }
        debug!(machine = %machine.id, entries = entries.len(), "built rule entries");
        Ok(entries)
    }

    fn build_rule(
        &self,
        machine: &MachineDef,
        rule: &OutputRule,
        shared_fuel: &[RuleItem],
        entries: &mut Vec<RuleEntry>,
    ) -> Result<(), BuildError> {
        let ready = ready_line(rule);
        let mut plain = Vec::new();
        let mut variants = Vec::new();
        for output in prune_outputs(&rule.outputs) {
            let visuals: Vec<OutputVisual> = self
                .output_visuals(output)
                .into_iter()
                .map(|visual| OutputVisual {
                    visual: match &ready {
                        Some(line) => visual.line(line.clone()),
                        None => visual,
                    },
                    copy_color: output.copy_color,
                })
                .collect();
            if visuals.is_empty() {
                continue;
            }
            let extra = match self.fuel_provider {
                Some(provider) => provider.extra_fuel(&machine.id, output)?,
                None => Vec::new(),
            };
            let fuel = self.extra_fuel_visuals(&extra);
            if fuel.is_empty() {
                plain.extend(visuals);
            } else {
                variants.push(FuelVariant {
                    outputs: visuals,
                    fuel,
                });
            }
        }

        let triggers: Vec<(RuleIdent, bool, Vec<RuleItem>)> = rule
            .triggers
            .iter()
            .enumerate()
            .map(|(index, trigger)| {
                let ident = RuleIdent::new(machine.id.clone(), &rule.id, &trigger.id, index);
                if trigger.kinds.is_item_placement() {
                    (ident, true, self.trigger_inputs(trigger, shared_fuel))
                } else {
                    (ident, false, vec![trigger_placeholder(trigger)])
                }
            })
            .collect();

        let has_outputs = !plain.is_empty() || !variants.is_empty();
        let has_inputs = triggers
            .iter()
            .any(|(_, can_check, inputs)| *can_check && inputs.iter().any(|i| !i.is_placeholder()));
        if !has_outputs && !has_inputs {
            debug!(machine = %machine.id, rule = %rule.id, "dropping rule with nothing resolved");
            return Ok(());
        }

        for (ident, can_check, inputs) in triggers {
            let inputs = if inputs.is_empty() {
                vec![unresolved_trigger_placeholder(&rule.triggers[ident.trigger_index])]
            } else {
                inputs
            };
            let tint = self.input_color(&inputs);
            if !plain.is_empty() || variants.is_empty() {
                let outputs = if plain.is_empty() {
                    vec![RuleItem::placeholder("???")]
                } else {
                    paint_outputs(&plain, tint)
                };
                entries.push(RuleEntry {
                    ident: ident.clone(),
                    can_check,
                    inputs: inputs.clone(),
                    outputs,
                    extra_fuel: false,
                });
            }
            for variant in &variants {
                let mut with_fuel = inputs.clone();
                with_fuel.extend(variant.fuel.iter().cloned());
                entries.push(RuleEntry {
                    ident: ident.clone(),
                    can_check,
                    inputs: with_fuel,
                    outputs: paint_outputs(&variant.outputs, tint),
                    extra_fuel: true,
                });
            }
        }
        Ok(())
    }

    /// Query the resolver, swallowing failures.
    fn query(&self, query: &str) -> Vec<ResolvedItem> {
        match self.resolver.resolve(query) {
            Ok(items) => items,
            Err(err) => {
                debug!(query, error = %err, "item query failed");
                Vec::new()
            }
        }
    }

    fn shared_fuel(&self, machine: &MachineDef) -> Vec<RuleItem> {
        machine
            .additional_consumed
            .iter()
            .filter_map(|consumed| {
                let item = self.query(&consumed.item_id).into_iter().next()?;
                Some(
                    RuleItem::from_resolved(&item)
                        .with_count(consumed.required_count)
                        .overlay(IconOverlay::Fuel),
                )
            })
            .collect()
    }

    fn extra_fuel_visuals(&self, extra: &[ExtraFuel]) -> Vec<RuleItem> {
        let mut visuals = Vec::new();
        for fuel in extra {
            let items: Vec<ResolvedItem> = match &fuel.requirement {
                FuelRequirement::Item(id) => self.query(id).into_iter().take(1).collect(),
                FuelRequirement::Tags(tags) => self
                    .matcher
                    .match_tags(self.resolver, tags.as_slice())
                    .map(|items| items.to_vec())
                    .unwrap_or_default(),
            };
            visuals.extend(items.iter().map(|item| {
                RuleItem::from_resolved(item)
                    .with_count(fuel.count)
                    .overlay(IconOverlay::Fuel)
            }));
        }
        visuals
    }

    fn output_visuals(&self, output: &OutputItem) -> Vec<RuleItem> {
        if let Some(method) = &output.output_method {
            return vec![
                RuleItem::placeholder(method.label())
                    .overlay(IconOverlay::Special)
                    .line("special"),
            ];
        }

        let candidates: Vec<&str> = if output.random_item_ids.is_empty() {
            output.item_id.as_deref().into_iter().collect()
        } else {
            output.random_item_ids.iter().map(String::as_str).collect()
        };

        let mut visuals: Vec<RuleItem> = Vec::new();
        for candidate in candidates.into_iter().filter(|c| !c.trim().is_empty()) {
            let (query, token) = substitute_slot_tokens(candidate);
            let items = self.query(&query);
            if items.is_empty() {
                if let Some(token) = token {
                    visuals.push(self.decorate_output(RuleItem::placeholder(token), output));
                }
                continue;
            }
            for item in items {
                let visual = self.decorate_output(RuleItem::from_resolved(&item), output);
                if !visuals.iter().any(|v| v.similar_to(&visual)) {
                    visuals.push(visual);
                }
            }
        }
        visuals
    }

    fn decorate_output(&self, visual: RuleItem, output: &OutputItem) -> RuleItem {
        let mut visual = visual.with_quality(output.quality);
        if output.min_stack > 1 {
            visual = visual.with_count(output.min_stack as u32);
        }
        if output.max_stack > output.min_stack.max(1) {
            visual = visual.line(format!("{}-{}", output.min_stack.max(1), output.max_stack));
        }
        if let Some(condition) = &output.condition {
            visual = visual.overlay(IconOverlay::Warning).line(condition.clone());
        }
        visual.key.quality = output.quality;
        visual.key.min_stack = output.min_stack;
        visual.key.max_stack = output.max_stack;
        visual.key.random_item_ids = output.random_item_ids.clone();
        if visual.key.preserve_id.is_none() {
            visual.key.preserve_id = output.preserve_id.clone();
        }
        visual
    }

    fn trigger_inputs(&self, trigger: &TriggerRule, shared_fuel: &[RuleItem]) -> Vec<RuleItem> {
        let resolved: Vec<RuleItem> = match &trigger.required_item_id {
            Some(base) => {
                if preserve_ingredient(trigger.required_tags.as_slice()).is_some() {
                    resolve_flavored(self.resolver, trigger.required_tags.as_slice(), base)
                        .into_iter()
                        .collect()
                } else {
                    self.query(base)
                        .iter()
                        .take(1)
                        .map(RuleItem::from_resolved)
                        .collect()
                }
            }
            None => self.tag_inputs(trigger.required_tags.as_slice()),
        };
        if resolved.is_empty() {
            return Vec::new();
        }

        let quality = quality_from_tags(trigger.required_tags.as_slice()).unwrap_or(-1);
        let mut inputs: Vec<RuleItem> = resolved
            .into_iter()
            .map(|visual| {
                let visual = visual
                    .with_count(trigger.required_count)
                    .with_quality(quality);
                match &trigger.condition {
                    Some(condition) => visual.overlay(IconOverlay::Condition).line(condition.clone()),
                    None => visual,
                }
            })
            .collect();
        inputs.extend(shared_fuel.iter().cloned());
        inputs
    }

    /// Color of the first input: its own tint for flavored items, else the
    /// catalog color of the item.
    fn input_color(&self, inputs: &[RuleItem]) -> Option<Color> {
        let first = inputs.first()?;
        first
            .tint()
            .or_else(|| self.resolver.catalog().get(first.item_id()?)?.color)
    }

    /// Inputs for a trigger with no item id. With a preserve tag, each match
    /// that is a preserve base item becomes its flavored variant, and a base
    /// whose flavored variant doesn't resolve is left out.
    fn tag_inputs(&self, tags: &[String]) -> Vec<RuleItem> {
        let Some(matched) = self.matcher.match_tags(self.resolver, tags) else {
            return Vec::new();
        };
        let flavored = preserve_ingredient(tags).is_some();
        matched
            .iter()
            .filter_map(|item| {
                if flavored && PreserveType::from_base_item(&item.id).is_some() {
                    resolve_flavored(self.resolver, tags, &item.id)
                } else {
                    Some(RuleItem::from_resolved(item))
                }
            })
            .collect()
    }
}

/// Input visual for a trigger that isn't item placement.
fn trigger_placeholder(trigger: &TriggerRule) -> RuleItem {
    let visual = RuleItem::placeholder(&trigger.kinds.to_string());
    match &trigger.condition {
        Some(condition) => visual.overlay(IconOverlay::Condition).line(condition.clone()),
        None => visual,
    }
}

/// Input visual for an item trigger whose item could not be resolved.
fn unresolved_trigger_placeholder(trigger: &TriggerRule) -> RuleItem {
    let label = match &trigger.required_item_id {
        Some(id) => id.clone(),
        None => trigger.required_tags.join(", "),
    };
    RuleItem::placeholder(&label)
}
