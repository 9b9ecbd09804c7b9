//! Property-based tests for the machine rule resolver.
//!
//! Uses proptest to generate random catalogs, tag expressions, machines and
//! toggle edits, then verify the resolver's invariants hold.

use machine_rules_core::builder::{derive_rule_idents, prune_outputs};
use machine_rules_core::catalog::{ItemCatalog, ItemCatalogBuilder, ItemRecord};
use machine_rules_core::id::{MachineId, RuleIdent};
use machine_rules_core::machine::{MachineDef, MachineTable, OutputItem, OutputRule, TriggerRule};
use machine_rules_core::query::CatalogQuery;
use machine_rules_core::tags::TagMatcher;
use machine_rules_core::test_utils::*;
use machine_rules_core::toggle::ToggleState;
use machine_rules_core::visual::SimilarityKey;
use proptest::prelude::*;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

const TAGS: &[&str] = &["red", "green", "blue", "round", "sweet"];

// ===========================================================================
// Generators
// ===========================================================================

/// Items as tag bitmasks over [`TAGS`].
fn arb_catalog() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(0..32u8, 1..30)
}

fn build_catalog(masks: &[u8]) -> ItemCatalog {
    let mut b = ItemCatalogBuilder::new();
    for (i, mask) in masks.iter().enumerate() {
        let tags: Vec<&str> = TAGS
            .iter()
            .enumerate()
            .filter(|(bit, _)| mask & (1 << bit) != 0)
            .map(|(_, tag)| *tag)
            .collect();
        b.register(ItemRecord::new(&format!("(O)p{i:03}"), &format!("P{i}")).with_tags(tags));
    }
    b.build().unwrap()
}

/// A non-empty tag expression: (tag index, negated).
fn arb_expression() -> impl Strategy<Value = Vec<(usize, bool)>> {
    proptest::collection::vec((0..TAGS.len(), any::<bool>()), 1..4)
}

fn arb_output() -> impl Strategy<Value = OutputItem> {
    (0..3usize, -1..3i32, 0..100u32).prop_map(|(item, quality, tag)| {
        OutputItem::item(&format!("out{tag}"), [WINE, JELLY, JUICE][item]).with_quality(quality)
    })
}

/// Rule and trigger ids drawn from a tiny alphabet so collisions are common.
fn arb_machine() -> impl Strategy<Value = MachineDef> {
    let trigger_ids = proptest::collection::vec(prop_oneof![Just(""), Just("a"), Just("a_1")], 1..4);
    let rule = (prop_oneof![Just(""), Just("r"), Just("r_1")], trigger_ids);
    proptest::collection::vec(rule, 1..6).prop_map(|rules| {
        let mut machine = MachineDef::new(KEG);
        for (rule_id, triggers) in rules {
            let mut rule = OutputRule::new(rule_id).output(OutputItem::item("wine", WINE));
            for trigger_id in triggers {
                rule = rule.trigger(TriggerRule::item_placed(trigger_id).with_item(GRAPE));
            }
            machine = machine.rule(rule);
        }
        machine
    })
}

fn arb_idents() -> impl Strategy<Value = BTreeSet<RuleIdent>> {
    proptest::collection::btree_set(
        (prop_oneof![Just("Wine"), Just("Juice"), Just("Gone")], 0..3usize).prop_map(
            |(rule, index)| RuleIdent::new(MachineId::new(KEG), rule, "ItemPlacedInMachine", index),
        ),
        0..6,
    )
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Matching equals the brute-force filter: every positive tag, no negative.
    #[test]
    fn tag_match_agrees_with_filter(masks in arb_catalog(), expr in arb_expression()) {
        let catalog = Arc::new(build_catalog(&masks));
        let resolver = CatalogQuery::new(Arc::clone(&catalog));
        let matcher = TagMatcher::new();
        let tags: Vec<String> = expr
            .iter()
            .map(|&(i, neg)| if neg { format!("!{}", TAGS[i]) } else { TAGS[i].to_string() })
            .collect();

        let expected: BTreeSet<String> = catalog
            .iter()
            .filter(|item| {
                expr.iter().all(|&(i, neg)| item.has_tag(TAGS[i]) != neg)
            })
            .map(|item| item.id.clone())
            .collect();

        let actual: BTreeSet<String> = matcher
            .match_tags(&resolver, tags.as_slice())
            .map(|items| items.iter().map(|i| i.id.clone()).collect())
            .unwrap_or_default();
        prop_assert_eq!(actual, expected);
    }

    /// A cached answer is the same as a fresh one.
    #[test]
    fn cached_match_is_stable(masks in arb_catalog(), expr in arb_expression()) {
        let resolver = CatalogQuery::new(Arc::new(build_catalog(&masks)));
        let matcher = TagMatcher::new();
        let tags: Vec<String> = expr
            .iter()
            .map(|&(i, neg)| if neg { format!("!{}", TAGS[i]) } else { TAGS[i].to_string() })
            .collect();
        let first = matcher.match_tags(&resolver, tags.as_slice());
        let second = matcher.match_tags(&resolver, tags.as_slice());
        prop_assert_eq!(first, second);
        prop_assert_eq!(matcher.stats().hits, 1);
    }

    /// Folding keeps one output per similarity key, at the key's first
    /// position, holding the key's last occurrence.
    #[test]
    fn prune_keeps_last_duplicate_at_first_slot(outputs in proptest::collection::vec(arb_output(), 0..12)) {
        let retained = prune_outputs(&outputs);
        let keys: Vec<SimilarityKey> = retained.iter().map(|o| SimilarityKey::of_output(o)).collect();
        let unique: HashSet<&SimilarityKey> = keys.iter().collect();
        prop_assert_eq!(unique.len(), keys.len());

        let mut first_seen: Vec<SimilarityKey> = Vec::new();
        for output in &outputs {
            let key = SimilarityKey::of_output(output);
            if !first_seen.contains(&key) {
                first_seen.push(key);
            }
        }
        prop_assert_eq!(&keys, &first_seen);

        for (key, output) in keys.iter().zip(&retained) {
            let last = outputs.iter().rev().find(|o| SimilarityKey::of_output(o) == *key).unwrap();
            prop_assert_eq!(*output, last);
        }
    }

    /// After making ids unique, every derived identity is distinct and a
    /// second pass changes nothing.
    #[test]
    fn unique_ids_are_distinct_and_stable(machine in arb_machine()) {
        let mut machine = machine;
        machine.ensure_unique_ids();
        let rule_ids: HashSet<&str> = machine.output_rules.iter().map(|r| r.id.as_str()).collect();
        prop_assert_eq!(rule_ids.len(), machine.output_rules.len());

        let pairings: usize = machine.output_rules.iter().map(|r| r.triggers.len()).sum();
        prop_assert_eq!(derive_rule_idents(&machine).len(), pairings);

        let again = {
            let mut copy = machine.clone();
            copy.ensure_unique_ids();
            copy
        };
        prop_assert_eq!(again, machine);
    }

    /// Toggle edits compute (old minus enabled) union disabled.
    #[test]
    fn set_disabled_is_set_algebra(
        old in arb_idents(),
        enabled in arb_idents(),
        disabled in arb_idents(),
    ) {
        let keg = MachineId::new(KEG);
        let mut state = ToggleState::new();
        state.set_disabled(&keg, &BTreeSet::new(), &old);
        state.set_disabled(&keg, &enabled, &disabled);

        let expected: BTreeSet<RuleIdent> =
            old.difference(&enabled).cloned().chain(disabled.iter().cloned()).collect();
        let actual = state.disabled(&keg).map(|set| set.rules.clone()).unwrap_or_default();
        prop_assert_eq!(actual, expected);
    }

    /// Reconciliation only removes, leaves only derivable idents, and is
    /// idempotent.
    #[test]
    fn reconcile_is_a_pure_shrink(disabled in arb_idents()) {
        let table: MachineTable = sample_machines();
        let catalog = sample_catalog();
        let keg = MachineId::new(KEG);
        let mut state = ToggleState::new();
        state.set_disabled(&keg, &BTreeSet::new(), &disabled);

        state.reconcile(&table, &catalog);
        let legal = table.get(&keg).map(derive_rule_idents).unwrap_or_default();
        let kept = state.disabled(&keg).map(|set| set.rules.clone()).unwrap_or_default();
        prop_assert!(kept.is_subset(&disabled));
        prop_assert!(kept.is_subset(&legal));
        prop_assert_eq!(kept, disabled.intersection(&legal).cloned().collect::<BTreeSet<_>>());

        prop_assert!(state.reconcile(&table, &catalog).is_clean());
    }
}
