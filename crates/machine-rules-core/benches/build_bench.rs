//! Criterion benchmarks for rule entry construction.
//!
//! Two benchmark groups:
//! - `build`: one wide machine (200 rules) with cold and warm tag caches
//! - `reconcile`: pruning a large toggle state against the machine table

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use machine_rules_core::builder::{RuleEntryBuilder, derive_rule_idents};
use machine_rules_core::catalog::{ItemCatalog, ItemCatalogBuilder, ItemRecord};
use machine_rules_core::id::{MachineId, RuleIdent};
use machine_rules_core::machine::{MachineDef, MachineTable, OutputItem, OutputRule, TriggerRule};
use machine_rules_core::query::CatalogQuery;
use machine_rules_core::tags::TagMatcher;
use machine_rules_core::test_utils::*;
use machine_rules_core::toggle::ToggleState;
use std::collections::BTreeSet;
use std::hint::black_box;
use std::sync::Arc;

// ===========================================================================
// Fixtures
// ===========================================================================

const ITEM_COUNT: usize = 2000;
const RULE_COUNT: usize = 200;

/// Catalog of synthetic items spread over 20 tags.
fn wide_catalog() -> ItemCatalog {
    let mut b = ItemCatalogBuilder::new();
    for i in 0..ITEM_COUNT {
        b.register(
            ItemRecord::new(&format!("(O)bench_{i}"), &format!("Item {i}"))
                .with_tags([format!("group_{}", i % 20), format!("parity_{}", i % 2)]),
        );
    }
    b.build().unwrap()
}

/// A machine alternating direct-id rules and tag-expression rules.
fn wide_machine() -> MachineDef {
    let mut machine = MachineDef::new(KEG);
    for i in 0..RULE_COUNT {
        let trigger = if i % 2 == 0 {
            TriggerRule::item_placed("").with_item(&format!("(O)bench_{i}"))
        } else {
            TriggerRule::item_placed("")
                .with_tags([format!("group_{}", i % 20), "!parity_0".to_string()])
        };
        machine = machine.rule(
            OutputRule::new(&format!("rule_{i}"))
                .trigger(trigger)
                .output(OutputItem::item("out", &format!("(O)bench_{}", (i * 7) % ITEM_COUNT))),
        );
    }
    machine.ensure_unique_ids();
    machine
}

// ===========================================================================
// Benchmarks
// ===========================================================================

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    group.sample_size(30);

    let resolver = CatalogQuery::new(Arc::new(wide_catalog()));
    let machine = wide_machine();

    group.bench_function("200_rules_cold_cache", |b| {
        b.iter_batched(
            TagMatcher::new,
            |matcher| {
                let builder = RuleEntryBuilder::new(&resolver, &matcher);
                black_box(builder.build(&machine).unwrap())
            },
            BatchSize::SmallInput,
        )
    });

    let matcher = TagMatcher::new();
    let builder = RuleEntryBuilder::new(&resolver, &matcher);
    group.bench_function("200_rules_warm_cache", |b| {
        b.iter(|| black_box(builder.build(&machine).unwrap()))
    });

    group.finish();
}

fn bench_reconcile(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile");
    group.sample_size(30);

    let catalog = wide_catalog();
    let table: MachineTable = [wide_machine()].into_iter().collect();
    let keg = MachineId::new(KEG);
    let mut disabled: BTreeSet<RuleIdent> = table
        .get(&keg)
        .map(derive_rule_idents)
        .unwrap_or_default();
    disabled.extend((0..RULE_COUNT).map(|i| RuleIdent::new(keg.clone(), format!("gone_{i}"), "x", 0)));

    group.bench_function("400_idents_half_stale", |b| {
        b.iter_batched(
            || {
                let mut state = ToggleState::new();
                state.set_disabled(&keg, &BTreeSet::new(), &disabled);
                state
            },
            |mut state| black_box(state.reconcile(&table, &catalog)),
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(benches, bench_build, bench_reconcile);
criterion_main!(benches);
