//! Shared test helpers for unit tests, integration tests, and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::catalog::{Color, ItemCatalog, ItemCatalogBuilder, ItemRecord};
use crate::machine::{MachineDef, MachineTable, OutputItem, OutputMethod, OutputRule, TriggerRule};
use crate::query::CatalogQuery;
use std::sync::Arc;

// ===========================================================================
// Machine ids
// ===========================================================================

pub const KEG: &str = "(BC)12";
pub const FURNACE: &str = "(BC)13";
pub const RECYCLER: &str = "(BC)20";

// ===========================================================================
// Item ids
// ===========================================================================

pub const WHEAT: &str = "(O)262";
pub const GRAPE: &str = "(O)398";
pub const APPLE: &str = "(O)613";
pub const SUNFLOWER: &str = "(O)421";
pub const TRASH: &str = "(O)168";

pub const COAL: &str = "(O)382";
pub const COPPER_ORE: &str = "(O)378";
pub const COPPER_BAR: &str = "(O)334";

// Preserve base items
pub const WINE: &str = "(O)348";
pub const JELLY: &str = "(O)344";
pub const PICKLE: &str = "(O)342";
pub const JUICE: &str = "(O)350";
pub const HONEY: &str = "(O)340";

pub fn grape_color() -> Color {
    Color::rgb(96, 48, 128)
}

pub fn sunflower_color() -> Color {
    Color::rgb(240, 200, 40)
}

// ===========================================================================
// Catalog
// ===========================================================================

/// Small item catalog covering every id the fixtures reference.
///
/// Only grape and apple carry `category_fruits`; apple is also a
/// `fruit_tree_item`.
pub fn sample_catalog() -> ItemCatalog {
    let mut b = ItemCatalogBuilder::new();
    b.register(
        ItemRecord::new(WHEAT, "Wheat")
            .with_category(-16)
            .with_tags(["category_basic", "crop"]),
    );
    b.register(
        ItemRecord::new(GRAPE, "Grape")
            .with_category(-79)
            .with_tags(["category_fruits", "crop"])
            .with_color(grape_color()),
    );
    b.register(
        ItemRecord::new(APPLE, "Apple")
            .with_category(-79)
            .with_tags(["category_fruits", "fruit_tree_item"])
            .with_color(Color::rgb(200, 30, 30)),
    );
    b.register(
        ItemRecord::new(SUNFLOWER, "Sunflower")
            .with_category(-80)
            .with_tags(["category_flowers", "crop"])
            .with_color(sunflower_color()),
    );
    b.register(ItemRecord::new(TRASH, "Trash").with_tags(["category_trash"]));
    b.register(ItemRecord::new(COAL, "Coal").with_tags(["category_minerals"]));
    b.register(ItemRecord::new(COPPER_ORE, "Copper Ore").with_tags(["ore_item"]));
    b.register(ItemRecord::new(COPPER_BAR, "Copper Bar").with_tags(["bar_item"]));
    for (id, name) in [
        (WINE, "Wine"),
        (JELLY, "Jelly"),
        (PICKLE, "Pickles"),
        (JUICE, "Juice"),
        (HONEY, "Honey"),
    ] {
        b.register(
            ItemRecord::new(id, name)
                .with_category(-26)
                .with_tags(["category_artisan_goods"]),
        );
    }
    for (id, name) in [(KEG, "Keg"), (FURNACE, "Furnace"), (RECYCLER, "Recycling Machine")] {
        b.register(ItemRecord::new(id, name).with_tags(["category_big_craftable"]));
    }
    // Fixture ids are unique by construction.
    b.build().unwrap()
}

/// Resolver over a fresh [`sample_catalog`].
pub fn sample_resolver() -> CatalogQuery {
    CatalogQuery::new(Arc::new(sample_catalog()))
}

// ===========================================================================
// Machines
// ===========================================================================

/// Keg turning wheat into wine. The trigger has no id, so its identity is
/// `(KEG, "Wine", "ItemPlacedInMachine", 0)` once ids are made unique.
pub fn keg_wheat_wine() -> MachineDef {
    MachineDef::new(KEG).rule(
        OutputRule::new("Wine")
            .trigger(TriggerRule::item_placed("").with_item(WHEAT))
            .output(OutputItem::item("wine", WINE)),
    )
}

/// Keg with the wheat rule plus a fruit juice rule driven by a context tag.
pub fn keg() -> MachineDef {
    keg_wheat_wine().rule(
        OutputRule::new("Juice")
            .trigger(TriggerRule::item_placed("").with_tags(["category_fruits"]))
            .output(OutputItem::item("juice", "FLAVORED_ITEM Juice DROP_IN_ID")),
    )
}

/// Furnace smelting five copper ore into a bar, burning one coal per batch.
pub fn furnace() -> MachineDef {
    MachineDef::new(FURNACE)
        .rule(
            OutputRule::new("copper")
                .trigger(TriggerRule::item_placed("").with_item(COPPER_ORE).with_count(5))
                .output(OutputItem::item("bar", COPPER_BAR)),
        )
        .consumes(COAL, 1)
}

/// Recycler whose only output is a complex method.
pub fn recycler() -> MachineDef {
    MachineDef::new(RECYCLER).rule(
        OutputRule::new("Recycle")
            .trigger(TriggerRule::item_placed("").with_tags(["category_trash"]))
            .output(OutputItem::method(
                "parts",
                OutputMethod::from_reference("StardewValley.Object, Stardew Valley: OutputDeconstructor"),
            )),
    )
}

pub fn sample_machines() -> MachineTable {
    [keg(), furnace(), recycler()].into_iter().collect()
}
