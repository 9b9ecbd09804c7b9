//! Integration tests: content packs loaded from disk into a control panel.
//!
//! Each test writes a small pack into a temp directory, mixing the three
//! supported formats, and drives the resulting panel.

use machine_rules_core::id::{MachineId, RuleIdent};
use machine_rules_core::test_utils::{COAL, COPPER_BAR, COPPER_ORE, FURNACE, KEG, WHEAT, WINE};
use machine_rules_data::{DataLoadError, load_content_pack};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

fn make_pack_dir(suffix: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "machine_rules_pack_{suffix}_{}",
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn cleanup(dir: &Path) {
    let _ = fs::remove_dir_all(dir);
}

const ITEMS_JSON: &str = r#"[
    {"id": "262", "name": "Wheat", "category": -16, "tags": ["crop"]},
    {"id": "348", "name": "Wine", "category": -26},
    {"id": "378", "name": "Copper Ore", "tags": ["ore_item"]},
    {"id": "334", "name": "Copper Bar"},
    {"id": "382", "name": "Coal", "tags": ["category_minerals"]},
    {"id": "(BC)12", "name": "Keg"},
    {"id": "(BC)13", "name": "Furnace"}
]"#;

const MACHINES_RON: &str = r#"[
    (
        id: "(BC)12",
        output_rules: [
            (
                id: "Wine",
                triggers: [(required_item_id: Some("262"))],
                outputs: [(id: "wine", item_id: Some("(O)348"))],
            ),
            (
                id: "Aging",
                triggers: [(trigger: Some("DayUpdate"), condition: Some("DAY_OF_MONTH 1"))],
                outputs: [(id: "aged", item_id: Some("(O)348"), quality: 2)],
            ),
        ],
    ),
    (
        id: "(BC)13",
        output_rules: [
            (
                id: "copper",
                triggers: [(required_item_id: Some("378"), required_count: 5)],
                outputs: [(id: "bar", item_id: Some("(O)334"))],
            ),
        ],
    ),
]"#;

const EXTRA_FUEL_TOML: &str = r#"
[[extra_fuel]]
machine = "(BC)13"
output = "bar"

[[extra_fuel.fuel]]
item_id = "382"
count = 2
"#;

fn write_pack(dir: &Path) {
    fs::write(dir.join("items.json"), ITEMS_JSON).unwrap();
    fs::write(dir.join("machines.ron"), MACHINES_RON).unwrap();
    fs::write(dir.join("extra_machine_config.toml"), EXTRA_FUEL_TOML).unwrap();
}

fn wine_ident() -> RuleIdent {
    RuleIdent::new(MachineId::new(KEG), "Wine", "ItemPlacedInMachine", 0)
}

#[test]
fn pack_builds_keg_entries() {
    let dir = make_pack_dir("keg");
    write_pack(&dir);
    let mut panel = load_content_pack(&dir).unwrap().into_panel();

    let entries = panel.open(&MachineId::new(KEG));
    assert_eq!(entries.len(), 2);

    let wine = &entries[0];
    assert_eq!(wine.ident, wine_ident());
    assert!(wine.can_check);
    assert_eq!(wine.inputs[0].item_id(), Some(WHEAT));
    assert_eq!(wine.outputs[0].item_id(), Some(WINE));

    let aging = &entries[1];
    assert!(!aging.can_check);
    assert!(aging.inputs[0].is_placeholder());
    cleanup(&dir);
}

#[test]
fn extra_machine_config_adds_fuel_variant() {
    let dir = make_pack_dir("fuel");
    write_pack(&dir);
    let mut panel = load_content_pack(&dir).unwrap().into_panel();

    let entries = panel.open(&MachineId::new(FURNACE));
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert!(entry.extra_fuel);
    let ids: Vec<_> = entry.inputs.iter().filter_map(|i| i.item_id()).collect();
    assert_eq!(ids, vec![COPPER_ORE, COAL]);
    assert_eq!(entry.outputs[0].item_id(), Some(COPPER_BAR));
    cleanup(&dir);
}

#[test]
fn config_can_turn_off_the_integration() {
    let dir = make_pack_dir("no_fuel");
    write_pack(&dir);
    fs::write(dir.join("config.toml"), "extra_machine_config = false\n").unwrap();
    let pack = load_content_pack(&dir).unwrap();
    assert!(!pack.config.extra_machine_config);
    let mut panel = pack.into_panel();

    let entries = panel.open(&MachineId::new(FURNACE));
    assert_eq!(entries.len(), 1);
    assert!(!entries[0].extra_fuel);
    assert_eq!(entries[0].inputs.len(), 1);
    cleanup(&dir);
}

#[test]
fn malformed_fuel_entry_only_fails_its_machine() {
    let dir = make_pack_dir("bad_fuel");
    write_pack(&dir);
    fs::write(
        dir.join("extra_machine_config.toml"),
        "[[extra_fuel]]\nmachine = \"(BC)13\"\n\n[[extra_fuel.fuel]]\ncount = 2\n",
    )
    .unwrap();
    let mut panel = load_content_pack(&dir).unwrap().into_panel();

    assert!(panel.open(&MachineId::new(FURNACE)).is_empty());
    assert_eq!(panel.cached_machines(), 0);
    assert_eq!(panel.open(&MachineId::new(KEG)).len(), 2);
    cleanup(&dir);
}

#[test]
fn toggles_survive_a_pack_reload() {
    let dir = make_pack_dir("reload");
    write_pack(&dir);
    let mut panel = load_content_pack(&dir).unwrap().into_panel();
    let disabled: BTreeSet<RuleIdent> = [wine_ident()].into_iter().collect();
    panel.apply_rule_toggles(&MachineId::new(KEG), &BTreeSet::new(), &disabled);
    let save = panel.save_json().unwrap();

    let mut reloaded = load_content_pack(&dir).unwrap().into_panel();
    reloaded.load_json(&save).unwrap();
    assert!(!reloaded.is_enabled(&wine_ident()));
    cleanup(&dir);
}

#[test]
fn removed_machine_is_pruned_from_save() {
    let dir = make_pack_dir("removed");
    write_pack(&dir);
    let mut panel = load_content_pack(&dir).unwrap().into_panel();
    let disabled: BTreeSet<RuleIdent> = [wine_ident()].into_iter().collect();
    panel.apply_rule_toggles(&MachineId::new(KEG), &BTreeSet::new(), &disabled);
    let save = panel.save_json().unwrap();

    let furnace_only = r#"[(id: "(BC)13", output_rules: [(id: "copper",
        triggers: [(required_item_id: Some("378"), required_count: 5)],
        outputs: [(id: "bar", item_id: Some("(O)334"))])])]"#;
    fs::write(dir.join("machines.ron"), furnace_only).unwrap();
    let mut reloaded = load_content_pack(&dir).unwrap().into_panel();
    let report = reloaded.load_json(&save).unwrap();
    assert_eq!(report.machines_dropped, 1);
    assert!(reloaded.toggles().disabled(&MachineId::new(KEG)).is_none());
    cleanup(&dir);
}

#[test]
fn v1_save_loads_into_current_format() {
    let dir = make_pack_dir("v1");
    write_pack(&dir);
    let mut panel = load_content_pack(&dir).unwrap().into_panel();
    let v1 = serde_json::json!({
        "machines": {
            "(BC)12": {
                "disabled": [{
                    "machine": "(BC)12",
                    "rule": "Wine",
                    "trigger": "ItemPlacedInMachine",
                    "trigger_index": 0
                }]
            }
        }
    });
    panel.load_json(&v1.to_string()).unwrap();
    assert!(!panel.is_enabled(&wine_ident()));

    let saved: serde_json::Value = serde_json::from_str(&panel.save_json().unwrap()).unwrap();
    assert_eq!(saved["version"], 2);
    cleanup(&dir);
}

#[test]
fn missing_machines_file_is_reported() {
    let dir = make_pack_dir("missing");
    fs::write(dir.join("items.json"), ITEMS_JSON).unwrap();
    let result = load_content_pack(&dir);
    assert!(matches!(result, Err(DataLoadError::MissingRequired { .. })));
    cleanup(&dir);
}
