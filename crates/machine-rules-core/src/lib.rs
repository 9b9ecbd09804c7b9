//! Machine Rules Core -- resolves machine output rules into toggleable entries.
//!
//! A machine declares output rules: "produce X when Y (with these tags and
//! conditions) is placed in it". This crate turns one machine's rules into
//! flat, displayable [`builder::RuleEntry`] values, folds outputs that would
//! look identical, resolves context-tag and flavored-item inputs, merges
//! optional extra fuel from an external integration, and keeps persisted
//! enable/disable state that survives content reloads.
//!
//! # Build Pipeline
//!
//! [`builder::RuleEntryBuilder::build`] walks a machine's rules in
//! declaration order:
//!
//! 1. **Shared fuel** -- Resolve the machine's additional consumed items once.
//! 2. **Fold** -- Collapse outputs with the same similarity key.
//! 3. **Outputs** -- Resolve each output to item visuals, or a "special"
//!    placeholder for complex output methods.
//! 4. **Extra fuel** -- Ask the integration; outputs needing fuel fork into
//!    a second entry.
//! 5. **Triggers** -- Resolve inputs by direct id, flavored item, or tag
//!    expression.
//! 6. **Pair** -- One entry per trigger and output list.
//! 7. **Drop** -- Skip rules where nothing resolved.
//!
//! # Key Types
//!
//! - [`catalog::ItemCatalog`] -- Immutable item registry (register -> build).
//! - [`query::ItemQueryResolver`] -- Host seam for item query strings.
//! - [`tags::TagMatcher`] -- Cached tag expression matching with negation.
//! - [`toggle::ToggleState`] -- Disabled rules and inputs, with reconciliation.
//! - [`panel::ControlPanel`] -- Session facade owning content, caches and state.
//! - [`serialize`] -- Versioned JSON save data with migrations.

pub mod builder;
pub mod catalog;
pub mod event;
pub mod fuel;
pub mod id;
pub mod instance;
pub mod machine;
pub mod migration;
pub mod panel;
pub mod preserve;
pub mod query;
pub mod serialize;
pub mod tags;
pub mod toggle;
pub mod visual;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
