//! The control panel session: everything the host needs behind one type.
//!
//! [`ControlPanel`] owns the content (catalog resolver and machine table),
//! the derived caches, the toggle state and the placed instances. Hosts call
//! [`open`](ControlPanel::open) when a machine's panel is shown, forward
//! toggle edits, and report content changes through
//! [`handle`](ControlPanel::handle).
//!
//! Build failures never reach the host: they are logged and the panel shows
//! no entries for that machine.

use crate::builder::{RuleEntry, RuleEntryBuilder};
use crate::catalog::ItemCatalog;
use crate::event::{AssetKind, ContentEvent};
use crate::fuel::ExtraFuelProvider;
use crate::id::{InstanceKey, MachineId, RuleIdent};
use crate::instance::InstanceRegistry;
use crate::machine::MachineTable;
use crate::migration::MigrationRegistry;
use crate::query::{CatalogQuery, ItemQueryResolver};
use crate::serialize::{DeserializeError, SerializeError, load_from_json, save_to_json};
use crate::tags::{CacheStats, TagMatcher};
use crate::toggle::{ReconcileReport, ToggleState};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

/// Behaviour switches, normally loaded from the panel config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelOptions {
    /// Allow disabling individual input items, not just whole rules.
    pub per_item_overrides: bool,
    /// Consult the extra fuel provider when building entries.
    pub extra_machine_config: bool,
    /// Reconcile toggle state against content after loading a save.
    pub prune_on_load: bool,
}

impl Default for PanelOptions {
    fn default() -> Self {
        Self {
            per_item_overrides: true,
            extra_machine_config: true,
            prune_on_load: true,
        }
    }
}

pub struct ControlPanel {
    resolver: Box<dyn ItemQueryResolver>,
    machines: MachineTable,
    matcher: TagMatcher,
    fuel_provider: Option<Box<dyn ExtraFuelProvider>>,
    options: PanelOptions,
    toggles: ToggleState,
    migrations: MigrationRegistry,
    entries: HashMap<MachineId, Arc<[RuleEntry]>>,
    instances: InstanceRegistry,
}

impl ControlPanel {
    pub fn new(catalog: ItemCatalog, machines: MachineTable) -> Self {
        Self::with_resolver(Box::new(CatalogQuery::new(Arc::new(catalog))), machines)
    }

    /// Use a host-provided query resolver instead of [`CatalogQuery`].
    pub fn with_resolver(resolver: Box<dyn ItemQueryResolver>, machines: MachineTable) -> Self {
        Self {
            resolver,
            machines,
            matcher: TagMatcher::new(),
            fuel_provider: None,
            options: PanelOptions::default(),
            toggles: ToggleState::new(),
            migrations: MigrationRegistry::with_defaults(),
            entries: HashMap::new(),
            instances: InstanceRegistry::new(),
        }
    }

    pub fn with_options(mut self, options: PanelOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_fuel_provider(mut self, provider: Box<dyn ExtraFuelProvider>) -> Self {
        self.fuel_provider = Some(provider);
        self
    }

    // -----------------------------------------------------------------------
    // Entries
    // -----------------------------------------------------------------------

    /// Rule entries for `machine`, built on first use and cached until the
    /// content they derive from changes.
    pub fn open(&mut self, machine: &MachineId) -> Arc<[RuleEntry]> {
        if let Some(entries) = self.entries.get(machine) {
            return Arc::clone(entries);
        }

        let mut builder = RuleEntryBuilder::new(self.resolver.as_ref(), &self.matcher);
        if self.options.extra_machine_config {
            if let Some(provider) = self.fuel_provider.as_deref() {
                builder = builder.with_fuel_provider(provider);
            }
        }
        match builder.build_for(&self.machines, machine) {
            Ok(entries) => {
                let entries: Arc<[RuleEntry]> = entries.into();
                self.entries.insert(machine.clone(), Arc::clone(&entries));
                entries
            }
            Err(err) => {
                // Not cached, so a fixed integration is picked up on the next open.
                warn!(machine = %machine, error = %err, "failed to build rule entries");
                Arc::from(Vec::new())
            }
        }
    }

    /// Open the panel of a placed instance, recording the entry count in its
    /// session and pulling a remembered page back onto the last entry if
    /// the list shrank. `None` for an unknown or removed instance.
    pub fn open_instance(&mut self, key: InstanceKey) -> Option<Arc<[RuleEntry]>> {
        let machine = self.instances.machine(key)?.clone();
        let entries = self.open(&machine);
        if let Some(session) = self.instances.session_mut(key) {
            session.last_entry_count = entries.len();
            session.page = session.page.min(entries.len().saturating_sub(1));
        }
        Some(entries)
    }

    /// Remember the page an instance's panel is showing. Returns false for
    /// an unknown instance.
    pub fn select_page(&mut self, key: InstanceKey, page: usize) -> bool {
        match self.instances.session_mut(key) {
            Some(session) => {
                session.page = page;
                true
            }
            None => false,
        }
    }

    pub fn cached_machines(&self) -> usize {
        self.entries.len()
    }

    pub fn tag_cache_stats(&self) -> CacheStats {
        self.matcher.stats()
    }

    // -----------------------------------------------------------------------
    // Toggles
    // -----------------------------------------------------------------------

    pub fn is_enabled(&self, ident: &RuleIdent) -> bool {
        self.toggles.is_enabled(ident)
    }

    /// Always true while per-item overrides are switched off.
    pub fn is_input_enabled(&self, machine: &MachineId, item_id: &str) -> bool {
        !self.options.per_item_overrides || self.toggles.is_input_enabled(machine, item_id)
    }

    pub fn apply_rule_toggles(
        &mut self,
        machine: &MachineId,
        enabled: &BTreeSet<RuleIdent>,
        disabled: &BTreeSet<RuleIdent>,
    ) {
        self.toggles.set_disabled(machine, enabled, disabled);
    }

    pub fn apply_input_toggles(
        &mut self,
        machine: &MachineId,
        enabled: &BTreeSet<String>,
        disabled: &BTreeSet<String>,
    ) {
        if !self.options.per_item_overrides {
            debug!(machine = %machine, "per-item overrides are off, ignoring input toggles");
            return;
        }
        self.toggles.set_disabled_inputs(machine, enabled, disabled);
    }

    pub fn toggles(&self) -> &ToggleState {
        &self.toggles
    }

    /// Prune toggle state that no longer matches the loaded content.
    pub fn reconcile(&mut self) -> ReconcileReport {
        self.toggles.reconcile(&self.machines, self.resolver.catalog())
    }

    // -----------------------------------------------------------------------
    // Content
    // -----------------------------------------------------------------------

    pub fn handle(&mut self, event: ContentEvent) {
        match event {
            ContentEvent::AssetInvalidated(kind) => {
                if kind.affects_tag_cache() {
                    self.matcher.invalidate();
                }
                debug!(asset = %kind, cached = self.entries.len(), "dropping cached rule entries");
                self.entries.clear();
            }
            ContentEvent::SaveLoaded => {
                self.reconcile();
            }
        }
    }

    pub fn replace_catalog(&mut self, catalog: ItemCatalog) {
        self.replace_resolver(Box::new(CatalogQuery::new(Arc::new(catalog))));
    }

    pub fn replace_resolver(&mut self, resolver: Box<dyn ItemQueryResolver>) {
        self.resolver = resolver;
        self.handle(ContentEvent::AssetInvalidated(AssetKind::Items));
    }

    /// Swap the machine table. Instances of machines that no longer exist
    /// are forgotten; toggle state is left for the next reconciliation.
    pub fn replace_machines(&mut self, machines: MachineTable) {
        self.machines = machines;
        let removed = self
            .instances
            .retain_machines(|machine| self.machines.contains(machine));
        if removed > 0 {
            debug!(removed, "forgot instances of removed machines");
        }
        self.handle(ContentEvent::AssetInvalidated(AssetKind::Machines));
    }

    pub fn set_fuel_provider(&mut self, provider: Option<Box<dyn ExtraFuelProvider>>) {
        self.fuel_provider = provider;
        self.handle(ContentEvent::AssetInvalidated(AssetKind::ExtraMachineConfig));
    }

    pub fn machines(&self) -> &MachineTable {
        &self.machines
    }

    pub fn catalog(&self) -> &ItemCatalog {
        self.resolver.catalog()
    }

    pub fn options(&self) -> PanelOptions {
        self.options
    }

    pub fn instances(&self) -> &InstanceRegistry {
        &self.instances
    }

    pub fn instances_mut(&mut self) -> &mut InstanceRegistry {
        &mut self.instances
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    pub fn save_json(&self) -> Result<String, SerializeError> {
        save_to_json(&self.toggles)
    }

    /// Replace toggle state with a saved document, migrating it if needed,
    /// then reconcile unless `prune_on_load` is off. On error the current
    /// state is kept.
    pub fn load_json(&mut self, json: &str) -> Result<ReconcileReport, DeserializeError> {
        self.toggles = load_from_json(json, &self.migrations)?;
        if self.options.prune_on_load {
            Ok(self.reconcile())
        } else {
            Ok(ReconcileReport::default())
        }
    }
}
