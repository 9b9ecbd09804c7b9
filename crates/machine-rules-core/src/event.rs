//! Content change notifications from the host.
//!
//! The host tells the panel when one of its content assets was reloaded or
//! when a save finished loading. The panel reacts by dropping the caches
//! derived from that asset, or by reconciling toggle state.

use std::fmt;

/// A content asset the resolver derives data from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// The item catalog. Invalidates tag matches and built entries.
    Items,
    /// The machine table. Invalidates built entries.
    Machines,
    /// Extra fuel definitions from an integration. Invalidates built entries.
    ExtraMachineConfig,
}

impl AssetKind {
    /// Whether tag matcher results depend on this asset.
    pub fn affects_tag_cache(self) -> bool {
        matches!(self, AssetKind::Items)
    }

    pub fn name(self) -> &'static str {
        match self {
            AssetKind::Items => "items",
            AssetKind::Machines => "machines",
            AssetKind::ExtraMachineConfig => "extra_machine_config",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEvent {
    AssetInvalidated(AssetKind),
    /// A save was loaded; persisted state must be checked against content.
    SaveLoaded,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_items_affect_tag_cache() {
        assert!(AssetKind::Items.affects_tag_cache());
        assert!(!AssetKind::Machines.affects_tag_cache());
        assert!(!AssetKind::ExtraMachineConfig.affects_tag_cache());
    }

    #[test]
    fn asset_names() {
        assert_eq!(AssetKind::ExtraMachineConfig.to_string(), "extra_machine_config");
    }
}
