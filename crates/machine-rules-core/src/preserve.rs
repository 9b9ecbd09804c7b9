//! Preserve (flavored item) resolution.
//!
//! A trigger may require a flavored item, e.g. honey made from a specific
//! flower, by pairing a base item id with a `preserve_sheet_index_<id>` tag.
//! This module maps the base item to its [`PreserveType`] and asks the query
//! resolver for the flavored variant.

use crate::id::qualify_item_id;
use crate::query::ItemQueryResolver;
use crate::visual::RuleItem;

/// Context tag prefix naming a flavored item's ingredient.
pub const PRESERVE_TAG_PREFIX: &str = "preserve_sheet_index_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreserveType {
    Wine,
    Jelly,
    Pickle,
    Juice,
    Roe,
    AgedRoe,
    Honey,
    Bait,
    DriedFruit,
    DriedMushroom,
    SmokedFish,
}

const BASE_ITEMS: &[(&str, PreserveType)] = &[
    ("(O)348", PreserveType::Wine),
    ("(O)344", PreserveType::Jelly),
    ("(O)342", PreserveType::Pickle),
    ("(O)350", PreserveType::Juice),
    ("(O)812", PreserveType::Roe),
    ("(O)447", PreserveType::AgedRoe),
    ("(O)340", PreserveType::Honey),
    ("(O)SpecificBait", PreserveType::Bait),
    ("(O)DriedFruit", PreserveType::DriedFruit),
    ("(O)DriedMushrooms", PreserveType::DriedMushroom),
    ("(O)SmokedFish", PreserveType::SmokedFish),
];

impl PreserveType {
    /// The preserve type produced as `base_id`, if any.
    pub fn from_base_item(base_id: &str) -> Option<Self> {
        let qualified = qualify_item_id(base_id);
        BASE_ITEMS
            .iter()
            .find(|(id, _)| *id == qualified)
            .map(|&(_, kind)| kind)
    }

    pub fn base_item_id(self) -> &'static str {
        BASE_ITEMS
            .iter()
            .find(|(_, kind)| *kind == self)
            .map(|&(id, _)| id)
            .unwrap_or_default()
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name {
            "Wine" => PreserveType::Wine,
            "Jelly" => PreserveType::Jelly,
            "Pickle" => PreserveType::Pickle,
            "Juice" => PreserveType::Juice,
            "Roe" => PreserveType::Roe,
            "AgedRoe" => PreserveType::AgedRoe,
            "Honey" => PreserveType::Honey,
            "Bait" => PreserveType::Bait,
            "DriedFruit" => PreserveType::DriedFruit,
            "DriedMushroom" => PreserveType::DriedMushroom,
            "SmokedFish" => PreserveType::SmokedFish,
            _ => return None,
        };
        Some(kind)
    }

    pub fn name(self) -> &'static str {
        match self {
            PreserveType::Wine => "Wine",
            PreserveType::Jelly => "Jelly",
            PreserveType::Pickle => "Pickle",
            PreserveType::Juice => "Juice",
            PreserveType::Roe => "Roe",
            PreserveType::AgedRoe => "AgedRoe",
            PreserveType::Honey => "Honey",
            PreserveType::Bait => "Bait",
            PreserveType::DriedFruit => "DriedFruit",
            PreserveType::DriedMushroom => "DriedMushroom",
            PreserveType::SmokedFish => "SmokedFish",
        }
    }

    /// Display name of the flavored item, e.g. "Grape Jelly".
    pub fn flavored_name(self, ingredient: &str) -> String {
        match self {
            PreserveType::Wine => format!("{ingredient} Wine"),
            PreserveType::Jelly => format!("{ingredient} Jelly"),
            PreserveType::Pickle => format!("Pickled {ingredient}"),
            PreserveType::Juice => format!("{ingredient} Juice"),
            PreserveType::Roe => format!("{ingredient} Roe"),
            PreserveType::AgedRoe => format!("Aged {ingredient} Roe"),
            PreserveType::Honey => format!("{ingredient} Honey"),
            PreserveType::Bait => format!("{ingredient} Bait"),
            PreserveType::DriedFruit => format!("Dried {ingredient}"),
            PreserveType::DriedMushroom => format!("Dried {ingredient}"),
            PreserveType::SmokedFish => format!("Smoked {ingredient}"),
        }
    }
}

/// The ingredient id named by a `preserve_sheet_index_` tag, if present.
pub fn preserve_ingredient<S: AsRef<str>>(tags: &[S]) -> Option<String> {
    tags.iter().find_map(|tag| {
        let tag = tag.as_ref().trim();
        let index = tag.strip_prefix(PRESERVE_TAG_PREFIX)?;
        (!index.is_empty()).then(|| qualify_item_id(index))
    })
}

/// Resolve the flavored variant of `base_id` described by `tags`.
///
/// Returns `None` when no preserve tag is present, the base item has no
/// preserve type, or the flavored item cannot be resolved.
pub fn resolve_flavored<S: AsRef<str>>(
    resolver: &dyn ItemQueryResolver,
    tags: &[S],
    base_id: &str,
) -> Option<RuleItem> {
    let ingredient = preserve_ingredient(tags)?;
    let kind = PreserveType::from_base_item(base_id)?;
    let query = format!("FLAVORED_ITEM {} {}", kind.name(), ingredient);
    let item = resolver.resolve(&query).ok()?.into_iter().next()?;

    Some(RuleItem::from_resolved(&item))
}
