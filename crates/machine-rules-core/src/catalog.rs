use crate::id::qualify_item_id;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// An RGB tint used for flavored and dyed items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// An item definition in the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemRecord {
    /// Qualified id, e.g. `(O)348`.
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub category: i32,
    /// Lower-cased context tags.
    pub tags: BTreeSet<String>,
    pub color: Option<Color>,
}

impl ItemRecord {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: qualify_item_id(id),
            name: name.to_string(),
            display_name: name.to_string(),
            category: 0,
            tags: BTreeSet::new(),
            color: None,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags
            .extend(tags.into_iter().map(|t| t.as_ref().trim().to_lowercase()));
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_category(mut self, category: i32) -> Self {
        self.category = category;
        self
    }

    pub fn with_display_name(mut self, display_name: &str) -> Self {
        self.display_name = display_name.to_string();
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(&tag.to_lowercase())
    }

    /// The `(<type>)` prefix of the qualified id.
    pub fn type_prefix(&self) -> &str {
        match self.id.find(')') {
            Some(end) => &self.id[..=end],
            None => "",
        }
    }
}

/// Builder for constructing an immutable [`ItemCatalog`].
/// Two-phase lifecycle: registration -> finalization.
#[derive(Debug, Default)]
pub struct ItemCatalogBuilder {
    items: Vec<ItemRecord>,
}

impl ItemCatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an item. Duplicates are reported by [`build`](Self::build).
    pub fn register(&mut self, item: ItemRecord) -> &mut Self {
        self.items.push(item);
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Finalize and build the immutable catalog.
    pub fn build(self) -> Result<ItemCatalog, CatalogError> {
        let mut by_id = HashMap::with_capacity(self.items.len());
        for (index, item) in self.items.iter().enumerate() {
            if item.id.ends_with(')') {
                return Err(CatalogError::EmptyId(item.name.clone()));
            }
            if by_id.insert(item.id.clone(), index).is_some() {
                return Err(CatalogError::DuplicateId(item.id.clone()));
            }
        }
        Ok(ItemCatalog {
            items: self.items,
            by_id,
        })
    }
}

/// Immutable item catalog. Replaced wholesale when the item asset reloads.
#[derive(Debug, Default)]
pub struct ItemCatalog {
    items: Vec<ItemRecord>,
    by_id: HashMap<String, usize>,
}

impl ItemCatalog {
    /// Look up an item by qualified or unqualified id.
    pub fn get(&self, id: &str) -> Option<&ItemRecord> {
        self.by_id
            .get(&qualify_item_id(id))
            .map(|&index| &self.items[index])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemRecord> {
        self.items.iter()
    }

    /// All items carrying the given context tag.
    pub fn with_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a ItemRecord> + 'a {
        let tag = tag.trim().to_lowercase();
        self.items.iter().filter(move |item| item.tags.contains(&tag))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("duplicate item id: {0}")]
    DuplicateId(String),
    #[error("item '{0}' has an empty id")]
    EmptyId(String),
}
