//! Item query resolution.
//!
//! The host evaluates item query strings; the core only builds them and
//! consumes the results through [`ItemQueryResolver`]. [`CatalogQuery`] is
//! the bundled resolver over an [`ItemCatalog`], covering the queries the
//! builder issues.

use crate::catalog::{Color, ItemCatalog, ItemRecord};
use crate::id::qualify_item_id;
use crate::preserve::PreserveType;
use std::sync::Arc;

/// Dynamic slot tokens and the synthetic ids they stand for.
pub const SLOT_TOKENS: &[(&str, &str)] = &[
    ("DROP_IN_PRESERVE", "(O)DropInPreserve"),
    ("DROP_IN_ID", "(O)DropIn"),
    ("NEARBY_FLOWER_ID", "(O)NearbyFlower"),
    ("DROP_IN_QUALITY", "0"),
];

/// Replace dynamic slot tokens with synthetic placeholder ids.
///
/// Returns the rewritten string and the first token found, if any.
pub fn substitute_slot_tokens(raw: &str) -> (String, Option<&'static str>) {
    let mut out = raw.to_string();
    let mut first = None;
    for (token, replacement) in SLOT_TOKENS {
        if out.contains(token) {
            out = out.replace(token, replacement);
            first.get_or_insert(*token);
        }
    }
    (out, first)
}

/// One item produced by a query.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedItem {
    /// Qualified id. Flavored items use the base item's id.
    pub id: String,
    pub display_name: String,
    pub tint: Option<Color>,
    /// Ingredient id for flavored items.
    pub preserve_id: Option<String>,
}

impl ResolvedItem {
    pub fn from_record(record: &ItemRecord) -> Self {
        Self {
            id: record.id.clone(),
            display_name: record.display_name.clone(),
            tint: None,
            preserve_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueryError {
    #[error("unknown item query: {0}")]
    UnknownQuery(String),
    #[error("malformed item query '{query}': {reason}")]
    Malformed { query: String, reason: String },
}

/// Evaluates item query strings against the host's item data.
pub trait ItemQueryResolver {
    fn resolve(&self, query: &str) -> Result<Vec<ResolvedItem>, QueryError>;

    /// The catalog the queries run against, for direct lookups.
    fn catalog(&self) -> &ItemCatalog;
}

/// Resolver backed by an in-memory [`ItemCatalog`].
///
/// Supported forms:
/// - `<item id>`
/// - `ALL_ITEMS`
/// - `ITEM_CONTEXT_TAG <tag>`
/// - `FLAVORED_ITEM <PreserveType> <ingredient id>`
/// - `RANDOM_ITEMS <type prefix>`
#[derive(Debug, Clone)]
pub struct CatalogQuery {
    catalog: Arc<ItemCatalog>,
}

impl CatalogQuery {
    pub fn new(catalog: Arc<ItemCatalog>) -> Self {
        Self { catalog }
    }

    fn flavored(&self, query: &str, args: &[&str]) -> Result<Vec<ResolvedItem>, QueryError> {
        let [kind, ingredient] = args else {
            return Err(QueryError::Malformed {
                query: query.to_string(),
                reason: "expected a preserve type and an ingredient id".to_string(),
            });
        };
        let preserve = PreserveType::from_name(kind).ok_or_else(|| QueryError::Malformed {
            query: query.to_string(),
            reason: format!("unknown preserve type '{kind}'"),
        })?;
        let (Some(base), Some(ingredient)) = (
            self.catalog.get(preserve.base_item_id()),
            self.catalog.get(ingredient),
        ) else {
            return Ok(Vec::new());
        };
        Ok(vec![ResolvedItem {
            id: base.id.clone(),
            display_name: preserve.flavored_name(&ingredient.display_name),
            tint: ingredient.color,
            preserve_id: Some(ingredient.id.clone()),
        }])
    }
}

impl ItemQueryResolver for CatalogQuery {
    fn resolve(&self, query: &str) -> Result<Vec<ResolvedItem>, QueryError> {
        let parts: Vec<&str> = query.split_whitespace().collect();
        let Some((&head, args)) = parts.split_first() else {
            return Ok(Vec::new());
        };
        let items = match head {
            "ALL_ITEMS" => self.catalog.iter().map(ResolvedItem::from_record).collect(),
            "ITEM_CONTEXT_TAG" => match args {
                [tag] => self
                    .catalog
                    .with_tag(tag)
                    .map(ResolvedItem::from_record)
                    .collect(),
                _ => {
                    return Err(QueryError::Malformed {
                        query: query.to_string(),
                        reason: "expected exactly one tag".to_string(),
                    });
                }
            },
            "FLAVORED_ITEM" => return self.flavored(query, args),
            "RANDOM_ITEMS" => {
                let prefix = args.first().copied().unwrap_or("(O)");
                self.catalog
                    .iter()
                    .filter(|item| item.type_prefix() == prefix)
                    .map(ResolvedItem::from_record)
                    .collect()
            }
            _ if head.chars().all(|c| c.is_ascii_uppercase() || c == '_') && head.len() > 1 => {
                return Err(QueryError::UnknownQuery(head.to_string()));
            }
            _ => self
                .catalog
                .get(&qualify_item_id(query))
                .map(ResolvedItem::from_record)
                .into_iter()
                .collect(),
        };
        Ok(items)
    }

    fn catalog(&self) -> &ItemCatalog {
        &self.catalog
    }
}
