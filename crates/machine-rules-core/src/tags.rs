//! Context tag matching with negation and caching.
//!
//! A tag expression is a list such as `["category_fruits", "!fruit_tree"]`.
//! Each single tag is resolved once through the query resolver and cached;
//! combined expressions are cached under a normalized key. Both caches are
//! dropped together by [`TagMatcher::invalidate`] when the item catalog
//! reloads.

use crate::preserve::PRESERVE_TAG_PREFIX;
use crate::query::{ItemQueryResolver, ResolvedItem};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

type ItemSet = BTreeMap<String, ResolvedItem>;

/// Context tag prefix for a required input quality, e.g. `quality_gold`.
pub const QUALITY_TAG_PREFIX: &str = "quality_";

/// A normalized tag: lower-cased, trimmed, with negation split off.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TagTerm {
    pub tag: String,
    pub negated: bool,
}

impl TagTerm {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (negated, rest) = match raw.strip_prefix('!') {
            Some(rest) => (true, rest.trim()),
            None => (false, raw),
        };
        if rest.is_empty() {
            return None;
        }
        Some(Self {
            tag: rest.to_lowercase(),
            negated,
        })
    }

    pub fn is_preserve(&self) -> bool {
        self.tag.starts_with(PRESERVE_TAG_PREFIX)
    }

    /// Quality tags decorate inputs; no catalog item carries one.
    pub fn is_quality(&self) -> bool {
        self.tag.starts_with(QUALITY_TAG_PREFIX)
    }
}

/// Parse and normalize a tag list, dropping blanks, preserve tags and
/// quality tags. The result is sorted and de-duplicated.
pub fn normalize_tags<S: AsRef<str>>(tags: &[S]) -> Vec<TagTerm> {
    let mut terms: Vec<TagTerm> = tags
        .iter()
        .filter_map(|t| TagTerm::parse(t.as_ref()))
        .filter(|t| !t.is_preserve() && !t.is_quality())
        .collect();
    terms.sort();
    terms.dedup();
    terms
}

/// Cache key for a tag expression: sorted, comma-joined normalized tags.
pub fn cache_key(terms: &[TagTerm]) -> String {
    terms
        .iter()
        .map(|t| {
            if t.negated {
                format!("!{}", t.tag)
            } else {
                t.tag.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Cache counters, for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub single_tags: usize,
    pub expressions: usize,
}

/// Resolves tag expressions to catalog items.
///
/// Results are cached by tag alone, not by resolver. A caller that swaps the
/// resolver it passes to [`match_tags`](Self::match_tags) must call
/// [`invalidate`](Self::invalidate) first; `ControlPanel::replace_resolver`
/// does this through the item invalidation event.
#[derive(Debug, Default)]
pub struct TagMatcher {
    single: RefCell<HashMap<String, Arc<ItemSet>>>,
    expressions: RefCell<HashMap<String, Option<Arc<[ResolvedItem]>>>>,
    hits: Cell<u64>,
    misses: Cell<u64>,
}

impl TagMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Items matching every positive tag and none of the negative ones,
    /// ordered by id. `None` when nothing matches or no usable tag is given.
    pub fn match_tags<S: AsRef<str>>(
        &self,
        resolver: &dyn ItemQueryResolver,
        tags: &[S],
    ) -> Option<Arc<[ResolvedItem]>> {
        let terms = normalize_tags(tags);
        if terms.is_empty() {
            return None;
        }
        let key = cache_key(&terms);
        if let Some(cached) = self.expressions.borrow().get(&key) {
            self.hits.set(self.hits.get() + 1);
            return cached.clone();
        }
        self.misses.set(self.misses.get() + 1);

        let result = self.evaluate(resolver, &terms);
        self.expressions.borrow_mut().insert(key, result.clone());
        result
    }

    fn evaluate(
        &self,
        resolver: &dyn ItemQueryResolver,
        terms: &[TagTerm],
    ) -> Option<Arc<[ResolvedItem]>> {
        let (negative, positive): (Vec<&TagTerm>, Vec<&TagTerm>) =
            terms.iter().partition(|t| t.negated);

        let mut result: ItemSet = match positive.split_first() {
            Some((first, rest)) => {
                let mut acc = (*self.single_tag(resolver, &first.tag)).clone();
                for term in rest {
                    let set = self.single_tag(resolver, &term.tag);
                    acc.retain(|id, _| set.contains_key(id));
                }
                acc
            }
            None => all_items(resolver),
        };

        for term in negative {
            let set = self.single_tag(resolver, &term.tag);
            result.retain(|id, _| !set.contains_key(id));
        }

        if result.is_empty() {
            None
        } else {
            Some(result.into_values().collect())
        }
    }

    fn single_tag(&self, resolver: &dyn ItemQueryResolver, tag: &str) -> Arc<ItemSet> {
        if let Some(set) = self.single.borrow().get(tag) {
            return Arc::clone(set);
        }
        let query = format!("ITEM_CONTEXT_TAG {tag}");
        let set: ItemSet = match resolver.resolve(&query) {
            Ok(items) => items.into_iter().map(|i| (i.id.clone(), i)).collect(),
            Err(err) => {
                debug!(tag, error = %err, "tag query failed, treating as no match");
                ItemSet::new()
            }
        };
        let set = Arc::new(set);
        self.single
            .borrow_mut()
            .insert(tag.to_string(), Arc::clone(&set));
        set
    }

    /// Drop every cached result. Call when the item catalog reloads.
    pub fn invalidate(&self) {
        self.single.borrow_mut().clear();
        self.expressions.borrow_mut().clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.get(),
            misses: self.misses.get(),
            single_tags: self.single.borrow().len(),
            expressions: self.expressions.borrow().len(),
        }
    }
}

fn all_items(resolver: &dyn ItemQueryResolver) -> ItemSet {
    match resolver.resolve("ALL_ITEMS") {
        Ok(items) => items.into_iter().map(|i| (i.id.clone(), i)).collect(),
        Err(err) => {
            debug!(error = %err, "ALL_ITEMS query failed");
            ItemSet::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::CatalogQuery;
    use crate::test_utils::*;

    fn ids(items: &Option<Arc<[ResolvedItem]>>) -> Vec<String> {
        items
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|i| i.id.clone())
            .collect()
    }

    #[test]
    fn term_parsing() {
        assert_eq!(
            TagTerm::parse(" !Fruit_Tree "),
            Some(TagTerm {
                tag: "fruit_tree".to_string(),
                negated: true
            })
        );
        assert_eq!(TagTerm::parse("!"), None);
        assert_eq!(TagTerm::parse("   "), None);
    }

    #[test]
    fn cache_key_is_order_and_case_independent() {
        let a = cache_key(&normalize_tags(&["B_tag", "!c", "a"]));
        let b = cache_key(&normalize_tags(&["a", "!C", "b_tag"]));
        assert_eq!(a, b);
        assert_eq!(a, "a,b_tag,!c");
    }

    #[test]
    fn preserve_tags_are_excluded() {
        let terms = normalize_tags(&["honey_item", "preserve_sheet_index_597"]);
        assert_eq!(terms.len(), 1);
        assert_eq!(terms[0].tag, "honey_item");
    }

    #[test]
    fn quality_tags_are_excluded() {
        let terms = normalize_tags(&["category_fruits", "Quality_Gold"]);
        assert_eq!(terms.len(), 1);
        assert_eq!(terms[0].tag, "category_fruits");

        let resolver = CatalogQuery::new(Arc::new(sample_catalog()));
        let matcher = TagMatcher::new();
        let items = matcher.match_tags(&resolver, &["category_fruits", "quality_gold"]);
        assert_eq!(ids(&items), vec![GRAPE.to_string(), APPLE.to_string()]);
        assert!(matcher.match_tags(&resolver, &["quality_iridium"]).is_none());
    }

    #[test]
    fn stale_results_survive_a_resolver_swap_until_invalidated() {
        let matcher = TagMatcher::new();
        let full = CatalogQuery::new(Arc::new(sample_catalog()));
        let mut builder = crate::catalog::ItemCatalogBuilder::new();
        for item in sample_catalog().iter().filter(|item| item.id != APPLE) {
            builder.register(item.clone());
        }
        let trimmed = CatalogQuery::new(Arc::new(builder.build().unwrap()));

        assert_eq!(ids(&matcher.match_tags(&full, &["category_fruits"])).len(), 2);
        assert_eq!(ids(&matcher.match_tags(&trimmed, &["category_fruits"])).len(), 2);
        matcher.invalidate();
        assert_eq!(
            ids(&matcher.match_tags(&trimmed, &["category_fruits"])),
            vec![GRAPE.to_string()]
        );
    }

    #[test]
    fn positive_tags_intersect() {
        let resolver = CatalogQuery::new(Arc::new(sample_catalog()));
        let matcher = TagMatcher::new();
        let items = matcher.match_tags(&resolver, &["category_fruits", "fruit_tree_item"]);
        assert_eq!(ids(&items), vec![APPLE.to_string()]);
    }

    #[test]
    fn negative_tags_subtract() {
        let resolver = CatalogQuery::new(Arc::new(sample_catalog()));
        let matcher = TagMatcher::new();
        let items = matcher.match_tags(&resolver, &["category_fruits", "!fruit_tree_item"]);
        assert_eq!(ids(&items), vec![GRAPE.to_string()]);
    }

    #[test]
    fn only_negative_tags_seed_with_catalog() {
        let catalog = sample_catalog();
        let total = catalog.len();
        let fruit = catalog.with_tag("category_fruits").count();
        let resolver = CatalogQuery::new(Arc::new(catalog));
        let matcher = TagMatcher::new();
        let items = matcher.match_tags(&resolver, &["!category_fruits"]).unwrap();
        assert_eq!(items.len(), total - fruit);
        assert!(items.iter().all(|i| i.id != GRAPE && i.id != APPLE));
    }

    #[test]
    fn no_match_is_none() {
        let resolver = CatalogQuery::new(Arc::new(sample_catalog()));
        let matcher = TagMatcher::new();
        assert!(matcher.match_tags(&resolver, &["no_such_tag"]).is_none());
        assert!(matcher.match_tags::<&str>(&resolver, &[]).is_none());
    }

    #[test]
    fn repeated_expressions_hit_cache() {
        let resolver = CatalogQuery::new(Arc::new(sample_catalog()));
        let matcher = TagMatcher::new();
        matcher.match_tags(&resolver, &["category_fruits", "!fruit_tree_item"]);
        matcher.match_tags(&resolver, &["!FRUIT_TREE_ITEM", "category_fruits"]);
        let stats = matcher.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.single_tags, 2);
        assert_eq!(stats.expressions, 1);
    }

    #[test]
    fn invalidate_clears_caches() {
        let resolver = CatalogQuery::new(Arc::new(sample_catalog()));
        let matcher = TagMatcher::new();
        matcher.match_tags(&resolver, &["category_fruits"]);
        matcher.invalidate();
        let stats = matcher.stats();
        assert_eq!(stats.single_tags, 0);
        assert_eq!(stats.expressions, 0);
    }
}
