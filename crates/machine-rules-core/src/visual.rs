//! Visual descriptors handed to the rendering layer.
//!
//! Nothing here draws. A [`RuleItem`] is a stack of icon overlays plus
//! tooltip lines, and carries the identity used to fold outputs that would
//! look the same on screen.

use crate::catalog::Color;
use crate::machine::OutputItem;
use crate::query::ResolvedItem;

/// One layer of an icon.
#[derive(Debug, Clone, PartialEq)]
pub enum IconOverlay {
    /// The sprite of a catalog item, optionally tinted.
    Item { id: String, tint: Option<Color> },
    /// A generic glyph for something that has no item sprite.
    Placeholder { label: String },
    /// Quality star, 1 (silver) through 4 (iridium).
    Quality(u8),
    /// Stack count badge.
    Count(u32),
    /// The output only applies under an extra condition.
    Warning,
    /// Output produced by a complex method.
    Special,
    /// A trigger condition applies.
    Condition,
    /// Consumed as additional fuel.
    Fuel,
}

/// Fields that decide whether two outputs look identical.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SimilarityKey {
    pub item_id: Option<String>,
    pub random_item_ids: Vec<String>,
    pub preserve_id: Option<String>,
    pub quality: i32,
    pub min_stack: i32,
    pub max_stack: i32,
}

impl SimilarityKey {
    pub fn of_output(output: &OutputItem) -> Self {
        Self {
            item_id: output.item_id.clone(),
            random_item_ids: output.random_item_ids.clone(),
            preserve_id: output.preserve_id.clone(),
            quality: output.quality,
            min_stack: output.min_stack,
            max_stack: output.max_stack,
        }
    }
}

/// A displayable item: icon layers and tooltip lines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleItem {
    pub icons: Vec<IconOverlay>,
    pub tooltip: Vec<String>,
    pub key: SimilarityKey,
}

impl RuleItem {
    /// Visual for a query result, keeping its tint and flavor.
    pub fn from_resolved(item: &ResolvedItem) -> Self {
        Self {
            icons: vec![IconOverlay::Item {
                id: item.id.clone(),
                tint: item.tint,
            }],
            tooltip: vec![item.display_name.clone()],
            key: SimilarityKey {
                item_id: Some(item.id.clone()),
                preserve_id: item.preserve_id.clone(),
                quality: -1,
                min_stack: -1,
                max_stack: -1,
                ..SimilarityKey::default()
            },
        }
    }

    /// Visual for something with no item sprite.
    pub fn placeholder(label: &str) -> Self {
        Self {
            icons: vec![IconOverlay::Placeholder {
                label: label.to_string(),
            }],
            tooltip: vec![label.to_string()],
            key: SimilarityKey {
                quality: -1,
                min_stack: -1,
                max_stack: -1,
                ..SimilarityKey::default()
            },
        }
    }

    /// Replace the tint of the item sprite. Placeholders are unchanged.
    pub fn with_tint(mut self, tint: Color) -> Self {
        if let Some(IconOverlay::Item { tint: slot, .. }) = self.icons.first_mut() {
            *slot = Some(tint);
        }
        self
    }

    pub fn overlay(mut self, icon: IconOverlay) -> Self {
        self.icons.push(icon);
        self
    }

    pub fn line(mut self, text: impl Into<String>) -> Self {
        self.tooltip.push(text.into());
        self
    }

    /// Add a quality star when `quality` is in `1..=4`.
    pub fn with_quality(self, quality: i32) -> Self {
        match u8::try_from(quality) {
            Ok(q @ 1..=4) => self.overlay(IconOverlay::Quality(q)),
            _ => self,
        }
    }

    /// Add a count badge when more than one is involved.
    pub fn with_count(self, count: u32) -> Self {
        if count > 1 {
            self.overlay(IconOverlay::Count(count))
        } else {
            self
        }
    }

    /// The first item sprite id, if any.
    pub fn item_id(&self) -> Option<&str> {
        self.icons.iter().find_map(|icon| match icon {
            IconOverlay::Item { id, .. } => Some(id.as_str()),
            _ => None,
        })
    }

    /// Tint of the first item sprite, if it has one.
    pub fn tint(&self) -> Option<Color> {
        self.icons.iter().find_map(|icon| match icon {
            IconOverlay::Item { tint, .. } => *tint,
            _ => None,
        })
    }

    pub fn has_overlay(&self, icon: &IconOverlay) -> bool {
        self.icons.contains(icon)
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.icons.first(), Some(IconOverlay::Placeholder { .. }))
    }

    /// Whether two visuals would render as the same item.
    pub fn similar_to(&self, other: &RuleItem) -> bool {
        self.key == other.key
    }
}
