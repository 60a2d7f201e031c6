use serde::{Deserialize, Serialize};

use crate::TradeItem;

/// What one party gives in one proposal.
///
/// Ordered, and never holds two items occupying the same slot (one entry per
/// technology/resource/settlement, one gold entry per fungible kind).
/// Decoding goes through [`OfferList::from_items`], so the same holds for
/// lists read off the wire.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<TradeItem>", into = "Vec<TradeItem>")]
pub struct OfferList {
    items: Vec<TradeItem>,
}

impl OfferList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a list, silently dropping items whose slot is already taken.
    pub fn from_items(items: impl IntoIterator<Item = TradeItem>) -> Self {
        let mut list = Self::new();
        for item in items {
            list.push(item);
        }
        list
    }

    /// Appends `item` unless its slot is taken. Returns whether it was added.
    pub fn push(&mut self, item: TradeItem) -> bool {
        if self.occupies(&item) {
            return false;
        }
        self.items.push(item);
        true
    }

    /// Adds a fungible quantity, merging with an existing entry of the same kind.
    ///
    /// Returns the new total for that kind, or `None` (list untouched) for a
    /// non-fungible item.
    pub fn add_fungible(&mut self, item: TradeItem) -> Option<i32> {
        let amount = item.amount()?;
        if let Some(existing) = self.items.iter_mut().find(|i| i.same_slot(&item)) {
            let total = existing.amount().unwrap_or(0).saturating_add(amount);
            *existing = existing.with_amount(total)?;
            return Some(total);
        }
        self.items.push(item);
        Some(amount)
    }

    pub fn contains(&self, item: &TradeItem) -> bool {
        self.items.contains(item)
    }

    /// True if an item occupying the same slot as `item` is already listed.
    pub fn occupies(&self, item: &TradeItem) -> bool {
        self.items.iter().any(|i| i.same_slot(item))
    }

    /// Quantity already listed for the fungible kind of `item`.
    pub fn fungible_amount(&self, item: &TradeItem) -> i32 {
        self.items
            .iter()
            .find(|i| i.is_fungible() && i.same_slot(item))
            .and_then(TradeItem::amount)
            .unwrap_or(0)
    }

    pub fn remove(&mut self, item: &TradeItem) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i != item);
        self.items.len() != before
    }

    /// Copies every dual item of `self` into `other` (and vice versa) so that
    /// treaties appear once per side.
    pub fn mirror_duals(&mut self, other: &mut OfferList) {
        let ours: Vec<TradeItem> = self.items.iter().filter(|i| i.is_dual()).cloned().collect();
        let theirs: Vec<TradeItem> = other.items.iter().filter(|i| i.is_dual()).cloned().collect();
        for item in ours {
            other.push(item);
        }
        for item in theirs {
            self.push(item);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &TradeItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[TradeItem] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<TradeItem> {
        self.items
    }
}

impl<'a> IntoIterator for &'a OfferList {
    type Item = &'a TradeItem;
    type IntoIter = std::slice::Iter<'a, TradeItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl From<Vec<TradeItem>> for OfferList {
    fn from(items: Vec<TradeItem>) -> Self {
        Self::from_items(items)
    }
}

impl From<OfferList> for Vec<TradeItem> {
    fn from(list: OfferList) -> Self {
        list.items
    }
}

impl FromIterator<TradeItem> for OfferList {
    fn from_iter<I: IntoIterator<Item = TradeItem>>(iter: I) -> Self {
        Self::from_items(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ResourceId, TechId};

    #[test]
    fn duplicate_slots_are_rejected() {
        let mut list = OfferList::new();
        let tech = TradeItem::Technology {
            tech: TechId::new(3),
        };
        assert!(list.push(tech.clone()));
        assert!(!list.push(tech));
        assert!(list.push(TradeItem::GoldLumpSum { amount: 5 }));
        assert!(!list.push(TradeItem::GoldLumpSum { amount: 7 }));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn fungible_amounts_merge() {
        let mut list = OfferList::new();
        assert_eq!(list.add_fungible(TradeItem::GoldLumpSum { amount: 40 }), Some(40));
        assert_eq!(list.add_fungible(TradeItem::GoldLumpSum { amount: 15 }), Some(55));
        assert_eq!(list.len(), 1);
        assert_eq!(list.fungible_amount(&TradeItem::GoldLumpSum { amount: 0 }), 55);
        assert_eq!(
            list.add_fungible(TradeItem::Resource {
                resource: ResourceId::new(0)
            }),
            None
        );
    }

    #[test]
    fn decoding_drops_repeated_slots() {
        let json = r#"[{"type":"Technology","tech":3},{"type":"Technology","tech":3},{"type":"GoldLumpSum","amount":5}]"#;
        let list: OfferList = serde_json::from_str(json).unwrap();
        assert_eq!(list.len(), 2);

        let encoded = serde_json::to_string(&list).unwrap();
        assert_eq!(
            encoded,
            r#"[{"type":"Technology","tech":3},{"type":"GoldLumpSum","amount":5}]"#
        );
        let back: OfferList = serde_json::from_str(&encoded).unwrap();
        assert_eq!(back, list);
    }

    #[test]
    fn mirror_duals_copies_treaties_both_ways() {
        let mut a = OfferList::from_items([TradeItem::OpenBorders, TradeItem::GoldLumpSum { amount: 9 }]);
        let mut b = OfferList::from_items([TradeItem::DefensivePact]);
        a.mirror_duals(&mut b);
        assert!(a.contains(&TradeItem::DefensivePact));
        assert!(b.contains(&TradeItem::OpenBorders));
        assert!(!b.contains(&TradeItem::GoldLumpSum { amount: 9 }));
        assert_eq!(a.len(), 3);
        assert_eq!(b.len(), 2);
    }
}
