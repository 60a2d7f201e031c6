use std::collections::BTreeMap;

use parley_protocol::{CategoryId, OfferList, TradeItem};

use crate::rules::NegotiationRules;

/// Remaining room per protected resource category in one negotiation.
///
/// Counts over both lists together: the cap bounds how many items of one
/// category change hands in a proposal, whichever direction they travel.
#[derive(Clone, Debug)]
pub struct ResourceCategoryCounter<'r> {
    rules: &'r NegotiationRules,
    cap: u8,
    counts: BTreeMap<CategoryId, u8>,
    /// Receiver is a vassal of the giver; no cap applies.
    unlimited: bool,
}

impl<'r> ResourceCategoryCounter<'r> {
    pub fn new(rules: &'r NegotiationRules, lists: [&OfferList; 2], unlimited: bool) -> Self {
        let mut counts = BTreeMap::new();
        for item in lists.into_iter().flat_map(|l| l.iter()) {
            if let Some(category) = category_of(rules, item) {
                let n: &mut u8 = counts.entry(category).or_insert(0);
                *n = n.saturating_add(1);
            }
        }
        Self {
            rules,
            cap: rules.balance.category_cap,
            counts,
            unlimited,
        }
    }

    pub fn count(&self, category: CategoryId) -> u8 {
        self.counts.get(&category).copied().unwrap_or(0)
    }

    /// Slots left in `category`, `None` when uncapped.
    pub fn remaining(&self, category: CategoryId) -> Option<u8> {
        if self.unlimited {
            return None;
        }
        Some(self.cap.saturating_sub(self.count(category)))
    }

    pub fn admits(&self, item: &TradeItem) -> bool {
        match category_of(self.rules, item) {
            Some(category) => self.remaining(category) != Some(0),
            None => true,
        }
    }

    /// Reserves a slot for `item`; false (nothing reserved) if the cap is reached.
    pub fn take(&mut self, item: &TradeItem) -> bool {
        if !self.admits(item) {
            return false;
        }
        if let Some(category) = category_of(self.rules, item) {
            let n = self.counts.entry(category).or_insert(0);
            *n = n.saturating_add(1);
        }
        true
    }

    pub fn is_unlimited(&self) -> bool {
        self.unlimited
    }
}

fn category_of(rules: &NegotiationRules, item: &TradeItem) -> Option<CategoryId> {
    item.resource().and_then(|r| rules.resource_category(r))
}
