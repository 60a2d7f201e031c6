//! Candidate items each party could add to a proposal.

use parley_protocol::{OfferList, PlayerId, TradeItem, TradeItemKind, TradeVerdict};
use serde::Serialize;

use crate::oracle::{check_offer, score_item, Sign};
use crate::world::Collaborators;

/// One candidate, valued by both sides at build time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InventoryEntry {
    pub item: TradeItem,
    pub verdict: TradeVerdict,
    /// What the owner gives up.
    pub owner_loss: i32,
    /// What the recipient gains.
    pub recipient_gain: i32,
}

/// Items `owner` may add toward `recipient`, snapshotted for one attempt.
///
/// Gold appears as a single entry per fungible kind whose amount is the
/// remaining affordability ceiling.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Inventory {
    owner: PlayerId,
    recipient: PlayerId,
    entries: Vec<InventoryEntry>,
}

impl Inventory {
    pub fn empty(owner: PlayerId, recipient: PlayerId) -> Self {
        Self {
            owner,
            recipient,
            entries: Vec::new(),
        }
    }

    pub fn from_entries(owner: PlayerId, recipient: PlayerId, entries: Vec<InventoryEntry>) -> Self {
        Self {
            owner,
            recipient,
            entries,
        }
    }

    pub fn owner(&self) -> PlayerId {
        self.owner
    }

    pub fn recipient(&self) -> PlayerId {
        self.recipient
    }

    pub fn entries(&self) -> &[InventoryEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &InventoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, item: &TradeItem) -> bool {
        self.entries.iter().any(|e| &e.item == item)
    }

    /// Gold entry of `kind`; its amount is the remaining ceiling.
    pub fn gold_slot(&self, kind: TradeItemKind) -> Option<&InventoryEntry> {
        self.entries
            .iter()
            .find(|e| e.item.is_fungible() && e.item.kind() == kind)
    }

    /// Allowed entry the recipient values most, skipping gold and treaties.
    pub fn most_wanted(&self) -> Option<&InventoryEntry> {
        self.entries
            .iter()
            .filter(|e| e.verdict.is_allowed() && !e.item.is_fungible() && !e.item.is_dual())
            .filter(|e| e.recipient_gain > 0)
            .fold(None, |best: Option<&InventoryEntry>, e| match best {
                Some(b) if b.recipient_gain >= e.recipient_gain => Some(b),
                _ => Some(e),
            })
    }
}

pub struct InventoryBuilder<'a> {
    env: Collaborators<'a>,
}

impl<'a> InventoryBuilder<'a> {
    pub fn new(env: Collaborators<'a>) -> Self {
        Self { env }
    }

    /// Every candidate with its verdict, denied ones included.
    ///
    /// Items occupying a slot in either list are left out. `generous` selects
    /// the treasury ceiling used for the gold entries.
    pub fn annotate(
        &self,
        owner: PlayerId,
        recipient: PlayerId,
        owner_gives: &OfferList,
        recipient_gives: &OfferList,
        generous: bool,
    ) -> Vec<InventoryEntry> {
        let mut entries = Vec::new();

        let ceiling = self.env.treasury.max_affordable(owner, recipient, generous);
        let gold = [
            TradeItem::GoldLumpSum {
                amount: ceiling.lump_sum,
            },
            TradeItem::GoldPerTurn {
                amount: ceiling.per_turn,
            },
        ];
        for slot in gold {
            let ceiling = slot.amount().unwrap_or(0);
            let remaining = ceiling.saturating_sub(owner_gives.fungible_amount(&slot));
            if remaining <= 0 {
                continue;
            }
            if let Some(item) = slot.with_amount(remaining) {
                entries.push(self.entry(owner, recipient, item));
            }
        }

        let mut seen = OfferList::new();
        for item in self.env.world.tradeable_items(owner, recipient) {
            if item.is_fungible()
                || owner_gives.occupies(&item)
                || recipient_gives.occupies(&item)
                || !seen.push(item.clone())
            {
                continue;
            }
            entries.push(self.entry(owner, recipient, item));
        }

        tracing::trace!(
            owner = owner.0,
            recipient = recipient.0,
            candidates = entries.len(),
            "inventory annotated"
        );
        entries
    }

    /// Allowed candidates only.
    pub fn build(
        &self,
        owner: PlayerId,
        recipient: PlayerId,
        owner_gives: &OfferList,
        recipient_gives: &OfferList,
        generous: bool,
    ) -> Inventory {
        let entries = self
            .annotate(owner, recipient, owner_gives, recipient_gives, generous)
            .into_iter()
            .filter(|e| e.verdict.is_allowed())
            .collect();
        Inventory::from_entries(owner, recipient, entries)
    }

    fn entry(&self, owner: PlayerId, recipient: PlayerId, item: TradeItem) -> InventoryEntry {
        let verdict = check_offer(self.env.denial, owner, recipient, &item);
        let (owner_loss, recipient_gain) = if item.is_unknown() {
            (0, 0)
        } else {
            (
                score_item(self.env.oracle, owner, &item, Sign::Loss),
                score_item(self.env.oracle, recipient, &item, Sign::Gain),
            )
        };
        InventoryEntry {
            item,
            verdict,
            owner_loss,
            recipient_gain,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::{SandboxParty, SandboxWorld};
    use crate::rules::{load_rules, RulesSource};
    use parley_protocol::{DenialReason, TechId};

    fn tech(raw: u16) -> TradeItem {
        TradeItem::Technology {
            tech: TechId::new(raw),
        }
    }

    fn world() -> SandboxWorld {
        let rules = load_rules(RulesSource::Embedded).unwrap();
        let mut world = SandboxWorld::new(&rules, 0);
        world.add_party(SandboxParty::automated(PlayerId(0)).with_gold(200, 6).with_techs([0, 1]));
        world.add_party(SandboxParty::automated(PlayerId(1)).with_gold(0, 0).with_techs([2]));
        world
    }

    #[test]
    fn build_is_idempotent_and_excludes_offered_items() {
        let world = world();
        let builder = InventoryBuilder::new(world.collaborators());
        let ours = OfferList::from_items([tech(0)]);
        let theirs = OfferList::new();

        let first = builder.build(PlayerId(0), PlayerId(1), &ours, &theirs, false);
        let second = builder.build(PlayerId(0), PlayerId(1), &ours, &theirs, false);
        assert_eq!(first, second);
        assert!(!first.contains(&tech(0)));
        assert!(first.contains(&tech(1)));
    }

    #[test]
    fn gold_slot_is_the_remaining_ceiling() {
        let world = world();
        let builder = InventoryBuilder::new(world.collaborators());
        let ours = OfferList::from_items([TradeItem::GoldLumpSum { amount: 30 }]);

        let inventory = builder.build(PlayerId(0), PlayerId(1), &ours, &OfferList::new(), true);
        let slot = inventory.gold_slot(TradeItemKind::GoldLumpSum).unwrap();
        assert_eq!(slot.item, TradeItem::GoldLumpSum { amount: 170 });
        assert!(inventory.gold_slot(TradeItemKind::GoldPerTurn).is_some());

        let broke = builder.build(PlayerId(1), PlayerId(0), &OfferList::new(), &ours, true);
        assert!(broke.gold_slot(TradeItemKind::GoldLumpSum).is_none());
    }

    #[test]
    fn denied_items_are_annotated_but_not_built() {
        let mut world = world();
        world.deny(PlayerId(0), PlayerId(1), tech(1), DenialReason::Monopoly);
        let builder = InventoryBuilder::new(world.collaborators());
        let empty = OfferList::new();

        let annotated = builder.annotate(PlayerId(0), PlayerId(1), &empty, &empty, false);
        let denied = annotated.iter().find(|e| e.item == tech(1)).unwrap();
        assert_eq!(denied.verdict, TradeVerdict::Denied(DenialReason::Monopoly));

        let built = builder.build(PlayerId(0), PlayerId(1), &empty, &empty, false);
        assert!(!built.contains(&tech(1)));
        assert!(built.iter().all(|e| e.verdict.is_allowed()));
    }
}
