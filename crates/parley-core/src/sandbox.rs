//! Table-driven reference collaborators.
//!
//! A small in-memory world used by the self-play harness and the tests. It
//! stands in for the game the engine is embedded in: holdings, treasuries,
//! relations, a valuation table and an explicit denial table.

use std::collections::{BTreeMap, BTreeSet};

use parley_protocol::{
    Deal, DenialReason, PlayerId, ProposalEvent, TechId, TradeItem, TradeItemKind, TradeVerdict,
    WorldVersion,
};

use crate::gold::GoldExchange;
use crate::oracle::{DenialPolicy, GoldCeiling, Sign, TreasuryAdviser, ValuationOracle};
use crate::rules::{GoldRules, NegotiationRules, ValuationRules};
use crate::world::{Collaborators, DealSink, NegotiationWorld};

// =============================================================================
// Valuation table
// =============================================================================

/// Per-kind base values, per-observer overrides, gold at the turn's rate.
#[derive(Clone, Debug)]
pub struct TableOracle {
    valuation: ValuationRules,
    exchange: GoldExchange,
    overrides: BTreeMap<(PlayerId, TradeItem), i32>,
}

impl TableOracle {
    pub fn new(valuation: ValuationRules, exchange: GoldExchange) -> Self {
        Self {
            valuation,
            exchange,
            overrides: BTreeMap::new(),
        }
    }

    /// Fixes what `observer` gains from receiving `item`.
    pub fn set_value(&mut self, observer: PlayerId, item: TradeItem, value: i32) {
        self.overrides.insert((observer, item), value);
    }

    pub fn set_exchange(&mut self, exchange: GoldExchange) {
        self.exchange = exchange;
    }

    pub fn exchange(&self) -> GoldExchange {
        self.exchange
    }
}

impl ValuationOracle for TableOracle {
    fn score(&self, observer: PlayerId, item: &TradeItem, sign: Sign) -> i32 {
        if let Some(gold) = self.exchange.value_of(item) {
            return gold;
        }
        let gain = self
            .overrides
            .get(&(observer, item.clone()))
            .copied()
            .or_else(|| self.valuation.base_value(item.kind()))
            .unwrap_or(0);
        match sign {
            Sign::Gain => gain,
            Sign::Loss => gain * self.valuation.loss_percent / 100,
        }
    }
}

// =============================================================================
// Parties
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SandboxParty {
    pub id: PlayerId,
    pub human: bool,
    pub gold: i32,
    pub income: i32,
    /// Standing by score, 0 = leading.
    pub rank: u8,
    /// Technologies, resources and settlements held.
    pub holdings: Vec<TradeItem>,
}

impl SandboxParty {
    pub fn automated(id: PlayerId) -> Self {
        Self {
            id,
            human: false,
            gold: 0,
            income: 0,
            rank: 0,
            holdings: Vec::new(),
        }
    }

    pub fn human(id: PlayerId) -> Self {
        Self {
            human: true,
            ..Self::automated(id)
        }
    }

    pub fn with_gold(mut self, gold: i32, income: i32) -> Self {
        self.gold = gold;
        self.income = income;
        self
    }

    pub fn with_rank(mut self, rank: u8) -> Self {
        self.rank = rank;
        self
    }

    pub fn with_techs(mut self, techs: impl IntoIterator<Item = u16>) -> Self {
        for raw in techs {
            self.gain(TradeItem::Technology {
                tech: TechId::new(raw),
            });
        }
        self
    }

    pub fn with_items(mut self, items: impl IntoIterator<Item = TradeItem>) -> Self {
        for item in items {
            self.gain(item);
        }
        self
    }

    pub fn holds(&self, item: &TradeItem) -> bool {
        self.holdings.contains(item)
    }

    fn gain(&mut self, item: TradeItem) {
        if !self.holds(&item) {
            self.holdings.push(item);
        }
    }

    fn lose(&mut self, item: &TradeItem) {
        self.holdings.retain(|i| i != item);
    }
}

// =============================================================================
// World
// =============================================================================

type Pair = (PlayerId, PlayerId);

fn unordered(a: PlayerId, b: PlayerId) -> Pair {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[derive(Clone, Debug)]
pub struct SandboxWorld {
    turn: u32,
    version: WorldVersion,
    gold_rules: GoldRules,
    parties: BTreeMap<PlayerId, SandboxParty>,
    pub oracle: TableOracle,
    dispositions: BTreeMap<Pair, i32>,
    /// Turn the pair met; may precede turn 0 for scripted histories.
    met_on: BTreeMap<Pair, i64>,
    wars: BTreeSet<Pair>,
    wronged: BTreeSet<Pair>,
    /// vassal -> master
    masters: BTreeMap<PlayerId, PlayerId>,
    agreements: BTreeSet<(PlayerId, PlayerId, TradeItemKind)>,
    denials: BTreeMap<(PlayerId, PlayerId, TradeItem), DenialReason>,
}

impl SandboxWorld {
    pub fn new(rules: &NegotiationRules, turn: u32) -> Self {
        let exchange = GoldExchange::at_turn(&rules.gold, turn);
        Self {
            turn,
            version: WorldVersion::default(),
            gold_rules: rules.gold.clone(),
            parties: BTreeMap::new(),
            oracle: TableOracle::new(rules.valuation.clone(), exchange),
            dispositions: BTreeMap::new(),
            met_on: BTreeMap::new(),
            wars: BTreeSet::new(),
            wronged: BTreeSet::new(),
            masters: BTreeMap::new(),
            agreements: BTreeSet::new(),
            denials: BTreeMap::new(),
        }
    }

    pub fn collaborators(&self) -> Collaborators<'_> {
        Collaborators::new(&self.oracle, self, self, self)
    }

    pub fn add_party(&mut self, party: SandboxParty) {
        self.parties.insert(party.id, party);
        self.touch();
    }

    pub fn party(&self, id: PlayerId) -> Option<&SandboxParty> {
        self.parties.get(&id)
    }

    pub fn party_mut(&mut self, id: PlayerId) -> Option<&mut SandboxParty> {
        self.touch();
        self.parties.get_mut(&id)
    }

    pub fn parties(&self) -> impl Iterator<Item = &SandboxParty> {
        self.parties.values()
    }

    pub fn party_ids(&self) -> Vec<PlayerId> {
        self.parties.keys().copied().collect()
    }

    /// One-directional attitude of `observer` toward `toward`.
    pub fn set_disposition(&mut self, observer: PlayerId, toward: PlayerId, value: i32) {
        self.dispositions.insert((observer, toward), value);
        self.touch();
    }

    /// Pretends `a` and `b` met `turns` turns ago.
    pub fn set_contact(&mut self, a: PlayerId, b: PlayerId, turns: u32) {
        self.met_on
            .insert(unordered(a, b), i64::from(self.turn) - i64::from(turns));
        self.touch();
    }

    pub fn set_war(&mut self, a: PlayerId, b: PlayerId, at_war: bool) {
        if at_war {
            self.wars.insert(unordered(a, b));
        } else {
            self.wars.remove(&unordered(a, b));
        }
        self.touch();
    }

    pub fn set_wronged(&mut self, observer: PlayerId, by: PlayerId, wronged: bool) {
        if wronged {
            self.wronged.insert((observer, by));
        } else {
            self.wronged.remove(&(observer, by));
        }
        self.touch();
    }

    pub fn set_master(&mut self, vassal: PlayerId, master: PlayerId) {
        self.masters.insert(vassal, master);
        self.touch();
    }

    /// `owner` refuses to hand `item` to `recipient`; the reverse direction is
    /// unaffected.
    pub fn deny(&mut self, owner: PlayerId, recipient: PlayerId, item: TradeItem, reason: DenialReason) {
        self.denials.insert((owner, recipient, item), reason);
        self.touch();
    }

    pub fn set_value(&mut self, observer: PlayerId, item: TradeItem, value: i32) {
        self.oracle.set_value(observer, item, value);
        self.touch();
    }

    pub fn has_agreement(&self, a: PlayerId, b: PlayerId, kind: TradeItemKind) -> bool {
        let (x, y) = unordered(a, b);
        self.agreements.contains(&(x, y, kind))
    }

    pub fn advance_turn(&mut self) {
        self.turn += 1;
        for party in self.parties.values_mut() {
            party.gold = party.gold.saturating_add(party.income);
        }
        self.oracle
            .set_exchange(GoldExchange::at_turn(&self.gold_rules, self.turn));
        self.touch();
    }

    /// Applies both sides of `deal` at once.
    pub fn apply_deal(&mut self, deal: &Deal) {
        let p = &deal.proposal;
        for (giver, receiver, list) in [
            (p.initiator, p.responder, &p.initiator_gives),
            (p.responder, p.initiator, &p.responder_gives),
        ] {
            for item in list {
                self.transfer(giver, receiver, item);
            }
        }
        self.touch();
    }

    fn transfer(&mut self, giver: PlayerId, receiver: PlayerId, item: &TradeItem) {
        match item {
            TradeItem::GoldLumpSum { amount } => {
                self.adjust(giver, |p| p.gold -= amount);
                self.adjust(receiver, |p| p.gold += amount);
            }
            TradeItem::GoldPerTurn { amount } => {
                self.adjust(giver, |p| p.income -= amount);
                self.adjust(receiver, |p| p.income += amount);
            }
            TradeItem::Technology { .. } => {
                self.adjust(receiver, |p| p.gain(item.clone()));
            }
            TradeItem::Resource { .. } | TradeItem::Settlement { .. } => {
                self.adjust(giver, |p| p.lose(item));
                self.adjust(receiver, |p| p.gain(item.clone()));
            }
            TradeItem::PeaceTreaty => {
                self.wars.remove(&unordered(giver, receiver));
            }
            TradeItem::OpenBorders | TradeItem::DefensivePact | TradeItem::MapSharing => {
                let (x, y) = unordered(giver, receiver);
                self.agreements.insert((x, y, item.kind()));
            }
            TradeItem::Vassalage => {
                self.masters.insert(giver, receiver);
            }
            TradeItem::Surrender => {
                self.wars.remove(&unordered(giver, receiver));
                self.masters.insert(giver, receiver);
            }
            TradeItem::DeclareWarOn { target } => {
                self.wars.insert(unordered(giver, *target));
            }
            TradeItem::Embargo { .. }
            | TradeItem::CivicChange { .. }
            | TradeItem::ReligionChange { .. }
            | TradeItem::Unknown => {}
        }
    }

    fn adjust(&mut self, id: PlayerId, f: impl FnOnce(&mut SandboxParty)) {
        if let Some(party) = self.parties.get_mut(&id) {
            f(party);
        }
    }

    fn touch(&mut self) {
        self.version = self.version.next();
    }
}

impl NegotiationWorld for SandboxWorld {
    fn turn(&self) -> u32 {
        self.turn
    }

    fn version(&self) -> WorldVersion {
        self.version
    }

    fn is_human(&self, party: PlayerId) -> bool {
        self.parties.get(&party).is_some_and(|p| p.human)
    }

    fn disposition(&self, observer: PlayerId, toward: PlayerId) -> i32 {
        self.dispositions
            .get(&(observer, toward))
            .copied()
            .unwrap_or(0)
    }

    fn rank(&self, party: PlayerId) -> u8 {
        self.parties.get(&party).map_or(0, |p| p.rank)
    }

    fn turns_in_contact(&self, a: PlayerId, b: PlayerId) -> u32 {
        self.met_on
            .get(&unordered(a, b))
            .map_or(0, |met| {
                u32::try_from(i64::from(self.turn) - met).unwrap_or(0)
            })
    }

    fn at_war(&self, a: PlayerId, b: PlayerId) -> bool {
        self.wars.contains(&unordered(a, b))
    }

    fn recently_wronged(&self, observer: PlayerId, by: PlayerId) -> bool {
        self.wronged.contains(&(observer, by))
    }

    fn is_subordinate(&self, party: PlayerId, master: PlayerId) -> bool {
        self.masters.get(&party) == Some(&master)
    }

    fn tradeable_items(&self, owner: PlayerId, recipient: PlayerId) -> Vec<TradeItem> {
        let (Some(giver), Some(taker)) = (self.parties.get(&owner), self.parties.get(&recipient))
        else {
            return Vec::new();
        };

        if self.at_war(owner, recipient) {
            return vec![TradeItem::PeaceTreaty];
        }

        let mut items: Vec<TradeItem> = giver
            .holdings
            .iter()
            .filter(|item| match item {
                TradeItem::Technology { .. } | TradeItem::Resource { .. } => !taker.holds(item),
                _ => true,
            })
            .cloned()
            .collect();
        for treaty in [
            TradeItem::OpenBorders,
            TradeItem::DefensivePact,
            TradeItem::MapSharing,
        ] {
            if !self.has_agreement(owner, recipient, treaty.kind()) {
                items.push(treaty);
            }
        }
        items
    }
}

impl DenialPolicy for SandboxWorld {
    fn may_offer(&self, owner: PlayerId, recipient: PlayerId, item: &TradeItem) -> TradeVerdict {
        if let Some(reason) = self.denials.get(&(owner, recipient, item.clone())) {
            return TradeVerdict::Denied(*reason);
        }
        if self.at_war(owner, recipient) && !matches!(item, TradeItem::PeaceTreaty | TradeItem::Surrender) {
            return TradeVerdict::Denied(DenialReason::AtWar);
        }
        if let (Some(amount), Some(party)) = (item.amount(), self.parties.get(&owner)) {
            let held = if item.is_recurring() {
                party.income
            } else {
                party.gold
            };
            if amount > held {
                return TradeVerdict::Denied(DenialReason::NotEnoughHeld);
            }
        }
        TradeVerdict::Allowed
    }
}

impl TreasuryAdviser for SandboxWorld {
    fn max_affordable(&self, party: PlayerId, counterpart: PlayerId, generous: bool) -> GoldCeiling {
        let Some(p) = self.parties.get(&party) else {
            return GoldCeiling::default();
        };
        if self.at_war(party, counterpart) {
            return GoldCeiling::default();
        }
        let (lump_sum, per_turn) = if generous {
            (p.gold, p.income / 2)
        } else {
            (p.gold / 2, p.income / 4)
        };
        GoldCeiling {
            lump_sum: lump_sum.max(0),
            per_turn: per_turn.max(0),
        }
    }
}

impl DealSink for SandboxWorld {
    fn commit(&mut self, deal: Deal) {
        self.apply_deal(&deal);
    }

    fn present(&mut self, event: ProposalEvent) {
        tracing::debug!(
            responder = event.proposal.responder.0,
            topic = ?event.topic,
            "proposal awaiting a human decision"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{load_rules, RulesSource};
    use parley_protocol::{OfferList, Proposal, ResourceId};

    fn iron() -> TradeItem {
        TradeItem::Resource {
            resource: ResourceId::new(6),
        }
    }

    fn world() -> SandboxWorld {
        let rules = load_rules(RulesSource::Embedded).unwrap();
        let mut world = SandboxWorld::new(&rules, 0);
        world.add_party(
            SandboxParty::automated(PlayerId(0))
                .with_gold(100, 4)
                .with_items([iron()]),
        );
        world.add_party(
            SandboxParty::automated(PlayerId(1))
                .with_gold(50, 0)
                .with_items([iron()]),
        );
        world
    }

    #[test]
    fn denial_is_directional() {
        let mut world = world();
        world.deny(PlayerId(0), PlayerId(1), iron(), DenialReason::Monopoly);
        assert_eq!(
            world.may_offer(PlayerId(0), PlayerId(1), &iron()),
            TradeVerdict::Denied(DenialReason::Monopoly)
        );
        assert_eq!(world.may_offer(PlayerId(1), PlayerId(0), &iron()), TradeVerdict::Allowed);
    }

    #[test]
    fn war_blocks_everything_but_peace() {
        let mut world = world();
        world.set_war(PlayerId(0), PlayerId(1), true);
        assert_eq!(
            world.tradeable_items(PlayerId(0), PlayerId(1)),
            vec![TradeItem::PeaceTreaty]
        );
        assert!(world
            .may_offer(PlayerId(0), PlayerId(1), &TradeItem::PeaceTreaty)
            .is_allowed());
        assert_eq!(
            world.max_affordable(PlayerId(0), PlayerId(1), true),
            GoldCeiling::default()
        );
    }

    #[test]
    fn gold_beyond_the_treasury_is_denied() {
        let world = world();
        assert_eq!(
            world.may_offer(PlayerId(1), PlayerId(0), &TradeItem::GoldLumpSum { amount: 60 }),
            TradeVerdict::Denied(DenialReason::NotEnoughHeld)
        );
        assert_eq!(
            world.max_affordable(PlayerId(0), PlayerId(1), false),
            GoldCeiling {
                lump_sum: 50,
                per_turn: 1
            }
        );
    }

    #[test]
    fn applying_a_deal_moves_gold_and_records_treaties() {
        let mut world = world();
        let before = world.version();
        let deal = Deal {
            turn: 0,
            proposal: Proposal::with_lists(
                PlayerId(0),
                PlayerId(1),
                OfferList::from_items([TradeItem::GoldLumpSum { amount: 30 }, TradeItem::OpenBorders]),
                OfferList::from_items([TradeItem::OpenBorders]),
            ),
        };
        world.commit(deal);
        assert_eq!(world.party(PlayerId(0)).unwrap().gold, 70);
        assert_eq!(world.party(PlayerId(1)).unwrap().gold, 80);
        assert!(world.has_agreement(PlayerId(1), PlayerId(0), TradeItemKind::OpenBorders));
        assert!(!world
            .tradeable_items(PlayerId(0), PlayerId(1))
            .contains(&TradeItem::OpenBorders));
        assert!(world.version() > before);
    }

    #[test]
    fn table_oracle_prices_loss_above_gain() {
        let world = world();
        let tech = TradeItem::Technology {
            tech: TechId::new(0),
        };
        assert_eq!(world.oracle.score(PlayerId(0), &tech, Sign::Gain), 60);
        assert_eq!(world.oracle.score(PlayerId(0), &tech, Sign::Loss), 72);
        assert_eq!(
            world
                .oracle
                .score(PlayerId(0), &TradeItem::GoldLumpSum { amount: 40 }, Sign::Loss),
            40
        );
    }
}
