//! Read-only view of the game the negotiation engine runs against, and the
//! sink it reports agreements to.

use parley_protocol::{Deal, PlayerId, ProposalEvent, TradeItem, WorldVersion};

use crate::oracle::{DenialPolicy, TreasuryAdviser, ValuationOracle};

pub trait NegotiationWorld {
    fn turn(&self) -> u32;

    /// Bumped whenever anything a valuation may depend on changes.
    fn version(&self) -> WorldVersion;

    fn is_human(&self, party: PlayerId) -> bool;

    /// Scalar attitude of `observer` toward `toward`, roughly -100..=100.
    fn disposition(&self, observer: PlayerId, toward: PlayerId) -> i32;

    /// Standing by score, 0 = leading.
    fn rank(&self, party: PlayerId) -> u8;

    fn turns_in_contact(&self, a: PlayerId, b: PlayerId) -> u32;

    fn at_war(&self, a: PlayerId, b: PlayerId) -> bool;

    /// `observer` holds a recent grievance against `by`.
    fn recently_wronged(&self, observer: PlayerId, by: PlayerId) -> bool;

    /// `party` is a vassal of `master`.
    fn is_subordinate(&self, party: PlayerId, master: PlayerId) -> bool;

    /// Non-gold items `owner` could conceivably hand to `recipient`.
    ///
    /// Legality is decided separately by the [`DenialPolicy`].
    fn tradeable_items(&self, owner: PlayerId, recipient: PlayerId) -> Vec<TradeItem>;
}

/// Receives the engine's decisions.
///
/// Calls are synchronous; implementations must apply a committed deal before
/// returning so the next negotiation in the same tick observes it.
pub trait DealSink {
    fn commit(&mut self, deal: Deal);
    fn present(&mut self, event: ProposalEvent);
}

/// The external collaborators one negotiation consults.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub oracle: &'a dyn ValuationOracle,
    pub denial: &'a dyn DenialPolicy,
    pub treasury: &'a dyn TreasuryAdviser,
    pub world: &'a dyn NegotiationWorld,
}

impl<'a> Collaborators<'a> {
    pub fn new(
        oracle: &'a dyn ValuationOracle,
        denial: &'a dyn DenialPolicy,
        treasury: &'a dyn TreasuryAdviser,
        world: &'a dyn NegotiationWorld,
    ) -> Self {
        Self {
            oracle,
            denial,
            treasury,
            world,
        }
    }

    /// Same collaborators with a different oracle (e.g. a cache in front).
    pub fn with_oracle(self, oracle: &'a dyn ValuationOracle) -> Self {
        Self { oracle, ..self }
    }
}

/// Sink that records everything it is handed.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    pub deals: Vec<Deal>,
    pub events: Vec<ProposalEvent>,
}

impl DealSink for RecordingSink {
    fn commit(&mut self, deal: Deal) {
        self.deals.push(deal);
    }

    fn present(&mut self, event: ProposalEvent) {
        self.events.push(event);
    }
}
