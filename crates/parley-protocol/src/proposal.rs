//! Proposal, deal and denial types shared with the presentation layer.

use serde::{Deserialize, Serialize};

use crate::{OfferList, PlayerId};

// =============================================================================
// Proposals
// =============================================================================

/// Both sides of a two-party proposal.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Proposal {
    pub initiator: PlayerId,
    pub responder: PlayerId,
    /// What the initiator gives.
    pub initiator_gives: OfferList,
    /// What the responder gives.
    pub responder_gives: OfferList,
}

impl Proposal {
    pub fn new(initiator: PlayerId, responder: PlayerId) -> Self {
        Self {
            initiator,
            responder,
            initiator_gives: OfferList::new(),
            responder_gives: OfferList::new(),
        }
    }

    pub fn with_lists(
        initiator: PlayerId,
        responder: PlayerId,
        initiator_gives: OfferList,
        responder_gives: OfferList,
    ) -> Self {
        Self {
            initiator,
            responder,
            initiator_gives,
            responder_gives,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.initiator_gives.is_empty() && self.responder_gives.is_empty()
    }

    /// A pure 1-for-1 swap: exactly one item on each side.
    pub fn is_single_swap(&self) -> bool {
        self.initiator_gives.len() == 1 && self.responder_gives.len() == 1
    }

    /// List given by `party`, if it takes part in this proposal.
    pub fn gives(&self, party: PlayerId) -> Option<&OfferList> {
        if party == self.initiator {
            Some(&self.initiator_gives)
        } else if party == self.responder {
            Some(&self.responder_gives)
        } else {
            None
        }
    }

    /// Same terms seen from the other side: initiator and responder trade places.
    pub fn swapped(&self) -> Self {
        Self {
            initiator: self.responder,
            responder: self.initiator,
            initiator_gives: self.responder_gives.clone(),
            responder_gives: self.initiator_gives.clone(),
        }
    }

    pub fn contains_unknown(&self) -> bool {
        self.initiator_gives
            .iter()
            .chain(self.responder_gives.iter())
            .any(|item| item.is_unknown())
    }

    pub fn other_party(&self, party: PlayerId) -> Option<PlayerId> {
        if party == self.initiator {
            Some(self.responder)
        } else if party == self.responder {
            Some(self.initiator)
        } else {
            None
        }
    }
}

/// Why a proposal is being shown to a human.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalTopic {
    /// An automated party opens a trade.
    TradeOffer,
    /// An automated party answers a human proposal with different terms.
    CounterOffer,
    /// An automated party asks for something without compensation.
    Request,
    /// An automated party intends to cancel a standing deal unless renegotiated.
    Renegotiate,
}

/// Structured event handed to the presentation layer instead of committing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalEvent {
    pub topic: ProposalTopic,
    pub turn: u32,
    pub proposal: Proposal,
}

/// A trade both parties agreed to; committed atomically.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Deal {
    pub turn: u32,
    pub proposal: Proposal,
}

// =============================================================================
// Denials
// =============================================================================

/// Reason an item may not be offered, surfaced verbatim to a human-facing layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    /// The owner considers the recipient its worst enemy.
    WorstEnemy,
    /// The parties are at war and the item is not a peace term.
    AtWar,
    /// The owner does not hold enough of the item to spare it.
    NotEnoughHeld,
    /// Giving it away would end a monopoly the owner relies on.
    Monopoly,
    /// Losing it would cause unrest at home.
    TooMuchUnrest,
    /// A vassal cannot make this commitment on its own.
    Vassal,
    /// The recipient has no use for it.
    NoUse,
    /// The owner just does not want to.
    Refused,
    /// The item kind is not recognized by this build.
    Unknown,
}

impl DenialReason {
    pub fn description(&self) -> &'static str {
        match self {
            DenialReason::WorstEnemy => "we will not help our worst enemy",
            DenialReason::AtWar => "not while we are at war",
            DenialReason::NotEnoughHeld => "we do not have enough to spare",
            DenialReason::Monopoly => "we will not give up our monopoly",
            DenialReason::TooMuchUnrest => "our people would not stand for it",
            DenialReason::Vassal => "our master would not allow it",
            DenialReason::NoUse => "they have no use for it",
            DenialReason::Refused => "we do not want to",
            DenialReason::Unknown => "unrecognized item",
        }
    }
}

/// Outcome of a denial-policy check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "verdict", content = "reason", rename_all = "snake_case")]
pub enum TradeVerdict {
    Allowed,
    Denied(DenialReason),
}

impl TradeVerdict {
    #[inline]
    pub fn is_allowed(&self) -> bool {
        matches!(self, TradeVerdict::Allowed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TradeItem;

    #[test]
    fn single_swap_detection() {
        let mut proposal = Proposal::new(PlayerId(0), PlayerId(1));
        assert!(proposal.is_empty());
        proposal.initiator_gives.push(TradeItem::MapSharing);
        assert!(!proposal.is_single_swap());
        proposal.responder_gives.push(TradeItem::GoldLumpSum { amount: 20 });
        assert!(proposal.is_single_swap());
    }

    #[test]
    fn gives_and_other_party() {
        let proposal = Proposal::with_lists(
            PlayerId(2),
            PlayerId(5),
            OfferList::from_items([TradeItem::OpenBorders]),
            OfferList::new(),
        );
        assert_eq!(proposal.gives(PlayerId(2)).map(OfferList::len), Some(1));
        assert_eq!(proposal.other_party(PlayerId(5)), Some(PlayerId(2)));
        assert_eq!(proposal.other_party(PlayerId(9)), None);

        let swapped = proposal.swapped();
        assert_eq!(swapped.initiator, PlayerId(5));
        assert!(swapped.initiator_gives.is_empty());
        assert_eq!(swapped.swapped(), proposal);
    }
}
