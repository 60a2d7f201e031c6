//! Tradeable item taxonomy.
//!
//! A [`TradeItem`] is an immutable, structurally comparable value. The
//! negotiation engine never branches on the variant directly; it goes through
//! the capability methods below (`is_dual`, `is_fungible`, `same_slot`, ...),
//! so adding a kind means extending this file and the valuation tables only.

use serde::{Deserialize, Serialize};

use crate::{CivicId, PlayerId, ReligionId, ResourceId, SettlementId, TechId};

/// Items that can be placed on one side of a proposal.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TradeItem {
    /// A specific technology.
    Technology { tech: TechId },
    /// One-time gold payment.
    GoldLumpSum { amount: i32 },
    /// Gold paid every turn over the rules' payment horizon.
    GoldPerTurn { amount: i32 },
    /// Strategic or luxury commodity access.
    Resource { resource: ResourceId },
    /// A settlement changes hands.
    Settlement { settlement: SettlementId },
    /// Peace between the two parties.
    PeaceTreaty,
    /// Units can move through each other's territory.
    OpenBorders,
    /// Join war if either party is attacked.
    DefensivePact,
    /// The giving party becomes a vassal of the receiver.
    Vassalage,
    /// Capitulation while at war (vassalage on the victor's terms).
    Surrender,
    /// Declaration of war on a third party.
    DeclareWarOn { target: PlayerId },
    /// Stop trading with a third party.
    Embargo { target: PlayerId },
    /// Adopt the given civic.
    CivicChange { civic: CivicId },
    /// Convert to the given state religion.
    ReligionChange { religion: ReligionId },
    /// Share explored map.
    MapSharing,
    /// Tag not recognized by this build (newer save, foreign peer).
    #[serde(other)]
    Unknown,
}

/// Payload-free tag of a [`TradeItem`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeItemKind {
    Technology,
    GoldLumpSum,
    GoldPerTurn,
    Resource,
    Settlement,
    PeaceTreaty,
    OpenBorders,
    DefensivePact,
    Vassalage,
    Surrender,
    DeclareWarOn,
    Embargo,
    CivicChange,
    ReligionChange,
    MapSharing,
    Unknown,
}

impl TradeItemKind {
    pub const ALL: [TradeItemKind; 15] = [
        TradeItemKind::Technology,
        TradeItemKind::GoldLumpSum,
        TradeItemKind::GoldPerTurn,
        TradeItemKind::Resource,
        TradeItemKind::Settlement,
        TradeItemKind::PeaceTreaty,
        TradeItemKind::OpenBorders,
        TradeItemKind::DefensivePact,
        TradeItemKind::Vassalage,
        TradeItemKind::Surrender,
        TradeItemKind::DeclareWarOn,
        TradeItemKind::Embargo,
        TradeItemKind::CivicChange,
        TradeItemKind::ReligionChange,
        TradeItemKind::MapSharing,
    ];

    /// Treaty-like kinds recorded once per side once agreed.
    pub fn is_dual(self) -> bool {
        matches!(
            self,
            TradeItemKind::PeaceTreaty
                | TradeItemKind::OpenBorders
                | TradeItemKind::DefensivePact
                | TradeItemKind::MapSharing
        )
    }

    pub fn is_fungible(self) -> bool {
        matches!(self, TradeItemKind::GoldLumpSum | TradeItemKind::GoldPerTurn)
    }

    pub fn name(self) -> &'static str {
        match self {
            TradeItemKind::Technology => "technology",
            TradeItemKind::GoldLumpSum => "gold",
            TradeItemKind::GoldPerTurn => "gold per turn",
            TradeItemKind::Resource => "resource",
            TradeItemKind::Settlement => "settlement",
            TradeItemKind::PeaceTreaty => "peace treaty",
            TradeItemKind::OpenBorders => "open borders",
            TradeItemKind::DefensivePact => "defensive pact",
            TradeItemKind::Vassalage => "vassalage",
            TradeItemKind::Surrender => "surrender",
            TradeItemKind::DeclareWarOn => "declare war",
            TradeItemKind::Embargo => "embargo",
            TradeItemKind::CivicChange => "civic change",
            TradeItemKind::ReligionChange => "religion change",
            TradeItemKind::MapSharing => "map sharing",
            TradeItemKind::Unknown => "unknown",
        }
    }
}

impl TradeItem {
    pub fn kind(&self) -> TradeItemKind {
        match self {
            TradeItem::Technology { .. } => TradeItemKind::Technology,
            TradeItem::GoldLumpSum { .. } => TradeItemKind::GoldLumpSum,
            TradeItem::GoldPerTurn { .. } => TradeItemKind::GoldPerTurn,
            TradeItem::Resource { .. } => TradeItemKind::Resource,
            TradeItem::Settlement { .. } => TradeItemKind::Settlement,
            TradeItem::PeaceTreaty => TradeItemKind::PeaceTreaty,
            TradeItem::OpenBorders => TradeItemKind::OpenBorders,
            TradeItem::DefensivePact => TradeItemKind::DefensivePact,
            TradeItem::Vassalage => TradeItemKind::Vassalage,
            TradeItem::Surrender => TradeItemKind::Surrender,
            TradeItem::DeclareWarOn { .. } => TradeItemKind::DeclareWarOn,
            TradeItem::Embargo { .. } => TradeItemKind::Embargo,
            TradeItem::CivicChange { .. } => TradeItemKind::CivicChange,
            TradeItem::ReligionChange { .. } => TradeItemKind::ReligionChange,
            TradeItem::MapSharing => TradeItemKind::MapSharing,
            TradeItem::Unknown => TradeItemKind::Unknown,
        }
    }

    #[inline]
    pub fn is_dual(&self) -> bool {
        self.kind().is_dual()
    }

    #[inline]
    pub fn is_fungible(&self) -> bool {
        self.kind().is_fungible()
    }

    /// Paid every turn rather than once.
    #[inline]
    pub fn is_recurring(&self) -> bool {
        matches!(self, TradeItem::GoldPerTurn { .. })
    }

    #[inline]
    pub fn is_unknown(&self) -> bool {
        matches!(self, TradeItem::Unknown)
    }

    /// Quantity carried by a fungible item, `None` for everything else.
    pub fn amount(&self) -> Option<i32> {
        match self {
            TradeItem::GoldLumpSum { amount } | TradeItem::GoldPerTurn { amount } => Some(*amount),
            _ => None,
        }
    }

    /// Same fungible kind carrying a different quantity.
    pub fn with_amount(&self, amount: i32) -> Option<TradeItem> {
        match self {
            TradeItem::GoldLumpSum { .. } => Some(TradeItem::GoldLumpSum { amount }),
            TradeItem::GoldPerTurn { .. } => Some(TradeItem::GoldPerTurn { amount }),
            _ => None,
        }
    }

    pub fn resource(&self) -> Option<ResourceId> {
        match self {
            TradeItem::Resource { resource } => Some(*resource),
            _ => None,
        }
    }

    /// Whether two items occupy the same slot of an offer list.
    ///
    /// Fungible items share a slot per kind regardless of amount; everything
    /// else only collides with a structurally equal item.
    pub fn same_slot(&self, other: &TradeItem) -> bool {
        if self.is_fungible() {
            self.kind() == other.kind()
        } else {
            self == other
        }
    }

    pub fn label(&self) -> String {
        match self {
            TradeItem::Technology { tech } => format!("technology #{}", tech.raw),
            TradeItem::GoldLumpSum { amount } => format!("{amount} gold"),
            TradeItem::GoldPerTurn { amount } => format!("{amount} gold per turn"),
            TradeItem::Resource { resource } => format!("resource #{}", resource.raw),
            TradeItem::Settlement { settlement } => format!("settlement {settlement}"),
            TradeItem::DeclareWarOn { target } => format!("declare war on player {}", target.0),
            TradeItem::Embargo { target } => format!("embargo against player {}", target.0),
            TradeItem::CivicChange { civic } => format!("adopt civic #{}", civic.raw),
            TradeItem::ReligionChange { religion } => format!("convert to religion #{}", religion.raw),
            other => other.kind().name().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gold_items_share_a_slot_regardless_of_amount() {
        let a = TradeItem::GoldLumpSum { amount: 10 };
        let b = TradeItem::GoldLumpSum { amount: 250 };
        assert!(a.same_slot(&b));
        assert!(!a.same_slot(&TradeItem::GoldPerTurn { amount: 10 }));
    }

    #[test]
    fn non_fungible_slots_need_structural_equality() {
        let iron = TradeItem::Resource {
            resource: ResourceId::new(1),
        };
        let silk = TradeItem::Resource {
            resource: ResourceId::new(2),
        };
        assert!(iron.same_slot(&iron.clone()));
        assert!(!iron.same_slot(&silk));
    }

    #[test]
    fn treaties_are_dual_and_gold_is_fungible() {
        assert!(TradeItem::OpenBorders.is_dual());
        assert!(TradeItem::PeaceTreaty.is_dual());
        assert!(!TradeItem::Vassalage.is_dual());
        assert!(TradeItem::GoldPerTurn { amount: 3 }.is_fungible());
        assert!(TradeItem::GoldPerTurn { amount: 3 }.is_recurring());
        assert!(!TradeItem::GoldLumpSum { amount: 3 }.is_recurring());
    }

    #[test]
    fn unrecognized_tag_decodes_as_unknown() {
        let item: TradeItem = serde_json::from_str(r#"{"type":"Wonder"}"#).unwrap();
        assert!(item.is_unknown());
        assert_eq!(item.kind(), TradeItemKind::Unknown);
    }

    #[test]
    fn kind_list_excludes_unknown() {
        assert!(!TradeItemKind::ALL.contains(&TradeItemKind::Unknown));
        assert_eq!(
            TradeItemKind::ALL.iter().filter(|k| k.is_dual()).count(),
            4
        );
    }
}
