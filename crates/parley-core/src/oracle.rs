//! Contracts for the strategy objects the engine consumes.
//!
//! Valuation, legality and affordability are owned by the surrounding game.
//! The engine only calls through these traits and never caches their answers
//! across world-state changes (see [`CachedOracle`] for the opt-in decorator).

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use parley_protocol::{DenialReason, OfferList, PlayerId, TradeItem, TradeVerdict, WorldVersion};
use serde::{Deserialize, Serialize};

/// Whether an item is valued as something received or something given away.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sign {
    Gain,
    Loss,
}

pub trait ValuationOracle {
    /// Value of `item` to `observer`, in abstract value units.
    fn score(&self, observer: PlayerId, item: &TradeItem, sign: Sign) -> i32;
}

pub trait DenialPolicy {
    fn may_offer(&self, owner: PlayerId, recipient: PlayerId, item: &TradeItem) -> TradeVerdict;
}

/// Gold a party can spend on one counterpart right now.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoldCeiling {
    pub lump_sum: i32,
    pub per_turn: i32,
}

pub trait TreasuryAdviser {
    /// `generous` asks for the ceiling used when courting the counterpart.
    fn max_affordable(&self, party: PlayerId, counterpart: PlayerId, generous: bool) -> GoldCeiling;
}

impl<T: ValuationOracle + ?Sized> ValuationOracle for &T {
    fn score(&self, observer: PlayerId, item: &TradeItem, sign: Sign) -> i32 {
        (**self).score(observer, item, sign)
    }
}

impl<T: DenialPolicy + ?Sized> DenialPolicy for &T {
    fn may_offer(&self, owner: PlayerId, recipient: PlayerId, item: &TradeItem) -> TradeVerdict {
        (**self).may_offer(owner, recipient, item)
    }
}

impl<T: TreasuryAdviser + ?Sized> TreasuryAdviser for &T {
    fn max_affordable(&self, party: PlayerId, counterpart: PlayerId, generous: bool) -> GoldCeiling {
        (**self).max_affordable(party, counterpart, generous)
    }
}

// =============================================================================
// Guarded access
// =============================================================================

/// Scores `item`, degrading unrecognized kinds to zero.
pub fn score_item(
    oracle: &dyn ValuationOracle,
    observer: PlayerId,
    item: &TradeItem,
    sign: Sign,
) -> i32 {
    debug_assert!(!item.is_unknown(), "valuing an unrecognized trade item");
    if item.is_unknown() {
        tracing::warn!(observer = observer.0, "unrecognized trade item valued as zero");
        return 0;
    }
    oracle.score(observer, item, sign)
}

/// Denial check that refuses unrecognized kinds without consulting the policy.
pub fn check_offer(
    policy: &dyn DenialPolicy,
    owner: PlayerId,
    recipient: PlayerId,
    item: &TradeItem,
) -> TradeVerdict {
    if item.is_unknown() {
        return TradeVerdict::Denied(DenialReason::Unknown);
    }
    policy.may_offer(owner, recipient, item)
}

/// Receiver-side valuation of items and lists.
pub trait Valuable {
    fn value_to(&self, observer: PlayerId, oracle: &dyn ValuationOracle) -> i32;
}

impl Valuable for TradeItem {
    fn value_to(&self, observer: PlayerId, oracle: &dyn ValuationOracle) -> i32 {
        score_item(oracle, observer, self, Sign::Gain)
    }
}

impl Valuable for OfferList {
    fn value_to(&self, observer: PlayerId, oracle: &dyn ValuationOracle) -> i32 {
        self.iter()
            .map(|item| item.value_to(observer, oracle))
            .fold(0_i32, i32::saturating_add)
    }
}

/// What `giver` loses by handing over every item of `list`.
pub fn loss_of(list: &OfferList, giver: PlayerId, oracle: &dyn ValuationOracle) -> i32 {
    list.iter()
        .map(|item| score_item(oracle, giver, item, Sign::Loss))
        .fold(0_i32, i32::saturating_add)
}

// =============================================================================
// Cache decorator
// =============================================================================

type CacheKey = (PlayerId, TradeItem, Sign);

/// Memoizes an oracle within one world-state version.
///
/// Single-threaded by construction; call [`CachedOracle::invalidate`] with the
/// current [`WorldVersion`] before each negotiation.
#[derive(Debug)]
pub struct CachedOracle<O> {
    inner: O,
    version: Cell<WorldVersion>,
    entries: RefCell<HashMap<CacheKey, i32>>,
    hits: Cell<u64>,
    misses: Cell<u64>,
}

impl<O: ValuationOracle> CachedOracle<O> {
    pub fn new(inner: O, version: WorldVersion) -> Self {
        Self {
            inner,
            version: Cell::new(version),
            entries: RefCell::new(HashMap::new()),
            hits: Cell::new(0),
            misses: Cell::new(0),
        }
    }

    /// Drops every entry if `version` differs from the cached one.
    pub fn invalidate(&self, version: WorldVersion) {
        if self.version.get() == version {
            return;
        }
        let dropped = {
            let mut entries = self.entries.borrow_mut();
            let n = entries.len();
            entries.clear();
            n
        };
        tracing::trace!(
            from = self.version.get().0,
            to = version.0,
            dropped,
            "valuation cache invalidated"
        );
        self.version.set(version);
    }

    pub fn version(&self) -> WorldVersion {
        self.version.get()
    }

    pub fn hits(&self) -> u64 {
        self.hits.get()
    }

    pub fn misses(&self) -> u64 {
        self.misses.get()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn inner(&self) -> &O {
        &self.inner
    }
}

impl<O: ValuationOracle> ValuationOracle for CachedOracle<O> {
    fn score(&self, observer: PlayerId, item: &TradeItem, sign: Sign) -> i32 {
        let key = (observer, item.clone(), sign);
        if let Some(value) = self.entries.borrow().get(&key).copied() {
            self.hits.set(self.hits.get() + 1);
            return value;
        }
        let value = self.inner.score(observer, item, sign);
        self.misses.set(self.misses.get() + 1);
        self.entries.borrow_mut().insert(key, value);
        value
    }
}
