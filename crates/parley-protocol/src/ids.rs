use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

/// Name of a rules entry as written in the YAML tables.
pub type DataId = String;

/// Dense index assigned to a rules entry at load time.
///
/// The tag keeps technologies, resources and the rest from being mixed up;
/// on the wire it is just the number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuntimeId<T> {
    pub raw: u16,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T> RuntimeId<T> {
    #[inline]
    pub const fn new(raw: u16) -> Self {
        Self {
            raw,
            _marker: PhantomData,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TechTag;
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceTag;
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CategoryTag;
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CivicTag;
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReligionTag;

pub type TechId = RuntimeId<TechTag>;
pub type ResourceId = RuntimeId<ResourceTag>;
/// Protected resource category ("grants contentment", "grants wellbeing", ...).
pub type CategoryId = RuntimeId<CategoryTag>;
pub type CivicId = RuntimeId<CivicTag>;
pub type ReligionId = RuntimeId<ReligionTag>;

/// Settlement handle issued by the host game; opaque to the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettlementId(pub u32);

impl fmt::Display for SettlementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Seat index of a party in the game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u8);

/// Monotonic world-state version; bumps whenever anything a valuation may depend on changes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorldVersion(pub u64);

impl WorldVersion {
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_bare_numbers() {
        let json = serde_json::to_string(&(TechId::new(7), SettlementId(12), PlayerId(3))).unwrap();
        assert_eq!(json, "[7,12,3]");
        let back: (TechId, SettlementId, PlayerId) = serde_json::from_str(&json).unwrap();
        assert_eq!(back, (TechId::new(7), SettlementId(12), PlayerId(3)));
    }
}
