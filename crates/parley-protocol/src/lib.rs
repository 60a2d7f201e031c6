//! Serializable types shared between the negotiation engine, the
//! presentation layer and persistence.

mod haggle;
mod ids;
mod item;
mod offer;
mod proposal;
pub mod wire;

pub use crate::haggle::*;
pub use crate::ids::*;
pub use crate::item::*;
pub use crate::offer::*;
pub use crate::proposal::*;
pub use crate::wire::{
    deal_hash, deserialize_deal, deserialize_haggle_ledger, deserialize_proposal_event,
    hash_bytes_fnv1a64, proposal_from_json, proposal_to_json, serialize_deal,
    serialize_haggle_ledger, serialize_proposal_event, WireError,
};
