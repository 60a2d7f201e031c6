use rmp_serde::{decode, encode};
use serde_json;
use thiserror::Error;

use crate::{Deal, HaggleLedger, Proposal, ProposalEvent};

#[derive(Debug, Error)]
pub enum WireError {
    #[error("encode error: {0}")]
    Encode(#[from] encode::Error),
    #[error("decode error: {0}")]
    Decode(#[from] decode::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn serialize_proposal_event(event: &ProposalEvent) -> Result<Vec<u8>, WireError> {
    Ok(encode::to_vec(event)?)
}

pub fn deserialize_proposal_event(bytes: &[u8]) -> Result<ProposalEvent, WireError> {
    Ok(decode::from_slice(bytes)?)
}

pub fn serialize_deal(deal: &Deal) -> Result<Vec<u8>, WireError> {
    Ok(encode::to_vec(deal)?)
}

pub fn deserialize_deal(bytes: &[u8]) -> Result<Deal, WireError> {
    Ok(decode::from_slice(bytes)?)
}

pub fn serialize_haggle_ledger(ledger: &HaggleLedger) -> Result<Vec<u8>, WireError> {
    Ok(encode::to_vec(ledger)?)
}

pub fn deserialize_haggle_ledger(bytes: &[u8]) -> Result<HaggleLedger, WireError> {
    Ok(decode::from_slice(bytes)?)
}

/// Human-readable export of a proposal (logs, debugging panels).
pub fn proposal_to_json(proposal: &Proposal) -> Result<String, WireError> {
    Ok(serde_json::to_string(proposal)?)
}

pub fn proposal_from_json(json: &str) -> Result<Proposal, WireError> {
    Ok(serde_json::from_str(json)?)
}

/// Deterministic deal hash for cross-peer agreement checks.
///
/// Hashes the MessagePack-serialized deal using FNV-1a 64-bit.
pub fn deal_hash(deal: &Deal) -> Result<u64, WireError> {
    let bytes = serialize_deal(deal)?;
    Ok(hash_bytes_fnv1a64(&bytes))
}

/// Deterministic, stable 64-bit hash for raw bytes (FNV-1a).
pub fn hash_bytes_fnv1a64(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;

    let mut hash = OFFSET_BASIS;
    for &byte in bytes {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}
