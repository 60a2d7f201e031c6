//! Cross-attempt haggling counters.
//!
//! The only negotiation state that outlives a single attempt. Owned by the
//! persistence layer and lent to the engine; it must survive save/reload.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::PlayerId;

/// Per ordered party pair `(asker, asked)` count of repeated haggling attempts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HaggleLedger {
    /// Keyed by the packed `(asker, asked)` pair.
    attempts: BTreeMap<u16, u8>,
    /// Saturation point; further attempts do not widen tolerance.
    cap: u8,
}

fn pair_key(asker: PlayerId, asked: PlayerId) -> u16 {
    (u16::from(asker.0) << 8) | u16::from(asked.0)
}

impl HaggleLedger {
    pub fn new(cap: u8) -> Self {
        Self {
            attempts: BTreeMap::new(),
            cap,
        }
    }

    pub fn attempts(&self, asker: PlayerId, asked: PlayerId) -> u8 {
        self.attempts
            .get(&pair_key(asker, asked))
            .copied()
            .unwrap_or(0)
    }

    /// Records one more attempt by `asker` toward `asked`; returns the new count.
    pub fn record_attempt(&mut self, asker: PlayerId, asked: PlayerId) -> u8 {
        let cap = self.cap;
        let entry = self.attempts.entry(pair_key(asker, asked)).or_insert(0);
        *entry = entry.saturating_add(1).min(cap);
        *entry
    }

    /// Clears the counter once the pair strikes a deal.
    pub fn reset(&mut self, asker: PlayerId, asked: PlayerId) {
        self.attempts.remove(&pair_key(asker, asked));
    }

    /// Start of a new session: forget every counter.
    pub fn clear(&mut self) {
        self.attempts.clear();
    }

    pub fn cap(&self) -> u8 {
        self.cap
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }
}
