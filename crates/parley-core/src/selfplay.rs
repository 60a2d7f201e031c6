//! Headless self-play harness for negotiation tuning.
//!
//! Loads a scripted world from YAML and lets every automated party court
//! every other party once per turn, collecting what came of it.

use std::collections::BTreeMap;

use parley_protocol::{
    deal_hash, deserialize_haggle_ledger, hash_bytes_fnv1a64, serialize_haggle_ledger, Deal,
    DenialReason, HaggleLedger, PlayerId, ProposalEvent, SettlementId, TradeItem, WireError,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::oracle::CachedOracle;
use crate::orchestrator::{propose_trade, Negotiator, Resolution};
use crate::rng::{TieBreak, TurnRng};
use crate::rules::NegotiationRules;
use crate::sandbox::{SandboxParty, SandboxWorld};
use crate::world::{NegotiationWorld, RecordingSink};

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("wire error: {0}")]
    Wire(#[from] WireError),
    #[error("unknown resource: {0}")]
    UnknownResource(String),
    #[error("unknown party: {0}")]
    UnknownParty(u8),
    #[error("duplicate party: {0}")]
    DuplicateParty(u8),
    #[error("scenario needs at least two parties")]
    TooFewParties,
}

// =============================================================================
// Scenario file
// =============================================================================

#[derive(Clone, Debug, Deserialize)]
pub struct Scenario {
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_turns")]
    pub turns: u32,
    #[serde(default)]
    pub start_turn: u32,
    pub parties: Vec<PartySpec>,
    #[serde(default)]
    pub relations: Vec<RelationSpec>,
    #[serde(default)]
    pub values: Vec<ValueSpec>,
    #[serde(default)]
    pub denials: Vec<DenialSpec>,
}

fn default_seed() -> u64 {
    42
}

fn default_turns() -> u32 {
    10
}

#[derive(Clone, Debug, Deserialize)]
pub struct PartySpec {
    pub id: u8,
    #[serde(default)]
    pub human: bool,
    #[serde(default)]
    pub gold: i32,
    #[serde(default)]
    pub income: i32,
    #[serde(default)]
    pub rank: u8,
    #[serde(default)]
    pub techs: Vec<u16>,
    /// Resource data ids from the rules file.
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default)]
    pub settlements: Vec<u32>,
}

/// Relation of `from` toward `to`. Wars and contact are symmetric.
#[derive(Clone, Debug, Deserialize)]
pub struct RelationSpec {
    pub from: u8,
    pub to: u8,
    #[serde(default)]
    pub disposition: i32,
    #[serde(default)]
    pub contact_turns: u32,
    #[serde(default)]
    pub war: bool,
    #[serde(default)]
    pub wronged: bool,
    /// `from` is a vassal of `to`.
    #[serde(default)]
    pub vassal: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ValueSpec {
    pub observer: u8,
    pub item: TradeItem,
    pub value: i32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct DenialSpec {
    pub owner: u8,
    pub recipient: u8,
    pub item: TradeItem,
    pub reason: DenialReason,
}

impl Scenario {
    pub fn from_yaml(yaml: &str) -> Result<Self, ScenarioError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: &str) -> Result<Self, ScenarioError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    /// Bundled four-party demo.
    pub fn embedded() -> Result<Self, ScenarioError> {
        Self::from_yaml(include_str!("../data/scenarios/four_courts.yaml"))
    }

    pub fn build_world(&self, rules: &NegotiationRules) -> Result<SandboxWorld, ScenarioError> {
        if self.parties.len() < 2 {
            return Err(ScenarioError::TooFewParties);
        }
        let mut world = SandboxWorld::new(rules, self.start_turn);

        for entry in &self.parties {
            let id = PlayerId(entry.id);
            if world.party(id).is_some() {
                return Err(ScenarioError::DuplicateParty(entry.id));
            }
            let mut items = Vec::new();
            for name in &entry.resources {
                let resource = rules
                    .resource_id(name)
                    .ok_or_else(|| ScenarioError::UnknownResource(name.clone()))?;
                items.push(TradeItem::Resource { resource });
            }
            items.extend(entry.settlements.iter().map(|&index| TradeItem::Settlement {
                settlement: SettlementId(index),
            }));

            let party = if entry.human {
                SandboxParty::human(id)
            } else {
                SandboxParty::automated(id)
            };
            world.add_party(
                party
                    .with_gold(entry.gold, entry.income)
                    .with_rank(entry.rank)
                    .with_techs(entry.techs.iter().copied())
                    .with_items(items),
            );
        }

        let known = |raw: u8| -> Result<PlayerId, ScenarioError> {
            let id = PlayerId(raw);
            match world.party(id) {
                Some(_) => Ok(id),
                None => Err(ScenarioError::UnknownParty(raw)),
            }
        };
        let mut relations = Vec::with_capacity(self.relations.len());
        for rel in &self.relations {
            relations.push((known(rel.from)?, known(rel.to)?, rel));
        }
        let mut values = Vec::with_capacity(self.values.len());
        for v in &self.values {
            values.push((known(v.observer)?, v));
        }
        let mut denials = Vec::with_capacity(self.denials.len());
        for d in &self.denials {
            denials.push((known(d.owner)?, known(d.recipient)?, d));
        }

        for (from, to, rel) in relations {
            world.set_disposition(from, to, rel.disposition);
            world.set_contact(from, to, rel.contact_turns);
            if rel.war {
                world.set_war(from, to, true);
            }
            if rel.wronged {
                world.set_wronged(from, to, true);
            }
            if rel.vassal {
                world.set_master(from, to);
            }
        }
        for (observer, v) in values {
            world.set_value(observer, v.item.clone(), v.value);
        }
        for (owner, recipient, d) in denials {
            world.deny(owner, recipient, d.item.clone(), d.reason);
        }
        Ok(world)
    }
}

// =============================================================================
// Harness
// =============================================================================

#[derive(Clone, Debug)]
pub struct SelfPlayConfig {
    pub seed: u64,
    pub turns: u32,
    /// Draw tie-breaks from the shared turn-keyed stream.
    pub jitter: bool,
}

impl SelfPlayConfig {
    pub fn from_scenario(scenario: &Scenario) -> Self {
        Self {
            seed: scenario.seed,
            turns: scenario.turns,
            jitter: true,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct SelfPlayReport {
    pub seed: u64,
    pub turns_played: u32,
    pub negotiations: u32,
    pub rejections: u32,
    pub deals: Vec<Deal>,
    /// Proposals shown to human parties.
    pub presented: Vec<ProposalEvent>,
    pub final_gold: BTreeMap<u8, i32>,
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Digest of every committed deal, for cross-run determinism checks.
    pub outcome_hash: u64,
}

pub fn run_selfplay(
    rules: &NegotiationRules,
    config: &SelfPlayConfig,
    scenario: &Scenario,
) -> Result<SelfPlayReport, ScenarioError> {
    let mut world = scenario.build_world(rules)?;
    let mut ledger = HaggleLedger::new(rules.haggle_cap);
    let mut report = SelfPlayReport {
        seed: config.seed,
        ..SelfPlayReport::default()
    };
    let mut digest = Vec::new();

    for _ in 0..config.turns {
        let turn = world.turn();
        let ids = world.party_ids();
        for &initiator in &ids {
            if world.is_human(initiator) {
                continue;
            }
            for &responder in &ids {
                if responder == initiator {
                    continue;
                }
                let mut sink = RecordingSink::default();
                let resolution = {
                    let cache = CachedOracle::new(&world.oracle, world.version());
                    let env = world.collaborators().with_oracle(&cache);
                    let negotiator = Negotiator::new(rules, env);
                    let mut rng = TurnRng::keyed(config.seed, turn, initiator, responder);
                    let mut tie = if config.jitter {
                        TieBreak::Shared(&mut rng)
                    } else {
                        TieBreak::Stable
                    };
                    let resolution = propose_trade(
                        &negotiator,
                        &mut ledger,
                        &mut sink,
                        &mut tie,
                        initiator,
                        responder,
                        None,
                    );
                    report.cache_hits += cache.hits();
                    report.cache_misses += cache.misses();
                    resolution
                };
                report.negotiations += 1;

                for deal in &sink.deals {
                    world.apply_deal(deal);
                    digest.extend_from_slice(&deal_hash(deal)?.to_le_bytes());
                }
                if matches!(resolution, Resolution::Rejected) {
                    report.rejections += 1;
                }
                report.deals.append(&mut sink.deals);
                report.presented.append(&mut sink.events);
            }
        }

        // Counters must survive a save/reload between turns.
        ledger = deserialize_haggle_ledger(&serialize_haggle_ledger(&ledger)?)?;
        world.advance_turn();
        report.turns_played += 1;
    }

    report.final_gold = world.parties().map(|p| (p.id.0, p.gold)).collect();
    report.outcome_hash = hash_bytes_fnv1a64(&digest);
    tracing::info!(
        turns = report.turns_played,
        negotiations = report.negotiations,
        deals = report.deals.len(),
        rejections = report.rejections,
        presented = report.presented.len(),
        outcome_hash = format_args!("{:016x}", report.outcome_hash),
        "self-play finished"
    );
    Ok(report)
}
