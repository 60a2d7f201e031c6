//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use parley_core::sandbox::{SandboxParty, SandboxWorld};
use parley_core::{
    load_rules, BalanceOutcome, InventoryBuilder, NegotiationContext, NegotiationRules,
    NegotiationWorld, OfferBalancer, RulesSource, TieBreak,
};
use parley_protocol::{OfferList, PlayerId, TechId, TradeItem};

pub const A: PlayerId = PlayerId(0);
pub const B: PlayerId = PlayerId(1);

pub fn rules() -> NegotiationRules {
    load_rules(RulesSource::Embedded).unwrap()
}

pub fn resource(rules: &NegotiationRules, name: &str) -> TradeItem {
    TradeItem::Resource {
        resource: rules.resource_id(name).unwrap(),
    }
}

pub fn tech(raw: u16) -> TradeItem {
    TradeItem::Technology {
        tech: TechId::new(raw),
    }
}

pub fn gold(amount: i32) -> TradeItem {
    TradeItem::GoldLumpSum { amount }
}

/// Two automated parties at turn 0 with nothing but what the caller adds.
pub fn two_party_world(rules: &NegotiationRules, a: SandboxParty, b: SandboxParty) -> SandboxWorld {
    let mut world = SandboxWorld::new(rules, 0);
    world.add_party(a);
    world.add_party(b);
    world
}

/// Runs the balancer with `A` as the side allowed to add.
pub fn balance_for(
    world: &SandboxWorld,
    rules: &NegotiationRules,
    caller: PlayerId,
    a_gives: &OfferList,
    b_gives: &OfferList,
    generosity_percent: i32,
) -> BalanceOutcome {
    let env = world.collaborators();
    let builder = InventoryBuilder::new(env);
    let generous = caller == A || world.is_human(B);
    let a_inventory = builder.build(A, B, a_gives, b_gives, generous);
    let b_inventory = builder.build(B, A, b_gives, a_gives, false);
    let ctx = NegotiationContext {
        caller,
        first: A,
        second: B,
        first_gives: a_gives,
        second_gives: b_gives,
        first_inventory: &a_inventory,
        second_inventory: &b_inventory,
        generosity_percent,
        first_may_add: true,
        second_may_add: false,
    };
    OfferBalancer::new(rules, env).balance(&ctx, &mut TieBreak::Stable)
}
