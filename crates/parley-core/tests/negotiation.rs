//! End-to-end negotiations: drafting, answering, presenting and committing.

mod common;

use common::*;
use parley_core::sandbox::{SandboxParty, SandboxWorld};
use parley_core::{
    negotiate, propose_trade, CachedOracle, EvaluationMode, InventoryBuilder, NegotiationRules,
    NegotiationWorld, Negotiator, RecordingSink, Resolution, TieBreak, Verdict,
};
use parley_protocol::{
    DenialReason, HaggleLedger, OfferList, Proposal, ProposalTopic, TradeItem, TradeVerdict,
};

/// A holds nothing B wants; B holds iron, worth 50 to A and 10 to B.
fn gift_world(rules: &NegotiationRules, b_human: bool) -> SandboxWorld {
    let iron = resource(rules, "iron");
    let b = if b_human {
        SandboxParty::human(B)
    } else {
        SandboxParty::automated(B)
    };
    let mut world = two_party_world(
        rules,
        SandboxParty::automated(A),
        b.with_items([iron.clone()]),
    );
    world.set_value(A, iron.clone(), 50);
    world.set_value(B, iron, 10);
    world
}

fn run(
    world: &SandboxWorld,
    rules: &NegotiationRules,
    ledger: &mut HaggleLedger,
    draft: Proposal,
) -> (Resolution, RecordingSink) {
    let negotiator = Negotiator::new(rules, world.collaborators());
    let mut sink = RecordingSink::default();
    let resolution = negotiate(&negotiator, ledger, &mut sink, &mut TieBreak::Stable, draft);
    (resolution, sink)
}

#[test]
fn empty_draft_asks_for_what_the_initiator_wants_most() {
    let rules = rules();
    let mut world = gift_world(&rules, false);
    world.set_disposition(B, A, 60);

    let mut ledger = HaggleLedger::new(rules.haggle_cap);
    let (resolution, sink) = run(&world, &rules, &mut ledger, Proposal::new(A, B));

    let deal = match resolution {
        Resolution::Committed(deal) => deal,
        other => panic!("expected a committed deal, got {other:?}"),
    };
    assert!(deal.proposal.initiator_gives.is_empty());
    assert_eq!(deal.proposal.responder_gives.as_slice(), &[resource(&rules, "iron")]);
    assert_eq!(sink.deals, vec![deal.clone()]);
    assert!(sink.events.is_empty());

    world.apply_deal(&deal);
    assert!(world.party(A).unwrap().holds(&resource(&rules, "iron")));
    assert!(!world.party(B).unwrap().holds(&resource(&rules, "iron")));
}

#[test]
fn unfriendly_responder_refuses_and_haggling_is_counted() {
    let rules = rules();
    let world = gift_world(&rules, false);
    let mut ledger = HaggleLedger::new(rules.haggle_cap);

    for expected in 1..=2 {
        let (resolution, sink) = run(&world, &rules, &mut ledger, Proposal::new(A, B));
        assert_eq!(resolution, Resolution::Rejected);
        assert!(sink.deals.is_empty());
        assert_eq!(ledger.attempts(A, B), expected);
    }
    assert_eq!(ledger.attempts(B, A), 0);
}

#[test]
fn human_responder_is_shown_a_request() {
    let rules = rules();
    let world = gift_world(&rules, true);
    let mut ledger = HaggleLedger::new(rules.haggle_cap);

    let (resolution, sink) = run(&world, &rules, &mut ledger, Proposal::new(A, B));

    let event = match resolution {
        Resolution::Presented(event) => event,
        other => panic!("expected a presented proposal, got {other:?}"),
    };
    assert_eq!(event.topic, ProposalTopic::Request);
    assert_eq!(event.proposal.responder_gives.as_slice(), &[resource(&rules, "iron")]);
    assert_eq!(sink.events, vec![event]);
    assert!(sink.deals.is_empty());
}

/// Short by 19 on the generous pass; gold from the human side makes it up.
#[test]
fn human_initiator_gets_a_counter_offer() {
    let rules = rules();
    let (wine, iron) = (resource(&rules, "wine"), resource(&rules, "iron"));
    let mut world = two_party_world(
        &rules,
        SandboxParty::human(A).with_gold(100, 0).with_items([wine.clone()]),
        SandboxParty::automated(B).with_items([iron.clone()]),
    );
    world.set_value(A, iron.clone(), 55);

    let mut ledger = HaggleLedger::new(rules.haggle_cap);
    let draft = Proposal::with_lists(
        A,
        B,
        OfferList::from_items([wine.clone()]),
        OfferList::from_items([iron.clone()]),
    );
    let (resolution, sink) = run(&world, &rules, &mut ledger, draft);

    let event = match resolution {
        Resolution::Presented(event) => event,
        other => panic!("expected a counter-offer, got {other:?}"),
    };
    assert_eq!(event.topic, ProposalTopic::CounterOffer);
    assert_eq!(event.proposal.initiator_gives.as_slice(), &[wine, gold(19)]);
    assert_eq!(event.proposal.responder_gives.as_slice(), &[iron]);
    assert_eq!(sink.events.len(), 1);
    assert_eq!(ledger.attempts(A, B), 1);
}

#[test]
fn treaties_are_recorded_on_both_sides() {
    let rules = rules();
    let mut world = two_party_world(
        &rules,
        SandboxParty::automated(A),
        SandboxParty::automated(B),
    );
    world.set_disposition(A, B, 40);
    world.set_disposition(B, A, 40);

    let mut ledger = HaggleLedger::new(rules.haggle_cap);
    let draft = Proposal::with_lists(
        A,
        B,
        OfferList::from_items([TradeItem::OpenBorders]),
        OfferList::from_items([TradeItem::MapSharing]),
    );
    let (resolution, _) = run(&world, &rules, &mut ledger, draft);

    let deal = match resolution {
        Resolution::Committed(deal) => deal,
        other => panic!("expected a committed deal, got {other:?}"),
    };
    for list in [&deal.proposal.initiator_gives, &deal.proposal.responder_gives] {
        assert!(list.contains(&TradeItem::OpenBorders));
        assert!(list.contains(&TradeItem::MapSharing));
    }
}

#[test]
fn reconsider_keeps_only_deals_still_worth_it() {
    let rules = rules();
    let (wine, iron) = (resource(&rules, "wine"), resource(&rules, "iron"));
    let mut world = two_party_world(
        &rules,
        SandboxParty::automated(A).with_items([wine.clone()]),
        SandboxParty::automated(B).with_items([iron.clone()]),
    );
    let standing = Proposal::with_lists(
        A,
        B,
        OfferList::from_items([wine.clone()]),
        OfferList::from_items([iron]),
    );
    let ledger = HaggleLedger::new(rules.haggle_cap);

    let cancel = Negotiator::new(&rules, world.collaborators()).evaluate(
        &standing,
        EvaluationMode::Reconsider,
        &ledger,
        &mut TieBreak::Stable,
    );
    assert_eq!(cancel.evaluator, B);
    assert_eq!(cancel.verdict, Verdict::Reject);
    assert_eq!((cancel.received, cancel.given), (25, 30));

    world.set_value(B, wine, 60);
    let keep = Negotiator::new(&rules, world.collaborators()).evaluate(
        &standing,
        EvaluationMode::Reconsider,
        &ledger,
        &mut TieBreak::Stable,
    );
    assert_eq!(keep.verdict, Verdict::Accept);
    assert!(keep.threshold.required_percent > 100);
}

#[test]
fn unrecognized_items_are_refused() {
    let rules = rules();
    let world = two_party_world(
        &rules,
        SandboxParty::automated(A),
        SandboxParty::automated(B),
    );
    let proposal = Proposal::with_lists(
        A,
        B,
        OfferList::from_items([TradeItem::Unknown]),
        OfferList::new(),
    );
    let evaluation = Negotiator::new(&rules, world.collaborators()).evaluate(
        &proposal,
        EvaluationMode::Respond,
        &HaggleLedger::new(rules.haggle_cap),
        &mut TieBreak::Stable,
    );
    assert_eq!(evaluation.verdict, Verdict::Reject);
    assert_eq!(evaluation.received, 0);
}

#[test]
fn denial_is_one_directional() {
    let rules = rules();
    let mut world = two_party_world(
        &rules,
        SandboxParty::automated(A).with_techs([1]),
        SandboxParty::automated(B).with_techs([2]),
    );
    world.deny(A, B, tech(1), DenialReason::Monopoly);
    world.deny(A, B, tech(2), DenialReason::Refused);

    let builder = InventoryBuilder::new(world.collaborators());
    let empty = OfferList::new();

    let a_all = builder.annotate(A, B, &empty, &empty, false);
    let denied = a_all.iter().find(|e| e.item == tech(1)).unwrap();
    assert_eq!(denied.verdict, TradeVerdict::Denied(DenialReason::Monopoly));
    assert!(!builder.build(A, B, &empty, &empty, false).contains(&tech(1)));

    // The same item from the other side is unaffected.
    assert!(builder.build(B, A, &empty, &empty, false).contains(&tech(2)));
}

#[test]
fn cached_oracle_serves_repeat_lookups() {
    let rules = rules();
    let world = gift_world(&rules, false);
    let cache = CachedOracle::new(&world.oracle, world.version());
    let builder = InventoryBuilder::new(world.collaborators().with_oracle(&cache));
    let empty = OfferList::new();

    let first = builder.build(B, A, &empty, &empty, false);
    let misses = cache.misses();
    assert!(misses > 0);
    assert_eq!(cache.hits(), 0);

    let second = builder.build(B, A, &empty, &empty, false);
    assert_eq!(first, second);
    assert_eq!(cache.misses(), misses);
    assert_eq!(cache.hits(), misses);

    cache.invalidate(cache.version().next());
    assert!(cache.is_empty());
}

#[test]
fn propose_trade_names_the_wanted_item() {
    let rules = rules();
    let mut world = gift_world(&rules, false);
    world.set_disposition(B, A, 60);
    let negotiator = Negotiator::new(&rules, world.collaborators());
    let mut ledger = HaggleLedger::new(rules.haggle_cap);
    let mut sink = RecordingSink::default();

    let resolution = propose_trade(
        &negotiator,
        &mut ledger,
        &mut sink,
        &mut TieBreak::Stable,
        A,
        B,
        Some(resource(&rules, "iron")),
    );
    assert!(matches!(resolution, Resolution::Committed(_)));
    assert_eq!(sink.deals.len(), 1);
}

/// A tech B wants more than A minds losing; B is asked to pay for it.
#[test]
fn initiator_asks_to_be_paid_for_what_it_offers() {
    let rules = rules();
    let mut world = two_party_world(
        &rules,
        SandboxParty::automated(A).with_techs([5]),
        SandboxParty::automated(B).with_gold(500, 0),
    );
    world.set_value(B, tech(5), 60);
    world.set_value(A, tech(5), 20);

    let draft = Proposal::with_lists(A, B, OfferList::from_items([tech(5)]), OfferList::new());
    let ledger = HaggleLedger::new(rules.haggle_cap);
    let evaluation = Negotiator::new(&rules, world.collaborators()).evaluate(
        &draft,
        EvaluationMode::Initiate,
        &ledger,
        &mut TieBreak::Stable,
    );
    let expected = Proposal::with_lists(
        A,
        B,
        OfferList::from_items([tech(5)]),
        OfferList::from_items([gold(60)]),
    );
    assert_eq!(evaluation.verdict, Verdict::CounterOffer(expected.clone()));

    let mut ledger = ledger;
    let (resolution, _) = run(&world, &rules, &mut ledger, draft);
    let deal = match resolution {
        Resolution::Committed(deal) => deal,
        other => panic!("expected a committed deal, got {other:?}"),
    };
    assert_eq!(deal.proposal, expected);

    world.apply_deal(&deal);
    assert_eq!(world.party(A).unwrap().gold, 60);
    assert_eq!(world.party(B).unwrap().gold, 440);
}

/// A human asks for B's iron, which B will not hand to A.
#[test]
fn responder_refuses_items_its_policy_denies() {
    let rules = rules();
    let iron = resource(&rules, "iron");
    let world_with = |denied: bool| {
        let mut world = two_party_world(
            &rules,
            SandboxParty::human(A).with_gold(400, 0),
            SandboxParty::automated(B).with_items([iron.clone()]),
        );
        if denied {
            world.deny(B, A, iron.clone(), DenialReason::WorstEnemy);
        }
        world
    };
    let draft = Proposal::with_lists(
        A,
        B,
        OfferList::from_items([gold(300)]),
        OfferList::from_items([iron.clone()]),
    );

    let mut ledger = HaggleLedger::new(rules.haggle_cap);
    let (resolution, _) = run(&world_with(false), &rules, &mut ledger, draft.clone());
    assert!(matches!(resolution, Resolution::Committed(_)));

    let denied = world_with(true);
    let mut ledger = HaggleLedger::new(rules.haggle_cap);
    let (resolution, sink) = run(&denied, &rules, &mut ledger, draft.clone());
    assert_eq!(resolution, Resolution::Rejected);
    assert!(sink.deals.is_empty());
    assert_eq!(ledger.attempts(A, B), 1);
    assert!(!Negotiator::new(&rules, denied.collaborators()).is_admissible(&draft));
}

/// Per-turn gold above the payer's ceiling is refused even when held.
#[test]
fn responder_refuses_gold_beyond_the_payers_ceiling() {
    let rules = rules();
    let iron = resource(&rules, "iron");
    let world = two_party_world(
        &rules,
        SandboxParty::human(A).with_gold(0, 10),
        SandboxParty::automated(B).with_items([iron.clone()]),
    );
    let offer = |per_turn: i32| {
        Proposal::with_lists(
            A,
            B,
            OfferList::from_items([TradeItem::GoldPerTurn { amount: per_turn }]),
            OfferList::from_items([iron.clone()]),
        )
    };

    let mut ledger = HaggleLedger::new(rules.haggle_cap);
    let (resolution, sink) = run(&world, &rules, &mut ledger, offer(8));
    assert_eq!(resolution, Resolution::Rejected);
    assert!(sink.deals.is_empty());

    let (resolution, _) = run(&world, &rules, &mut ledger, offer(5));
    assert!(matches!(resolution, Resolution::Committed(_)));
}
