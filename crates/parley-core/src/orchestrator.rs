//! Accept / reject / counter decisions and the two-party negotiation driver.

use parley_protocol::{
    Deal, HaggleLedger, OfferList, PlayerId, Proposal, ProposalEvent, ProposalTopic, TradeItem,
};
use serde::Serialize;

use crate::balancer::{BalanceStatus, NegotiationContext, OfferBalancer};
use crate::inventory::InventoryBuilder;
use crate::oracle::{check_offer, loss_of, Valuable};
use crate::rng::TieBreak;
use crate::rules::NegotiationRules;
use crate::threshold::{acceptance_threshold, AcceptanceThreshold, EvaluationMode};
use crate::world::{Collaborators, DealSink};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", content = "proposal", rename_all = "snake_case")]
pub enum Verdict {
    Accept,
    Reject,
    CounterOffer(Proposal),
}

/// A verdict with what it was based on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    pub evaluator: PlayerId,
    pub mode: EvaluationMode,
    pub verdict: Verdict,
    pub threshold: AcceptanceThreshold,
    /// Value the evaluator receives under the proposal as given.
    pub received: i32,
    /// Value the evaluator gives up under the proposal as given.
    pub given: i32,
}

/// How one call to [`negotiate`] ended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "resolution", content = "detail", rename_all = "snake_case")]
pub enum Resolution {
    Committed(Deal),
    Presented(ProposalEvent),
    Rejected,
}

pub struct Negotiator<'a> {
    rules: &'a NegotiationRules,
    env: Collaborators<'a>,
}

impl<'a> Negotiator<'a> {
    pub fn new(rules: &'a NegotiationRules, env: Collaborators<'a>) -> Self {
        Self { rules, env }
    }

    pub fn rules(&self) -> &'a NegotiationRules {
        self.rules
    }

    pub fn env(&self) -> Collaborators<'a> {
        self.env
    }

    pub fn inventory_builder(&self) -> InventoryBuilder<'a> {
        InventoryBuilder::new(self.env)
    }

    pub fn balancer(&self) -> OfferBalancer<'a> {
        OfferBalancer::new(self.rules, self.env)
    }

    pub fn threshold(
        &self,
        evaluator: PlayerId,
        counterpart: PlayerId,
        mode: EvaluationMode,
        haggles: u8,
    ) -> AcceptanceThreshold {
        acceptance_threshold(
            &self.rules.acceptance,
            self.env.world,
            evaluator,
            counterpart,
            mode,
            haggles,
        )
    }

    /// `(received, given)` for `evaluator` under `proposal`.
    pub fn appraise(&self, evaluator: PlayerId, proposal: &Proposal) -> (i32, i32) {
        let (ours, theirs) = if evaluator == proposal.initiator {
            (&proposal.initiator_gives, &proposal.responder_gives)
        } else {
            (&proposal.responder_gives, &proposal.initiator_gives)
        };
        (
            theirs.value_to(evaluator, self.env.oracle),
            loss_of(ours, evaluator, self.env.oracle),
        )
    }

    pub fn accepts(
        &self,
        evaluator: PlayerId,
        proposal: &Proposal,
        threshold: &AcceptanceThreshold,
    ) -> bool {
        let (received, given) = self.appraise(evaluator, proposal);
        threshold.accepts(received, given)
    }

    /// Decides on `proposal`.
    ///
    /// The evaluator is the responder for [`EvaluationMode::Respond`] and
    /// [`EvaluationMode::Reconsider`], the initiator for
    /// [`EvaluationMode::Initiate`]. Reconsider answers `Accept` to keep a
    /// standing deal and `Reject` to cancel it.
    pub fn evaluate(
        &self,
        proposal: &Proposal,
        mode: EvaluationMode,
        ledger: &HaggleLedger,
        tie: &mut TieBreak<'_>,
    ) -> Evaluation {
        let (evaluator, counterpart) = match mode {
            EvaluationMode::Initiate => (proposal.initiator, proposal.responder),
            EvaluationMode::Respond | EvaluationMode::Reconsider => {
                (proposal.responder, proposal.initiator)
            }
        };
        let haggles = match mode {
            EvaluationMode::Reconsider => 0,
            _ => ledger.attempts(proposal.initiator, proposal.responder),
        };
        let threshold = self.threshold(evaluator, counterpart, mode, haggles);

        if proposal.contains_unknown() {
            tracing::warn!(
                evaluator = evaluator.0,
                "proposal carries unrecognized items; rejecting"
            );
            return Evaluation {
                evaluator,
                mode,
                verdict: Verdict::Reject,
                threshold,
                received: 0,
                given: 0,
            };
        }

        let (received, given) = self.appraise(evaluator, proposal);
        let verdict = match mode {
            EvaluationMode::Respond | EvaluationMode::Reconsider
                if !self.is_admissible(proposal) =>
            {
                Verdict::Reject
            }
            EvaluationMode::Respond => self.respond(proposal, &threshold, received, given, tie),
            EvaluationMode::Initiate => self.initiate(proposal, &threshold, tie),
            EvaluationMode::Reconsider => {
                if threshold.accepts(received, given) {
                    Verdict::Accept
                } else {
                    Verdict::Reject
                }
            }
        };

        tracing::debug!(
            evaluator = evaluator.0,
            counterpart = counterpart.0,
            mode = ?mode,
            received,
            given,
            required = threshold.required_percent,
            verdict = verdict_name(&verdict),
            "proposal evaluated"
        );

        Evaluation {
            evaluator,
            mode,
            verdict,
            threshold,
            received,
            given,
        }
    }

    /// Whether every item of `proposal` may move in its direction and the
    /// gold on each side stays within the payer's ceiling.
    pub fn is_admissible(&self, proposal: &Proposal) -> bool {
        let sides = [
            (proposal.initiator, proposal.responder, &proposal.initiator_gives),
            (proposal.responder, proposal.initiator, &proposal.responder_gives),
        ];
        for (giver, receiver, list) in sides {
            for item in list {
                let verdict = check_offer(self.env.denial, giver, receiver, item);
                if !verdict.is_allowed() {
                    tracing::debug!(
                        giver = giver.0,
                        receiver = receiver.0,
                        item = %item.label(),
                        verdict = ?verdict,
                        "proposal carries a denied item"
                    );
                    return false;
                }
            }
            let ceiling = self.env.treasury.max_affordable(giver, receiver, true);
            let lump = list.fungible_amount(&TradeItem::GoldLumpSum { amount: 0 });
            let per_turn = list.fungible_amount(&TradeItem::GoldPerTurn { amount: 0 });
            if lump > ceiling.lump_sum || per_turn > ceiling.per_turn {
                tracing::debug!(
                    giver = giver.0,
                    lump,
                    per_turn,
                    lump_ceiling = ceiling.lump_sum,
                    per_turn_ceiling = ceiling.per_turn,
                    "proposal asks for more gold than the payer can spare"
                );
                return false;
            }
        }
        true
    }

    fn respond(
        &self,
        proposal: &Proposal,
        threshold: &AcceptanceThreshold,
        received: i32,
        given: i32,
        tie: &mut TieBreak<'_>,
    ) -> Verdict {
        if threshold.accepts(received, given) {
            return Verdict::Accept;
        }
        let (them, us) = (proposal.initiator, proposal.responder);
        let builder = self.inventory_builder();
        let their_inventory =
            builder.build(them, us, &proposal.initiator_gives, &proposal.responder_gives, false);
        let our_inventory =
            builder.build(us, them, &proposal.responder_gives, &proposal.initiator_gives, false);

        // A human counterpart first gets a pass that asks less of them.
        let mut passes = Vec::with_capacity(2);
        if self.env.world.is_human(them) {
            let percent = self.rules.balance.human_generosity_percent.max(1);
            passes.push(100 * 100 / percent);
        }
        passes.push(100);

        let balancer = self.balancer();
        for generosity_percent in passes {
            let ctx = NegotiationContext {
                caller: us,
                first: them,
                second: us,
                first_gives: &proposal.initiator_gives,
                second_gives: &proposal.responder_gives,
                first_inventory: &their_inventory,
                second_inventory: &our_inventory,
                generosity_percent,
                first_may_add: true,
                second_may_add: false,
            };
            let outcome = balancer.balance(&ctx, tie);
            if outcome.status == BalanceStatus::Unbalanced {
                continue;
            }
            let counter =
                Proposal::with_lists(them, us, outcome.first_gives, outcome.second_gives);
            if counter != *proposal && self.accepts(us, &counter, threshold) {
                return Verdict::CounterOffer(counter);
            }
        }
        Verdict::Reject
    }

    fn initiate(
        &self,
        proposal: &Proposal,
        threshold: &AcceptanceThreshold,
        tie: &mut TieBreak<'_>,
    ) -> Verdict {
        let (us, them) = (proposal.initiator, proposal.responder);
        let builder = self.inventory_builder();
        let courting_human = self.env.world.is_human(them);

        let mut draft = proposal.clone();
        if draft.is_empty() {
            let theirs = builder.build(them, us, &OfferList::new(), &OfferList::new(), false);
            match theirs.most_wanted() {
                Some(entry) => {
                    draft.responder_gives.push(entry.item.clone());
                }
                None => return Verdict::Reject,
            }
        }

        let our_inventory = builder.build(
            us,
            them,
            &draft.initiator_gives,
            &draft.responder_gives,
            courting_human,
        );
        let their_inventory =
            builder.build(them, us, &draft.responder_gives, &draft.initiator_gives, false);

        // Whoever comes out ahead adds. Generosity scales the adder's receipts:
        // above 100 toward a human when we add, below 100 when they pay.
        let received = i64::from(draft.responder_gives.value_to(us, self.env.oracle));
        let owed = i64::from(draft.initiator_gives.value_to(them, self.env.oracle));
        let human_percent = self.rules.balance.human_generosity_percent.max(1);
        let we_add = if courting_human {
            received * i64::from(human_percent) >= owed * 100
        } else {
            received >= owed
        };
        let generosity_percent = match (courting_human, we_add) {
            (false, _) => 100,
            (true, true) => human_percent,
            (true, false) => 100 * 100 / human_percent,
        };
        let ctx = NegotiationContext {
            caller: us,
            first: us,
            second: them,
            first_gives: &draft.initiator_gives,
            second_gives: &draft.responder_gives,
            first_inventory: &our_inventory,
            second_inventory: &their_inventory,
            generosity_percent,
            first_may_add: we_add,
            second_may_add: !we_add,
        };
        let outcome = self.balancer().balance(&ctx, tie);
        let candidate = match outcome.status {
            BalanceStatus::Unbalanced => draft,
            _ => Proposal::with_lists(us, them, outcome.first_gives, outcome.second_gives),
        };

        if !self.accepts(us, &candidate, threshold) {
            Verdict::Reject
        } else if candidate == *proposal {
            Verdict::Accept
        } else {
            Verdict::CounterOffer(candidate)
        }
    }
}

fn verdict_name(verdict: &Verdict) -> &'static str {
    match verdict {
        Verdict::Accept => "accept",
        Verdict::Reject => "reject",
        Verdict::CounterOffer(_) => "counter_offer",
    }
}

// =============================================================================
// Driver
// =============================================================================

/// Runs one negotiation from `draft` to a resolution.
///
/// An automated initiator first shapes the draft; a human responder is shown
/// the result instead of it being committed; an automated responder decides
/// and may counter once, which the initiator either takes or drops. Accepted
/// deals reach `sink` in a single `commit` call.
pub fn negotiate(
    negotiator: &Negotiator<'_>,
    ledger: &mut HaggleLedger,
    sink: &mut dyn DealSink,
    tie: &mut TieBreak<'_>,
    draft: Proposal,
) -> Resolution {
    let world = negotiator.env().world;
    let (initiator, responder) = (draft.initiator, draft.responder);
    let turn = world.turn();

    let proposal = if world.is_human(initiator) {
        draft
    } else {
        match negotiator
            .evaluate(&draft, EvaluationMode::Initiate, ledger, tie)
            .verdict
        {
            Verdict::Accept => draft,
            Verdict::CounterOffer(shaped) => shaped,
            Verdict::Reject => return Resolution::Rejected,
        }
    };

    if world.is_human(responder) {
        let topic = if proposal.initiator_gives.is_empty() {
            ProposalTopic::Request
        } else {
            ProposalTopic::TradeOffer
        };
        return present(sink, topic, turn, proposal);
    }

    match negotiator
        .evaluate(&proposal, EvaluationMode::Respond, ledger, tie)
        .verdict
    {
        Verdict::Accept => commit(ledger, sink, turn, proposal),
        Verdict::Reject => {
            ledger.record_attempt(initiator, responder);
            Resolution::Rejected
        }
        Verdict::CounterOffer(counter) => {
            let haggles = ledger.record_attempt(initiator, responder);
            if world.is_human(initiator) {
                return present(sink, ProposalTopic::CounterOffer, turn, counter);
            }
            let threshold =
                negotiator.threshold(initiator, responder, EvaluationMode::Initiate, haggles);
            if negotiator.accepts(initiator, &counter, &threshold) {
                commit(ledger, sink, turn, counter)
            } else {
                tracing::debug!(
                    initiator = initiator.0,
                    responder = responder.0,
                    "counter-offer declined"
                );
                Resolution::Rejected
            }
        }
    }
}

/// Asks `responder` for `wanted`, or for whatever the initiator values most
/// among what the responder may offer.
pub fn propose_trade(
    negotiator: &Negotiator<'_>,
    ledger: &mut HaggleLedger,
    sink: &mut dyn DealSink,
    tie: &mut TieBreak<'_>,
    initiator: PlayerId,
    responder: PlayerId,
    wanted: Option<TradeItem>,
) -> Resolution {
    let mut draft = Proposal::new(initiator, responder);
    if let Some(item) = wanted {
        draft.responder_gives.push(item);
    }
    negotiate(negotiator, ledger, sink, tie, draft)
}

fn present(
    sink: &mut dyn DealSink,
    topic: ProposalTopic,
    turn: u32,
    proposal: Proposal,
) -> Resolution {
    let event = ProposalEvent {
        topic,
        turn,
        proposal,
    };
    tracing::debug!(
        initiator = event.proposal.initiator.0,
        responder = event.proposal.responder.0,
        topic = ?topic,
        "proposal presented"
    );
    sink.present(event.clone());
    Resolution::Presented(event)
}

fn commit(
    ledger: &mut HaggleLedger,
    sink: &mut dyn DealSink,
    turn: u32,
    mut proposal: Proposal,
) -> Resolution {
    let (a, b) = (&mut proposal.initiator_gives, &mut proposal.responder_gives);
    a.mirror_duals(b);
    ledger.reset(proposal.initiator, proposal.responder);

    let deal = Deal { turn, proposal };
    tracing::info!(
        turn,
        initiator = deal.proposal.initiator.0,
        responder = deal.proposal.responder.0,
        items = deal.proposal.initiator_gives.len() + deal.proposal.responder_gives.len(),
        "deal committed"
    );
    sink.commit(deal.clone());
    Resolution::Committed(deal)
}
