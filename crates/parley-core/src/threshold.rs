//! How much worse than even a party is willing to accept.

use parley_protocol::PlayerId;
use serde::{Deserialize, Serialize};

use crate::rules::AcceptanceRules;
use crate::world::NegotiationWorld;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationMode {
    /// Answer an incoming proposal.
    Respond,
    /// Draft and check a proposal of our own.
    Initiate,
    /// Decide whether a standing deal is still worth keeping.
    Reconsider,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorKind {
    Disposition,
    Duration,
    Rank,
    War,
    Wronged,
    Haggling,
    ReconsiderDecay,
    ReconsiderPenalty,
}

/// Signed contribution to the required percentage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdFactor {
    pub kind: FactorKind,
    pub percent: i32,
}

/// Acceptance rule for one evaluator toward one counterpart.
///
/// A proposal passes when `received + allowance` is at least
/// `required_percent` of what the evaluator gives up.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptanceThreshold {
    pub required_percent: i32,
    /// Value the evaluator will give away for nothing.
    pub allowance: i32,
    pub factors: Vec<ThresholdFactor>,
}

impl AcceptanceThreshold {
    pub fn accepts(&self, received: i32, given: i32) -> bool {
        let lhs = (i64::from(received) + i64::from(self.allowance)) * 100;
        let rhs = i64::from(given.max(0)) * i64::from(self.required_percent);
        lhs >= rhs
    }

    pub fn factor(&self, kind: FactorKind) -> i32 {
        self.factors
            .iter()
            .filter(|f| f.kind == kind)
            .map(|f| f.percent)
            .sum()
    }
}

/// Derives `evaluator`'s threshold toward `counterpart`.
///
/// `haggles` is how often the asking side has already been turned down by
/// the asked side this session.
pub fn acceptance_threshold(
    rules: &AcceptanceRules,
    world: &dyn NegotiationWorld,
    evaluator: PlayerId,
    counterpart: PlayerId,
    mode: EvaluationMode,
    haggles: u8,
) -> AcceptanceThreshold {
    let mut factors = Vec::new();
    let mut push = |kind: FactorKind, percent: i32| {
        if percent != 0 {
            factors.push(ThresholdFactor { kind, percent });
        }
    };

    let at_war = world.at_war(evaluator, counterpart);
    let disposition = world.disposition(evaluator, counterpart).clamp(-100, 100);

    // Friendly terms lower the bar; reconsidering only keeps part of them.
    let disposition_term = -(disposition / rules.disposition_divisor.max(1));
    let duration_term = if rules.duration_step_turns == 0 {
        0
    } else {
        let steps = world.turns_in_contact(evaluator, counterpart) / rules.duration_step_turns;
        -(i32::try_from(steps).unwrap_or(i32::MAX).min(rules.duration_cap_percent))
    };
    let widening = disposition_term.min(0) + duration_term;

    push(FactorKind::Disposition, disposition_term);
    push(FactorKind::Duration, duration_term);

    let rank_gap = i32::from(world.rank(evaluator)) - i32::from(world.rank(counterpart));
    push(
        FactorKind::Rank,
        (rank_gap * rules.rank_step_percent).clamp(-rules.rank_cap_percent, rules.rank_cap_percent),
    );
    if at_war {
        push(FactorKind::War, rules.war_penalty_percent);
    }
    if world.recently_wronged(evaluator, counterpart) {
        push(FactorKind::Wronged, rules.wronged_penalty_percent);
    }

    let mut allowance = if at_war {
        0
    } else {
        (disposition.max(0) / rules.gift_allowance_divisor.max(1)).min(rules.gift_allowance_cap)
    };

    match mode {
        EvaluationMode::Respond | EvaluationMode::Initiate => {
            push(
                FactorKind::Haggling,
                -(i32::from(haggles) * rules.haggle_step_percent),
            );
        }
        EvaluationMode::Reconsider => {
            let kept = widening * rules.reconsider_decay_percent / 100;
            push(FactorKind::ReconsiderDecay, kept - widening);
            push(FactorKind::ReconsiderPenalty, rules.reconsider_penalty_percent);
            allowance = allowance * rules.reconsider_decay_percent / 100;
        }
    }

    let total: i32 = factors.iter().map(|f| f.percent).sum();
    let required_percent =
        (rules.base_percent + total).clamp(rules.min_percent, rules.max_percent);

    tracing::trace!(
        evaluator = evaluator.0,
        counterpart = counterpart.0,
        mode = ?mode,
        required_percent,
        allowance,
        "acceptance threshold"
    );

    AcceptanceThreshold {
        required_percent,
        allowance,
        factors,
    }
}
