//! Gold fungibility: converting value gaps into lump-sum or per-turn gold.

use parley_protocol::TradeItem;

use crate::rules::GoldRules;

/// Exchange rate between gold and abstract value for one turn.
///
/// The rate decays in steps as the game progresses and is rounded down to the
/// configured step, so every peer derives the same integer rate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GoldExchange {
    /// Value of 100 gold.
    percent: i32,
    /// Turns a per-turn payment is valued over.
    horizon: i32,
}

impl GoldExchange {
    pub fn at_turn(rules: &GoldRules, turn: u32) -> Self {
        let steps = if rules.decay_interval_turns == 0 {
            0
        } else {
            i64::from(turn / rules.decay_interval_turns)
        };
        let decayed = i64::from(rules.base_percent) - i64::from(rules.decay_percent) * steps;
        let rounding = i64::from(rules.rounding_percent.max(1));
        let rounded = decayed - decayed.rem_euclid(rounding);
        let percent = rounded.max(i64::from(rules.min_percent)).max(1);

        Self {
            percent: percent.min(i64::from(i32::MAX)) as i32,
            horizon: rules.per_turn_horizon.max(1),
        }
    }

    pub const fn from_percent(percent: i32, horizon: i32) -> Self {
        Self {
            percent: if percent < 1 { 1 } else { percent },
            horizon: if horizon < 1 { 1 } else { horizon },
        }
    }

    pub fn percent(&self) -> i32 {
        self.percent
    }

    pub fn horizon(&self) -> i32 {
        self.horizon
    }

    /// Value of a one-time payment.
    pub fn lump_value(&self, amount: i32) -> i32 {
        value_at_rate(amount, i64::from(self.percent))
    }

    /// Value of a recurring payment over the horizon.
    pub fn per_turn_value(&self, amount: i32) -> i32 {
        value_at_rate(amount, self.per_turn_rate())
    }

    /// Value of a gold item, `None` for non-gold items.
    pub fn value_of(&self, item: &TradeItem) -> Option<i32> {
        match item {
            TradeItem::GoldLumpSum { amount } => Some(self.lump_value(*amount)),
            TradeItem::GoldPerTurn { amount } => Some(self.per_turn_value(*amount)),
            _ => None,
        }
    }

    /// Lump-sum amount closing `gap`, bounded by `max_affordable`.
    ///
    /// Without `overpay` the result is the largest amount whose value does not
    /// exceed `gap`; with `overpay` it is the smallest amount whose value
    /// reaches `gap`. Always in `0..=max_affordable` and non-decreasing in `gap`.
    pub fn gold_for_gap(&self, gap: i32, overpay: bool, max_affordable: i32) -> i32 {
        amount_for_gap(gap, overpay, max_affordable, i64::from(self.percent))
    }

    /// Per-turn amount closing `gap` over the horizon, bounded by `max_affordable`.
    pub fn per_turn_for_gap(&self, gap: i32, overpay: bool, max_affordable: i32) -> i32 {
        amount_for_gap(gap, overpay, max_affordable, self.per_turn_rate())
    }

    /// Amount of the same kind as `slot` closing `gap`.
    pub fn amount_for_slot(
        &self,
        slot: &TradeItem,
        gap: i32,
        overpay: bool,
        max_affordable: i32,
    ) -> Option<i32> {
        match slot {
            TradeItem::GoldLumpSum { .. } => Some(self.gold_for_gap(gap, overpay, max_affordable)),
            TradeItem::GoldPerTurn { .. } => {
                Some(self.per_turn_for_gap(gap, overpay, max_affordable))
            }
            _ => None,
        }
    }

    fn per_turn_rate(&self) -> i64 {
        i64::from(self.percent) * i64::from(self.horizon)
    }
}

fn value_at_rate(amount: i32, rate: i64) -> i32 {
    let value = i64::from(amount) * rate / 100;
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

fn amount_for_gap(gap: i32, overpay: bool, max_affordable: i32, rate: i64) -> i32 {
    if gap <= 0 || max_affordable <= 0 || rate <= 0 {
        return 0;
    }
    let gap = i64::from(gap);
    let amount = if overpay {
        // smallest a with a * rate / 100 >= gap
        (gap * 100 + rate - 1) / rate
    } else {
        // largest a with a * rate / 100 <= gap
        ((gap + 1) * 100 - 1) / rate
    };
    amount.clamp(0, i64::from(max_affordable)) as i32
}
