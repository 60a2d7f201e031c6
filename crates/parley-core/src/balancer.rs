//! Greedy gap closing between two offer lists.
//!
//! The balancer never touches the inventories it is given: it works on its
//! own copies of the two lists and reports them back with a status. Every
//! insertion it keeps strictly shrinks the absolute value gap (the final
//! tie-break may leave it equal), so a call terminates after at most one
//! insertion per inventory entry and never ends further from fair than it
//! started.

use parley_protocol::{OfferList, PlayerId, TradeItem, TradeItemKind};
use serde::Serialize;

use crate::gold::GoldExchange;
use crate::inventory::{Inventory, InventoryEntry};
use crate::limiter::ResourceCategoryCounter;
use crate::oracle::Valuable;
use crate::rng::TieBreak;
use crate::rules::NegotiationRules;
use crate::world::Collaborators;

// =============================================================================
// Inputs and outputs
// =============================================================================

/// Everything one balancer call reads. Built fresh per attempt.
#[derive(Clone, Copy, Debug)]
pub struct NegotiationContext<'a> {
    /// Party on whose behalf the balancer runs.
    pub caller: PlayerId,
    pub first: PlayerId,
    pub second: PlayerId,
    pub first_gives: &'a OfferList,
    pub second_gives: &'a OfferList,
    /// What `first` could add toward `second`.
    pub first_inventory: &'a Inventory,
    /// What `second` could add toward `first`.
    pub second_inventory: &'a Inventory,
    /// Percent applied to the list given by the side that may not add.
    /// Above 100 the adding side ends up giving more.
    pub generosity_percent: i32,
    pub first_may_add: bool,
    pub second_may_add: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceStatus {
    /// Within tolerance; lists may or may not have changed.
    Balanced,
    /// Closer than before but still out of tolerance.
    Improved,
    /// Nothing could be done; lists are returned unchanged.
    Unbalanced,
}

/// Ranking and admission rule for filler items.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Closest to the residual gap; may overshoot when that is the better fit.
    Generous,
    /// Highest value that does not overshoot, save for a near-fair 1-for-1 swap.
    Strict,
}

impl SelectionPolicy {
    /// Whether adding `value` against a positive `gap` is allowed.
    ///
    /// `swap_slack` is the overshoot a 1-for-1 swap may carry, if the
    /// insertion would produce one.
    pub fn admits(self, gap: i32, value: i32, swap_slack: Option<i32>) -> bool {
        if gap <= 0 || value <= 0 {
            return false;
        }
        let residual = gap.saturating_sub(value);
        let improves = residual.saturating_abs() < gap;
        match self {
            SelectionPolicy::Generous => improves,
            SelectionPolicy::Strict => {
                residual >= 0
                    || swap_slack.is_some_and(|slack| residual.saturating_neg() <= slack && improves)
            }
        }
    }

    /// Sort key among admissible candidates; smaller is better.
    fn rank(self, gap: i32, value: i32) -> i64 {
        match self {
            SelectionPolicy::Generous => (i64::from(gap) - i64::from(value)).abs(),
            SelectionPolicy::Strict => -i64::from(value),
        }
    }

    pub fn overpays(self) -> bool {
        matches!(self, SelectionPolicy::Generous)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BalanceOutcome {
    pub status: BalanceStatus,
    pub first_gives: OfferList,
    pub second_gives: OfferList,
    /// Signed rescaled gap, `first`'s receipts minus `second`'s.
    pub gap: i32,
    /// Policy used, if any items were considered.
    pub policy: Option<SelectionPolicy>,
}

impl BalanceOutcome {
    pub fn is_balanced(&self) -> bool {
        self.status == BalanceStatus::Balanced
    }
}

// =============================================================================
// Working state
// =============================================================================

/// Both lists with what each party currently receives.
struct Books {
    parties: [PlayerId; 2],
    lists: [OfferList; 2],
    /// Raw value party `i` receives from `lists[1 - i]`.
    received: [i32; 2],
    /// Party whose receipts are scaled by generosity.
    rescaled: Option<usize>,
    generosity_percent: i32,
}

impl Books {
    fn effective(&self, side: usize) -> i32 {
        let raw = self.received[side];
        if self.rescaled == Some(side) {
            let scaled = i64::from(raw) * i64::from(self.generosity_percent) / 100;
            scaled.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
        } else {
            raw
        }
    }

    /// `adv`'s receipts minus `dis`'s.
    fn gap(&self, adv: usize, dis: usize) -> i32 {
        self.effective(adv).saturating_sub(self.effective(dis))
    }

    fn refresh(&mut self, side: usize, env: &Collaborators<'_>) {
        self.received[side] = self.lists[1 - side].value_to(self.parties[side], env.oracle);
    }

    fn is_single_swap(&self) -> bool {
        self.lists[0].len() == 1 && self.lists[1].len() == 1
    }
}

/// Advantaged/disadvantaged indices into [`Books`].
#[derive(Clone, Copy)]
struct Sides {
    adv: usize,
    dis: usize,
}

// =============================================================================
// Balancer
// =============================================================================

pub struct OfferBalancer<'a> {
    rules: &'a NegotiationRules,
    env: Collaborators<'a>,
    exchange: GoldExchange,
}

impl<'a> OfferBalancer<'a> {
    pub fn new(rules: &'a NegotiationRules, env: Collaborators<'a>) -> Self {
        let exchange = GoldExchange::at_turn(&rules.gold, env.world.turn());
        Self {
            rules,
            env,
            exchange,
        }
    }

    pub fn exchange(&self) -> GoldExchange {
        self.exchange
    }

    pub fn balance(&self, ctx: &NegotiationContext<'_>, tie: &mut TieBreak<'_>) -> BalanceOutcome {
        let rescaled = match (ctx.first_may_add, ctx.second_may_add) {
            // first is fixed: second receives first's list
            (false, true) => Some(1),
            (true, false) => Some(0),
            _ => None,
        };
        let mut books = Books {
            parties: [ctx.first, ctx.second],
            lists: [ctx.first_gives.clone(), ctx.second_gives.clone()],
            received: [0, 0],
            rescaled,
            generosity_percent: ctx.generosity_percent,
        };
        books.refresh(0, &self.env);
        books.refresh(1, &self.env);

        let start = books.gap(0, 1);
        if self.is_balanced(&books) {
            return self.finish(ctx, books, start, BalanceStatus::Balanced, None);
        }

        let sides = if books.effective(0) > books.effective(1) {
            Sides { adv: 0, dis: 1 }
        } else {
            Sides { adv: 1, dis: 0 }
        };
        let may_add = [ctx.first_may_add, ctx.second_may_add];
        if !may_add[sides.adv] {
            tracing::debug!(
                first = ctx.first.0,
                second = ctx.second.0,
                gap = start,
                "advantaged side may not add; cannot balance"
            );
            return self.finish(ctx, books, start, BalanceStatus::Unbalanced, None);
        }

        let (adv_party, dis_party) = (books.parties[sides.adv], books.parties[sides.dis]);
        let policy = self.policy_for(ctx.caller, adv_party, dis_party);
        let inventory = if sides.adv == 0 {
            ctx.first_inventory
        } else {
            ctx.second_inventory
        };
        let mut counter = ResourceCategoryCounter::new(
            self.rules,
            [&books.lists[0], &books.lists[1]],
            self.env.world.is_subordinate(dis_party, adv_party),
        );
        let mut used = vec![false; inventory.len()];

        self.gold_pass(&mut books, sides, inventory, TradeItemKind::GoldLumpSum, policy);
        self.item_pass(&mut books, sides, inventory, &mut counter, &mut used, policy, tie);
        self.gold_pass(&mut books, sides, inventory, TradeItemKind::GoldPerTurn, policy);
        self.tie_break_pass(&mut books, sides, inventory, &counter, &used, tie);

        let end = books.gap(0, 1);
        let status = if self.is_balanced(&books) {
            BalanceStatus::Balanced
        } else if end.saturating_abs() < start.saturating_abs() {
            BalanceStatus::Improved
        } else {
            BalanceStatus::Unbalanced
        };
        if status == BalanceStatus::Unbalanced {
            books.lists = [ctx.first_gives.clone(), ctx.second_gives.clone()];
            books.refresh(0, &self.env);
            books.refresh(1, &self.env);
        }
        self.finish(ctx, books, start, status, Some(policy))
    }

    /// Generous when conceding on the caller's own behalf or when the party
    /// being compensated is human.
    pub fn policy_for(&self, caller: PlayerId, advantaged: PlayerId, disadvantaged: PlayerId) -> SelectionPolicy {
        if advantaged == caller || self.env.world.is_human(disadvantaged) {
            SelectionPolicy::Generous
        } else {
            SelectionPolicy::Strict
        }
    }

    fn is_balanced(&self, books: &Books) -> bool {
        let diff = books.gap(0, 1).saturating_abs();
        diff <= self.rules.balance.granularity
            || (books.is_single_swap() && diff <= self.rules.balance.swap_tolerance)
    }

    /// Overshoot allowed if inserting into `books` would produce a 1-for-1 swap.
    fn swap_slack(&self, books: &Books, sides: Sides) -> Option<i32> {
        (books.lists[sides.adv].is_empty() && books.lists[sides.dis].len() == 1)
            .then_some(self.rules.balance.swap_tolerance)
    }

    /// Inserts `item` into the advantaged list if the real gain to the
    /// receiver is admissible; rolls back otherwise.
    fn try_insert(
        &self,
        books: &mut Books,
        sides: Sides,
        item: TradeItem,
        policy: SelectionPolicy,
    ) -> bool {
        let before = books.gap(sides.adv, sides.dis);
        let slack = self.swap_slack(books, sides);
        let saved = books.lists[sides.adv].clone();

        let inserted = if item.is_fungible() {
            books.lists[sides.adv].add_fungible(item).is_some()
        } else {
            books.lists[sides.adv].push(item)
        };
        if !inserted {
            return false;
        }
        books.refresh(sides.dis, &self.env);

        let after = books.gap(sides.adv, sides.dis);
        let gained = before.saturating_sub(after);
        if after.saturating_abs() < before.saturating_abs() && policy.admits(before, gained, slack) {
            return true;
        }
        books.lists[sides.adv] = saved;
        books.refresh(sides.dis, &self.env);
        false
    }

    fn gold_pass(
        &self,
        books: &mut Books,
        sides: Sides,
        inventory: &Inventory,
        kind: TradeItemKind,
        policy: SelectionPolicy,
    ) {
        let gap = books.gap(sides.adv, sides.dis);
        if gap <= 0 || self.is_balanced(books) {
            return;
        }
        let Some(slot) = inventory.gold_slot(kind) else {
            return;
        };
        let ceiling = slot.item.amount().unwrap_or(0);
        let amount = self
            .exchange
            .amount_for_slot(&slot.item, gap, policy.overpays(), ceiling)
            .unwrap_or(0);
        let Some(item) = slot.item.with_amount(amount).filter(|_| amount > 0) else {
            return;
        };
        if self.try_insert(books, sides, item, policy) {
            tracing::trace!(
                kind = kind.name(),
                amount,
                gap = books.gap(sides.adv, sides.dis),
                "gold added"
            );
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn item_pass(
        &self,
        books: &mut Books,
        sides: Sides,
        inventory: &Inventory,
        counter: &mut ResourceCategoryCounter<'_>,
        used: &mut [bool],
        policy: SelectionPolicy,
        tie: &mut TieBreak<'_>,
    ) {
        loop {
            let gap = books.gap(sides.adv, sides.dis);
            if gap <= 0 || self.is_balanced(books) {
                return;
            }
            let slack = self.swap_slack(books, sides);
            let candidates: Vec<(usize, i32)> = {
                let (books, counter, used): (&Books, &ResourceCategoryCounter<'_>, &[bool]) =
                    (books, counter, used);
                inventory
                    .entries()
                    .iter()
                    .enumerate()
                    .filter(|(i, e)| !used[*i] && self.is_filler(books, counter, e))
                    .filter(|(_, e)| policy.admits(gap, e.recipient_gain, slack))
                    .map(|(i, e)| (i, e.recipient_gain))
                    .collect()
            };
            let Some(pick) = choose(&candidates, |v| policy.rank(gap, v), tie) else {
                return;
            };
            used[pick] = true;

            let item = inventory.entries()[pick].item.clone();
            if self.try_insert(books, sides, item.clone(), policy) {
                counter.take(&item);
                tracing::trace!(
                    item = %item.label(),
                    gap = books.gap(sides.adv, sides.dis),
                    "item added"
                );
            }
        }
    }

    /// One last item so a human receiver is not left short when the automated
    /// side can afford it.
    fn tie_break_pass(
        &self,
        books: &mut Books,
        sides: Sides,
        inventory: &Inventory,
        counter: &ResourceCategoryCounter<'_>,
        used: &[bool],
        tie: &mut TieBreak<'_>,
    ) {
        let gap = books.gap(sides.adv, sides.dis);
        if gap <= 0 || self.is_balanced(books) {
            return;
        }
        let world = self.env.world;
        if !world.is_human(books.parties[sides.dis]) || world.is_human(books.parties[sides.adv]) {
            return;
        }
        let candidates: Vec<(usize, i32)> = inventory
            .entries()
            .iter()
            .enumerate()
            .filter(|(i, e)| !used[*i] && self.is_filler(books, counter, e))
            .filter(|(_, e)| {
                e.recipient_gain >= gap
                    && e.owner_loss <= gap
                    && (gap - e.recipient_gain).saturating_abs() <= gap
            })
            .map(|(i, e)| (i, e.owner_loss))
            .collect();
        let Some(pick) = choose(&candidates, i64::from, tie) else {
            return;
        };

        let item = inventory.entries()[pick].item.clone();
        let before = gap;
        if books.lists[sides.adv].push(item.clone()) {
            books.refresh(sides.dis, &self.env);
            let after = books.gap(sides.adv, sides.dis);
            if after.saturating_abs() > before.saturating_abs() {
                books.lists[sides.adv].remove(&item);
                books.refresh(sides.dis, &self.env);
                return;
            }
            tracing::debug!(item = %item.label(), gap = after, "tie-break item added");
        }
    }

    fn is_filler(
        &self,
        books: &Books,
        counter: &ResourceCategoryCounter<'_>,
        entry: &InventoryEntry,
    ) -> bool {
        let item = &entry.item;
        entry.verdict.is_allowed()
            && !item.is_fungible()
            && !item.is_dual()
            && !item.is_unknown()
            && !books.lists[0].occupies(item)
            && !books.lists[1].occupies(item)
            && counter.admits(item)
    }

    fn finish(
        &self,
        ctx: &NegotiationContext<'_>,
        books: Books,
        start: i32,
        status: BalanceStatus,
        policy: Option<SelectionPolicy>,
    ) -> BalanceOutcome {
        let gap = books.gap(0, 1);
        tracing::debug!(
            first = ctx.first.0,
            second = ctx.second.0,
            status = ?status,
            policy = ?policy,
            start,
            gap,
            "balance pass finished"
        );
        let [first_gives, second_gives] = books.lists;
        BalanceOutcome {
            status,
            first_gives,
            second_gives,
            gap,
            policy,
        }
    }
}

/// Best candidate by `key` (smaller wins); ties go to `tie`.
fn choose(
    candidates: &[(usize, i32)],
    key: impl Fn(i32) -> i64,
    tie: &mut TieBreak<'_>,
) -> Option<usize> {
    let best = candidates.iter().map(|&(_, v)| key(v)).min()?;
    let tied: Vec<usize> = candidates
        .iter()
        .filter(|&&(_, v)| key(v) == best)
        .map(|&(i, _)| i)
        .collect();
    tied.get(tie.choose(tied.len())).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_refuses_overshoot_outside_swaps() {
        let p = SelectionPolicy::Strict;
        assert!(p.admits(40, 40, None));
        assert!(p.admits(40, 10, None));
        assert!(!p.admits(40, 45, None));
        assert!(p.admits(40, 52, Some(15)));
        assert!(!p.admits(40, 60, Some(15)));
    }

    #[test]
    fn generous_takes_the_closer_fit() {
        let p = SelectionPolicy::Generous;
        assert!(p.admits(40, 70, None));
        assert!(!p.admits(40, 80, None));
        assert!(!p.admits(0, 10, None));
        assert!(p.rank(40, 45) < p.rank(40, 30));
    }

    #[test]
    fn strict_ranks_by_value() {
        let p = SelectionPolicy::Strict;
        assert!(p.rank(100, 60) < p.rank(100, 30));
    }

    #[test]
    fn choose_is_stable_by_default() {
        let mut tie = TieBreak::Stable;
        let candidates = [(3, 10), (5, 10), (7, 4)];
        assert_eq!(choose(&candidates, |v| -i64::from(v), &mut tie), Some(3));
        assert_eq!(choose(&candidates, i64::from, &mut tie), Some(7));
        assert_eq!(choose(&[], i64::from, &mut tie), None);
    }
}
