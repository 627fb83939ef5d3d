//! Order lifecycle tracker — correlates venue events with ladder levels.
//!
//! Every submitted order is registered here with a ticket describing which
//! level (or which whole ladder) it belongs to. Fills arrive with the
//! venue's *cumulative* filled volume; the tracker applies deltas against
//! the acknowledged volume, which makes re-delivery of the same report a
//! natural no-op. Cancels and rejects release the level's pending marker so
//! the stage can be retried; a level that never filled is removed entirely.

use crate::domain::{CorrelationId, InstrumentScale, Ladder, LevelState, Side};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{debug, warn};

/// What an order was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderPurpose {
    Entry,
    Exit,
}

/// Which levels an exit order drains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitScope {
    /// A single level's take-profit style exit.
    Level(u32),
    /// A forced/aggregate close covering every open level pro-rata.
    Basket,
}

#[derive(Debug, Clone)]
struct Ticket {
    side: Side,
    purpose: OrderPurpose,
    /// Entry: the level index. Exit: the scope.
    level_index: u32,
    exit_scope: Option<ExitScope>,
    requested_volume: Decimal,
    /// Cumulative volume already applied, for idempotence.
    acked_volume: Decimal,
}

/// Result of applying one fill report.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedFill {
    pub purpose: OrderPurpose,
    pub side: Side,
    /// The level the fill applied to; `None` for basket exits.
    pub level_index: Option<u32>,
    /// Newly applied volume (zero for duplicate delivery never returned;
    /// the tracker yields `None` instead).
    pub delta: Decimal,
    /// Realized P&L of the drained volume, pro-rata across the levels the
    /// exit drew from. Zero for entry fills.
    pub realized_pnl: Decimal,
}

/// Registry of outstanding correlation ids and their ladder bookkeeping.
#[derive(Debug, Clone)]
pub struct OrderLifecycleTracker {
    scale: InstrumentScale,
    tickets: HashMap<CorrelationId, Ticket>,
}

impl OrderLifecycleTracker {
    pub fn new(scale: InstrumentScale) -> Self {
        Self {
            scale,
            tickets: HashMap::new(),
        }
    }

    pub fn register_entry(
        &mut self,
        id: CorrelationId,
        side: Side,
        level_index: u32,
        volume: Decimal,
    ) {
        self.tickets.insert(
            id,
            Ticket {
                side,
                purpose: OrderPurpose::Entry,
                level_index,
                exit_scope: None,
                requested_volume: volume,
                acked_volume: Decimal::ZERO,
            },
        );
    }

    pub fn register_exit(
        &mut self,
        id: CorrelationId,
        side: Side,
        scope: ExitScope,
        volume: Decimal,
    ) {
        let level_index = match scope {
            ExitScope::Level(index) => index,
            ExitScope::Basket => 0,
        };
        self.tickets.insert(
            id,
            Ticket {
                side,
                purpose: OrderPurpose::Exit,
                level_index,
                exit_scope: Some(scope),
                requested_volume: volume,
                acked_volume: Decimal::ZERO,
            },
        );
    }

    /// Which ladder an outstanding order belongs to.
    pub fn side_of(&self, id: CorrelationId) -> Option<Side> {
        self.tickets.get(&id).map(|t| t.side)
    }

    pub fn outstanding(&self) -> usize {
        self.tickets.len()
    }

    /// Apply a fill report. `cumulative` is the venue's total filled volume
    /// for this order; only the delta beyond what was already acknowledged
    /// is applied. Returns `None` for unknown ids and duplicate deliveries.
    pub fn on_fill(
        &mut self,
        ladder: &mut Ladder,
        id: CorrelationId,
        price: Decimal,
        cumulative: Decimal,
    ) -> Option<AppliedFill> {
        let ticket = match self.tickets.get_mut(&id) {
            Some(t) => t,
            None => {
                debug!(%id, "fill for unknown correlation id ignored");
                return None;
            }
        };
        let delta = cumulative - ticket.acked_volume;
        if delta <= Decimal::ZERO {
            debug!(%id, %cumulative, "duplicate fill delivery ignored");
            return None;
        }
        ticket.acked_volume = cumulative;

        let purpose = ticket.purpose;
        let side = ticket.side;
        let complete = ticket.acked_volume >= ticket.requested_volume;
        let scope = ticket.exit_scope;
        let level_index = ticket.level_index;

        let applied = match purpose {
            OrderPurpose::Entry => {
                let level = match ladder.level_mut(level_index) {
                    Some(l) => l,
                    None => {
                        warn!(%id, level_index, "entry fill for missing level");
                        self.tickets.remove(&id);
                        return None;
                    }
                };
                level.apply_entry_fill(price, delta);
                if complete {
                    level.pending_entry = None;
                }
                ladder.record_entry_fill(price);
                AppliedFill {
                    purpose,
                    side,
                    level_index: Some(level_index),
                    delta,
                    realized_pnl: Decimal::ZERO,
                }
            }
            OrderPurpose::Exit => {
                let realized = match scope {
                    Some(ExitScope::Level(index)) => {
                        self.drain_level(ladder, index, price, delta, complete)
                    }
                    Some(ExitScope::Basket) => {
                        self.drain_basket(ladder, id, price, delta, complete)
                    }
                    None => Decimal::ZERO,
                };
                AppliedFill {
                    purpose,
                    side,
                    level_index: match scope {
                        Some(ExitScope::Level(index)) => Some(index),
                        _ => None,
                    },
                    delta,
                    realized_pnl: realized,
                }
            }
        };

        if complete {
            self.tickets.remove(&id);
        }
        Some(applied)
    }

    /// A cancel confirmation releases the pending marker. An entry level
    /// that never filled is removed so the stage can be retried later.
    /// Unknown ids are a no-op (cancellation is idempotent).
    pub fn on_cancelled(&mut self, ladder: &mut Ladder, id: CorrelationId) {
        self.release(ladder, id, "cancelled");
    }

    /// Rejects release the pending marker exactly like cancels; there is no
    /// automatic retry. The caller surfaces the reject to the operator.
    pub fn on_rejected(&mut self, ladder: &mut Ladder, id: CorrelationId) {
        self.release(ladder, id, "rejected");
    }

    fn release(&mut self, ladder: &mut Ladder, id: CorrelationId, what: &str) {
        let ticket = match self.tickets.remove(&id) {
            Some(t) => t,
            None => return,
        };
        match ticket.purpose {
            OrderPurpose::Entry => {
                let remove = match ladder.level_mut(ticket.level_index) {
                    Some(level) => {
                        level.pending_entry = None;
                        level.executed_volume.is_zero()
                    }
                    None => false,
                };
                if remove {
                    debug!(%id, level_index = ticket.level_index, what, "unfilled entry released, level removed");
                    ladder.remove_level(ticket.level_index);
                }
            }
            OrderPurpose::Exit => {
                for level in ladder.levels_mut() {
                    if level.pending_exit == Some(id) {
                        level.pending_exit = None;
                        if level.state == LevelState::PendingExit
                            && level.open_volume() > Decimal::ZERO
                        {
                            level.state = LevelState::Open;
                        }
                    }
                }
                debug!(%id, what, "exit order released");
            }
        }
    }

    fn drain_level(
        &self,
        ladder: &mut Ladder,
        index: u32,
        price: Decimal,
        delta: Decimal,
        complete: bool,
    ) -> Decimal {
        let level = match ladder.level_mut(index) {
            Some(l) => l,
            None => {
                warn!(index, "exit fill for missing level");
                return Decimal::ZERO;
            }
        };
        let entry = level.entry_price.unwrap_or(price);
        let drained = level.apply_exit_fill(delta);
        if complete {
            level.pending_exit = None;
            if level.open_volume().is_zero() {
                level.state = LevelState::Closed;
            }
        }
        let sign = level.side.sign();
        self.scale.money_per_volume((price - entry) * sign) * drained
    }

    /// Basket exits drain every participating level pro-rata by open
    /// volume, attributing realized P&L the same way. The final slice goes
    /// entirely to the remaining volume to avoid rounding residue.
    fn drain_basket(
        &self,
        ladder: &mut Ladder,
        id: CorrelationId,
        price: Decimal,
        delta: Decimal,
        complete: bool,
    ) -> Decimal {
        let total_open: Decimal = ladder
            .levels()
            .iter()
            .filter(|l| l.pending_exit == Some(id))
            .map(|l| l.open_volume())
            .sum();

        let mut realized = Decimal::ZERO;
        if !total_open.is_zero() {
            let mut remaining = delta.min(total_open);
            let sign = ladder.side.sign();

            let member_indices: Vec<u32> = ladder
                .levels()
                .iter()
                .filter(|l| l.pending_exit == Some(id))
                .map(|l| l.index)
                .collect();
            let member_count = member_indices.len();

            for (i, index) in member_indices.into_iter().enumerate() {
                let level = match ladder.level_mut(index) {
                    Some(l) => l,
                    None => continue,
                };
                let open = level.open_volume();
                let share = if i + 1 == member_count {
                    remaining
                } else {
                    self.scale
                        .round_volume(delta.min(total_open) * open / total_open)
                        .min(remaining)
                };
                if share.is_zero() {
                    continue;
                }
                let entry = level.entry_price.unwrap_or(price);
                let drained = level.apply_exit_fill(share);
                remaining -= drained;
                realized += self.scale.money_per_volume((price - entry) * sign) * drained;
            }
        }

        // Completion must release every member, not just the ones this
        // chunk drained: earlier chunks may have emptied a level already,
        // and rounding can hand a member a zero share of the final chunk.
        if complete {
            for level in ladder.levels_mut() {
                if level.pending_exit == Some(id) {
                    level.pending_exit = None;
                    if level.open_volume().is_zero() {
                        level.state = LevelState::Closed;
                    }
                }
            }
        }
        realized
    }
}
