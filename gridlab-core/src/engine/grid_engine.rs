//! The grid engine: one instrument, two ladders, fully event-driven.
//!
//! The engine consumes finished bars (with a directional signal) and
//! asynchronous execution reports, and emits order requests. It never
//! blocks on order state: requests are fire-and-forget, and all position
//! bookkeeping happens when the venue's lifecycle events come back.
//!
//! Per market event the passes run in a fixed order: expire stale entries,
//! cover liquidation stragglers, risk check, protection (stops / basket
//! target / takes), then new-level placement. A risk breach pre-empts
//! everything else for that event.

use super::config::EngineConfig;
use crate::domain::{
    Bar, CancelOrder, CorrelationIdGen, ExecutionEvent, InstrumentScale, Ladder, Level,
    LevelState, OrderKind, OrderRequest, Side, Signal, SubmitOrder,
};
use crate::error::ConfigError;
use crate::lifecycle::{ExitScope, OrderLifecycleTracker, OrderPurpose};
use crate::progression::{next_volume, VolumeLimits};
use crate::protection::ProtectionCalculator;
use crate::risk::RiskBreaker;
use crate::spacing::spacing_met;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

/// Per-side engine phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No levels; waiting for a signal.
    Idle,
    /// Ladder has levels and may still add more.
    Building,
    /// A forced close is in flight; no new levels, no further exits.
    Liquidating,
}

/// Event-driven grid manager for a single instrument.
///
/// Owns both ladders, the order lifecycle tracker, and the risk breaker.
/// Single-threaded by construction: one event is processed to completion
/// before the next is looked at.
#[derive(Debug, Clone)]
pub struct GridEngine {
    config: EngineConfig,
    scale: InstrumentScale,
    limits: VolumeLimits,
    long: Ladder,
    short: Ladder,
    long_phase: Phase,
    short_phase: Phase,
    tracker: OrderLifecycleTracker,
    breaker: RiskBreaker,
    ids: CorrelationIdGen,
    /// Market-event sequence number, advanced once per bar.
    seq: u64,
    /// Set on a risk breach; lifted once every ladder is flat and empty.
    suspended: bool,
    realized_pnl: Decimal,
}

impl GridEngine {
    pub fn new(config: EngineConfig, scale: InstrumentScale) -> Result<Self, ConfigError> {
        config.validate()?;
        scale.validate()?;
        let limits = VolumeLimits::from_scale(&scale);
        Ok(Self {
            tracker: OrderLifecycleTracker::new(scale.clone()),
            breaker: RiskBreaker::new(config.risk),
            long: Ladder::new(Side::Long),
            short: Ladder::new(Side::Short),
            long_phase: Phase::Idle,
            short_phase: Phase::Idle,
            ids: CorrelationIdGen::new(),
            seq: 0,
            suspended: false,
            realized_pnl: Decimal::ZERO,
            limits,
            config,
            scale,
        })
    }

    pub fn ladder(&self, side: Side) -> &Ladder {
        match side {
            Side::Long => &self.long,
            Side::Short => &self.short,
        }
    }

    pub fn phase(&self, side: Side) -> Phase {
        match side {
            Side::Long => self.long_phase,
            Side::Short => self.short_phase,
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Realized P&L accumulated across all closed volume.
    pub fn realized_pnl(&self) -> Decimal {
        self.realized_pnl
    }

    pub fn open_volume(&self) -> Decimal {
        self.long.open_volume() + self.short.open_volume()
    }

    pub fn outstanding_orders(&self) -> usize {
        self.tracker.outstanding()
    }

    /// Floating P&L of both ladders marked at `price`.
    pub fn floating_pnl(&self, price: Decimal) -> Decimal {
        RiskBreaker::floating_pnl(&self.scale, &[&self.long, &self.short], price)
    }

    /// Process one finished bar plus its signal. Returns the order requests
    /// to send; execution outcomes arrive later via [`Self::on_execution`].
    pub fn on_market(&mut self, signal: &Signal, bar: &Bar, equity: Decimal) -> Vec<OrderRequest> {
        let mut out = Vec::new();
        if !bar.is_sane() {
            warn!(symbol = %bar.symbol, "malformed bar dropped");
            return out;
        }
        self.seq += 1;
        self.expire_stale_entries(&mut out);
        self.cover_stragglers(Side::Long, &mut out);
        self.cover_stragglers(Side::Short, &mut out);

        let floating = self.floating_pnl(bar.mid());
        if let Some(breach) = self.breaker.check(equity, floating) {
            if !self.long.is_flat() || !self.short.is_flat() {
                warn!(
                    floating = %breach.floating_pnl,
                    equity = %breach.equity,
                    peak = %breach.peak_equity,
                    "risk breach, liquidating all ladders"
                );
                self.suspended = true;
                self.cancel_pending_entries(&mut out);
                self.liquidate(Side::Long, "risk breach", &mut out);
                self.liquidate(Side::Short, "risk breach", &mut out);
                self.settle();
                return out;
            }
        }

        self.protection_pass(Side::Long, bar, &mut out);
        self.protection_pass(Side::Short, bar, &mut out);

        if !self.suspended {
            self.entry_pass(Side::Long, signal, bar, equity, &mut out);
            self.entry_pass(Side::Short, signal, bar, equity, &mut out);
        }
        self.settle();
        out
    }

    /// Apply one asynchronous execution report from the venue.
    pub fn on_execution(&mut self, event: &ExecutionEvent) {
        let id = event.correlation_id();
        let Some(side) = self.tracker.side_of(id) else {
            debug!(%id, "execution event for unknown order ignored");
            return;
        };
        match *event {
            ExecutionEvent::Fill { id, price, volume } => {
                let applied = match side {
                    Side::Long => self.tracker.on_fill(&mut self.long, id, price, volume),
                    Side::Short => self.tracker.on_fill(&mut self.short, id, price, volume),
                };
                if let Some(applied) = applied {
                    match applied.purpose {
                        OrderPurpose::Entry => {
                            if let Some(index) = applied.level_index {
                                self.arm_protection(side, index);
                            }
                        }
                        OrderPurpose::Exit => {
                            self.realized_pnl += applied.realized_pnl;
                            debug!(%id, %side, realized = %applied.realized_pnl, "exit fill applied");
                        }
                    }
                }
            }
            ExecutionEvent::Cancelled { id } => match side {
                Side::Long => self.tracker.on_cancelled(&mut self.long, id),
                Side::Short => self.tracker.on_cancelled(&mut self.short, id),
            },
            ExecutionEvent::Rejected { id } => {
                warn!(%id, %side, "order rejected by venue");
                match side {
                    Side::Long => self.tracker.on_rejected(&mut self.long, id),
                    Side::Short => self.tracker.on_rejected(&mut self.short, id),
                }
            }
        }
        self.settle();
    }

    /// Cancel entry orders that have gone unfilled for too many events.
    fn expire_stale_entries(&mut self, out: &mut Vec<OrderRequest>) {
        let Some(expiry) = self.config.entry_expiry_events else {
            return;
        };
        let seq = self.seq;
        for ladder in [&mut self.long, &mut self.short] {
            for level in ladder.levels_mut() {
                if let Some(id) = level.pending_entry {
                    if !level.cancel_requested && seq.saturating_sub(level.submitted_seq) >= expiry
                    {
                        debug!(%id, level_index = level.index, "pending entry expired, cancel requested");
                        level.cancel_requested = true;
                        out.push(OrderRequest::Cancel(CancelOrder { id }));
                    }
                }
            }
        }
    }

    /// Cancel every in-flight entry on both ladders. Used on a risk breach,
    /// where even a flat side must not acquire new volume; the venue treats
    /// cancels for gone orders as no-ops.
    fn cancel_pending_entries(&mut self, out: &mut Vec<OrderRequest>) {
        for ladder in [&mut self.long, &mut self.short] {
            for level in ladder.levels_mut() {
                if let Some(id) = level.pending_entry {
                    if !level.cancel_requested {
                        level.cancel_requested = true;
                        out.push(OrderRequest::Cancel(CancelOrder { id }));
                    }
                }
            }
        }
    }

    /// An entry fill can still land after its side's forced close went out
    /// (the cancel lost the race at the venue). That volume is outside the
    /// close order; submit a covering exit for it instead of leaving it
    /// stranded.
    fn cover_stragglers(&mut self, side: Side, out: &mut Vec<OrderRequest>) {
        if self.phase(side) != Phase::Liquidating && !self.suspended {
            return;
        }
        let stragglers: Vec<u32> = self
            .ladder(side)
            .levels()
            .iter()
            .filter(|l| l.open_volume() > Decimal::ZERO && l.pending_exit.is_none())
            .map(|l| l.index)
            .collect();
        for index in stragglers {
            self.submit_level_exit(side, index, out);
        }
    }

    /// Update protective stops and evaluate exit triggers for one side.
    ///
    /// A stop hit or a basket-target hit closes the whole ladder; a
    /// per-level take closes only its level. Skipped entirely while a
    /// liquidation is already in flight.
    fn protection_pass(&mut self, side: Side, bar: &Bar, out: &mut Vec<OrderRequest>) {
        if self.phase(side) == Phase::Liquidating {
            return;
        }
        let exit_price = match side {
            Side::Long => bar.bid,
            Side::Short => bar.ask,
        };
        let favorable = match side {
            Side::Long => bar.high,
            Side::Short => bar.low,
        };
        let calc = ProtectionCalculator::new(&self.config.protection, &self.scale);

        let mut liquidation_reason: Option<&'static str> = None;
        let mut level_exits: Vec<u32> = Vec::new();
        {
            let ladder = match side {
                Side::Long => &mut self.long,
                Side::Short => &mut self.short,
            };
            if ladder.is_flat() {
                return;
            }
            for level in ladder.levels_mut() {
                if level.open_volume() <= Decimal::ZERO {
                    continue;
                }
                let Some(entry) = level.entry_price else {
                    continue;
                };
                let anchor = match (level.trail_anchor, side) {
                    (Some(a), Side::Long) => a.max(favorable),
                    (Some(a), Side::Short) => a.min(favorable),
                    (None, _) => favorable,
                };
                level.trail_anchor = Some(anchor);
                level.stop_price =
                    calc.ratcheted_stop(entry, side, exit_price, anchor, level.stop_price);
            }

            let stop_hit = ladder.levels().iter().any(|l| {
                l.open_volume() > Decimal::ZERO
                    && l.stop_price.map_or(false, |stop| match side {
                        Side::Long => bar.low <= stop,
                        Side::Short => bar.high >= stop,
                    })
            });
            if stop_hit {
                liquidation_reason = Some("protective stop");
            } else if let Some(weighted_entry) = ladder.weighted_entry() {
                let legs = ladder.open_level_count();
                if let Some(target) = calc.basket_target(weighted_entry, side, legs) {
                    let hit = match side {
                        Side::Long => bar.high >= target,
                        Side::Short => bar.low <= target,
                    };
                    if hit {
                        liquidation_reason = Some("basket target");
                    }
                }
            }
            if liquidation_reason.is_none() {
                for level in ladder.levels() {
                    if level.open_volume() > Decimal::ZERO
                        && level.pending_exit.is_none()
                        && level.take_price.map_or(false, |take| match side {
                            Side::Long => bar.high >= take,
                            Side::Short => bar.low <= take,
                        })
                    {
                        level_exits.push(level.index);
                    }
                }
            }
        }

        if let Some(reason) = liquidation_reason {
            self.liquidate(side, reason, out);
            return;
        }
        for index in level_exits {
            self.submit_level_exit(side, index, out);
        }
    }

    /// Place a new level when due: the first on a matching signal, further
    /// ones when price has moved the required spacing against the ladder.
    fn entry_pass(
        &mut self,
        side: Side,
        signal: &Signal,
        bar: &Bar,
        equity: Decimal,
        out: &mut Vec<OrderRequest>,
    ) {
        if self.phase(side) == Phase::Liquidating {
            return;
        }
        if !self.config.duplex {
            let opposite = self.ladder(side.opposite());
            let blocked = if self.config.allow_reversal_while_liquidating {
                !opposite.is_empty() && self.phase(side.opposite()) != Phase::Liquidating
            } else {
                !opposite.is_empty()
            };
            if blocked {
                return;
            }
        }

        // Entries pay the spread: longs buy the ask, shorts sell the bid.
        let market_price = match side {
            Side::Long => bar.ask,
            Side::Short => bar.bid,
        };

        let (is_first, due) = {
            let ladder = self.ladder(side);
            if ladder.entry_in_flight() {
                return;
            }
            if (ladder.levels().len() as u32) >= self.config.max_levels {
                return;
            }
            if ladder.is_empty() {
                (true, signal.trigger == Some(side))
            } else {
                let levels_open = ladder.open_level_count();
                let distance = self
                    .scale
                    .pips(self.config.spacing.required_distance_pips(levels_open));
                match ladder.last_entry_price {
                    Some(last) => (false, spacing_met(side, last, market_price, distance)),
                    None => (false, false),
                }
            }
        };
        if !due {
            return;
        }

        let stop_money = if self.config.protection.stop_pips > Decimal::ZERO {
            Some(
                self.scale
                    .money_per_volume(self.scale.pips(self.config.protection.stop_pips)),
            )
        } else {
            None
        };
        let volume = match next_volume(
            self.config.progression,
            self.config.base_volume,
            &self.ladder(side).planned_volumes(),
            equity,
            stop_money,
            &self.limits,
        ) {
            Some(v) => v,
            None => {
                debug!(%side, "progression volume outside venue bounds, level skipped");
                return;
            }
        };

        let (kind, price) = if is_first {
            match signal.suggested_price {
                Some(p) => (OrderKind::Limit, Some(self.scale.round_price(p))),
                None => (OrderKind::Market, None),
            }
        } else {
            (OrderKind::Market, None)
        };

        let id = self.ids.next_id();
        let seq = self.seq;
        let ladder = match side {
            Side::Long => &mut self.long,
            Side::Short => &mut self.short,
        };
        let index = ladder.next_index();
        ladder.push_level(Level::new(index, side, volume, id, seq));
        self.tracker.register_entry(id, side, index, volume);
        *self.phase_slot(side) = Phase::Building;
        info!(%id, %side, index, %volume, "grid level submitted");
        out.push(OrderRequest::Submit(SubmitOrder {
            id,
            side,
            kind,
            price,
            volume,
            reduce_only: false,
        }));
    }

    /// Close every open level on `side` with one reduce-only market order
    /// and cancel the side's in-flight entries. A ladder already
    /// liquidating is left alone, which makes a persisting trigger emit
    /// exactly one close per episode.
    fn liquidate(&mut self, side: Side, reason: &str, out: &mut Vec<OrderRequest>) {
        if self.phase(side) == Phase::Liquidating {
            return;
        }
        if self.ladder(side).is_flat() {
            return;
        }
        *self.phase_slot(side) = Phase::Liquidating;

        let id = self.ids.next_id();
        let ladder = match side {
            Side::Long => &mut self.long,
            Side::Short => &mut self.short,
        };
        let mut total = Decimal::ZERO;
        for level in ladder.levels_mut() {
            if let Some(pending) = level.pending_entry {
                if !level.cancel_requested {
                    level.cancel_requested = true;
                    out.push(OrderRequest::Cancel(CancelOrder { id: pending }));
                }
            }
            if level.open_volume() > Decimal::ZERO && level.pending_exit.is_none() {
                level.pending_exit = Some(id);
                level.state = LevelState::PendingExit;
                total += level.open_volume();
            }
        }
        if total.is_zero() {
            // All open volume already has exits in flight.
            return;
        }
        self.tracker.register_exit(id, side, ExitScope::Basket, total);
        info!(%id, %side, %total, reason, "liquidating ladder");
        out.push(OrderRequest::Submit(SubmitOrder {
            id,
            side: side.opposite(),
            kind: OrderKind::Market,
            price: None,
            volume: total,
            reduce_only: true,
        }));
    }

    /// Submit a reduce-only exit for a single level's open volume.
    fn submit_level_exit(&mut self, side: Side, index: u32, out: &mut Vec<OrderRequest>) {
        let id = self.ids.next_id();
        let ladder = match side {
            Side::Long => &mut self.long,
            Side::Short => &mut self.short,
        };
        let Some(level) = ladder.level_mut(index) else {
            return;
        };
        if level.pending_exit.is_some() {
            return;
        }
        let volume = level.open_volume();
        if volume.is_zero() {
            return;
        }
        level.pending_exit = Some(id);
        level.state = LevelState::PendingExit;
        self.tracker.register_exit(id, side, ExitScope::Level(index), volume);
        debug!(%id, %side, index, %volume, "level exit submitted");
        out.push(OrderRequest::Submit(SubmitOrder {
            id,
            side: side.opposite(),
            kind: OrderKind::Market,
            price: None,
            volume,
            reduce_only: true,
        }));
    }

    /// Arm per-level stop and take once the level has an entry price. The
    /// stop is set once (the ratchet only tightens it afterwards); the take
    /// is recomputed because partial fills shift the weighted entry.
    fn arm_protection(&mut self, side: Side, index: u32) {
        let calc = ProtectionCalculator::new(&self.config.protection, &self.scale);
        let remaining = self.config.max_levels.saturating_sub(index + 1);
        let grid_step = self.config.spacing.base_step_pips;
        let ladder = match side {
            Side::Long => &mut self.long,
            Side::Short => &mut self.short,
        };
        let Some(level) = ladder.level_mut(index) else {
            return;
        };
        let Some(entry) = level.entry_price else {
            return;
        };
        if level.stop_price.is_none() {
            level.stop_price = calc.initial_stop(entry, side, remaining, grid_step);
        }
        level.take_price = calc.take_price(entry, side);
    }

    /// Post-event cleanup: drop fully closed ladders, return phases to
    /// idle, and lift the risk suspension once everything is flat.
    fn settle(&mut self) {
        if self.long.clear_if_flat() {
            debug!(side = %Side::Long, "ladder cleared");
        }
        if self.short.clear_if_flat() {
            debug!(side = %Side::Short, "ladder cleared");
        }
        if self.long.is_empty() {
            self.long_phase = Phase::Idle;
        }
        if self.short.is_empty() {
            self.short_phase = Phase::Idle;
        }
        if self.suspended && self.long.is_empty() && self.short.is_empty() {
            self.suspended = false;
            info!("risk suspension lifted, trading may resume");
        }
    }

    fn phase_slot(&mut self, side: Side) -> &mut Phase {
        match side {
            Side::Long => &mut self.long_phase,
            Side::Short => &mut self.short_phase,
        }
    }
}
