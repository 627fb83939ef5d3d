//! A single rung of the grid ladder, with full lifecycle tracking.

use super::ids::CorrelationId;
use super::side::Side;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Level lifecycle states.
///
/// `Closed` is terminal; the ladder drops closed levels once no orders
/// remain pending anywhere on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelState {
    /// Entry order submitted, nothing filled yet.
    PendingEntry,
    /// At least one entry fill received.
    Open,
    /// Exit order submitted for some of this level's volume.
    PendingExit,
    /// Open volume drained to zero.
    Closed,
}

/// One grid level: a planned entry, its fills, and its protective exits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub index: u32,
    pub side: Side,
    pub planned_volume: Decimal,
    pub executed_volume: Decimal,
    pub exited_volume: Decimal,
    /// Volume-weighted average entry, defined once `executed_volume > 0`.
    /// Updated incrementally on every fill, never replayed from history.
    pub entry_price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub take_price: Option<Decimal>,
    /// Favorable extreme since entry (highest high for longs, lowest low
    /// for shorts). Drives break-even and trailing candidates.
    pub trail_anchor: Option<Decimal>,
    pub pending_entry: Option<CorrelationId>,
    pub pending_exit: Option<CorrelationId>,
    /// Market-event sequence number at entry submission; used for expiry.
    pub submitted_seq: u64,
    /// Set once an expiry cancellation has been requested, so the request
    /// is not re-emitted on every subsequent market event.
    pub cancel_requested: bool,
    pub state: LevelState,
}

impl Level {
    /// Create a level in `PendingEntry` with its entry order outstanding.
    pub fn new(
        index: u32,
        side: Side,
        planned_volume: Decimal,
        entry_id: CorrelationId,
        submitted_seq: u64,
    ) -> Self {
        Self {
            index,
            side,
            planned_volume,
            executed_volume: Decimal::ZERO,
            exited_volume: Decimal::ZERO,
            entry_price: None,
            stop_price: None,
            take_price: None,
            trail_anchor: None,
            pending_entry: Some(entry_id),
            pending_exit: None,
            submitted_seq,
            cancel_requested: false,
            state: LevelState::PendingEntry,
        }
    }

    /// `executed - exited`, never negative.
    pub fn open_volume(&self) -> Decimal {
        (self.executed_volume - self.exited_volume).max(Decimal::ZERO)
    }

    pub fn is_closed(&self) -> bool {
        self.state == LevelState::Closed
    }

    pub fn has_pending(&self) -> bool {
        self.pending_entry.is_some() || self.pending_exit.is_some()
    }

    /// Apply an incremental entry fill: update the volume-weighted average
    /// entry and transition `PendingEntry -> Open` on the first fill.
    pub fn apply_entry_fill(&mut self, price: Decimal, delta: Decimal) {
        debug_assert!(delta > Decimal::ZERO, "entry fill delta must be positive");

        let old_volume = self.executed_volume;
        let new_volume = old_volume + delta;
        self.entry_price = Some(match self.entry_price {
            None => price,
            Some(avg) => (avg * old_volume + price * delta) / new_volume,
        });
        self.executed_volume = new_volume;

        if self.trail_anchor.is_none() {
            self.trail_anchor = Some(price);
        }
        if self.state == LevelState::PendingEntry {
            self.state = LevelState::Open;
        }
    }

    /// Apply an incremental exit fill. Returns the volume actually drained
    /// (capped at the remaining open volume — the venue's cumulative number
    /// wins, but a level can never go negative).
    pub fn apply_exit_fill(&mut self, delta: Decimal) -> Decimal {
        let drained = delta.min(self.open_volume());
        self.exited_volume += drained;
        if self.open_volume().is_zero() {
            self.state = LevelState::Closed;
        }
        drained
    }
}
