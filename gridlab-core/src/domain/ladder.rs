//! The ladder: one side's ordered sequence of grid levels.

use super::level::Level;
use super::side::Side;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Ordered same-direction grid levels for one instrument side.
///
/// Levels are stored in insertion order with strictly increasing indices.
/// The ladder is exclusively owned by one engine instance; handlers mutate
/// it one event at a time, so no locking is needed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ladder {
    pub side: Side,
    levels: Vec<Level>,
    /// Price of the most recent entry fill; spacing is measured from here.
    pub last_entry_price: Option<Decimal>,
}

impl Ladder {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            levels: Vec::new(),
            last_entry_price: None,
        }
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn levels_mut(&mut self) -> &mut [Level] {
        &mut self.levels
    }

    /// Index the next level would get.
    pub fn next_index(&self) -> u32 {
        self.levels.last().map(|l| l.index + 1).unwrap_or(0)
    }

    pub fn push_level(&mut self, level: Level) {
        debug_assert_eq!(level.side, self.side);
        debug_assert!(
            self.levels.last().map(|l| level.index > l.index).unwrap_or(true),
            "level indices must be strictly increasing"
        );
        self.levels.push(level);
    }

    pub fn level_mut(&mut self, index: u32) -> Option<&mut Level> {
        self.levels.iter_mut().find(|l| l.index == index)
    }

    pub fn level(&self, index: u32) -> Option<&Level> {
        self.levels.iter().find(|l| l.index == index)
    }

    /// Drop a level entirely (used when its entry cancels before any fill).
    pub fn remove_level(&mut self, index: u32) {
        self.levels.retain(|l| l.index != index);
    }

    /// Total open volume across all levels.
    pub fn open_volume(&self) -> Decimal {
        self.levels.iter().map(|l| l.open_volume()).sum()
    }

    /// Number of levels currently holding open volume.
    pub fn open_level_count(&self) -> u32 {
        self.levels
            .iter()
            .filter(|l| l.open_volume() > Decimal::ZERO)
            .count() as u32
    }

    pub fn is_flat(&self) -> bool {
        self.open_volume().is_zero()
    }

    pub fn has_pending(&self) -> bool {
        self.levels.iter().any(|l| l.has_pending())
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// True when the newest level still has its entry order outstanding;
    /// guards against duplicate entry submission while one is in flight.
    pub fn entry_in_flight(&self) -> bool {
        self.levels
            .last()
            .map(|l| l.pending_entry.is_some())
            .unwrap_or(false)
    }

    /// Planned volumes in ladder order, the progression's input.
    pub fn planned_volumes(&self) -> Vec<Decimal> {
        self.levels.iter().map(|l| l.planned_volume).collect()
    }

    /// Volume-weighted average entry over levels with open volume.
    pub fn weighted_entry(&self) -> Option<Decimal> {
        let mut total = Decimal::ZERO;
        let mut weighted = Decimal::ZERO;
        for level in &self.levels {
            let open = level.open_volume();
            if open > Decimal::ZERO {
                let entry = level.entry_price?;
                total += open;
                weighted += entry * open;
            }
        }
        if total.is_zero() {
            None
        } else {
            Some(weighted / total)
        }
    }

    /// Record an entry fill price as the new spacing reference.
    pub fn record_entry_fill(&mut self, price: Decimal) {
        self.last_entry_price = Some(price);
    }

    /// Clear all levels exactly when flat with nothing pending.
    /// Returns true if the ladder was cleared.
    pub fn clear_if_flat(&mut self) -> bool {
        if self.levels.is_empty() {
            return false;
        }
        if self.is_flat() && !self.has_pending() {
            debug_assert!(self
                .levels
                .iter()
                .all(|l| l.is_closed() || l.executed_volume.is_zero()));
            self.levels.clear();
            self.last_entry_price = None;
            true
        } else {
            false
        }
    }
}
