//! Spacing policy — adverse excursion required before the next level.

use crate::domain::Side;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Grid spacing in pips: constant (`step_multiplier == 1`) or expanding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpacingConfig {
    pub base_step_pips: Decimal,
    /// Expansion factor per additional open level (>= 1).
    pub step_multiplier: Decimal,
    /// Hard cap on the expanded step.
    pub max_step_pips: Decimal,
}

impl SpacingConfig {
    /// Required adverse distance (in pips) before level `levels_open` may
    /// be placed: `min(base * multiplier^(levels_open - 1), max)`.
    /// Zero when no level is open yet — the first entry is signal-driven.
    pub fn required_distance_pips(&self, levels_open: u32) -> Decimal {
        if levels_open == 0 {
            return Decimal::ZERO;
        }
        let mut factor = Decimal::ONE;
        for _ in 1..levels_open {
            factor *= self.step_multiplier;
        }
        (self.base_step_pips * factor).min(self.max_step_pips)
    }
}

/// Direction-aware spacing gate: a long ladder adds a level only when price
/// has fallen below the last entry by at least `distance`; a short ladder
/// only when it has risen by that much.
pub fn spacing_met(
    side: Side,
    last_entry: Decimal,
    market_price: Decimal,
    distance: Decimal,
) -> bool {
    if distance <= Decimal::ZERO {
        // Zero spacing would stack levels on every event; treat as "not met".
        return false;
    }
    match side {
        Side::Long => last_entry - market_price >= distance,
        Side::Short => market_price - last_entry >= distance,
    }
}
