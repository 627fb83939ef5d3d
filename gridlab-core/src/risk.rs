//! Risk breaker — floating P&L / drawdown monitor.
//!
//! A breach is not an error: it is a first-class control-flow event that
//! pre-empts all new-level placement for the event and forces full-ladder
//! liquidation. The engine stays suspended until every ladder is flat.

use crate::domain::{InstrumentScale, Ladder};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How the breach threshold is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RiskMode {
    Disabled,
    /// Trip when equity drawdown from its running peak reaches this
    /// fraction (0.25 = 25%).
    DrawdownPercent(Decimal),
    /// Trip when floating loss reaches this many account-currency units.
    AbsoluteCurrency(Decimal),
}

/// Evidence attached to a breach, for the operator log.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskBreach {
    pub floating_pnl: Decimal,
    pub equity: Decimal,
    pub peak_equity: Decimal,
}

/// Tracks peak equity and evaluates the configured breach condition.
#[derive(Debug, Clone)]
pub struct RiskBreaker {
    mode: RiskMode,
    peak_equity: Decimal,
}

impl RiskBreaker {
    pub fn new(mode: RiskMode) -> Self {
        Self {
            mode,
            peak_equity: Decimal::ZERO,
        }
    }

    /// Floating P&L across ladders at `price`:
    /// `sum(sign(side) * (price - entry) / price_step * step_value * open)`.
    pub fn floating_pnl(scale: &InstrumentScale, ladders: &[&Ladder], price: Decimal) -> Decimal {
        let mut pnl = Decimal::ZERO;
        for ladder in ladders {
            let sign = ladder.side.sign();
            for level in ladder.levels() {
                let open = level.open_volume();
                if open > Decimal::ZERO {
                    if let Some(entry) = level.entry_price {
                        pnl += scale.money_per_volume((price - entry) * sign) * open;
                    }
                }
            }
        }
        pnl
    }

    /// Evaluate the breach condition. Updates the running equity peak.
    pub fn check(&mut self, equity: Decimal, floating_pnl: Decimal) -> Option<RiskBreach> {
        self.peak_equity = self.peak_equity.max(equity);
        let breached = match self.mode {
            RiskMode::Disabled => false,
            RiskMode::DrawdownPercent(threshold) => {
                if self.peak_equity <= Decimal::ZERO {
                    false
                } else {
                    (self.peak_equity - equity) / self.peak_equity >= threshold
                }
            }
            RiskMode::AbsoluteCurrency(threshold) => -floating_pnl >= threshold,
        };
        if breached {
            Some(RiskBreach {
                floating_pnl,
                equity,
                peak_equity: self.peak_equity,
            })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CorrelationId, Level, Side};
    use rust_decimal_macros::dec;

    fn scale() -> InstrumentScale {
        InstrumentScale {
            symbol: "EURUSD".into(),
            price_step: dec!(0.00001),
            volume_step: dec!(0.01),
            min_volume: dec!(0.01),
            max_volume: dec!(100),
            decimals: 5,
            step_value: dec!(1),
        }
    }

    fn long_ladder() -> Ladder {
        let mut ladder = Ladder::new(Side::Long);
        let mut level = Level::new(0, Side::Long, dec!(0.10), CorrelationId(1), 1);
        level.apply_entry_fill(dec!(1.2000), dec!(0.10));
        level.pending_entry = None;
        ladder.push_level(level);
        ladder
    }

    #[test]
    fn floating_pnl_signed_by_side() {
        let scale = scale();
        let long = long_ladder();
        // 20 pips against a 0.10 long: -200 steps * 1 * 0.10 = -20
        let pnl = RiskBreaker::floating_pnl(&scale, &[&long], dec!(1.1980));
        assert_eq!(pnl, dec!(-20.0));

        let mut short = Ladder::new(Side::Short);
        let mut level = Level::new(0, Side::Short, dec!(0.10), CorrelationId(2), 1);
        level.apply_entry_fill(dec!(1.2000), dec!(0.10));
        level.pending_entry = None;
        short.push_level(level);
        let pnl = RiskBreaker::floating_pnl(&scale, &[&short], dec!(1.1980));
        assert_eq!(pnl, dec!(20.0));
    }

    #[test]
    fn absolute_mode_trips_on_floating_loss() {
        let mut breaker = RiskBreaker::new(RiskMode::AbsoluteCurrency(dec!(50)));
        assert!(breaker.check(dec!(10000), dec!(-49)).is_none());
        let breach = breaker.check(dec!(10000), dec!(-50)).unwrap();
        assert_eq!(breach.floating_pnl, dec!(-50));
    }

    #[test]
    fn drawdown_mode_trips_from_peak() {
        let mut breaker = RiskBreaker::new(RiskMode::DrawdownPercent(dec!(0.10)));
        assert!(breaker.check(dec!(10000), Decimal::ZERO).is_none());
        // 5% down from the 10_000 peak: no trip.
        assert!(breaker.check(dec!(9500), Decimal::ZERO).is_none());
        // 10% down: trip, and the peak is remembered.
        let breach = breaker.check(dec!(9000), Decimal::ZERO).unwrap();
        assert_eq!(breach.peak_equity, dec!(10000));
    }

    #[test]
    fn disabled_mode_never_trips() {
        let mut breaker = RiskBreaker::new(RiskMode::Disabled);
        assert!(breaker.check(dec!(1), dec!(-1000000)).is_none());
    }
}
