//! Volume progression — how much to trade at each ladder level.
//!
//! Progressions translate the level history plus an equity/risk budget into
//! the next order volume. They are ladder-aware but market-agnostic: prior
//! planned volumes come in, one normalized volume (or a rejection) comes out.

use crate::domain::InstrumentScale;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Volume scaling rule applied per additional grid level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ProgressionMode {
    /// Every level trades the configured base volume.
    Fixed,
    /// Martingale: each level multiplies the previous one (factor >= 1).
    Multiplier(Decimal),
    /// Seeded [v0, v0], then each level is the sum of the prior two.
    Fibonacci,
    /// Risk a fraction of equity against the configured stop distance;
    /// falls back to Fixed when the stop distance is absent or zero.
    RiskPercent(Decimal),
}

/// Venue volume constraints, lifted from the instrument scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeLimits {
    pub volume_step: Decimal,
    pub min_volume: Decimal,
    pub max_volume: Decimal,
}

impl VolumeLimits {
    pub fn from_scale(scale: &InstrumentScale) -> Self {
        Self {
            volume_step: scale.volume_step,
            min_volume: scale.min_volume,
            max_volume: scale.max_volume,
        }
    }

    /// Quantize to the volume step and cap at the maximum. A result below
    /// the minimum is rejected (`None`) rather than silently raised.
    pub fn normalize(&self, raw: Decimal) -> Option<Decimal> {
        if raw <= Decimal::ZERO {
            return None;
        }
        let stepped = crate::domain::instrument::round_to_step(raw, self.volume_step);
        let capped = stepped.min(self.max_volume);
        if capped < self.min_volume {
            None
        } else {
            Some(capped)
        }
    }
}

/// Compute the next order volume for a ladder with `prior` planned volumes.
///
/// `stop_distance_money` is the account-currency cost of the configured
/// stop distance per 1.0 volume (used by `RiskPercent` only).
pub fn next_volume(
    mode: ProgressionMode,
    base_volume: Decimal,
    prior: &[Decimal],
    equity: Decimal,
    stop_distance_money: Option<Decimal>,
    limits: &VolumeLimits,
) -> Option<Decimal> {
    let raw = match mode {
        ProgressionMode::Fixed => base_volume,
        ProgressionMode::Multiplier(factor) => match prior.last() {
            None => base_volume,
            Some(last) => *last * factor,
        },
        ProgressionMode::Fibonacci => match prior.len() {
            // Seeded [v0, v0]: the first two levels both trade the base.
            0 | 1 => base_volume,
            n => prior[n - 1] + prior[n - 2],
        },
        ProgressionMode::RiskPercent(risk) => match stop_distance_money {
            Some(money) if money > Decimal::ZERO => equity * risk / money,
            _ => base_volume,
        },
    };
    limits.normalize(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn limits() -> VolumeLimits {
        VolumeLimits {
            volume_step: dec!(0.001),
            min_volume: dec!(0.01),
            max_volume: dec!(100),
        }
    }

    #[test]
    fn fixed_returns_base() {
        let v = next_volume(ProgressionMode::Fixed, dec!(0.10), &[dec!(0.10)], dec!(10000), None, &limits());
        assert_eq!(v, Some(dec!(0.10)));
    }

    #[test]
    fn multiplier_scales_last() {
        let prior = [dec!(0.10), dec!(0.11)];
        let v = next_volume(
            ProgressionMode::Multiplier(dec!(1.1)),
            dec!(0.10),
            &prior,
            dec!(10000),
            None,
            &limits(),
        );
        assert_eq!(v, Some(dec!(0.121)));
    }

    #[test]
    fn multiplier_starts_at_base() {
        let v = next_volume(
            ProgressionMode::Multiplier(dec!(2)),
            dec!(0.10),
            &[],
            dec!(10000),
            None,
            &limits(),
        );
        assert_eq!(v, Some(dec!(0.10)));
    }

    #[test]
    fn fibonacci_sums_prior_two() {
        let base = dec!(0.01);
        let mut prior: Vec<Decimal> = Vec::new();
        let expected = [
            dec!(0.01), // seed
            dec!(0.01), // seed
            dec!(0.02),
            dec!(0.03),
            dec!(0.05),
            dec!(0.08),
        ];
        for want in expected {
            let v = next_volume(ProgressionMode::Fibonacci, base, &prior, dec!(10000), None, &limits())
                .unwrap();
            assert_eq!(v, want);
            prior.push(v);
        }
    }

    #[test]
    fn risk_percent_divides_risk_budget() {
        // 1% of 10_000 = 100; stop costs 300 per 1.0 volume -> 0.333
        let v = next_volume(
            ProgressionMode::RiskPercent(dec!(0.01)),
            dec!(0.10),
            &[],
            dec!(10000),
            Some(dec!(300)),
            &limits(),
        );
        assert_eq!(v, Some(dec!(0.333)));
    }

    #[test]
    fn risk_percent_falls_back_to_fixed_without_stop() {
        let v = next_volume(
            ProgressionMode::RiskPercent(dec!(0.01)),
            dec!(0.10),
            &[],
            dec!(10000),
            None,
            &limits(),
        );
        assert_eq!(v, Some(dec!(0.10)));

        let v = next_volume(
            ProgressionMode::RiskPercent(dec!(0.01)),
            dec!(0.10),
            &[],
            dec!(10000),
            Some(Decimal::ZERO),
            &limits(),
        );
        assert_eq!(v, Some(dec!(0.10)));
    }

    #[test]
    fn sub_minimum_is_rejected_not_raised() {
        let v = next_volume(ProgressionMode::Fixed, dec!(0.004), &[], dec!(10000), None, &limits());
        assert_eq!(v, None);
    }

    #[test]
    fn above_maximum_caps() {
        let v = next_volume(ProgressionMode::Fixed, dec!(500), &[], dec!(10000), None, &limits());
        assert_eq!(v, Some(dec!(100)));
    }

    proptest! {
        /// For Multiplier(m), v_i == clamp(round_to_step(v_{i-1} * m), min, max)
        /// for every level that is not rejected.
        #[test]
        fn multiplier_progression_law(
            base_cents in 1u32..500,
            mult_tenths in 10u32..30,
            steps in 1usize..8,
        ) {
            let limits = limits();
            let base = Decimal::from(base_cents) / dec!(100);
            let mult = Decimal::from(mult_tenths) / dec!(10);

            let mut prior: Vec<Decimal> = Vec::new();
            for _ in 0..steps {
                let next = next_volume(
                    ProgressionMode::Multiplier(mult),
                    base,
                    &prior,
                    dec!(10000),
                    None,
                    &limits,
                );
                let raw = match prior.last() {
                    None => base,
                    Some(last) => *last * mult,
                };
                prop_assert_eq!(next, limits.normalize(raw));
                match next {
                    Some(v) => {
                        prop_assert!(v >= limits.min_volume);
                        prop_assert!(v <= limits.max_volume);
                        prior.push(v);
                    }
                    None => break,
                }
            }
        }
    }
}
