//! Protection calculator — per-level stops/takes, the aggregate basket
//! target, and break-even / trailing stop candidates.

pub mod ratchet;

use crate::domain::{InstrumentScale, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Break-even adjustment: once favorable excursion reaches `trigger_pips`,
/// move the stop to entry plus/minus `offset_pips`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakEvenConfig {
    pub trigger_pips: Decimal,
    pub offset_pips: Decimal,
}

/// Trailing stop: once favorable excursion reaches
/// `trigger_pips + distance_pips`, trail at `distance_pips` behind price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrailingConfig {
    pub trigger_pips: Decimal,
    pub distance_pips: Decimal,
}

/// All protective-exit parameters for one engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtectionConfig {
    /// Base per-level stop distance in pips (widened by remaining grid
    /// capacity, see [`ProtectionCalculator::initial_stop`]). Zero disables
    /// per-level stops.
    pub stop_pips: Decimal,
    /// Per-level take distance in pips. Zero disables per-level takes.
    pub take_pips: Decimal,
    /// Aggregate target table: `basket_take_points[n-1]` is the total take
    /// in pips for an `n`-leg basket. Must be monotone non-decreasing;
    /// baskets larger than the table reuse the last entry. Empty disables
    /// the basket target.
    pub basket_take_points: Vec<u32>,
    pub break_even: Option<BreakEvenConfig>,
    pub trailing: Option<TrailingConfig>,
}

impl ProtectionConfig {
    pub fn table_is_monotone(&self) -> bool {
        self.basket_take_points.windows(2).all(|w| w[0] <= w[1])
    }

    /// Total take pips for an `legs`-leg basket, if a basket target applies.
    pub fn total_take_pips(&self, legs: u32) -> Option<Decimal> {
        if legs == 0 || self.basket_take_points.is_empty() {
            return None;
        }
        let idx = (legs as usize - 1).min(self.basket_take_points.len() - 1);
        Some(Decimal::from(self.basket_take_points[idx]))
    }
}

/// Derives protective prices from entries and market extremes. Borrows the
/// engine's config and instrument scale; holds no state of its own — the
/// ratchet state lives on each level's `stop_price`.
pub struct ProtectionCalculator<'a> {
    config: &'a ProtectionConfig,
    scale: &'a InstrumentScale,
}

impl<'a> ProtectionCalculator<'a> {
    pub fn new(config: &'a ProtectionConfig, scale: &'a InstrumentScale) -> Self {
        Self { config, scale }
    }

    /// Initial per-level stop: `entry -/+ (stop + remaining_capacity * grid_step)`.
    ///
    /// The buffer widens while more grid capacity remains so an early thin
    /// leg is not stopped out before the ladder has averaged in.
    pub fn initial_stop(
        &self,
        entry: Decimal,
        side: Side,
        remaining_capacity: u32,
        grid_step_pips: Decimal,
    ) -> Option<Decimal> {
        if self.config.stop_pips <= Decimal::ZERO {
            return None;
        }
        let buffer_pips =
            self.config.stop_pips + Decimal::from(remaining_capacity) * grid_step_pips;
        let distance = self.scale.pips(buffer_pips);
        let stop = entry - side.sign() * distance;
        Some(self.scale.round_price(stop))
    }

    /// Per-level take: `entry +/- take_pips`.
    pub fn take_price(&self, entry: Decimal, side: Side) -> Option<Decimal> {
        if self.config.take_pips <= Decimal::ZERO {
            return None;
        }
        let take = entry + side.sign() * self.scale.pips(self.config.take_pips);
        Some(self.scale.round_price(take))
    }

    /// Aggregate basket target for `legs` open levels:
    /// `weighted_entry +/- total_take(legs) / legs` pips, tick-rounded.
    /// Reaching it liquidates the whole ladder, not a single level.
    pub fn basket_target(
        &self,
        weighted_entry: Decimal,
        side: Side,
        legs: u32,
    ) -> Option<Decimal> {
        let total = self.config.total_take_pips(legs)?;
        let per_leg_pips = total / Decimal::from(legs);
        let target = weighted_entry + side.sign() * self.scale.pips(per_leg_pips);
        Some(self.scale.round_price(target))
    }

    /// Break-even stop candidate, armed once the favorable extreme is at
    /// least `trigger_pips` past the entry.
    pub fn break_even_candidate(
        &self,
        entry: Decimal,
        side: Side,
        favorable_extreme: Decimal,
    ) -> Option<Decimal> {
        let be = self.config.break_even.as_ref()?;
        let excursion = side.favorable_excursion(entry, favorable_extreme);
        if excursion < self.scale.pips(be.trigger_pips) {
            return None;
        }
        let stop = entry + side.sign() * self.scale.pips(be.offset_pips);
        Some(self.scale.round_price(stop))
    }

    /// Trailing stop candidate: `price -/+ distance` once the favorable
    /// extreme clears `trigger + distance`.
    pub fn trailing_candidate(
        &self,
        entry: Decimal,
        side: Side,
        current_price: Decimal,
        favorable_extreme: Decimal,
    ) -> Option<Decimal> {
        let trail = self.config.trailing.as_ref()?;
        let arm_at = self.scale.pips(trail.trigger_pips + trail.distance_pips);
        if side.favorable_excursion(entry, favorable_extreme) < arm_at {
            return None;
        }
        let stop = current_price - side.sign() * self.scale.pips(trail.distance_pips);
        Some(self.scale.round_price(stop))
    }

    /// Ratchet break-even and trailing candidates into the current stop.
    /// Both pass through [`ratchet::tighten`], so the tighter one wins and
    /// the stop never loosens. Returns the updated stop, if any.
    pub fn ratcheted_stop(
        &self,
        entry: Decimal,
        side: Side,
        current_price: Decimal,
        favorable_extreme: Decimal,
        current_stop: Option<Decimal>,
    ) -> Option<Decimal> {
        let mut stop = current_stop;
        if let Some(candidate) = self.break_even_candidate(entry, side, favorable_extreme) {
            stop = Some(ratchet::tighten(side, stop, candidate));
        }
        if let Some(candidate) =
            self.trailing_candidate(entry, side, current_price, favorable_extreme)
        {
            stop = Some(ratchet::tighten(side, stop, candidate));
        }
        stop
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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

    fn config() -> ProtectionConfig {
        ProtectionConfig {
            stop_pips: dec!(50),
            take_pips: dec!(20),
            basket_take_points: vec![15, 30, 45, 60],
            break_even: Some(BreakEvenConfig {
                trigger_pips: dec!(10),
                offset_pips: dec!(2),
            }),
            trailing: Some(TrailingConfig {
                trigger_pips: dec!(10),
                distance_pips: dec!(15),
            }),
        }
    }

    #[test]
    fn initial_stop_widens_with_capacity() {
        let cfg = config();
        let scale = scale();
        let calc = ProtectionCalculator::new(&cfg, &scale);

        // No capacity left: plain 50-pip stop.
        let tight = calc.initial_stop(dec!(1.2000), Side::Long, 0, dec!(30)).unwrap();
        assert_eq!(tight, dec!(1.1950));

        // Three levels of capacity left: 50 + 3*30 = 140 pips.
        let wide = calc.initial_stop(dec!(1.2000), Side::Long, 3, dec!(30)).unwrap();
        assert_eq!(wide, dec!(1.1860));

        // Short side mirrors.
        let short = calc.initial_stop(dec!(1.2000), Side::Short, 0, dec!(30)).unwrap();
        assert_eq!(short, dec!(1.2050));
    }

    #[test]
    fn take_price_mirrors_by_side() {
        let cfg = config();
        let scale = scale();
        let calc = ProtectionCalculator::new(&cfg, &scale);
        assert_eq!(calc.take_price(dec!(1.2000), Side::Long), Some(dec!(1.2020)));
        assert_eq!(calc.take_price(dec!(1.2000), Side::Short), Some(dec!(1.1980)));
    }

    #[test]
    fn zero_distances_disable() {
        let mut cfg = config();
        cfg.stop_pips = Decimal::ZERO;
        cfg.take_pips = Decimal::ZERO;
        let scale = scale();
        let calc = ProtectionCalculator::new(&cfg, &scale);
        assert_eq!(calc.initial_stop(dec!(1.2), Side::Long, 2, dec!(30)), None);
        assert_eq!(calc.take_price(dec!(1.2), Side::Long), None);
    }

    #[test]
    fn basket_target_divides_table_by_legs() {
        let cfg = config();
        let scale = scale();
        let calc = ProtectionCalculator::new(&cfg, &scale);

        // 4 legs: 60 / 4 = 15 pips above the weighted entry.
        let target = calc.basket_target(dec!(1.19697), Side::Long, 4).unwrap();
        assert_eq!(target, dec!(1.19847));

        // Larger baskets reuse the last table entry.
        let target = calc.basket_target(dec!(1.19697), Side::Long, 6).unwrap();
        assert_eq!(target, dec!(1.19697) + scale.pips(dec!(10)));

        // Short side subtracts.
        let target = calc.basket_target(dec!(1.2000), Side::Short, 1).unwrap();
        assert_eq!(target, dec!(1.2000) - scale.pips(dec!(15)));
    }

    #[test]
    fn basket_target_requires_legs_and_table() {
        let scale = scale();
        let cfg = config();
        let calc = ProtectionCalculator::new(&cfg, &scale);
        assert_eq!(calc.basket_target(dec!(1.2), Side::Long, 0), None);

        let mut empty = config();
        empty.basket_take_points.clear();
        let calc = ProtectionCalculator::new(&empty, &scale);
        assert_eq!(calc.basket_target(dec!(1.2), Side::Long, 3), None);
    }

    #[test]
    fn break_even_arms_at_trigger() {
        let cfg = config();
        let scale = scale();
        let calc = ProtectionCalculator::new(&cfg, &scale);

        // 9 pips of excursion: not armed.
        assert_eq!(
            calc.break_even_candidate(dec!(1.2000), Side::Long, dec!(1.2009)),
            None
        );
        // 10 pips: stop to entry + 2 pips.
        assert_eq!(
            calc.break_even_candidate(dec!(1.2000), Side::Long, dec!(1.2010)),
            Some(dec!(1.2002))
        );
        // Short mirrors.
        assert_eq!(
            calc.break_even_candidate(dec!(1.2000), Side::Short, dec!(1.1990)),
            Some(dec!(1.1998))
        );
    }

    #[test]
    fn trailing_arms_at_trigger_plus_distance() {
        let cfg = config();
        let scale = scale();
        let calc = ProtectionCalculator::new(&cfg, &scale);

        // 24 pips < 10 + 15: not armed.
        assert_eq!(
            calc.trailing_candidate(dec!(1.2000), Side::Long, dec!(1.2024), dec!(1.2024)),
            None
        );
        // 25 pips: trail 15 pips behind price.
        assert_eq!(
            calc.trailing_candidate(dec!(1.2000), Side::Long, dec!(1.2025), dec!(1.2025)),
            Some(dec!(1.2010))
        );
    }

    #[test]
    fn ratcheted_stop_takes_the_tighter_and_never_loosens() {
        let cfg = config();
        let scale = scale();
        let calc = ProtectionCalculator::new(&cfg, &scale);
        let entry = dec!(1.2000);

        // Break-even fires first: stop 1.2002.
        let stop = calc.ratcheted_stop(entry, Side::Long, dec!(1.2012), dec!(1.2012), None);
        assert_eq!(stop, Some(dec!(1.2002)));

        // Price runs: trailing candidate 1.2030 - 15 pips = 1.2015 wins.
        let stop = calc.ratcheted_stop(entry, Side::Long, dec!(1.2030), dec!(1.2030), stop);
        assert_eq!(stop, Some(dec!(1.2015)));

        // Price retreats; candidates would loosen, stop holds.
        let stop = calc.ratcheted_stop(entry, Side::Long, dec!(1.2018), dec!(1.2030), stop);
        assert_eq!(stop, Some(dec!(1.2015)));
    }
}
