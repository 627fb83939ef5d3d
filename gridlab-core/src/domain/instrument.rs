//! Instrument scale: tick/lot steps, volume bounds, and pip derivation.

use crate::error::ValidationError;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Static per-instrument scale supplied by the market data feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentScale {
    pub symbol: String,
    /// Minimal price increment (tick size).
    pub price_step: Decimal,
    /// Minimal volume increment (lot step).
    pub volume_step: Decimal,
    pub min_volume: Decimal,
    pub max_volume: Decimal,
    /// Price decimals; 3/5-decimal instruments use the x10 pip convention.
    pub decimals: u32,
    /// Account-currency value of one `price_step` move per 1.0 volume.
    pub step_value: Decimal,
}

impl InstrumentScale {
    /// One pip in price units. Fractional-quote instruments (3 or 5
    /// decimals) quote a pip as ten price steps.
    pub fn pip(&self) -> Decimal {
        if self.decimals == 3 || self.decimals == 5 {
            self.price_step * Decimal::TEN
        } else {
            self.price_step
        }
    }

    /// Convert a pip count into a price distance.
    pub fn pips(&self, n: Decimal) -> Decimal {
        n * self.pip()
    }

    /// Round a price to the nearest tick.
    pub fn round_price(&self, price: Decimal) -> Decimal {
        round_to_step(price, self.price_step)
    }

    /// Round a volume to the nearest lot step.
    pub fn round_volume(&self, volume: Decimal) -> Decimal {
        round_to_step(volume, self.volume_step)
    }

    /// Account-currency value of a price distance per 1.0 volume.
    pub fn money_per_volume(&self, price_distance: Decimal) -> Decimal {
        if self.price_step.is_zero() {
            return Decimal::ZERO;
        }
        price_distance / self.price_step * self.step_value
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.price_step <= Decimal::ZERO {
            return Err(ValidationError::NonPositivePrice(self.price_step));
        }
        if self.volume_step <= Decimal::ZERO || self.min_volume <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveVolume(self.volume_step.min(self.min_volume)));
        }
        if self.max_volume < self.min_volume {
            return Err(ValidationError::VolumeBoundsInverted {
                min: self.min_volume,
                max: self.max_volume,
            });
        }
        Ok(())
    }
}

/// Round `value` to the nearest multiple of `step` (midpoint away from zero).
pub fn round_to_step(value: Decimal, step: Decimal) -> Decimal {
    if step.is_zero() {
        return value;
    }
    let steps = (value / step)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    (steps * step).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn five_digit_fx() -> InstrumentScale {
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

    #[test]
    fn pip_is_ten_steps_on_five_decimals() {
        assert_eq!(five_digit_fx().pip(), dec!(0.0001));
    }

    #[test]
    fn pip_equals_step_on_four_decimals() {
        let mut scale = five_digit_fx();
        scale.decimals = 4;
        scale.price_step = dec!(0.0001);
        assert_eq!(scale.pip(), dec!(0.0001));
    }

    #[test]
    fn price_rounds_to_tick() {
        let scale = five_digit_fx();
        assert_eq!(scale.round_price(dec!(1.200004)), dec!(1.2));
        assert_eq!(scale.round_price(dec!(1.200006)), dec!(1.20001));
    }

    #[test]
    fn volume_rounds_to_lot_step() {
        let scale = five_digit_fx();
        assert_eq!(scale.round_volume(dec!(0.114)), dec!(0.11));
        assert_eq!(scale.round_volume(dec!(0.115)), dec!(0.12));
    }

    #[test]
    fn money_per_volume_scales_by_step_value() {
        let scale = five_digit_fx();
        // 30 pips = 300 steps, 1 unit per step per 1.0 volume
        assert_eq!(scale.money_per_volume(scale.pips(dec!(30))), dec!(300));
    }

    #[test]
    fn validate_rejects_bad_steps() {
        let mut scale = five_digit_fx();
        scale.price_step = Decimal::ZERO;
        assert!(scale.validate().is_err());

        let mut scale = five_digit_fx();
        scale.max_volume = dec!(0.001);
        assert!(scale.validate().is_err());

        assert!(five_digit_fx().validate().is_ok());
    }
}
