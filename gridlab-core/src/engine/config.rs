//! Engine configuration — every policy choice in one named struct.

use crate::error::ConfigError;
use crate::progression::ProgressionMode;
use crate::protection::ProtectionConfig;
use crate::risk::RiskMode;
use crate::spacing::SpacingConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Complete policy selection for one engine instance.
///
/// The source pattern of scattered boolean toggles (use-trailing,
/// use-breakeven, use-risk-percent, ...) collapses into this one struct:
/// each concern is an enum or an `Option`al sub-config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub progression: ProgressionMode,
    /// Volume of the first level (and the progression seed).
    pub base_volume: Decimal,
    pub spacing: SpacingConfig,
    pub protection: ProtectionConfig,
    pub risk: RiskMode,
    /// Maximum number of levels per ladder.
    pub max_levels: u32,
    /// Allow both ladders to hold open volume at once.
    #[serde(default)]
    pub duplex: bool,
    /// Allow starting the opposite ladder while the current one is still
    /// liquidating. Default: require full flat first.
    #[serde(default)]
    pub allow_reversal_while_liquidating: bool,
    /// Cancel a pending entry after this many market events without a
    /// fill. `None` disables expiry.
    #[serde(default)]
    pub entry_expiry_events: Option<u64>,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_volume <= Decimal::ZERO {
            return Err(ConfigError::NonPositiveBaseVolume(self.base_volume));
        }
        if let ProgressionMode::Multiplier(m) = self.progression {
            if m < Decimal::ONE {
                return Err(ConfigError::MultiplierBelowOne(m));
            }
        }
        if self.spacing.step_multiplier < Decimal::ONE {
            return Err(ConfigError::StepMultiplierBelowOne(self.spacing.step_multiplier));
        }
        if self.max_levels == 0 {
            return Err(ConfigError::ZeroMaxLevels);
        }
        if !self.protection.table_is_monotone() {
            return Err(ConfigError::BasketTableNotMonotone);
        }
        match self.risk {
            RiskMode::DrawdownPercent(t) | RiskMode::AbsoluteCurrency(t)
                if t <= Decimal::ZERO =>
            {
                return Err(ConfigError::NonPositiveRiskThreshold(t));
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn valid() -> EngineConfig {
        EngineConfig {
            progression: ProgressionMode::Multiplier(dec!(1.5)),
            base_volume: dec!(0.10),
            spacing: SpacingConfig {
                base_step_pips: dec!(30),
                step_multiplier: dec!(1.1),
                max_step_pips: dec!(100),
            },
            protection: ProtectionConfig {
                stop_pips: dec!(50),
                take_pips: dec!(20),
                basket_take_points: vec![15, 30, 45, 60],
                break_even: None,
                trailing: None,
            },
            risk: RiskMode::AbsoluteCurrency(dec!(500)),
            max_levels: 5,
            duplex: false,
            allow_reversal_while_liquidating: false,
            entry_expiry_events: None,
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn rejects_sub_one_multiplier() {
        let mut cfg = valid();
        cfg.progression = ProgressionMode::Multiplier(dec!(0.9));
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::MultiplierBelowOne(dec!(0.9)))
        );
    }

    #[test]
    fn rejects_non_monotone_basket_table() {
        let mut cfg = valid();
        cfg.protection.basket_take_points = vec![15, 10, 45];
        assert_eq!(cfg.validate(), Err(ConfigError::BasketTableNotMonotone));
    }

    #[test]
    fn rejects_zero_levels_and_volume() {
        let mut cfg = valid();
        cfg.max_levels = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroMaxLevels));

        let mut cfg = valid();
        cfg.base_volume = Decimal::ZERO;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn toml_roundtrip_via_serde() {
        let cfg = valid();
        let json = serde_json::to_string(&cfg).unwrap();
        let deser: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, deser);
    }
}
