//! Serializable replay configuration.

use anyhow::{Context, Result};
use gridlab_core::domain::InstrumentScale;
use gridlab_core::engine::EngineConfig;
use gridlab_core::progression::ProgressionMode;
use gridlab_core::protection::{BreakEvenConfig, ProtectionConfig, TrailingConfig};
use gridlab_core::risk::RiskMode;
use gridlab_core::spacing::SpacingConfig;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything a replay run needs: the instrument, the engine policies, and
/// the starting account balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub instrument: InstrumentScale,
    pub engine: EngineConfig,
    pub initial_equity: Decimal,
}

impl RunConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: RunConfig = toml::from_str(text).context("parsing TOML config")?;
        config.engine.validate().context("engine config")?;
        config.instrument.validate().context("instrument scale")?;
        Ok(config)
    }

    /// A complete, valid starting point for `gridlab sample-config`.
    pub fn sample() -> Self {
        Self {
            instrument: InstrumentScale {
                symbol: "EURUSD".into(),
                price_step: dec!(0.00001),
                volume_step: dec!(0.01),
                min_volume: dec!(0.01),
                max_volume: dec!(100),
                decimals: 5,
                step_value: dec!(1),
            },
            engine: EngineConfig {
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
                    break_even: Some(BreakEvenConfig {
                        trigger_pips: dec!(10),
                        offset_pips: dec!(2),
                    }),
                    trailing: Some(TrailingConfig {
                        trigger_pips: dec!(10),
                        distance_pips: dec!(15),
                    }),
                },
                risk: RiskMode::AbsoluteCurrency(dec!(500)),
                max_levels: 5,
                duplex: false,
                allow_reversal_while_liquidating: false,
                entry_expiry_events: Some(10),
            },
            initial_equity: dec!(10000),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_config_roundtrips_through_toml() {
        let sample = RunConfig::sample();
        let text = toml::to_string_pretty(&sample).unwrap();
        let parsed = RunConfig::from_toml(&text).unwrap();
        assert_eq!(sample, parsed);
    }

    #[test]
    fn invalid_engine_config_is_rejected() {
        let mut sample = RunConfig::sample();
        sample.engine.max_levels = 0;
        let text = toml::to_string_pretty(&sample).unwrap();
        assert!(RunConfig::from_toml(&text).is_err());
    }

    #[test]
    fn parses_a_handwritten_config() {
        let text = r#"
initial_equity = "5000"

[instrument]
symbol = "EURUSD"
price_step = "0.00001"
volume_step = "0.01"
min_volume = "0.01"
max_volume = "100"
decimals = 5
step_value = "1"

[engine]
base_volume = "0.10"
max_levels = 3

[engine.progression]
type = "fixed"

[engine.spacing]
base_step_pips = "30"
step_multiplier = "1"
max_step_pips = "100"

[engine.protection]
stop_pips = "50"
take_pips = "20"
basket_take_points = [15, 30, 45]

[engine.risk]
type = "disabled"
"#;
        let config = RunConfig::from_toml(text).unwrap();
        assert_eq!(config.engine.progression, ProgressionMode::Fixed);
        assert_eq!(config.engine.max_levels, 3);
        assert_eq!(config.initial_equity, dec!(5000));
        assert!(!config.engine.duplex);
    }
}
