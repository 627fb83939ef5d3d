//! Error taxonomy.
//!
//! Nothing in this subsystem terminates the process: validation failures
//! degrade to a skipped action plus a log entry, and the ladder stays
//! internally consistent. These types exist for construction-time checks
//! and for hosts that want typed failures.

use rust_decimal::Decimal;
use thiserror::Error;

/// Construction-time configuration errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("base volume must be positive, got {0}")]
    NonPositiveBaseVolume(Decimal),

    #[error("volume multiplier must be >= 1, got {0}")]
    MultiplierBelowOne(Decimal),

    #[error("step multiplier must be >= 1, got {0}")]
    StepMultiplierBelowOne(Decimal),

    #[error("max_levels must be at least 1")]
    ZeroMaxLevels,

    #[error("basket take table must be monotone non-decreasing")]
    BasketTableNotMonotone,

    #[error("risk threshold must be positive, got {0}")]
    NonPositiveRiskThreshold(Decimal),

    #[error(transparent)]
    Scale(#[from] ValidationError),
}

/// Per-action validation failures. The engine logs these and skips the
/// specific action; engine state is unchanged.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("non-positive price {0}")]
    NonPositivePrice(Decimal),

    #[error("non-positive volume {0}")]
    NonPositiveVolume(Decimal),

    #[error("volume bounds inverted: min {min} > max {max}")]
    VolumeBoundsInverted { min: Decimal, max: Decimal },
}
