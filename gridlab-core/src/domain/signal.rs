//! Directional trigger emitted by the external signal source.

use super::side::Side;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One signal per finished bar. `trigger` of `None` means "no opinion";
/// the engine still runs spacing, protection, and risk checks on such bars.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub trigger: Option<Side>,
    /// Optional price hint from the signal source; the engine may ignore it.
    pub suggested_price: Option<Decimal>,
}

impl Signal {
    pub fn none() -> Self {
        Self { trigger: None, suggested_price: None }
    }

    pub fn long() -> Self {
        Self { trigger: Some(Side::Long), suggested_price: None }
    }

    pub fn short() -> Self {
        Self { trigger: Some(Side::Short), suggested_price: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors() {
        assert_eq!(Signal::none().trigger, None);
        assert_eq!(Signal::long().trigger, Some(Side::Long));
        assert_eq!(Signal::short().trigger, Some(Side::Short));
    }
}
