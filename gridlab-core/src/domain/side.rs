use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a ladder and of every order in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1 for long, -1 for short. Used in P&L and distance math.
    pub fn sign(&self) -> Decimal {
        match self {
            Side::Long => Decimal::ONE,
            Side::Short => -Decimal::ONE,
        }
    }

    pub fn opposite(&self) -> Side {
        match self {
            Side::Long => Side::Short,
            Side::Short => Side::Long,
        }
    }

    /// Favorable excursion from `entry` to `extreme`, never negative.
    pub fn favorable_excursion(&self, entry: Decimal, extreme: Decimal) -> Decimal {
        let excursion = (extreme - entry) * self.sign();
        excursion.max(Decimal::ZERO)
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => write!(f, "long"),
            Side::Short => write!(f, "short"),
        }
    }
}
