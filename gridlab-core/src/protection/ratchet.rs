//! Stop ratchet invariant enforcement.
//!
//! **Core rule:** stops may tighten, never loosen. Break-even and trailing
//! candidates both pass through the ratchet, so the tighter of the two wins
//! and a once-armed stop never retreats.

use crate::domain::Side;
use rust_decimal::Decimal;

/// Apply the ratchet rule to a candidate stop.
///
/// - Long: the stop may only rise — `max(current, candidate)`.
/// - Short: the stop may only fall — `min(current, candidate)`.
/// - No current stop: the candidate arms the ratchet.
pub fn tighten(side: Side, current: Option<Decimal>, candidate: Decimal) -> Decimal {
    match current {
        None => candidate,
        Some(current) => match side {
            Side::Long => current.max(candidate),
            Side::Short => current.min(candidate),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn long_tightening_allowed() {
        assert_eq!(tighten(Side::Long, Some(dec!(95)), dec!(100)), dec!(100));
    }

    #[test]
    fn long_loosening_blocked() {
        assert_eq!(tighten(Side::Long, Some(dec!(100)), dec!(90)), dec!(100));
    }

    #[test]
    fn short_tightening_allowed() {
        assert_eq!(tighten(Side::Short, Some(dec!(105)), dec!(100)), dec!(100));
    }

    #[test]
    fn short_loosening_blocked() {
        assert_eq!(tighten(Side::Short, Some(dec!(100)), dec!(110)), dec!(100));
    }

    #[test]
    fn first_candidate_arms_the_ratchet() {
        assert_eq!(tighten(Side::Long, None, dec!(95)), dec!(95));
    }

    #[test]
    fn volatility_expansion_cannot_widen_stop() {
        // A wider candidate after a favorable move must not loosen.
        let armed = tighten(Side::Long, None, dec!(95));
        assert_eq!(tighten(Side::Long, Some(armed), dec!(90)), dec!(95));
    }
}
