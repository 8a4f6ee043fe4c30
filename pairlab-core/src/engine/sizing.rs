//! Leg sizing for a spread entry.
//!
//! Leg A is always one unit. Leg B is scaled to `(pa/pb)·beta` units so the
//! two legs carry comparable notional after hedging.

use crate::domain::SpreadState;

/// Unsigned leg sizes `(|size_a|, |size_b|)`.
pub fn unit_sizes(price_a: f64, price_b: f64, beta: f64) -> (f64, f64) {
    let size_a = 1.0;
    (size_a, (price_a / price_b) * beta * size_a)
}

/// Signed sizes for `state`: `size_a = state·|a|`, `size_b = -state·|b|`.
pub fn position_sizes(state: SpreadState, price_a: f64, price_b: f64, beta: f64) -> (f64, f64) {
    let sign = state.sign_f64();
    let (abs_a, abs_b) = unit_sizes(price_a, price_b, beta);
    (sign * abs_a, -sign * abs_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_spread_with_beta_two() {
        let (a, b) = position_sizes(SpreadState::LongSpread, 100.0, 50.0, 2.0);
        assert_eq!(a, 1.0);
        assert_eq!(b, -4.0);
    }

    #[test]
    fn short_spread_mirrors_long() {
        let (a, b) = position_sizes(SpreadState::ShortSpread, 100.0, 50.0, 2.0);
        assert_eq!(a, -1.0);
        assert_eq!(b, 4.0);
    }

    #[test]
    fn flat_is_zero() {
        let (a, b) = position_sizes(SpreadState::Flat, 100.0, 50.0, 1.0);
        assert_eq!(a, 0.0);
        assert_eq!(b, 0.0);
    }
}
