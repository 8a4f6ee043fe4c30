//! Spread position state and exit classification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position held in the spread.
///
/// Long spread = long leg A, short leg B. Short spread is the mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SpreadState {
    #[default]
    Flat,
    LongSpread,
    ShortSpread,
}

impl SpreadState {
    /// Signed integer view: `0`, `+1`, `-1`.
    pub fn sign(&self) -> i8 {
        match self {
            SpreadState::Flat => 0,
            SpreadState::LongSpread => 1,
            SpreadState::ShortSpread => -1,
        }
    }

    pub fn sign_f64(&self) -> f64 {
        f64::from(self.sign())
    }

    pub fn is_flat(&self) -> bool {
        matches!(self, SpreadState::Flat)
    }

    pub fn from_sign(sign: i8) -> Option<Self> {
        match sign {
            0 => Some(SpreadState::Flat),
            1 => Some(SpreadState::LongSpread),
            -1 => Some(SpreadState::ShortSpread),
            _ => None,
        }
    }
}

impl fmt::Display for SpreadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SpreadState::Flat => "flat",
            SpreadState::LongSpread => "long",
            SpreadState::ShortSpread => "short",
        };
        f.write_str(s)
    }
}

/// Why a held spread was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExitReason {
    /// The z-score reverted inside the exit band.
    Signal,
    /// A leg breached the fixed-fraction stop. Takes the label when both fire.
    StopLoss,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Signal => f.write_str("signal"),
            ExitReason::StopLoss => f.write_str("stop_loss"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_round_trips() {
        for state in [SpreadState::Flat, SpreadState::LongSpread, SpreadState::ShortSpread] {
            assert_eq!(SpreadState::from_sign(state.sign()), Some(state));
        }
        assert_eq!(SpreadState::from_sign(2), None);
    }

    #[test]
    fn default_is_flat() {
        assert!(SpreadState::default().is_flat());
        assert_eq!(SpreadState::ShortSpread.sign_f64(), -1.0);
    }
}
