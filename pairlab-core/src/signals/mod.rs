//! Signal generation: z-score thresholds to entry/exit flags.
//!
//! Signals never see position state. Each bar's record depends only on
//! that bar's z-score and residual, so the generator is memoryless.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SignalError {
    #[error("z-score length {z} does not match residual length {residual}")]
    LengthMismatch { z: usize, residual: usize },

    #[error("invalid signal parameter {name} = {value}: must be finite and non-negative")]
    InvalidParam { name: &'static str, value: f64 },
}

/// Threshold parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalParams {
    /// Enter when |z| exceeds this.
    pub entry_z: f64,
    /// Exit when |z| falls below this.
    pub exit_z: f64,
    /// Minimum |residual| required to enter.
    pub abs_floor: f64,
}

impl Default for SignalParams {
    fn default() -> Self {
        Self {
            entry_z: 2.5,
            exit_z: 0.05,
            abs_floor: 0.0,
        }
    }
}

impl SignalParams {
    pub fn new(entry_z: f64, exit_z: f64, abs_floor: f64) -> Self {
        Self {
            entry_z,
            exit_z,
            abs_floor,
        }
    }

    pub fn validate(&self) -> Result<(), SignalError> {
        for (name, value) in [
            ("entry_z", self.entry_z),
            ("exit_z", self.exit_z),
            ("abs_floor", self.abs_floor),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(SignalError::InvalidParam { name, value });
            }
        }
        Ok(())
    }

    /// Flags for one bar. Undefined inputs raise no flag.
    pub fn evaluate(&self, z: Option<f64>, residual: Option<f64>) -> SignalRecord {
        match (z, residual) {
            (Some(z), Some(res)) => {
                let tradable = res.abs() >= self.abs_floor;
                SignalRecord {
                    long: z < -self.entry_z && tradable,
                    short: z > self.entry_z && tradable,
                    exit: z.abs() < self.exit_z,
                }
            }
            _ => SignalRecord::NONE,
        }
    }
}

/// Per-bar entry/exit flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignalRecord {
    pub long: bool,
    pub short: bool,
    pub exit: bool,
}

impl SignalRecord {
    pub const NONE: SignalRecord = SignalRecord {
        long: false,
        short: false,
        exit: false,
    };

    pub fn is_entry(&self) -> bool {
        self.long || self.short
    }
}

/// Convert aligned z-score and residual series into signal records.
pub fn generate_signals(
    z: &[Option<f64>],
    residual: &[Option<f64>],
    params: &SignalParams,
) -> Result<Vec<SignalRecord>, SignalError> {
    if z.len() != residual.len() {
        return Err(SignalError::LengthMismatch {
            z: z.len(),
            residual: residual.len(),
        });
    }
    params.validate()?;
    Ok(z
        .iter()
        .zip(residual)
        .map(|(z, r)| params.evaluate(*z, *r))
        .collect())
}
