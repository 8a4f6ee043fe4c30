//! Asset classes supported by the price sources.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unsupported asset class '{0}' (expected 'etf' or 'crypto')")]
pub struct UnknownAssetClass(pub String);

/// Which price source a pair is fetched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    /// Exchange-traded funds and equities (Yahoo chart API).
    Etf,
    /// Spot crypto pairs (Binance klines API).
    Crypto,
}

impl AssetClass {
    pub const ALL: [AssetClass; 2] = [AssetClass::Etf, AssetClass::Crypto];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetClass::Etf => "etf",
            AssetClass::Crypto => "crypto",
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetClass {
    type Err = UnknownAssetClass;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "etf" => Ok(AssetClass::Etf),
            "crypto" => Ok(AssetClass::Crypto),
            _ => Err(UnknownAssetClass(s.to_string())),
        }
    }
}
