//! Domain types for PairLab

pub mod instrument;
pub mod price;
pub mod spread;
pub mod trade;

pub use instrument::{AssetClass, UnknownAssetClass};
pub use price::{PairError, PairSeries, PriceBar};
pub use spread::{ExitReason, SpreadState};
pub use trade::PairTrade;
