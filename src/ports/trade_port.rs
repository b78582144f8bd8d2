//! Trade store access port trait.

use crate::domain::error::TradestatsError;
use crate::domain::trade::{TradeFilter, TradeRow};

/// A source of classified trade rows.
///
/// Implementations hold an open connection; dropping the value releases it.
pub trait TradePort {
    /// Rows tagged as trades that match `filter`, in ascending date order.
    fn fetch_trades(&self, filter: &TradeFilter) -> Result<Vec<TradeRow>, TradestatsError>;
}
