//! Output artifact port traits.

use std::path::Path;

use crate::domain::error::TradestatsError;
use crate::domain::metrics::Metrics;
use crate::domain::trade::ProcessedTrade;

/// What a chart render did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartOutcome {
    Written,
    /// Nothing plottable; no file was touched.
    NoData,
}

/// Port for drawing the equity curve.
pub trait ChartPort {
    fn render_equity_curve(
        &self,
        trades: &[ProcessedTrade],
        output_path: &Path,
    ) -> Result<ChartOutcome, TradestatsError>;
}

/// Port for persisting metrics and processed trades.
pub trait ResultPort {
    /// `None` metrics means the run had no data.
    fn write_results(
        &self,
        metrics: Option<&Metrics>,
        trades: &[ProcessedTrade],
        output_path: &Path,
    ) -> Result<(), TradestatsError>;
}
