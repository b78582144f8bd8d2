//! Trade records: raw rows from the store and their processed form.

use chrono::{NaiveDateTime, TimeDelta};
use serde::Serialize;
use std::fmt;

/// Classification tag selecting real trade entries in the `trades` table.
pub const TRADE_CLASSIFICATION: &str = "Trade";

/// Trade type that disables the type filter.
pub const ALL_TYPES: &str = "ALL";

/// A row of the `trades` table as read from the store.
///
/// Numeric columns are kept as text; the store does not guarantee they hold
/// numbers. Coercion happens when the row is processed.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRow {
    pub id: String,
    pub date: Option<NaiveDateTime>,
    pub trade_type: Option<String>,
    pub side: Option<String>,
    pub profit: Option<String>,
    pub loss: Option<String>,
    pub risk_reward_ratio: Option<String>,
    pub return_percent: Option<String>,
    pub take_profit: Option<String>,
    pub stop_loss: Option<String>,
    pub entry: Option<String>,
    pub data: Option<String>,
}

/// A trade with numeric fields coerced and equity-curve fields derived.
///
/// `None` marks a missing value: either absent in the store or not numeric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedTrade {
    pub id: String,
    #[serde(serialize_with = "date_text::serialize")]
    pub date: Option<NaiveDateTime>,
    #[serde(rename = "type")]
    pub trade_type: Option<String>,
    pub side: Option<String>,
    pub profit: Option<f64>,
    pub loss: Option<f64>,
    pub risk_reward_ratio: Option<f64>,
    pub return_percent: Option<f64>,
    pub take_profit: Option<f64>,
    pub stop_loss: Option<f64>,
    pub entry: Option<f64>,
    pub data: Option<String>,
    pub cumulative_return: Option<f64>,
    pub peak: Option<f64>,
    pub drawdown: Option<f64>,
}

impl ProcessedTrade {
    /// Coerce a raw row. Derived fields start out missing.
    pub fn from_row(row: &TradeRow) -> Self {
        ProcessedTrade {
            id: row.id.clone(),
            date: row.date,
            trade_type: row.trade_type.clone(),
            side: row.side.clone(),
            profit: coerce_numeric(row.profit.as_deref()),
            loss: coerce_numeric(row.loss.as_deref()),
            risk_reward_ratio: coerce_numeric(row.risk_reward_ratio.as_deref()),
            return_percent: coerce_numeric(row.return_percent.as_deref()),
            take_profit: coerce_numeric(row.take_profit.as_deref()),
            stop_loss: coerce_numeric(row.stop_loss.as_deref()),
            entry: coerce_numeric(row.entry.as_deref()),
            data: row.data.clone(),
            cumulative_return: None,
            peak: None,
            drawdown: None,
        }
    }

    pub fn is_win(&self) -> bool {
        self.profit.is_some_and(|p| p > 0.0)
    }

    pub fn is_loss(&self) -> bool {
        self.loss.is_some_and(|l| l > 0.0)
    }
}

/// Parse a textual numeric value. Anything that is not a finite number is missing.
pub fn coerce_numeric(raw: Option<&str>) -> Option<f64> {
    let value = raw?.trim().parse::<f64>().ok()?;
    value.is_finite().then_some(value)
}

/// Row selection for a trade query.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeFilter {
    /// Exact trade type to match; `None` matches every type.
    pub trade_type: Option<String>,
    /// Inclusive lower bound on the trade date; `None` means unbounded.
    pub since: Option<NaiveDateTime>,
}

impl TradeFilter {
    /// Trades of `trade_type` dated within `days` of `now`.
    ///
    /// A type of `ALL` matches every type and `days <= 0` removes the date bound.
    pub fn lookback(trade_type: &str, days: i64, now: NaiveDateTime) -> Self {
        let trade_type = trade_type.trim();
        let trade_type = if trade_type.eq_ignore_ascii_case(ALL_TYPES) {
            None
        } else {
            Some(trade_type.to_string())
        };

        let since = if days > 0 {
            TimeDelta::try_days(days).and_then(|delta| now.checked_sub_signed(delta))
        } else {
            None
        };

        TradeFilter { trade_type, since }
    }
}

impl fmt::Display for TradeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.trade_type {
            Some(t) => write!(f, "type {t}")?,
            None => write!(f, "all types")?,
        }
        match self.since {
            Some(since) => write!(f, " since {}", since.format("%Y-%m-%d %H:%M:%S")),
            None => write!(f, ", no date bound"),
        }
    }
}

mod date_text {
    use chrono::NaiveDateTime;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(
        date: &Option<NaiveDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match date {
            Some(d) => serializer.collect_str(&d.format("%Y-%m-%d %H:%M:%S")),
            None => serializer.serialize_none(),
        }
    }
}
