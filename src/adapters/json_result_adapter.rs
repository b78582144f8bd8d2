//! JSON result adapter implementing ResultPort.

use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::domain::error::TradestatsError;
use crate::domain::metrics::Metrics;
use crate::domain::trade::ProcessedTrade;
use crate::ports::report_port::ResultPort;

#[derive(Serialize)]
struct ResultDocument<'a> {
    success: bool,
    metrics: serde_json::Value,
    trades: &'a [ProcessedTrade],
}

/// Pretty-printed `{ success, metrics, trades }` document.
///
/// Missing metrics serialize as an empty object.
pub fn render_results_json(
    metrics: Option<&Metrics>,
    trades: &[ProcessedTrade],
) -> Result<String, TradestatsError> {
    let metrics = match metrics {
        Some(m) => serde_json::to_value(m)?,
        None => serde_json::Value::Object(serde_json::Map::new()),
    };
    let document = ResultDocument {
        success: true,
        metrics,
        trades,
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

pub struct JsonResultAdapter;

impl JsonResultAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JsonResultAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultPort for JsonResultAdapter {
    fn write_results(
        &self,
        metrics: Option<&Metrics>,
        trades: &[ProcessedTrade],
        output_path: &Path,
    ) -> Result<(), TradestatsError> {
        let json = render_results_json(metrics, trades)?;

        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(output_path, json)?;

        info!(path = %output_path.display(), trades = trades.len(), "results saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::metrics::calculate;
    use crate::domain::trade::TradeRow;
    use chrono::NaiveDate;
    use serde_json::Value;

    fn row(id: &str, ret: &str) -> TradeRow {
        TradeRow {
            id: id.into(),
            date: NaiveDate::from_ymd_opt(2024, 4, 2)
                .unwrap()
                .and_hms_opt(14, 5, 0),
            trade_type: Some("REAL".into()),
            side: Some("LONG".into()),
            profit: Some("5".into()),
            loss: Some("0".into()),
            risk_reward_ratio: Some("2".into()),
            return_percent: Some(ret.into()),
            take_profit: Some("1.1".into()),
            stop_loss: Some("0.9".into()),
            entry: Some("1.0".into()),
            data: Some("Trade".into()),
        }
    }

    #[test]
    fn empty_run_has_empty_metrics_object() {
        let json = render_results_json(None, &[]).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["metrics"], serde_json::json!({}));
        assert_eq!(value["trades"], serde_json::json!([]));
    }

    #[test]
    fn document_includes_metrics_and_derived_fields() {
        let (metrics, trades) = calculate(&[row("1", "2.0"), row("2", "N/A")]);
        let json = render_results_json(metrics.as_ref(), &trades).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["metrics"]["totalTrades"], 2);
        assert_eq!(value["metrics"]["netReturn"], 2.0);

        let trades = value["trades"].as_array().unwrap();
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0]["id"], "1");
        assert_eq!(trades[0]["date"], "2024-04-02 14:05:00");
        assert_eq!(trades[0]["cumulative_return"], 2.0);
        assert_eq!(trades[0]["peak"], 2.0);
        assert_eq!(trades[0]["drawdown"], 0.0);
        assert!(trades[1]["return_percent"].is_null());
        assert!(trades[1]["cumulative_return"].is_null());
    }

    #[test]
    fn document_key_order() {
        let json = render_results_json(None, &[]).unwrap();
        let success = json.find("\"success\"").unwrap();
        let metrics = json.find("\"metrics\"").unwrap();
        let trades = json.find("\"trades\"").unwrap();
        assert!(success < metrics && metrics < trades);
        assert!(json.contains("\n  \"success\": true"));
    }

    #[test]
    fn write_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("trade_metrics.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "old content").unwrap();

        let (metrics, trades) = calculate(&[row("9", "1.5")]);
        JsonResultAdapter::new()
            .write_results(metrics.as_ref(), &trades, &path)
            .unwrap();

        let value: Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["trades"][0]["id"], "9");
    }
}
