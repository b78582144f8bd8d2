//! Performance metrics and the derived equity curve.

use super::trade::{ProcessedTrade, TradeRow};
use serde::Serialize;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    /// Percentage of trades with a positive profit, 0..=100.
    pub win_rate: f64,
    pub average_return: f64,
    pub average_win: f64,
    pub average_loss: f64,
    pub profit_factor: f64,
    pub average_risk_reward_ratio: f64,
    pub max_drawdown: f64,
    pub net_return: f64,
    pub sharpe_ratio: f64,
}

/// Process rows into trades with equity-curve fields and summarise them.
///
/// Rows must already be in ascending date order. An empty input yields no
/// metrics and no trades.
pub fn calculate(rows: &[TradeRow]) -> (Option<Metrics>, Vec<ProcessedTrade>) {
    if rows.is_empty() {
        return (None, Vec::new());
    }

    let mut trades: Vec<ProcessedTrade> = rows.iter().map(ProcessedTrade::from_row).collect();
    apply_equity_curve(&mut trades);
    let metrics = Metrics::compute(&trades);

    (Some(metrics), trades)
}

/// Fill cumulative return, running peak and drawdown in sequence order.
///
/// Trades without a return percent keep all three fields missing and do not
/// move the running sum or the peak.
pub fn apply_equity_curve(trades: &mut [ProcessedTrade]) {
    let mut cumulative = 0.0_f64;
    let mut peak: Option<f64> = None;

    for trade in trades.iter_mut() {
        let Some(ret) = trade.return_percent else {
            continue;
        };

        cumulative += ret;
        let current_peak = peak.map_or(cumulative, |p| p.max(cumulative));
        peak = Some(current_peak);

        trade.cumulative_return = Some(cumulative);
        trade.peak = Some(current_peak);
        trade.drawdown = Some(current_peak - cumulative);
    }
}

impl Metrics {
    pub fn compute(trades: &[ProcessedTrade]) -> Self {
        let total_trades = trades.len();

        let winners: Vec<&ProcessedTrade> = trades.iter().filter(|t| t.is_win()).collect();
        let losers: Vec<&ProcessedTrade> = trades.iter().filter(|t| t.is_loss()).collect();
        let winning_trades = winners.len();
        let losing_trades = losers.len();

        let win_rate = if total_trades > 0 {
            winning_trades as f64 / total_trades as f64 * 100.0
        } else {
            0.0
        };

        let returns: Vec<f64> = trades.iter().filter_map(|t| t.return_percent).collect();
        let win_returns: Vec<f64> = winners.iter().filter_map(|t| t.return_percent).collect();
        let loss_returns: Vec<f64> = losers.iter().filter_map(|t| t.return_percent).collect();

        let gross_profit: f64 = winners.iter().filter_map(|t| t.profit).sum();
        let gross_loss: f64 = losers.iter().filter_map(|t| t.loss).sum::<f64>().abs();
        let profit_factor = if losing_trades > 0 && gross_loss > 0.0 {
            gross_profit / gross_loss
        } else {
            0.0
        };

        let risk_rewards: Vec<f64> = trades.iter().filter_map(|t| t.risk_reward_ratio).collect();

        let max_drawdown = trades
            .iter()
            .filter_map(|t| t.drawdown)
            .fold(None, |acc: Option<f64>, dd| Some(acc.map_or(dd, |m| m.max(dd))))
            .unwrap_or(0.0);

        let average_return = mean(&returns);
        let sharpe_ratio = match sample_stddev(&returns) {
            Some(stddev) if stddev > 0.0 => {
                average_return / stddev * TRADING_DAYS_PER_YEAR.sqrt()
            }
            _ => 0.0,
        };

        Metrics {
            total_trades,
            winning_trades,
            losing_trades,
            win_rate,
            average_return,
            average_win: mean(&win_returns),
            average_loss: mean(&loss_returns),
            profit_factor,
            average_risk_reward_ratio: mean(&risk_rewards),
            max_drawdown,
            net_return: returns.iter().sum(),
            sharpe_ratio,
        }
    }

    /// Human-readable run summary, one line per figure.
    pub fn summary_lines(&self) -> Vec<String> {
        vec![
            format!("Total trades:     {}", self.total_trades),
            format!(
                "Win rate:         {:.2}% ({} won, {} lost)",
                self.win_rate, self.winning_trades, self.losing_trades
            ),
            format!("Net return:       {:.2}%", self.net_return),
            format!("Max drawdown:     {:.2}%", self.max_drawdown),
            format!("Profit factor:    {:.2}", self.profit_factor),
            format!("Sharpe ratio:     {:.2}", self.sharpe_ratio),
        ]
    }
}

/// Arithmetic mean; an empty set averages to 0.
fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample (n - 1) standard deviation; undefined below two values.
fn sample_stddev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    // Identical values have no spread, regardless of rounding in the mean.
    if values.iter().all(|v| *v == values[0]) {
        return Some(0.0);
    }

    let m = mean(values);
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn row(day: u32, profit: &str, loss: &str, ret: &str) -> TradeRow {
        TradeRow {
            id: day.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 5, day)
                .unwrap()
                .and_hms_opt(9, 30, 0),
            trade_type: Some("REAL".into()),
            side: Some("LONG".into()),
            profit: Some(profit.into()),
            loss: Some(loss.into()),
            risk_reward_ratio: Some("2".into()),
            return_percent: Some(ret.into()),
            take_profit: Some("1.1".into()),
            stop_loss: Some("1.0".into()),
            entry: Some("1.05".into()),
            data: Some("Trade".into()),
        }
    }

    #[test]
    fn empty_input_has_no_metrics() {
        let (metrics, trades) = calculate(&[]);
        assert!(metrics.is_none());
        assert!(trades.is_empty());
    }

    #[test]
    fn equity_curve_scenario() {
        let rows = vec![
            row(1, "2", "0", "2.0"),
            row(2, "0", "1", "-1.0"),
            row(3, "3", "0", "3.0"),
        ];
        let (metrics, trades) = calculate(&rows);
        let metrics = metrics.unwrap();

        let cumulative: Vec<f64> = trades.iter().map(|t| t.cumulative_return.unwrap()).collect();
        let peak: Vec<f64> = trades.iter().map(|t| t.peak.unwrap()).collect();
        let drawdown: Vec<f64> = trades.iter().map(|t| t.drawdown.unwrap()).collect();

        assert_eq!(cumulative, vec![2.0, 1.0, 4.0]);
        assert_eq!(peak, vec![2.0, 2.0, 4.0]);
        assert_eq!(drawdown, vec![0.0, 1.0, 0.0]);
        assert_relative_eq!(metrics.max_drawdown, 1.0);
        assert_relative_eq!(metrics.net_return, 4.0);
    }

    #[test]
    fn win_rate_and_profit_factor_scenario() {
        let rows = vec![row(1, "5", "0", "1.0"), row(2, "0", "3", "-0.5")];
        let metrics = calculate(&rows).0.unwrap();

        assert_eq!(metrics.total_trades, 2);
        assert_eq!(metrics.winning_trades, 1);
        assert_eq!(metrics.losing_trades, 1);
        assert_relative_eq!(metrics.win_rate, 50.0);
        assert_relative_eq!(metrics.profit_factor, 5.0 / 3.0);
        assert_relative_eq!(metrics.average_win, 1.0);
        assert_relative_eq!(metrics.average_loss, -0.5);
    }

    #[test]
    fn profit_factor_zero_without_losses() {
        let rows = vec![row(1, "5", "0", "1.0"), row(2, "8", "0", "2.0")];
        let metrics = calculate(&rows).0.unwrap();
        assert_eq!(metrics.losing_trades, 0);
        assert_eq!(metrics.profit_factor, 0.0);
        assert_eq!(metrics.average_loss, 0.0);
    }

    #[test]
    fn negative_loss_value_is_not_a_losing_trade() {
        let rows = vec![row(1, "6", "0", "1.0"), row(2, "0", "-2", "-1.0")];
        let metrics = calculate(&rows).0.unwrap();
        assert_eq!(metrics.losing_trades, 0);
        assert_eq!(metrics.profit_factor, 0.0);
    }

    #[test]
    fn trade_counted_as_both_win_and_loss() {
        let rows = vec![row(1, "4", "2", "1.0"), row(2, "0", "0", "0.0")];
        let metrics = calculate(&rows).0.unwrap();
        assert_eq!(metrics.winning_trades, 1);
        assert_eq!(metrics.losing_trades, 1);
        assert_relative_eq!(metrics.win_rate, 50.0);
        assert_relative_eq!(metrics.profit_factor, 2.0);
    }

    #[test]
    fn sharpe_zero_for_identical_returns() {
        let rows = vec![
            row(1, "1", "0", "0.1"),
            row(2, "1", "0", "0.1"),
            row(3, "1", "0", "0.1"),
        ];
        let metrics = calculate(&rows).0.unwrap();
        assert_eq!(metrics.sharpe_ratio, 0.0);
    }

    #[test]
    fn sharpe_zero_for_single_return() {
        let metrics = calculate(&[row(1, "1", "0", "2.0")]).0.unwrap();
        assert_eq!(metrics.sharpe_ratio, 0.0);
        assert_relative_eq!(metrics.average_return, 2.0);
    }

    #[test]
    fn sharpe_uses_sample_stddev() {
        let rows = vec![
            row(1, "2", "0", "2.0"),
            row(2, "0", "1", "-1.0"),
            row(3, "3", "0", "3.0"),
        ];
        let metrics = calculate(&rows).0.unwrap();
        // mean 4/3, sample variance 13/3
        let expected = (4.0 / 3.0) / (13.0_f64 / 3.0).sqrt() * 252.0_f64.sqrt();
        assert_relative_eq!(metrics.sharpe_ratio, expected, epsilon = 1e-12);
    }

    #[test]
    fn non_numeric_return_is_excluded_but_kept() {
        let rows = vec![
            row(1, "2", "0", "2.0"),
            row(2, "0", "1", "N/A"),
            row(3, "3", "0", "4.0"),
        ];
        let (metrics, trades) = calculate(&rows);
        let metrics = metrics.unwrap();

        assert_eq!(trades.len(), 3);
        assert_eq!(trades[1].return_percent, None);
        assert_eq!(trades[1].cumulative_return, None);
        assert_eq!(trades[1].drawdown, None);
        assert_eq!(trades[2].cumulative_return, Some(6.0));

        assert_eq!(metrics.total_trades, 3);
        assert_relative_eq!(metrics.average_return, 3.0);
        assert_relative_eq!(metrics.net_return, 6.0);
        // the losing trade has no usable return
        assert_eq!(metrics.average_loss, 0.0);
    }

    #[test]
    fn all_returns_missing_degrades_to_zero() {
        let rows = vec![row(1, "2", "0", "x"), row(2, "0", "1", "")];
        let metrics = calculate(&rows).0.unwrap();
        assert_eq!(metrics.average_return, 0.0);
        assert_eq!(metrics.net_return, 0.0);
        assert_eq!(metrics.max_drawdown, 0.0);
        assert_eq!(metrics.sharpe_ratio, 0.0);
    }

    #[test]
    fn average_risk_reward_ignores_missing() {
        let mut rows = vec![row(1, "1", "0", "1"), row(2, "1", "0", "1"), row(3, "1", "0", "1")];
        rows[0].risk_reward_ratio = Some("1.5".into());
        rows[1].risk_reward_ratio = Some("n/a".into());
        rows[2].risk_reward_ratio = Some("2.5".into());
        let metrics = calculate(&rows).0.unwrap();
        assert_relative_eq!(metrics.average_risk_reward_ratio, 2.0);
    }

    #[test]
    fn max_drawdown_after_new_peak() {
        let rows = vec![
            row(1, "0", "0", "5"),
            row(2, "0", "0", "-2"),
            row(3, "0", "0", "4"),
            row(4, "0", "0", "-6"),
            row(5, "0", "0", "1"),
        ];
        let (metrics, trades) = calculate(&rows);
        let drawdown: Vec<f64> = trades.iter().map(|t| t.drawdown.unwrap()).collect();
        assert_eq!(drawdown, vec![0.0, 2.0, 0.0, 6.0, 5.0]);
        assert_relative_eq!(metrics.unwrap().max_drawdown, 6.0);
    }

    #[test]
    fn serializes_camel_case_keys() {
        let metrics = calculate(&[row(1, "5", "0", "1.0")]).0.unwrap();
        let value = serde_json::to_value(&metrics).unwrap();
        for key in [
            "totalTrades",
            "winningTrades",
            "losingTrades",
            "winRate",
            "averageReturn",
            "averageWin",
            "averageLoss",
            "profitFactor",
            "averageRiskRewardRatio",
            "maxDrawdown",
            "netReturn",
            "sharpeRatio",
        ] {
            assert!(value.get(key).is_some(), "missing key {key}");
        }
    }

    #[test]
    fn summary_lines_format() {
        let rows = vec![row(1, "5", "0", "1.0"), row(2, "0", "3", "-0.5")];
        let lines = calculate(&rows).0.unwrap().summary_lines();
        assert_eq!(lines[0], "Total trades:     2");
        assert_eq!(lines[1], "Win rate:         50.00% (1 won, 1 lost)");
        assert_eq!(lines[2], "Net return:       0.50%");
    }
}
