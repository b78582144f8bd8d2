//! SVG equity-curve chart adapter implementing ChartPort.
//!
//! Draws cumulative return against trade date: title, axis titles, a light
//! grid, Y tick labels, date tick labels spaced evenly in time, a zero
//! reference line and the curve itself.

use std::fs;
use std::path::Path;

use chrono::{NaiveDateTime, TimeDelta};
use tracing::info;

use crate::domain::error::TradestatsError;
use crate::domain::trade::ProcessedTrade;
use crate::ports::report_port::{ChartOutcome, ChartPort};

const CHART_WIDTH: f64 = 1200.0;
const CHART_HEIGHT: f64 = 600.0;
const MARGIN_LEFT: f64 = 90.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 100.0;
const Y_TICKS: usize = 5;
const X_TICKS: usize = 6;

pub struct SvgChartAdapter;

impl SvgChartAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SvgChartAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// (date, cumulative return) for every trade that has both.
pub fn equity_points(trades: &[ProcessedTrade]) -> Vec<(NaiveDateTime, f64)> {
    trades
        .iter()
        .filter_map(|t| Some((t.date?, t.cumulative_return?)))
        .collect()
}

/// Render the chart; empty input renders nothing.
pub fn generate_equity_svg(points: &[(NaiveDateTime, f64)]) -> String {
    if points.is_empty() {
        return String::new();
    }

    // The zero line is always inside the plotted range.
    let min_value = points.iter().map(|p| p.1).fold(0.0_f64, f64::min);
    let max_value = points.iter().map(|p| p.1).fold(0.0_f64, f64::max);
    let (low, high) = if max_value > min_value {
        let pad = (max_value - min_value) * 0.05;
        (min_value - pad, max_value + pad)
    } else {
        (-1.0, 1.0)
    };
    let span = high - low;

    let first_date = points.iter().map(|p| p.0).min().unwrap_or(points[0].0);
    let last_date = points.iter().map(|p| p.0).max().unwrap_or(points[0].0);
    let seconds = (last_date - first_date).num_seconds();

    let plot_width = CHART_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_height = CHART_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let plot_bottom = MARGIN_TOP + plot_height;

    let x_scale = |t: NaiveDateTime| -> f64 {
        if seconds > 0 {
            MARGIN_LEFT + ((t - first_date).num_seconds() as f64 / seconds as f64) * plot_width
        } else {
            MARGIN_LEFT + plot_width / 2.0
        }
    };
    let y_scale = |v: f64| -> f64 { MARGIN_TOP + plot_height - ((v - low) / span) * plot_height };

    let mut svg = String::new();
    svg.push_str(&format!(
        r##"<svg width="{}" height="{}" viewBox="0 0 {} {}" xmlns="http://www.w3.org/2000/svg" font-family="sans-serif">"##,
        CHART_WIDTH, CHART_HEIGHT, CHART_WIDTH, CHART_HEIGHT
    ));
    svg.push_str("\n  <rect width=\"100%\" height=\"100%\" fill=\"white\"/>\n");
    svg.push_str(&format!(
        "  <text x=\"{:.1}\" y=\"30\" text-anchor=\"middle\" font-size=\"18\" fill=\"#111\">Equity Curve</text>\n",
        MARGIN_LEFT + plot_width / 2.0
    ));

    // Horizontal grid and Y tick labels
    for i in 0..Y_TICKS {
        let value = low + span * i as f64 / (Y_TICKS - 1) as f64;
        let y = y_scale(value);
        svg.push_str(&format!(
            "  <line x1=\"{:.1}\" y1=\"{:.1}\" x2=\"{:.1}\" y2=\"{:.1}\" stroke=\"#e5e7eb\" stroke-width=\"1\"/>\n",
            MARGIN_LEFT,
            y,
            MARGIN_LEFT + plot_width,
            y
        ));
        svg.push_str(&format!(
            "  <text x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"end\" font-size=\"11\" fill=\"#666\">{:.2}</text>\n",
            MARGIN_LEFT - 8.0,
            y + 4.0,
            value
        ));
    }

    // Vertical grid and date labels
    let date_ticks: Vec<NaiveDateTime> = if seconds > 0 {
        (0..X_TICKS)
            .map(|i| {
                let offset = seconds * i as i64 / (X_TICKS - 1) as i64;
                first_date + TimeDelta::seconds(offset)
            })
            .collect()
    } else {
        vec![first_date]
    };
    for tick in &date_ticks {
        let x = x_scale(*tick);
        svg.push_str(&format!(
            "  <line x1=\"{:.1}\" y1=\"{:.1}\" x2=\"{:.1}\" y2=\"{:.1}\" stroke=\"#e5e7eb\" stroke-width=\"1\"/>\n",
            x, MARGIN_TOP, x, plot_bottom
        ));
        svg.push_str(&format!(
            "  <text x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"end\" font-size=\"11\" fill=\"#666\" transform=\"rotate(-30 {:.1} {:.1})\">{}</text>\n",
            x,
            plot_bottom + 18.0,
            x,
            plot_bottom + 18.0,
            tick.format("%Y-%m-%d")
        ));
    }

    // Axes
    svg.push_str(&format!(
        "  <line x1=\"{:.1}\" y1=\"{:.1}\" x2=\"{:.1}\" y2=\"{:.1}\" stroke=\"#999\" stroke-width=\"1\"/>\n",
        MARGIN_LEFT, MARGIN_TOP, MARGIN_LEFT, plot_bottom
    ));
    svg.push_str(&format!(
        "  <line x1=\"{:.1}\" y1=\"{:.1}\" x2=\"{:.1}\" y2=\"{:.1}\" stroke=\"#999\" stroke-width=\"1\"/>\n",
        MARGIN_LEFT,
        plot_bottom,
        MARGIN_LEFT + plot_width,
        plot_bottom
    ));
    svg.push_str(&format!(
        "  <text x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"middle\" font-size=\"13\" fill=\"#333\">Date</text>\n",
        MARGIN_LEFT + plot_width / 2.0,
        CHART_HEIGHT - 12.0
    ));
    svg.push_str(&format!(
        "  <text x=\"20\" y=\"{:.1}\" text-anchor=\"middle\" font-size=\"13\" fill=\"#333\" transform=\"rotate(-90 20 {:.1})\">Cumulative Return</text>\n",
        MARGIN_TOP + plot_height / 2.0,
        MARGIN_TOP + plot_height / 2.0
    ));

    // Zero reference line
    let zero_y = y_scale(0.0);
    svg.push_str(&format!(
        "  <line class=\"zero-line\" x1=\"{:.1}\" y1=\"{:.1}\" x2=\"{:.1}\" y2=\"{:.1}\" stroke=\"red\" stroke-opacity=\"0.3\" stroke-width=\"1\"/>\n",
        MARGIN_LEFT,
        zero_y,
        MARGIN_LEFT + plot_width,
        zero_y
    ));

    let mut path_data = String::new();
    for (i, (date, value)) in points.iter().enumerate() {
        let x = x_scale(*date);
        let y = y_scale(*value);
        if i == 0 {
            path_data.push_str(&format!("M {:.1} {:.1}", x, y));
        } else {
            path_data.push_str(&format!(" L {:.1} {:.1}", x, y));
        }
    }
    svg.push_str(&format!(
        "  <path class=\"equity\" d=\"{}\" fill=\"none\" stroke=\"#2563eb\" stroke-width=\"2\"/>\n",
        path_data
    ));
    if points.len() == 1 {
        svg.push_str(&format!(
            "  <circle cx=\"{:.1}\" cy=\"{:.1}\" r=\"3\" fill=\"#2563eb\"/>\n",
            x_scale(points[0].0),
            y_scale(points[0].1)
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

impl ChartPort for SvgChartAdapter {
    fn render_equity_curve(
        &self,
        trades: &[ProcessedTrade],
        output_path: &Path,
    ) -> Result<ChartOutcome, TradestatsError> {
        if trades.is_empty() {
            info!("no trades data to plot");
            return Ok(ChartOutcome::NoData);
        }

        let points = equity_points(trades);
        if points.is_empty() {
            info!("no trade has both a date and a cumulative return; nothing to plot");
            return Ok(ChartOutcome::NoData);
        }

        let svg = generate_equity_svg(&points);

        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(output_path, svg)?;

        info!(path = %output_path.display(), points = points.len(), "equity curve saved");
        Ok(ChartOutcome::Written)
    }
}
