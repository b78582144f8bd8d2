#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tradestats::domain::error::TradestatsError;
use tradestats::domain::trade::{TradeFilter, TradeRow};
use tradestats::ports::trade_port::TradePort;

/// In-memory trade source that records its queries and its release.
pub struct MockTradePort {
    pub rows: Vec<TradeRow>,
    pub error: Option<String>,
    pub connection_lost: bool,
    pub queries: Rc<RefCell<Vec<TradeFilter>>>,
    pub released: Rc<Cell<bool>>,
}

impl MockTradePort {
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            error: None,
            connection_lost: false,
            queries: Rc::new(RefCell::new(Vec::new())),
            released: Rc::new(Cell::new(false)),
        }
    }

    pub fn with_rows(mut self, rows: Vec<TradeRow>) -> Self {
        self.rows = rows;
        self
    }

    pub fn with_error(mut self, reason: &str) -> Self {
        self.error = Some(reason.to_string());
        self
    }

    pub fn with_lost_connection(mut self) -> Self {
        self.connection_lost = true;
        self
    }
}

impl TradePort for MockTradePort {
    fn fetch_trades(&self, filter: &TradeFilter) -> Result<Vec<TradeRow>, TradestatsError> {
        self.queries.borrow_mut().push(filter.clone());
        if self.connection_lost {
            return Err(TradestatsError::Connection {
                reason: "server closed the connection unexpectedly".into(),
            });
        }
        if let Some(reason) = &self.error {
            return Err(TradestatsError::DatabaseQuery {
                reason: reason.clone(),
            });
        }
        Ok(self.rows.clone())
    }
}

impl Drop for MockTradePort {
    fn drop(&mut self) {
        self.released.set(true);
    }
}

pub fn datetime(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
}

pub fn make_row(id: &str, date: NaiveDateTime, profit: &str, loss: &str, ret: &str) -> TradeRow {
    TradeRow {
        id: id.to_string(),
        date: Some(date),
        trade_type: Some("REAL".to_string()),
        side: Some("LONG".to_string()),
        profit: Some(profit.to_string()),
        loss: Some(loss.to_string()),
        risk_reward_ratio: Some("2.0".to_string()),
        return_percent: Some(ret.to_string()),
        take_profit: Some("1.2".to_string()),
        stop_loss: Some("0.9".to_string()),
        entry: Some("1.0".to_string()),
        data: Some("Trade".to_string()),
    }
}

/// Three trades returning 2, -1 and 3 percent on consecutive days.
pub fn scenario_rows() -> Vec<TradeRow> {
    vec![
        make_row("1", datetime(2024, 1, 2), "2", "0", "2.0"),
        make_row("2", datetime(2024, 1, 3), "0", "1", "-1.0"),
        make_row("3", datetime(2024, 1, 4), "3", "0", "3.0"),
    ]
}
