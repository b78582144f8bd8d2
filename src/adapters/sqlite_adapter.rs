//! SQLite trade store adapter.
//!
//! Serves local trade databases and in-memory stores for tests. Columns are
//! read through SQLite's dynamic values so text in a numeric column survives
//! until coercion.

use crate::domain::config::DatabaseConfig;
use crate::domain::error::TradestatsError;
use crate::domain::trade::{TradeFilter, TradeRow, TRADE_CLASSIFICATION};
use crate::ports::trade_port::TradePort;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Value;
use rusqlite::{params, OpenFlags};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteAdapter {
    /// Open an existing database file. A missing file is a connection error.
    pub fn from_config(config: &DatabaseConfig) -> Result<Self, TradestatsError> {
        let path = config
            .sqlite_path
            .as_ref()
            .ok_or_else(|| TradestatsError::ConfigMissing {
                section: "sqlite".into(),
                key: "path".into(),
            })?;

        if !path.is_file() {
            return Err(TradestatsError::Connection {
                reason: format!("database file not found: {}", path.display()),
            });
        }

        let manager = SqliteConnectionManager::file(path).with_flags(
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        );
        let adapter = Self::build(manager, config.connect_timeout, config.statement_timeout)?;
        info!(path = %path.display(), "database connection established");
        Ok(adapter)
    }

    /// Open a database file, creating it if needed.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, TradestatsError> {
        Self::build(SqliteConnectionManager::file(path), None, None)
    }

    pub fn in_memory() -> Result<Self, TradestatsError> {
        Self::build(SqliteConnectionManager::memory(), None, None)
    }

    fn build(
        manager: SqliteConnectionManager,
        connect_timeout: Option<Duration>,
        busy_timeout: Option<Duration>,
    ) -> Result<Self, TradestatsError> {
        let manager = match busy_timeout {
            Some(timeout) => manager.with_init(move |conn| conn.busy_timeout(timeout)),
            None => manager,
        };

        // One connection: in-memory databases are private to their connection.
        let mut builder = Pool::builder().max_size(1);
        if let Some(timeout) = connect_timeout {
            builder = builder.connection_timeout(timeout);
        }

        let pool = builder
            .build(manager)
            .map_err(|e: r2d2::Error| TradestatsError::Connection {
                reason: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    fn connection(
        &self,
    ) -> Result<r2d2::PooledConnection<SqliteConnectionManager>, TradestatsError> {
        self.pool
            .get()
            .map_err(|e: r2d2::Error| TradestatsError::Connection {
                reason: e.to_string(),
            })
    }

    pub fn initialize_schema(&self) -> Result<(), TradestatsError> {
        let conn = self.connection()?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS trades (
                id TEXT NOT NULL PRIMARY KEY,
                date TEXT,
                type TEXT,
                side TEXT,
                profit REAL,
                loss REAL,
                risk_reward_ratio REAL,
                return_percent REAL,
                take_profit REAL,
                stop_loss REAL,
                entry REAL,
                data TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_trades_type_date ON trades(type, date);",
        )
        .map_err(|e: rusqlite::Error| TradestatsError::DatabaseQuery {
            reason: e.to_string(),
        })?;

        Ok(())
    }

    pub fn insert_trades(&self, trades: &[TradeRow]) -> Result<(), TradestatsError> {
        let mut conn = self.connection()?;

        let tx = conn
            .transaction()
            .map_err(|e: rusqlite::Error| TradestatsError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        for trade in trades {
            tx.execute(
                "INSERT OR REPLACE INTO trades (id, date, type, side, profit, loss,
                     risk_reward_ratio, return_percent, take_profit, stop_loss, entry, data)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    trade.id,
                    trade.date.map(|d| d.format(DATE_FORMAT).to_string()),
                    trade.trade_type,
                    trade.side,
                    trade.profit,
                    trade.loss,
                    trade.risk_reward_ratio,
                    trade.return_percent,
                    trade.take_profit,
                    trade.stop_loss,
                    trade.entry,
                    trade.data,
                ],
            )
            .map_err(|e: rusqlite::Error| TradestatsError::DatabaseQuery {
                reason: e.to_string(),
            })?;
        }

        tx.commit()
            .map_err(|e: rusqlite::Error| TradestatsError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        Ok(())
    }
}

/// Render any SQLite value as text; blobs and NULL are missing.
fn value_text(value: Value) -> Option<String> {
    match value {
        Value::Null | Value::Blob(_) => None,
        Value::Integer(i) => Some(i.to_string()),
        Value::Real(r) => Some(r.to_string()),
        Value::Text(s) => Some(s),
    }
}

fn parse_date_text(text: &str) -> Option<NaiveDateTime> {
    const DATETIME_FORMATS: [&str; 4] = [
        DATE_FORMAT,
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];

    let text = text.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

impl TradePort for SqliteAdapter {
    fn fetch_trades(&self, filter: &TradeFilter) -> Result<Vec<TradeRow>, TradestatsError> {
        debug!(%filter, "querying trades");
        let conn = self.connection()?;

        // julianday() normalises the ISO variants the store may hold.
        let query = "SELECT id, date, type, side, profit, loss, risk_reward_ratio,
                            return_percent, take_profit, stop_loss, entry, data
                     FROM trades
                     WHERE data = ?1
                       AND (?2 IS NULL OR type = ?2)
                       AND (?3 IS NULL OR julianday(date) >= julianday(?3))
                     ORDER BY julianday(date) ASC";

        let mut stmt =
            conn.prepare(query)
                .map_err(|e: rusqlite::Error| TradestatsError::DatabaseQuery {
                    reason: e.to_string(),
                })?;

        let since = filter.since.map(|d| d.format(DATE_FORMAT).to_string());
        let rows = stmt
            .query_map(
                params![TRADE_CLASSIFICATION, filter.trade_type, since],
                |row| {
                    let text = |idx: usize| -> rusqlite::Result<Option<String>> {
                        row.get::<_, Value>(idx).map(value_text)
                    };
                    Ok(TradeRow {
                        id: text(0)?.unwrap_or_default(),
                        date: text(1)?.as_deref().and_then(parse_date_text),
                        trade_type: text(2)?,
                        side: text(3)?,
                        profit: text(4)?,
                        loss: text(5)?,
                        risk_reward_ratio: text(6)?,
                        return_percent: text(7)?,
                        take_profit: text(8)?,
                        stop_loss: text(9)?,
                        entry: text(10)?,
                        data: text(11)?,
                    })
                },
            )
            .map_err(|e: rusqlite::Error| TradestatsError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        let mut trades = Vec::new();
        for row in rows {
            trades.push(
                row.map_err(|e: rusqlite::Error| TradestatsError::DatabaseQuery {
                    reason: e.to_string(),
                })?,
            );
        }

        Ok(trades)
    }
}
