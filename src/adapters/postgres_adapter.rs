//! PostgreSQL trade store adapter.

use crate::domain::config::DatabaseConfig;
use crate::domain::error::TradestatsError;
use crate::domain::trade::{TradeFilter, TradeRow, TRADE_CLASSIFICATION};
use crate::ports::trade_port::TradePort;
use chrono::NaiveDateTime;
use postgres::types::ToSql;
use postgres::{Client, Config, NoTls, Row};
use std::cell::RefCell;
use tracing::{debug, info};

// Numeric columns come back as text; coercion is the calculator's job.
const TRADES_QUERY: &str = "SELECT id::text, date::timestamp, type::text, side::text, \
                                   profit::text, loss::text, risk_reward_ratio::text, \
                                   return_percent::text, take_profit::text, stop_loss::text, \
                                   entry::text, data::text \
                            FROM trades \
                            WHERE data = $1 \
                              AND ($2::text IS NULL OR type = $2::text) \
                              AND ($3::timestamp IS NULL OR date::timestamp >= $3::timestamp) \
                            ORDER BY date ASC";

pub struct PostgresAdapter {
    client: RefCell<Client>,
}

impl PostgresAdapter {
    pub fn connect(config: &DatabaseConfig) -> Result<Self, TradestatsError> {
        let pg_config = build_pg_config(config)?;

        let mut client = pg_config
            .connect(NoTls)
            .map_err(|e| TradestatsError::Connection {
                reason: e.to_string(),
            })?;

        if let Some(timeout) = config.statement_timeout {
            client
                .batch_execute(&format!("SET statement_timeout = {}", timeout.as_millis()))
                .map_err(|e| TradestatsError::Connection {
                    reason: format!("failed to set statement timeout: {e}"),
                })?;
        }

        info!(
            host = %config.host,
            dbname = %config.dbname,
            "database connection established"
        );

        Ok(Self {
            client: RefCell::new(client),
        })
    }
}

fn build_pg_config(config: &DatabaseConfig) -> Result<Config, TradestatsError> {
    let mut pg_config = match &config.connection_string {
        Some(conninfo) => conninfo
            .parse::<Config>()
            .map_err(|e| TradestatsError::ConfigInvalid {
                section: "database".into(),
                key: "connection_string".into(),
                reason: e.to_string(),
            })?,
        None => {
            let mut pg_config = Config::new();
            pg_config
                .host(&config.host)
                .port(config.port)
                .user(&config.user)
                .dbname(&config.dbname);
            if let Some(password) = &config.password {
                pg_config.password(password);
            }
            pg_config
        }
    };

    if let Some(timeout) = config.connect_timeout {
        pg_config.connect_timeout(timeout);
    }

    Ok(pg_config)
}

fn trade_from_row(row: &Row) -> TradeRow {
    TradeRow {
        id: row.get::<_, Option<String>>(0).unwrap_or_default(),
        date: row.get::<_, Option<NaiveDateTime>>(1),
        trade_type: row.get(2),
        side: row.get(3),
        profit: row.get(4),
        loss: row.get(5),
        risk_reward_ratio: row.get(6),
        return_percent: row.get(7),
        take_profit: row.get(8),
        stop_loss: row.get(9),
        entry: row.get(10),
        data: row.get(11),
    }
}

impl TradePort for PostgresAdapter {
    fn fetch_trades(&self, filter: &TradeFilter) -> Result<Vec<TradeRow>, TradestatsError> {
        debug!(%filter, "querying trades");

        let params: &[&(dyn ToSql + Sync)] =
            &[&TRADE_CLASSIFICATION, &filter.trade_type, &filter.since];
        let rows = self
            .client
            .borrow_mut()
            .query(TRADES_QUERY, params)
            .map_err(|e| TradestatsError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        Ok(rows.iter().map(trade_from_row).collect())
    }
}
