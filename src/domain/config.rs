//! Typed run configuration.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_TRADE_TYPE: &str = "REAL";
pub const DEFAULT_LOOKBACK_DAYS: i64 = 60;
pub const DEFAULT_CHART_PATH: &str = "public/equity_curve.svg";
pub const DEFAULT_METRICS_PATH: &str = "public/trade_metrics.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Postgres,
    Sqlite,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Backend::Postgres),
            "sqlite" => Ok(Backend::Sqlite),
            other => Err(format!("unknown backend '{other}' (expected postgres or sqlite)")),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Postgres => write!(f, "postgres"),
            Backend::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// Connection parameters for the trade store.
#[derive(Clone, PartialEq)]
pub struct DatabaseConfig {
    pub backend: Backend,
    /// Full libpq-style connection string; takes precedence over the fields below.
    pub connection_string: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub dbname: String,
    pub sqlite_path: Option<PathBuf>,
    /// No bound when unset.
    pub connect_timeout: Option<Duration>,
    /// No bound when unset.
    pub statement_timeout: Option<Duration>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            backend: Backend::Postgres,
            connection_string: None,
            host: "localhost".into(),
            port: 5432,
            user: "postgres".into(),
            password: None,
            dbname: "PallasDB".into(),
            sqlite_path: None,
            connect_timeout: None,
            statement_timeout: None,
        }
    }
}

// Hand-written so the password never reaches the logs.
impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("backend", &self.backend)
            .field(
                "connection_string",
                &self.connection_string.as_ref().map(|_| "<redacted>"),
            )
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("dbname", &self.dbname)
            .field("sqlite_path", &self.sqlite_path)
            .field("connect_timeout", &self.connect_timeout)
            .field("statement_timeout", &self.statement_timeout)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryConfig {
    pub trade_type: String,
    pub lookback_days: i64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        QueryConfig {
            trade_type: DEFAULT_TRADE_TYPE.into(),
            lookback_days: DEFAULT_LOOKBACK_DAYS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputConfig {
    pub chart_path: PathBuf,
    pub metrics_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            chart_path: PathBuf::from(DEFAULT_CHART_PATH),
            metrics_path: PathBuf::from(DEFAULT_METRICS_PATH),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub query: QueryConfig,
    pub output: OutputConfig,
}
