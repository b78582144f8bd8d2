//! Domain error types.

/// Top-level error type for tradestats.
#[derive(Debug, thiserror::Error)]
pub enum TradestatsError {
    #[error("cannot connect to trade store: {reason}")]
    Connection { reason: String },

    #[error("trade query failed: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TradestatsError {
    /// Fatal errors abort the run; everything else degrades to partial output.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TradestatsError::Connection { .. }
                | TradestatsError::ConfigParse { .. }
                | TradestatsError::ConfigMissing { .. }
                | TradestatsError::ConfigInvalid { .. }
        )
    }
}

impl From<&TradestatsError> for std::process::ExitCode {
    fn from(err: &TradestatsError) -> Self {
        let code: u8 = match err {
            TradestatsError::Io(_) | TradestatsError::Serialize(_) => 1,
            TradestatsError::ConfigParse { .. }
            | TradestatsError::ConfigMissing { .. }
            | TradestatsError::ConfigInvalid { .. } => 2,
            TradestatsError::Connection { .. } | TradestatsError::DatabaseQuery { .. } => 3,
        };
        std::process::ExitCode::from(code)
    }
}
