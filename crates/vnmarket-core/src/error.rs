use thiserror::Error;

/// Validation and contract errors exposed by `vnmarket-core`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("invalid interval '{value}', expected one of 1m, 5m, 15m, 30m, 1H, 1D, 1W, 1M")]
    InvalidInterval { value: String },
    #[error("unknown source '{value}', expected one of ssi, vnd")]
    InvalidSource { value: String },
    #[error("invalid language '{value}', expected one of vi, en")]
    InvalidLanguage { value: String },
    #[error("invalid frequency '{value}', expected Quarterly or Yearly")]
    InvalidFrequency { value: String },
    #[error("invalid market scope '{value}', expected one of All, HOSE, HNX, UPCOM")]
    InvalidMarketScope { value: String },
    #[error("invalid mover kind '{value}', expected gainers, losers, value or volume")]
    InvalidMoverKind { value: String },

    #[error("date must be formatted as YYYY-MM-DD: '{value}'")]
    InvalidDate { value: String },
    #[error("start date {start} is after end date {end}")]
    InvertedDateRange { start: String, end: String },

    #[error("currency must be a 3-letter uppercase ISO code: '{value}'")]
    InvalidCurrency { value: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },

    #[error("bar high must be >= low")]
    InvalidBarRange,
    #[error("bar open/close must be within high/low range")]
    InvalidBarBounds,

    #[error("depth rank must be at least 1")]
    InvalidDepthRank,
    #[error("ranking position must be at least 1")]
    InvalidRank,
    #[error("quarter must be between 1 and 4, got {value}")]
    InvalidQuarter { value: u8 },
    #[error("ownership percentage must be within 0..=100, got {value}")]
    InvalidOwnership { value: f64 },
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid configuration value for {key}: '{value}'")]
    InvalidConfig { key: &'static str, value: String },
}
