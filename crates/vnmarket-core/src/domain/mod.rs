//! # Canonical Schema
//!
//! Provider-independent record shapes returned by every adapter.
//!
//! ## Models
//!
//! | Type | Description |
//! |------|-------------|
//! | [`PriceBar`] | Daily OHLCV bar |
//! | [`IntradayTick`] | Matched trade from the intraday tape |
//! | [`DepthLevel`] | One ranked order-book level |
//! | [`SymbolListing`] | Symbol directory entry |
//! | [`IndustryGroup`] | Industry classification node |
//! | [`FinancialStatementLine`] | One line item for one reporting period |
//! | [`CompanyProfile`] | Company metadata with shareholders, events and dividends |
//! | [`PriceBoardRow`] | Live board snapshot |
//! | [`RatioComparisonLine`] | One ratio for a company, a peer or the industry |
//! | [`TopMover`] | Ranked market mover |
//! | [`ForeignTradeRow`] | Foreign investor flows for one symbol |
//! | [`MarketIndex`] | Latest index level |
//!
//! ## Validation
//!
//! Constructors enforce record invariants up front, so adapters drop or
//! reject bad provider rows instead of passing them through:
//!
//! ```rust
//! use time::macros::date;
//! use vnmarket_core::{PriceBar, Symbol, ValidationError};
//!
//! let symbol = Symbol::parse("VCB").unwrap();
//! let bad = PriceBar::new(symbol, date!(2024 - 01 - 02), 90.0, 85.0, 88.0, 89.0, 1_000);
//! assert!(matches!(bad, Err(ValidationError::InvalidBarRange)));
//! ```
//!
//! All timestamps are exchange-local (UTC+7); see [`timestamp`].

mod interval;
mod market;
mod models;
mod symbol;
pub mod timestamp;

pub use interval::Interval;
pub use market::{
    BoardScope, ForeignTradeCriterion, ForeignTradeRow, MarketIndex, MarketScope, MoverKind,
    TimeRange, TopMover,
};
pub use models::{
    validate_currency_code, BookSide, CompanyEvent, CompanyProfile, ComparisonSubject,
    DepthLevel, Dividend, DividendKind, Exchange, FinancialStatementLine, Frequency,
    IndustryGroup, IntradayTick, Language, ListingStatus, Period, PriceBar, PriceBoardRow,
    RatioComparisonLine, Shareholder, StatementType, SymbolListing, TradeSide,
};
pub use symbol::Symbol;
