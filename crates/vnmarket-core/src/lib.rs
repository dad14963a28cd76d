//! # vnmarket-core
//!
//! Multi-provider data layer for the Vietnamese stock market.
//!
//! ## Overview
//!
//! Callers pick a data source by name (`"ssi"`, `"vnd"`) and get the same
//! canonical records back whichever provider serves them:
//!
//! - **Provider adapters** translate canonical requests into provider calls
//!   and provider payloads (JSON or spreadsheet reports) into canonical rows
//! - **Canonical schema** for bars, ticks, depth, listings, statements,
//!   company profiles and price-board rows
//! - **Source registry** resolving case-insensitive source ids to shared
//!   adapter instances and checking capabilities before dispatch
//! - **Domain façades** (`Quote`, `Listing`, `Finance`, `Company`, `Trading`)
//!   and the aggregate [`Stock`]
//!
//! ## Feature Flags
//!
//! | Flag | Description |
//! |------|-------------|
//! | `default` | Enables `xlsx` |
//! | `xlsx` | Decodes statement workbooks with calamine |
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | SSI and VNDIRECT adapters |
//! | [`config`] | Immutable endpoint/header/retry configuration |
//! | [`data_source`] | Adapter trait, requests, `Batch`, `SourceError` |
//! | [`domain`] | Canonical schema |
//! | [`error`] | Validation and core error types |
//! | [`facade`] | Domain façades |
//! | [`http_client`] | HTTP transport seam |
//! | [`normalize`] | Shared raw-row helpers |
//! | [`registry`] | Source registry and builder |
//! | [`retry`] | Backoff and bounded retry |
//! | [`source`] | Provider identifiers |
//! | [`workbook`] | Spreadsheet seam and header detection |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vnmarket_core::{Interval, SourceRegistryBuilder, Stock};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = Arc::new(SourceRegistryBuilder::from_env()?.build());
//!     let stock = Stock::new(registry, "vnd", "VCB")?;
//!
//!     let bars = stock.quote().history(None, None, Interval::OneDay).await?;
//!     for warning in &bars.warnings {
//!         eprintln!("warning: {warning}");
//!     }
//!     if let Some(last) = bars.items.last() {
//!         println!("VCB close on {}: {}", last.date, last.close);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │ Stock / Façades      │
//! └──────────┬───────────┘
//!            │ source id
//!            ▼
//! ┌──────────────────────┐
//! │ Source Registry      │  capability check
//! └──────────┬───────────┘
//!            │
//!            ▼
//! ┌──────────────────────┐     ┌──────────────────┐
//! │ DataSource adapter   │────▶│ HttpClient       │
//! │ (SSI / VND)          │     │ + retry/backoff  │
//! └──────────┬───────────┘     └──────────────────┘
//!            │ JSON / workbook
//!            ▼
//! ┌──────────────────────┐
//! │ Canonical schema     │
//! └──────────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Failures carry a [`SourceErrorKind`]; an empty result for a valid request
//! is not an error but a [`Batch`] with a [`DataWarning::DataUnavailable`]:
//!
//! ```rust
//! use vnmarket_core::{SourceError, SourceErrorKind};
//!
//! fn describe(error: &SourceError) -> &'static str {
//!     match error.kind() {
//!         SourceErrorKind::Transport(failure) if failure.is_transient() => "try again later",
//!         SourceErrorKind::UnknownSource
//!         | SourceErrorKind::UnsupportedOperation
//!         | SourceErrorKind::UnsupportedInterval => "pick another source",
//!         SourceErrorKind::AdapterParse | SourceErrorKind::ReportFormat => "provider changed format",
//!         _ => "request failed",
//!     }
//! }
//! ```

pub mod adapters;
pub mod config;
pub mod data_source;
pub mod domain;
pub mod error;
pub mod facade;
pub mod http_client;
pub mod normalize;
pub mod registry;
pub mod retry;
pub mod source;
pub mod workbook;

// Adapter implementations
pub use adapters::{SsiAdapter, VndAdapter};

// Configuration
pub use config::{ProviderConfig, ProviderEndpoints, RegistryConfig};

// Data source trait and types
pub use data_source::{
    Batch, CapabilitySet, DataSource, DataWarning, ForeignTradeRequest, HistoryRequest,
    IntradayRequest, Operation, PriceBoardRequest, RatioComparisonRequest, SourceError,
    SourceErrorKind, StatementRequest, TopMoverRequest, TransportFailure,
};

// Domain models
pub use domain::{
    BoardScope, BookSide, CompanyEvent, CompanyProfile, ComparisonSubject, DepthLevel, Dividend,
    DividendKind, Exchange, FinancialStatementLine, ForeignTradeCriterion, ForeignTradeRow,
    Frequency, IndustryGroup, Interval, IntradayTick, Language, ListingStatus, MarketIndex,
    MarketScope, MoverKind, Period, PriceBar, PriceBoardRow, RatioComparisonLine, Shareholder,
    StatementType, Symbol, SymbolListing, TimeRange, TopMover, TradeSide,
};

// Error types
pub use error::{CoreError, ValidationError};

// Façades
pub use facade::{Company, Finance, HistoryOptions, Listing, Quote, Stock, Trading};

// HTTP client types
pub use http_client::{
    HttpClient, HttpError, HttpErrorKind, HttpMethod, HttpRequest, HttpResponse,
    ReqwestHttpClient,
};

// Registry
pub use registry::{SourceRegistry, SourceRegistryBuilder};

// Retry logic
pub use retry::{Backoff, RetryConfig};

// Source identifiers
pub use source::ProviderId;

// Workbook seam
pub use workbook::{Cell, Sheet, WorkbookDecoder, WorkbookError};
#[cfg(feature = "xlsx")]
pub use workbook::XlsxWorkbookDecoder;
