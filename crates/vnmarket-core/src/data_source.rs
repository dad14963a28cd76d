//! Data source trait and request/response types.
//!
//! This module defines the adapter contract (`DataSource`) every provider
//! implements, the request payloads for each operation, the structured
//! [`SourceError`] taxonomy and the [`Batch`] wrapper that carries
//! non-fatal [`DataWarning`]s next to canonical records.
//!
//! # Operations
//!
//! | Operation | Request | Response |
//! |-----------|---------|----------|
//! | History | [`HistoryRequest`] | `Batch<PriceBar>` |
//! | Intraday | [`IntradayRequest`] | `Batch<IntradayTick>` |
//! | Depth | [`Symbol`] | `Batch<DepthLevel>` |
//! | Symbols | none | `Batch<SymbolListing>` |
//! | Industries | [`Language`] | `Batch<IndustryGroup>` |
//! | Statement | [`StatementRequest`] | `Batch<FinancialStatementLine>` |
//! | CompanyOverview | [`Symbol`] | [`CompanyProfile`] |
//! | PriceBoard | [`PriceBoardRequest`] | `Batch<PriceBoardRow>` |
//! | RatioComparison | [`RatioComparisonRequest`] | `Batch<RatioComparisonLine>` |
//! | TopMovers | [`TopMoverRequest`] | `Batch<TopMover>` |
//! | ForeignTrade | [`ForeignTradeRequest`] | `Batch<ForeignTradeRow>` |
//! | MarketIndices | none | `Batch<MarketIndex>` |

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::Serialize;
use time::Date;

use crate::{
    BoardScope, CompanyProfile, DepthLevel, FinancialStatementLine, ForeignTradeCriterion,
    ForeignTradeRow, Frequency, IndustryGroup, Interval, IntradayTick, Language, MarketIndex,
    MarketScope, MoverKind, PriceBar, PriceBoardRow, ProviderId, RatioComparisonLine,
    StatementType, Symbol, SymbolListing, TimeRange, TopMover, ValidationError,
};

/// Raw fragments attached to parse errors are cut to this many characters.
pub const MAX_FRAGMENT_CHARS: usize = 256;

/// Boxed future returned by every adapter operation.
pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SourceError>> + Send + 'a>>;

/// Logical operation used for capability checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    History,
    Intraday,
    Depth,
    Symbols,
    Industries,
    Statement,
    CompanyOverview,
    PriceBoard,
    RatioComparison,
    TopMovers,
    ForeignTrade,
    MarketIndices,
}

impl Operation {
    pub const ALL: [Self; 12] = [
        Self::History,
        Self::Intraday,
        Self::Depth,
        Self::Symbols,
        Self::Industries,
        Self::Statement,
        Self::CompanyOverview,
        Self::PriceBoard,
        Self::RatioComparison,
        Self::TopMovers,
        Self::ForeignTrade,
        Self::MarketIndices,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::History => "history",
            Self::Intraday => "intraday",
            Self::Depth => "depth",
            Self::Symbols => "symbols",
            Self::Industries => "industries",
            Self::Statement => "statement",
            Self::CompanyOverview => "company_overview",
            Self::PriceBoard => "price_board",
            Self::RatioComparison => "ratio_comparison",
            Self::TopMovers => "top_movers",
            Self::ForeignTrade => "foreign_trade",
            Self::MarketIndices => "market_indices",
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported operation matrix for a data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CapabilitySet {
    pub history: bool,
    pub intraday: bool,
    pub depth: bool,
    pub symbols: bool,
    pub industries: bool,
    pub statements: bool,
    pub company_overview: bool,
    pub price_board: bool,
    pub ratio_comparison: bool,
    pub top_movers: bool,
    pub foreign_trade: bool,
    pub market_indices: bool,
    /// Bar intervals `fetch_history` can serve. Daily is always present.
    pub history_intervals: &'static [Interval],
}

impl CapabilitySet {
    pub const fn daily_only() -> &'static [Interval] {
        &[Interval::OneDay]
    }

    pub const fn supports(self, operation: Operation) -> bool {
        match operation {
            Operation::History => self.history,
            Operation::Intraday => self.intraday,
            Operation::Depth => self.depth,
            Operation::Symbols => self.symbols,
            Operation::Industries => self.industries,
            Operation::Statement => self.statements,
            Operation::CompanyOverview => self.company_overview,
            Operation::PriceBoard => self.price_board,
            Operation::RatioComparison => self.ratio_comparison,
            Operation::TopMovers => self.top_movers,
            Operation::ForeignTrade => self.foreign_trade,
            Operation::MarketIndices => self.market_indices,
        }
    }

    pub fn supports_interval(self, interval: Interval) -> bool {
        self.history && self.history_intervals.contains(&interval)
    }

    pub fn supported_operations(self) -> Vec<&'static str> {
        Operation::ALL
            .into_iter()
            .filter(|operation| self.supports(*operation))
            .map(Operation::as_str)
            .collect()
    }
}

/// Transport failure class reported by the HTTP seam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case", tag = "failure", content = "status")]
pub enum TransportFailure {
    Timeout,
    Connection,
    /// Malformed request rejected before it reached the provider.
    Request,
    HttpStatus(u16),
}

impl TransportFailure {
    /// Timeouts, connection failures and 5xx responses may succeed on retry.
    pub const fn is_transient(self) -> bool {
        match self {
            Self::Timeout | Self::Connection => true,
            Self::Request => false,
            Self::HttpStatus(status) => status >= 500,
        }
    }
}

impl Display for TransportFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => f.write_str("timeout"),
            Self::Connection => f.write_str("connection"),
            Self::Request => f.write_str("malformed request"),
            Self::HttpStatus(status) => write!(f, "http status {status}"),
        }
    }
}

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceErrorKind {
    Transport(TransportFailure),
    UnknownSource,
    UnsupportedOperation,
    UnsupportedInterval,
    InvalidRequest,
    AdapterParse,
    ReportFormat,
    DataUnavailable,
}

/// Structured source error surfaced by adapters, the registry and façades.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    provider: Option<ProviderId>,
    message: String,
    retryable: bool,
    fragment: Option<String>,
}

impl SourceError {
    fn new(kind: SourceErrorKind, provider: Option<ProviderId>, message: String) -> Self {
        let retryable = match kind {
            SourceErrorKind::Transport(failure) => failure.is_transient(),
            _ => false,
        };
        Self {
            kind,
            provider,
            message,
            retryable,
            fragment: None,
        }
    }

    pub fn transport(
        provider: ProviderId,
        failure: TransportFailure,
        message: impl Into<String>,
    ) -> Self {
        Self::new(
            SourceErrorKind::Transport(failure),
            Some(provider),
            message.into(),
        )
    }

    pub fn unknown_source(source_id: &str) -> Self {
        Self::new(
            SourceErrorKind::UnknownSource,
            None,
            format!("no adapter registered for source '{}'", source_id.trim()),
        )
    }

    pub fn unsupported_operation(provider: ProviderId, operation: Operation) -> Self {
        Self::new(
            SourceErrorKind::UnsupportedOperation,
            Some(provider),
            format!("operation '{operation}' is not supported by source '{provider}'"),
        )
    }

    pub fn unsupported_interval(provider: ProviderId, interval: Interval) -> Self {
        Self::new(
            SourceErrorKind::UnsupportedInterval,
            Some(provider),
            format!("interval '{interval}' is not supported by source '{provider}'"),
        )
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::InvalidRequest, None, message.into())
    }

    /// Parse failure carrying the offending raw fragment.
    pub fn adapter_parse(
        provider: ProviderId,
        message: impl Into<String>,
        fragment: impl AsRef<str>,
    ) -> Self {
        let mut error = Self::new(SourceErrorKind::AdapterParse, Some(provider), message.into());
        error.fragment = Some(truncate_fragment(fragment.as_ref()));
        error
    }

    pub fn report_format(provider: ProviderId, message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::ReportFormat, Some(provider), message.into())
    }

    pub fn data_unavailable(provider: ProviderId, message: impl Into<String>) -> Self {
        Self::new(
            SourceErrorKind::DataUnavailable,
            Some(provider),
            message.into(),
        )
    }

    /// Attach the provider when the error was raised before one was known.
    pub fn with_provider(mut self, provider: ProviderId) -> Self {
        self.provider.get_or_insert(provider);
        self
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub const fn provider(&self) -> Option<ProviderId> {
        self.provider
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Transport(_) => "source.transport",
            SourceErrorKind::UnknownSource => "source.unknown",
            SourceErrorKind::UnsupportedOperation => "source.unsupported_operation",
            SourceErrorKind::UnsupportedInterval => "source.unsupported_interval",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::AdapterParse => "source.adapter_parse",
            SourceErrorKind::ReportFormat => "source.report_format",
            SourceErrorKind::DataUnavailable => "source.data_unavailable",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.provider {
            Some(provider) => write!(f, "{provider}: {} ({})", self.message, self.code()),
            None => write!(f, "{} ({})", self.message, self.code()),
        }
    }
}

impl std::error::Error for SourceError {}

impl From<ValidationError> for SourceError {
    fn from(value: ValidationError) -> Self {
        Self::invalid_request(value.to_string())
    }
}

/// Cut a raw payload down to a loggable diagnostic fragment.
pub fn truncate_fragment(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.char_indices().nth(MAX_FRAGMENT_CHARS) {
        Some((cut, _)) => format!("{}…", &trimmed[..cut]),
        None => trimmed.to_owned(),
    }
}

/// Non-fatal condition attached to a [`Batch`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum DataWarning {
    /// Valid request, provider legitimately returned no rows.
    DataUnavailable {
        provider: ProviderId,
        operation: Operation,
    },
    /// A requested symbol was unknown or unparseable and left out.
    SymbolOmitted { symbol: String, reason: String },
    /// Provider rows falling outside the requested date range were dropped.
    RowsOutsideRange { dropped: usize },
    /// Requested page size exceeded the provider maximum.
    PageSizeClamped { requested: usize, applied: usize },
    /// A single provider row failed validation and was skipped.
    RowDropped { index: usize, reason: String },
    /// A report column was ignored, for example a repeated period.
    ColumnDropped { index: usize, reason: String },
    /// The provider page limit was reached, so older rows may be missing.
    ResultTruncated { limit: usize },
}

impl Display for DataWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DataUnavailable {
                provider,
                operation,
            } => write!(f, "{provider} returned no data for {operation}"),
            Self::SymbolOmitted { symbol, reason } => {
                write!(f, "symbol '{symbol}' omitted: {reason}")
            }
            Self::RowsOutsideRange { dropped } => {
                write!(f, "{dropped} row(s) outside the requested range dropped")
            }
            Self::PageSizeClamped { requested, applied } => {
                write!(f, "page size {requested} clamped to {applied}")
            }
            Self::RowDropped { index, reason } => write!(f, "row {index} dropped: {reason}"),
            Self::ColumnDropped { index, reason } => {
                write!(f, "column {index} dropped: {reason}")
            }
            Self::ResultTruncated { limit } => {
                write!(f, "provider returned its {limit}-row maximum; result may be truncated")
            }
        }
    }
}

/// Canonical record sequence plus the warnings raised while producing it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Batch<T> {
    pub items: Vec<T>,
    pub warnings: Vec<DataWarning>,
}

impl<T> Batch<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            warnings: Vec::new(),
        }
    }

    /// Empty result for a valid request the provider had no rows for.
    pub fn unavailable(provider: ProviderId, operation: Operation) -> Self {
        let warning = DataWarning::DataUnavailable {
            provider,
            operation,
        };
        tracing::warn!(provider = %provider, operation = %operation, "{warning}");
        Self {
            items: Vec::new(),
            warnings: vec![warning],
        }
    }

    pub fn push_warning(&mut self, warning: DataWarning) {
        tracing::warn!("{warning}");
        self.warnings.push(warning);
    }

    pub fn with_warnings(mut self, warnings: impl IntoIterator<Item = DataWarning>) -> Self {
        for warning in warnings {
            self.push_warning(warning);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_unavailable(&self) -> bool {
        self.items.is_empty()
            && self
                .warnings
                .iter()
                .any(|warning| matches!(warning, DataWarning::DataUnavailable { .. }))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

impl<T> Default for Batch<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T> IntoIterator for Batch<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Request payload for daily history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    pub symbol: Symbol,
    pub start: Date,
    pub end: Date,
    pub interval: Interval,
    /// Keep only the most recent N bars after range filtering.
    pub count_back: Option<usize>,
}

impl HistoryRequest {
    pub fn new(
        symbol: Symbol,
        start: Date,
        end: Date,
        interval: Interval,
    ) -> Result<Self, SourceError> {
        if start > end {
            return Err(ValidationError::InvertedDateRange {
                start: crate::domain::timestamp::format_iso_date(start),
                end: crate::domain::timestamp::format_iso_date(end),
            }
            .into());
        }
        Ok(Self {
            symbol,
            start,
            end,
            interval,
            count_back: None,
        })
    }

    pub fn with_count_back(mut self, count_back: usize) -> Self {
        self.count_back = Some(count_back);
        self
    }
}

/// Request payload for the intraday trade tape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntradayRequest {
    pub symbol: Symbol,
    pub page_size: usize,
    pub page: usize,
}

impl IntradayRequest {
    pub const DEFAULT_PAGE_SIZE: usize = 100;

    pub fn new(symbol: Symbol, page_size: usize) -> Result<Self, SourceError> {
        if page_size == 0 {
            return Err(SourceError::invalid_request(
                "intraday page size must be greater than zero",
            ));
        }
        Ok(Self {
            symbol,
            page_size,
            page: 0,
        })
    }

    pub fn with_page(mut self, page: usize) -> Self {
        self.page = page;
        self
    }
}

/// Request payload for financial statements and ratio reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementRequest {
    pub symbol: Symbol,
    pub statement: StatementType,
    pub frequency: Frequency,
    pub language: Language,
}

impl StatementRequest {
    pub fn new(
        symbol: Symbol,
        statement: StatementType,
        frequency: Frequency,
        language: Language,
    ) -> Self {
        Self {
            symbol,
            statement,
            frequency,
            language,
        }
    }
}

/// Ratio report for one company benchmarked against peers and, optionally,
/// its industry average.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatioComparisonRequest {
    pub symbol: Symbol,
    /// Companies reported next to `symbol`, deduplicated, never `symbol` itself.
    pub peers: Vec<Symbol>,
    pub compare_to_industry: bool,
    pub frequency: Frequency,
    pub language: Language,
}

impl RatioComparisonRequest {
    /// Industry comparison is on by default, matching the provider.
    pub fn new(symbol: Symbol, frequency: Frequency, language: Language) -> Self {
        Self {
            symbol,
            peers: Vec::new(),
            compare_to_industry: true,
            frequency,
            language,
        }
    }

    pub fn with_peers(mut self, peers: impl IntoIterator<Item = Symbol>) -> Self {
        for peer in peers {
            if peer != self.symbol && !self.peers.contains(&peer) {
                self.peers.push(peer);
            }
        }
        self
    }

    pub fn with_industry(mut self, compare_to_industry: bool) -> Self {
        self.compare_to_industry = compare_to_industry;
        self
    }
}

/// Request payload for a top-movers ranking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TopMoverRequest {
    pub scope: MarketScope,
    pub kind: MoverKind,
    pub range: TimeRange,
}

impl TopMoverRequest {
    pub fn new(scope: MarketScope, kind: MoverKind) -> Self {
        Self {
            scope,
            kind,
            range: TimeRange::OneDay,
        }
    }

    pub fn with_range(mut self, range: TimeRange) -> Self {
        self.range = range;
        self
    }
}

/// Request payload for the foreign-flow heatmap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForeignTradeRequest {
    pub scope: BoardScope,
    pub criterion: ForeignTradeCriterion,
}

impl ForeignTradeRequest {
    pub fn new(scope: impl Into<BoardScope>, criterion: ForeignTradeCriterion) -> Self {
        Self {
            scope: scope.into(),
            criterion,
        }
    }
}

/// Request payload for the live price board.
///
/// Inputs are raw strings so one malformed ticker becomes a
/// [`DataWarning::SymbolOmitted`] instead of failing the batch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PriceBoardRequest {
    pub symbols: Vec<Symbol>,
    pub rejected: Vec<(String, String)>,
}

impl PriceBoardRequest {
    pub fn new<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut request = Self::default();
        for input in inputs {
            let raw = input.as_ref();
            match Symbol::parse(raw) {
                Ok(symbol) if request.symbols.contains(&symbol) => {}
                Ok(symbol) => request.symbols.push(symbol),
                Err(error) => request.rejected.push((raw.to_owned(), error.to_string())),
            }
        }
        request
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Warnings for inputs that never reached the provider.
    pub fn rejection_warnings(&self) -> Vec<DataWarning> {
        self.rejected
            .iter()
            .map(|(symbol, reason)| DataWarning::SymbolOmitted {
                symbol: symbol.clone(),
                reason: reason.clone(),
            })
            .collect()
    }
}

/// Source adapter contract.
///
/// Every provider implements the full operation set; operations a provider
/// cannot serve are reported through [`capabilities`](DataSource::capabilities)
/// and answer with [`SourceErrorKind::UnsupportedOperation`].
///
/// Adapters hold only immutable configuration and shared handles, so one
/// instance is safe to call from concurrent tasks.
pub trait DataSource: Send + Sync {
    /// Returns the unique provider identifier.
    fn id(&self) -> ProviderId;

    /// Returns the set of supported operations.
    fn capabilities(&self) -> CapabilitySet;

    /// Fetches daily bars within `[start, end]`, strictly increasing by date.
    ///
    /// # Errors
    ///
    /// - [`SourceErrorKind::UnsupportedInterval`] before any network call if the
    ///   interval is outside [`CapabilitySet::history_intervals`]
    /// - [`SourceErrorKind::Transport`] / [`SourceErrorKind::AdapterParse`] on
    ///   provider failure
    fn fetch_history<'a>(&'a self, req: HistoryRequest) -> SourceFuture<'a, Batch<PriceBar>>;

    /// Fetches one page of intraday trades; oversize pages are clamped.
    fn fetch_intraday<'a>(
        &'a self,
        req: IntradayRequest,
    ) -> SourceFuture<'a, Batch<IntradayTick>>;

    fn fetch_depth<'a>(&'a self, symbol: Symbol) -> SourceFuture<'a, Batch<DepthLevel>>;

    fn fetch_symbols<'a>(&'a self) -> SourceFuture<'a, Batch<SymbolListing>>;

    fn fetch_industries<'a>(&'a self, language: Language)
        -> SourceFuture<'a, Batch<IndustryGroup>>;

    /// Fetches one statement for one symbol.
    ///
    /// # Errors
    ///
    /// [`SourceErrorKind::ReportFormat`] when a workbook response has no
    /// recognizable header row.
    fn fetch_statement<'a>(
        &'a self,
        req: StatementRequest,
    ) -> SourceFuture<'a, Batch<FinancialStatementLine>>;

    fn fetch_company_overview<'a>(&'a self, symbol: Symbol) -> SourceFuture<'a, CompanyProfile>;

    /// Fetches board rows; unknown symbols are dropped with a warning.
    fn fetch_price_board<'a>(
        &'a self,
        req: PriceBoardRequest,
    ) -> SourceFuture<'a, Batch<PriceBoardRow>>;

    /// Fetches ratios for a company, its peers and optionally the industry.
    /// Each line is attributed to the subject whose column it came from.
    fn fetch_ratio_comparison<'a>(
        &'a self,
        req: RatioComparisonRequest,
    ) -> SourceFuture<'a, Batch<RatioComparisonLine>>;

    /// Fetches a market-wide ranking, ranked from 1 in provider order.
    fn fetch_top_movers<'a>(&'a self, req: TopMoverRequest) -> SourceFuture<'a, Batch<TopMover>>;

    fn fetch_foreign_trade<'a>(
        &'a self,
        req: ForeignTradeRequest,
    ) -> SourceFuture<'a, Batch<ForeignTradeRow>>;

    fn fetch_market_indices<'a>(&'a self) -> SourceFuture<'a, Batch<MarketIndex>>;
}
