use std::sync::Arc;

use serde_json::Value;

use crate::config::{ProviderConfig, ProviderEndpoints};
use crate::data_source::{
    Batch, CapabilitySet, DataSource, DataWarning, ForeignTradeRequest, HistoryRequest,
    IntradayRequest, Operation, PriceBoardRequest, RatioComparisonRequest, SourceError,
    SourceFuture, StatementRequest, TopMoverRequest,
};
use crate::domain::timestamp::format_compact_date;
use crate::http_client::{HttpClient, HttpRequest};
use crate::normalize::{decode_json, history_batch, object_row, parse_error, row_array};
use crate::retry::send_with_retry;
use crate::{
    CompanyProfile, DepthLevel, Exchange, FinancialStatementLine, ForeignTradeRow, IndustryGroup,
    Interval, IntradayTick, Language, ListingStatus, MarketIndex, PriceBar, PriceBoardRow,
    ProviderId, RatioComparisonLine, Symbol, SymbolListing, TopMover,
};

const PROVIDER: ProviderId = ProviderId::Vnd;

/// finfo caps `size` at this many rows per page.
const MAX_PAGE_SIZE: i64 = 9_999;

const CAPABILITIES: CapabilitySet = CapabilitySet {
    history: true,
    intraday: false,
    depth: false,
    symbols: true,
    industries: false,
    statements: false,
    company_overview: true,
    price_board: false,
    ratio_comparison: false,
    top_movers: false,
    foreign_trade: false,
    market_indices: false,
    history_intervals: &[Interval::OneDay],
};

/// VNDIRECT finfo adapter (daily prices and the stock directory).
#[derive(Clone)]
pub struct VndAdapter {
    config: ProviderConfig,
    http_client: Arc<dyn HttpClient>,
}

impl VndAdapter {
    pub fn new(config: ProviderConfig, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            config,
            http_client,
        }
    }

    fn request(&self, base: &str, path: &str) -> HttpRequest {
        HttpRequest::get(ProviderEndpoints::join(base, path))
            .with_headers(&self.config.headers)
            .with_timeout_ms(self.config.timeout_ms)
    }

    async fn get_json(&self, request: HttpRequest) -> Result<Value, SourceError> {
        tracing::debug!(provider = %PROVIDER, url = %request.full_url(), "sending request");
        let response = send_with_retry(
            self.http_client.as_ref(),
            &request,
            &self.config.retry,
            PROVIDER,
        )
        .await?;
        decode_json(PROVIDER, &response.body)
    }

    fn unsupported<'a, T: Send + 'a>(&'a self, operation: Operation) -> SourceFuture<'a, T> {
        Box::pin(async move {
            let error = SourceError::unsupported_operation(PROVIDER, operation);
            tracing::debug!(provider = %PROVIDER, "{error}");
            Err(error)
        })
    }

    async fn history(&self, req: HistoryRequest) -> Result<Batch<PriceBar>, SourceError> {
        if !CAPABILITIES.supports_interval(req.interval) {
            return Err(SourceError::unsupported_interval(PROVIDER, req.interval));
        }

        let days = (req.end - req.start).whole_days() + 1;
        let request = self
            .request(&self.config.endpoints.market, "stock_prices")
            .with_query("symbol", req.symbol.as_str())
            .with_query("sort", "date")
            .with_query("size", days.clamp(1, MAX_PAGE_SIZE))
            .with_query("from", format_compact_date(req.start))
            .with_query("to", format_compact_date(req.end));

        let payload = self.get_json(request).await?;
        let rows = row_array(PROVIDER, &payload, &["data"])?;
        if rows.is_empty() {
            return Ok(Batch::unavailable(PROVIDER, Operation::History));
        }

        let mut bars = Vec::with_capacity(rows.len());
        let mut warnings = Vec::new();
        if rows.len() as i64 >= MAX_PAGE_SIZE {
            warnings.push(DataWarning::ResultTruncated {
                limit: MAX_PAGE_SIZE as usize,
            });
        }
        for (index, raw) in rows.iter().enumerate() {
            let row = object_row(PROVIDER, raw)?;
            let (Some(date), Some(open), Some(high), Some(low), Some(close)) = (
                row.date(&["date", "tradingDate"]),
                row.f64(&["open", "adOpen"]),
                row.f64(&["high", "adHigh"]),
                row.f64(&["low", "adLow"]),
                row.f64(&["close", "adClose"]),
            ) else {
                return Err(parse_error(
                    PROVIDER,
                    "stock_prices row is missing date or OHLC prices",
                    raw,
                ));
            };
            let volume = row.u64(&["nmVolume", "volume"]).unwrap_or(0);

            match PriceBar::new(req.symbol.clone(), date, open, high, low, close, volume) {
                Ok(bar) => bars.push(bar),
                Err(error) => warnings.push(DataWarning::RowDropped {
                    index,
                    reason: error.to_string(),
                }),
            }
        }

        Ok(history_batch(PROVIDER, bars, warnings, &req))
    }

    async fn symbols(&self) -> Result<Batch<SymbolListing>, SourceError> {
        let request = self
            .request(&self.config.endpoints.core, "stocks")
            .with_query("q", "type:STOCK")
            .with_query("size", MAX_PAGE_SIZE);
        let payload = self.get_json(request).await?;
        let rows = row_array(PROVIDER, &payload, &["data"])?;
        if rows.is_empty() {
            return Ok(Batch::unavailable(PROVIDER, Operation::Symbols));
        }

        let mut listings = Vec::with_capacity(rows.len());
        let mut warnings = Vec::new();
        for (index, raw) in rows.iter().enumerate() {
            let row = object_row(PROVIDER, raw)?;
            let symbol = row
                .str(&["code", "symbol"])
                .ok_or_else(|| String::from("missing code"))
                .and_then(|code| Symbol::parse(code).map_err(|error| error.to_string()));
            let symbol = match symbol {
                Ok(symbol) => symbol,
                Err(reason) => {
                    warnings.push(DataWarning::RowDropped { index, reason });
                    continue;
                }
            };

            listings.push(SymbolListing {
                symbol,
                name: row.string(&["companyName", "shortName"]),
                exchange: row
                    .str(&["floor", "exchange"])
                    .map(Exchange::from_provider)
                    .unwrap_or_else(|| Exchange::Other(String::from("UNKNOWN"))),
                industry: row.string(&["industryName", "industryNameVi"]),
                status: row
                    .str(&["status"])
                    .map(ListingStatus::from_provider)
                    .unwrap_or(ListingStatus::Unknown),
            });
        }

        Ok(Batch::new(listings).with_warnings(warnings))
    }

    async fn company_overview(&self, symbol: Symbol) -> Result<CompanyProfile, SourceError> {
        let request = self
            .request(&self.config.endpoints.core, "stocks")
            .with_query("symbol", symbol.as_str());
        let payload = self.get_json(request).await?;
        let rows = row_array(PROVIDER, &payload, &["data"])?;

        let matching = rows.iter().find(|raw| {
            raw.get("code")
                .and_then(Value::as_str)
                .is_some_and(|code| code.trim().eq_ignore_ascii_case(symbol.as_str()))
        });
        let Some(raw) = matching else {
            let error = SourceError::data_unavailable(
                PROVIDER,
                format!("no stock record returned for {symbol}"),
            );
            tracing::warn!(provider = %PROVIDER, "{error}");
            return Err(error);
        };

        let row = object_row(PROVIDER, raw)?;
        let name = row
            .string(&["companyName", "companyNameEng", "shortName"])
            .ok_or_else(|| parse_error(PROVIDER, "stock record has no company name", raw))?;

        Ok(CompanyProfile {
            symbol,
            name,
            founded: row.date(&["foundingDate", "listedDate"]),
            industry: row.string(&["industryName", "industryNameVi"]),
            shareholders: Vec::new(),
            events: Vec::new(),
            dividends: Vec::new(),
        })
    }
}

impl DataSource for VndAdapter {
    fn id(&self) -> ProviderId {
        PROVIDER
    }

    fn capabilities(&self) -> CapabilitySet {
        CAPABILITIES
    }

    fn fetch_history<'a>(&'a self, req: HistoryRequest) -> SourceFuture<'a, Batch<PriceBar>> {
        Box::pin(self.history(req))
    }

    fn fetch_intraday<'a>(
        &'a self,
        _req: IntradayRequest,
    ) -> SourceFuture<'a, Batch<IntradayTick>> {
        self.unsupported(Operation::Intraday)
    }

    fn fetch_depth<'a>(&'a self, _symbol: Symbol) -> SourceFuture<'a, Batch<DepthLevel>> {
        self.unsupported(Operation::Depth)
    }

    fn fetch_symbols<'a>(&'a self) -> SourceFuture<'a, Batch<SymbolListing>> {
        Box::pin(self.symbols())
    }

    fn fetch_industries<'a>(
        &'a self,
        _language: Language,
    ) -> SourceFuture<'a, Batch<IndustryGroup>> {
        self.unsupported(Operation::Industries)
    }

    fn fetch_statement<'a>(
        &'a self,
        _req: StatementRequest,
    ) -> SourceFuture<'a, Batch<FinancialStatementLine>> {
        self.unsupported(Operation::Statement)
    }

    fn fetch_company_overview<'a>(&'a self, symbol: Symbol) -> SourceFuture<'a, CompanyProfile> {
        Box::pin(self.company_overview(symbol))
    }

    fn fetch_price_board<'a>(
        &'a self,
        _req: PriceBoardRequest,
    ) -> SourceFuture<'a, Batch<PriceBoardRow>> {
        self.unsupported(Operation::PriceBoard)
    }

    fn fetch_ratio_comparison<'a>(
        &'a self,
        _req: RatioComparisonRequest,
    ) -> SourceFuture<'a, Batch<RatioComparisonLine>> {
        self.unsupported(Operation::RatioComparison)
    }

    fn fetch_top_movers<'a>(&'a self, _req: TopMoverRequest) -> SourceFuture<'a, Batch<TopMover>> {
        self.unsupported(Operation::TopMovers)
    }

    fn fetch_foreign_trade<'a>(
        &'a self,
        _req: ForeignTradeRequest,
    ) -> SourceFuture<'a, Batch<ForeignTradeRow>> {
        self.unsupported(Operation::ForeignTrade)
    }

    fn fetch_market_indices<'a>(&'a self) -> SourceFuture<'a, Batch<MarketIndex>> {
        self.unsupported(Operation::MarketIndices)
    }
}
