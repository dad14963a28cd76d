use std::sync::Arc;

use serde_json::Value;
use time::PrimitiveDateTime;

use crate::config::{ProviderConfig, ProviderEndpoints};
use crate::data_source::{
    Batch, CapabilitySet, DataSource, DataWarning, ForeignTradeRequest, HistoryRequest,
    IntradayRequest, Operation, PriceBoardRequest, RatioComparisonRequest, SourceError,
    SourceFuture, StatementRequest, TopMoverRequest,
};
use crate::domain::timestamp::{
    local_datetime_from_millis, local_midnight_millis, local_today, parse_clock_time,
};
use crate::http_client::{HttpClient, HttpRequest, HttpResponse};
use crate::normalize::{decode_json, history_batch, object_row, parse_error, row_array, Row};
use crate::retry::send_with_retry;
use crate::workbook::{extract_ratio_comparison, extract_statement, Sheet, WorkbookDecoder};
use crate::{
    BoardScope, BookSide, CompanyEvent, CompanyProfile, DepthLevel, Dividend, DividendKind,
    Exchange, FinancialStatementLine, ForeignTradeRow, Frequency, IndustryGroup, Interval,
    IntradayTick, Language, ListingStatus, MarketIndex, PriceBar, PriceBoardRow, ProviderId,
    RatioComparisonLine, Shareholder, StatementType, Symbol, SymbolListing, TopMover, TradeSide,
};

const PROVIDER: ProviderId = ProviderId::Ssi;

/// iBoard rejects larger intraday pages.
pub const INTRADAY_MAX_PAGE_SIZE: usize = 1_000;
const HISTORY_PAGE_SIZE: usize = 1_000;
/// Pages fetched per history call before the result is reported truncated.
const HISTORY_MAX_PAGES: usize = 10;
const BOOK_DEPTH: usize = 10;
const INDEX_PAGE_SIZE: usize = 999_999;

/// Ratio codes requested from the FiinTrade ratio report.
const RATIO_CODES: [&str; 21] = [
    "ryd21", "ryd25", "ryd14", "ryd7", "rev", "isa22", "ryq44", "ryq14", "ryq12", "rtq51",
    "rtq50", "ryq48", "ryq47", "ryq45", "ryq46", "ryq54", "ryq55", "ryq56", "ryq57", "nob151",
    "casa",
];

const CAPABILITIES: CapabilitySet = CapabilitySet {
    history: true,
    intraday: true,
    depth: true,
    symbols: true,
    industries: true,
    statements: true,
    company_overview: true,
    price_board: true,
    ratio_comparison: true,
    top_movers: true,
    foreign_trade: true,
    market_indices: true,
    history_intervals: &[Interval::OneDay],
};

/// SSI adapter: FiinTrade market/fundamental/core services plus the iBoard
/// query API.
#[derive(Clone)]
pub struct SsiAdapter {
    config: ProviderConfig,
    http_client: Arc<dyn HttpClient>,
    workbook_decoder: Arc<dyn WorkbookDecoder>,
}

impl SsiAdapter {
    pub fn new(
        config: ProviderConfig,
        http_client: Arc<dyn HttpClient>,
        workbook_decoder: Arc<dyn WorkbookDecoder>,
    ) -> Self {
        Self {
            config,
            http_client,
            workbook_decoder,
        }
    }

    fn request(&self, base: &str, path: &str) -> HttpRequest {
        HttpRequest::get(ProviderEndpoints::join(base, path))
            .with_headers(&self.config.headers)
            .with_timeout_ms(self.config.timeout_ms)
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, SourceError> {
        tracing::debug!(provider = %PROVIDER, url = %request.full_url(), "sending request");
        send_with_retry(
            self.http_client.as_ref(),
            &request,
            &self.config.retry,
            PROVIDER,
        )
        .await
    }

    async fn get_json(&self, request: HttpRequest) -> Result<Value, SourceError> {
        let response = self.send(request).await?;
        decode_json(PROVIDER, &response.body)
    }

    async fn history(&self, req: HistoryRequest) -> Result<Batch<PriceBar>, SourceError> {
        if !CAPABILITIES.supports_interval(req.interval) {
            return Err(SourceError::unsupported_interval(PROVIDER, req.interval));
        }

        let end_millis = req
            .end
            .next_day()
            .map(|day| local_midnight_millis(day) - 1)
            .unwrap_or_else(|| local_midnight_millis(req.end));
        let path = format!("stock/{}/historical-quotes", req.symbol.to_lowercase());
        let mut rows: Vec<Value> = Vec::new();
        let mut warnings = Vec::new();
        for page in 1..=HISTORY_MAX_PAGES {
            let request = self
                .request(&self.config.endpoints.board, &path)
                .with_query("startDate", local_midnight_millis(req.start))
                .with_query("endDate", end_millis)
                .with_query("pageIndex", page)
                .with_query("pageSize", HISTORY_PAGE_SIZE);

            let payload = self.get_json(request).await?;
            let page_rows = row_array(PROVIDER, &payload, &["data"])?;
            // A provider that ignores pageIndex repeats the first page.
            let repeated = page > 1 && page_rows.first() == rows.first();
            if repeated {
                break;
            }
            rows.extend(page_rows.iter().cloned());
            if page_rows.len() < HISTORY_PAGE_SIZE {
                break;
            }
            if page == HISTORY_MAX_PAGES {
                warnings.push(DataWarning::ResultTruncated {
                    limit: HISTORY_MAX_PAGES * HISTORY_PAGE_SIZE,
                });
            }
        }
        if rows.is_empty() {
            return Ok(Batch::unavailable(PROVIDER, Operation::History));
        }

        let mut bars = Vec::with_capacity(rows.len());
        for (index, raw) in rows.iter().enumerate() {
            let row = object_row(PROVIDER, raw)?;
            let (Some(date), Some(open), Some(high), Some(low), Some(close)) = (
                row.date(&["tradingDate", "date"]),
                row.f64(&["priceOpen", "open"]),
                row.f64(&["priceHigh", "high"]),
                row.f64(&["priceLow", "low"]),
                row.f64(&["priceClose", "close"]),
            ) else {
                return Err(parse_error(
                    PROVIDER,
                    "history row is missing tradingDate or OHLC prices",
                    raw,
                ));
            };
            let volume = row
                .u64(&["totalVolume", "totalMatchVol", "volume"])
                .unwrap_or(0);

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

    async fn intraday(&self, req: IntradayRequest) -> Result<Batch<IntradayTick>, SourceError> {
        let mut warnings = Vec::new();
        let page_size = if req.page_size > INTRADAY_MAX_PAGE_SIZE {
            warnings.push(DataWarning::PageSizeClamped {
                requested: req.page_size,
                applied: INTRADAY_MAX_PAGE_SIZE,
            });
            INTRADAY_MAX_PAGE_SIZE
        } else {
            req.page_size
        };

        let path = format!("stock/{}/intraday-trades", req.symbol.to_lowercase());
        let request = self
            .request(&self.config.endpoints.board, &path)
            .with_query("pageIndex", req.page)
            .with_query("pageSize", page_size);

        let payload = self.get_json(request).await?;
        let rows = row_array(PROVIDER, &payload, &["data"])?;
        if rows.is_empty() {
            return Ok(Batch::unavailable(PROVIDER, Operation::Intraday).with_warnings(warnings));
        }

        let mut ticks = Vec::with_capacity(rows.len());
        for (index, raw) in rows.iter().enumerate() {
            let row = object_row(PROVIDER, raw)?;
            let (Some(price), Some(volume), Some(timestamp)) = (
                row.f64(&["p", "price", "matchedPrice"]),
                row.u64(&["v", "vol", "volume", "matchedVolume"]),
                tick_timestamp(row),
            ) else {
                return Err(parse_error(
                    PROVIDER,
                    "intraday row is missing price, volume or time",
                    raw,
                ));
            };
            let side = row
                .str(&["s", "side"])
                .map(TradeSide::from_provider)
                .unwrap_or(TradeSide::Unknown);

            match IntradayTick::new(req.symbol.clone(), timestamp, price, volume, side) {
                Ok(tick) => ticks.push(tick),
                Err(error) => warnings.push(DataWarning::RowDropped {
                    index,
                    reason: error.to_string(),
                }),
            }
        }

        ticks.sort_by_key(|tick| tick.timestamp);
        Ok(Batch::new(ticks).with_warnings(warnings))
    }

    async fn depth(&self, symbol: Symbol) -> Result<Batch<DepthLevel>, SourceError> {
        let path = format!("stock/{}/price-depth", symbol.to_lowercase());
        let request = self.request(&self.config.endpoints.board, &path);
        let payload = self.get_json(request).await?;

        let snapshot = match payload.get("data") {
            Some(Value::Null) => None,
            Some(Value::Array(rows)) => rows.first(),
            Some(other) => Some(other),
            None => Some(&payload),
        };
        let Some(snapshot) = snapshot else {
            return Ok(Batch::unavailable(PROVIDER, Operation::Depth));
        };

        let row = object_row(PROVIDER, snapshot)?;
        let (bids, asks) = book_levels(&symbol, row)?;
        if bids.is_empty() && asks.is_empty() {
            return Ok(Batch::unavailable(PROVIDER, Operation::Depth));
        }
        Ok(Batch::new(bids.into_iter().chain(asks).collect()))
    }

    async fn symbols(&self) -> Result<Batch<SymbolListing>, SourceError> {
        let request = self
            .request(&self.config.endpoints.core, "Master/GetListOrganization")
            .with_query("language", Language::Vi);
        let payload = self.get_json(request).await?;
        let rows = row_array(PROVIDER, &payload, &["items", "data"])?;
        if rows.is_empty() {
            return Ok(Batch::unavailable(PROVIDER, Operation::Symbols));
        }

        let mut listings = Vec::with_capacity(rows.len());
        let mut warnings = Vec::new();
        for (index, raw) in rows.iter().enumerate() {
            let row = object_row(PROVIDER, raw)?;
            let symbol = match row.str(&["ticker", "organCode", "symbol"]).map(Symbol::parse) {
                Some(Ok(symbol)) => symbol,
                Some(Err(error)) => {
                    warnings.push(DataWarning::RowDropped {
                        index,
                        reason: error.to_string(),
                    });
                    continue;
                }
                None => {
                    warnings.push(DataWarning::RowDropped {
                        index,
                        reason: String::from("missing ticker"),
                    });
                    continue;
                }
            };

            listings.push(SymbolListing {
                symbol,
                name: row.string(&["organName", "organShortName", "companyName"]),
                exchange: row
                    .str(&["comGroupCode", "exchange"])
                    .map(Exchange::from_provider)
                    .unwrap_or_else(|| Exchange::Other(String::from("UNKNOWN"))),
                industry: row.string(&["icbName", "icbCode", "industryName"]),
                status: row
                    .str(&["status"])
                    .map(ListingStatus::from_provider)
                    .unwrap_or(ListingStatus::Unknown),
            });
        }

        Ok(Batch::new(listings).with_warnings(warnings))
    }

    async fn industries(&self, language: Language) -> Result<Batch<IndustryGroup>, SourceError> {
        let request = self
            .request(&self.config.endpoints.core, "Master/GetAllCompanyGroup")
            .with_query("language", language);
        let payload = self.get_json(request).await?;
        let rows = row_array(PROVIDER, &payload, &["items", "data"])?;
        if rows.is_empty() {
            return Ok(Batch::unavailable(PROVIDER, Operation::Industries));
        }

        let mut groups = Vec::with_capacity(rows.len());
        let mut warnings = Vec::new();
        for (index, raw) in rows.iter().enumerate() {
            let row = object_row(PROVIDER, raw)?;
            let Some(code) = row.string(&["comGroupCode", "code"]) else {
                warnings.push(DataWarning::RowDropped {
                    index,
                    reason: String::from("missing comGroupCode"),
                });
                continue;
            };
            groups.push(IndustryGroup {
                code,
                parent_code: row.string(&["parentComGroupCode", "parentCode"]),
                order: row.i64(&["comGroupOrder", "order"]),
            });
        }

        groups.sort_by(|left, right| {
            (left.order.unwrap_or(i64::MAX), &left.code)
                .cmp(&(right.order.unwrap_or(i64::MAX), &right.code))
        });
        Ok(Batch::new(groups).with_warnings(warnings))
    }

    fn ratio_request(
        &self,
        symbol: &Symbol,
        frequency: Frequency,
        language: Language,
        compare_to_industry: bool,
        peers: &[Symbol],
    ) -> HttpRequest {
        let request = self
            .request(
                &self.config.endpoints.fundamental,
                "FinancialAnalysis/DownloadFinancialRatio2",
            )
            .with_query("language", language)
            .with_query("OrganCode", symbol.as_str())
            .with_query("CompareToIndustry", compare_to_industry);
        let request = peers.iter().fold(request, |request, peer| {
            request.with_query("CompareToCompanies", peer.as_str())
        });
        RATIO_CODES.iter().fold(
            request.with_query("Frequency", frequency),
            |request, code| request.with_query("Ratios", code),
        )
    }

    async fn download_sheets(&self, request: HttpRequest) -> Result<Vec<Sheet>, SourceError> {
        let response = self.send(request).await?;
        self.workbook_decoder
            .decode(&response.body)
            .map_err(|error| SourceError::adapter_parse(PROVIDER, error.to_string(), response.text()))
    }

    async fn statement(
        &self,
        req: StatementRequest,
    ) -> Result<Batch<FinancialStatementLine>, SourceError> {
        let request = match req.statement {
            StatementType::Ratio => {
                self.ratio_request(&req.symbol, req.frequency, req.language, false, &[])
            }
            statement => self
                .request(
                    &self.config.endpoints.fundamental,
                    &format!("FinancialStatement/Download{}", report_name(statement)),
                )
                .with_query("language", req.language)
                .with_query("OrganCode", req.symbol.as_str())
                .with_query("Skip", 0)
                .with_query("Frequency", req.frequency),
        };

        let sheets = self.download_sheets(request).await?;
        let (lines, warnings) = extract_statement(PROVIDER, &sheets, &req.symbol, req.statement)?;
        if lines.is_empty() {
            return Ok(Batch::unavailable(PROVIDER, Operation::Statement).with_warnings(warnings));
        }
        Ok(Batch::new(lines).with_warnings(warnings))
    }

    async fn ratio_comparison(
        &self,
        req: RatioComparisonRequest,
    ) -> Result<Batch<RatioComparisonLine>, SourceError> {
        let request = self.ratio_request(
            &req.symbol,
            req.frequency,
            req.language,
            req.compare_to_industry,
            &req.peers,
        );
        let sheets = self.download_sheets(request).await?;
        let (lines, warnings) =
            extract_ratio_comparison(PROVIDER, &sheets, &req.symbol, &req.peers)?;
        if lines.is_empty() {
            return Ok(Batch::unavailable(PROVIDER, Operation::RatioComparison)
                .with_warnings(warnings));
        }
        Ok(Batch::new(lines).with_warnings(warnings))
    }

    async fn company_overview(&self, symbol: Symbol) -> Result<CompanyProfile, SourceError> {
        let request = self
            .request(&self.config.endpoints.fundamental, "Snapshot/GetCompanyProfile")
            .with_query("language", Language::Vi)
            .with_query("OrganCode", symbol.as_str());
        let payload = self.get_json(request).await?;

        let profile = match payload.get("items").or_else(|| payload.get("data")) {
            Some(Value::Array(rows)) => rows.first(),
            Some(Value::Null) | None => None,
            Some(other) => Some(other),
        };
        let Some(raw) = profile else {
            let error = SourceError::data_unavailable(
                PROVIDER,
                format!("no company profile returned for {symbol}"),
            );
            tracing::warn!(provider = %PROVIDER, "{error}");
            return Err(error);
        };

        let row = object_row(PROVIDER, raw)?;
        let name = row
            .string(&["organName", "companyName", "name"])
            .ok_or_else(|| parse_error(PROVIDER, "company profile has no name", raw))?;

        let shareholders = row
            .array(&["shareholders", "majorShareholders"])
            .iter()
            .filter_map(parse_shareholder)
            .collect();

        let mut events: Vec<CompanyEvent> = row
            .array(&["events"])
            .iter()
            .filter_map(parse_event)
            .collect();
        events.sort_by_key(|event| event.date);

        let mut dividends: Vec<Dividend> = row
            .array(&["dividends"])
            .iter()
            .filter_map(parse_dividend)
            .collect();
        dividends.sort_by_key(|dividend| dividend.ex_date);

        Ok(CompanyProfile {
            symbol,
            name,
            founded: row.date(&["foundingDate", "foundedDate", "establishedDate"]),
            industry: row.string(&["icbName", "industryName", "industry"]),
            shareholders,
            events,
            dividends,
        })
    }

    async fn price_board(&self, req: PriceBoardRequest) -> Result<Batch<PriceBoardRow>, SourceError> {
        let mut warnings = req.rejection_warnings();
        if req.is_empty() {
            return Ok(Batch::new(Vec::new()).with_warnings(warnings));
        }

        let joined = req
            .symbols
            .iter()
            .map(Symbol::to_lowercase)
            .collect::<Vec<_>>()
            .join(",");
        let request = self
            .request(&self.config.endpoints.board, "stock/price-board")
            .with_query("symbols", joined);
        let payload = self.get_json(request).await?;
        let rows = row_array(PROVIDER, &payload, &["data"])?;

        let mut board = Vec::with_capacity(req.symbols.len());
        for symbol in &req.symbols {
            let raw = rows.iter().find(|raw| {
                Row::new(raw)
                    .and_then(|row| row.str(&["ss", "stockSymbol", "symbol"]))
                    .is_some_and(|code| code.eq_ignore_ascii_case(symbol.as_str()))
            });
            let Some(raw) = raw else {
                warnings.push(DataWarning::SymbolOmitted {
                    symbol: symbol.to_string(),
                    reason: String::from("not returned by provider"),
                });
                continue;
            };

            match board_row(symbol, raw) {
                Ok(row) => board.push(row),
                Err(error) => warnings.push(DataWarning::SymbolOmitted {
                    symbol: symbol.to_string(),
                    reason: error.to_string(),
                }),
            }
        }

        Ok(Batch::new(board).with_warnings(warnings))
    }

    async fn top_movers(&self, req: TopMoverRequest) -> Result<Batch<TopMover>, SourceError> {
        let path = format!("TopMover/Get{}", req.kind.endpoint());
        let request = self
            .request(&self.config.endpoints.market, &path)
            .with_query("language", Language::Vi)
            .with_query("ComGroupCode", req.scope)
            .with_query("TimeRange", req.range);
        let payload = self.get_json(request).await?;
        let rows = row_array(PROVIDER, &payload, &["items", "data"])?;
        if rows.is_empty() {
            return Ok(Batch::unavailable(PROVIDER, Operation::TopMovers));
        }

        let mut movers = Vec::with_capacity(rows.len());
        let mut warnings = Vec::new();
        for (index, raw) in rows.iter().enumerate() {
            let row = object_row(PROVIDER, raw)?;
            let symbol = match row.str(&["ticker", "organCode", "symbol"]).map(Symbol::parse) {
                Some(Ok(symbol)) => symbol,
                Some(Err(error)) => {
                    warnings.push(DataWarning::RowDropped {
                        index,
                        reason: error.to_string(),
                    });
                    continue;
                }
                None => {
                    warnings.push(DataWarning::RowDropped {
                        index,
                        reason: String::from("missing ticker"),
                    });
                    continue;
                }
            };
            let Some(price) = row.f64(&["closePrice", "matchPrice", "price", "lastPrice"]) else {
                return Err(parse_error(PROVIDER, "top mover row has no price", raw));
            };

            let rank = movers.len() as u32 + 1;
            match TopMover::new(
                rank,
                symbol,
                row.str(&["comGroupCode", "exchange"]).map(Exchange::from_provider),
                price,
                row.f64(&["priceChange", "change"]),
                row.f64(&["percentPriceChange", "perPriceChange", "changePercent"]),
                row.u64(&["totalMatchVolume", "totalVolume", "volume"]),
                row.f64(&["totalMatchValue", "totalValue", "value"]),
            ) {
                Ok(mover) => movers.push(mover),
                Err(error) => warnings.push(DataWarning::RowDropped {
                    index,
                    reason: error.to_string(),
                }),
            }
        }

        Ok(Batch::new(movers).with_warnings(warnings))
    }

    async fn foreign_trade(
        &self,
        req: ForeignTradeRequest,
    ) -> Result<Batch<ForeignTradeRow>, SourceError> {
        let path = match &req.scope {
            BoardScope::Market(scope) => format!("stock/exchange/{}", scope.as_str().to_lowercase()),
            BoardScope::Group(group) => format!("stock/group/{}", group.to_lowercase()),
        };
        let request = self
            .request(&self.config.endpoints.board, &path)
            .with_query("language", Language::Vi)
            .with_query("Exchange", req.scope.code())
            .with_query("Criteria", req.criterion);
        let payload = self.get_json(request).await?;
        let rows = row_array(PROVIDER, &payload, &["data"])?;
        if rows.is_empty() {
            return Ok(Batch::unavailable(PROVIDER, Operation::ForeignTrade));
        }

        let mut flows = Vec::with_capacity(rows.len());
        let mut warnings = Vec::new();
        for (index, raw) in rows.iter().enumerate() {
            let row = object_row(PROVIDER, raw)?;
            let Some(Ok(symbol)) = row.str(&["ss", "stockSymbol", "symbol"]).map(Symbol::parse)
            else {
                warnings.push(DataWarning::RowDropped {
                    index,
                    reason: String::from("missing or malformed symbol"),
                });
                continue;
            };

            let buy_volume = row.u64(&["fBVol", "fBVo", "foreignBuyVolume", "frBuyVol"]);
            let sell_volume = row.u64(&["fSVolume", "fSVol", "fSVo", "foreignSellVolume", "frSellVol"]);
            let buy_value = row.f64(&["fBValue", "fBVal", "foreignBuyValue", "frBuyVal"]);
            let sell_value = row.f64(&["fSValue", "fSVal", "foreignSellValue", "frSellVal"]);
            if buy_volume.is_none()
                && sell_volume.is_none()
                && buy_value.is_none()
                && sell_value.is_none()
            {
                return Err(parse_error(
                    PROVIDER,
                    "foreign trade row has no foreign buy or sell fields",
                    raw,
                ));
            }

            match ForeignTradeRow::new(
                symbol,
                buy_volume.unwrap_or(0),
                sell_volume.unwrap_or(0),
                buy_value.unwrap_or(0.0),
                sell_value.unwrap_or(0.0),
                row.f64(&["frr", "foreignRoom", "currentRoom"]),
            ) {
                Ok(flow) => flows.push(flow),
                Err(error) => warnings.push(DataWarning::RowDropped {
                    index,
                    reason: error.to_string(),
                }),
            }
        }

        Ok(Batch::new(flows).with_warnings(warnings))
    }

    async fn market_indices(&self) -> Result<Batch<MarketIndex>, SourceError> {
        let request = self
            .request(&self.config.endpoints.market, "MarketInDepth/GetLatestIndices")
            .with_query("language", Language::Vi)
            .with_query("pageSize", INDEX_PAGE_SIZE)
            .with_query("status", 1);
        let payload = self.get_json(request).await?;
        let rows = row_array(PROVIDER, &payload, &["items", "data"])?;
        if rows.is_empty() {
            return Ok(Batch::unavailable(PROVIDER, Operation::MarketIndices));
        }

        let mut indices = Vec::with_capacity(rows.len());
        let mut warnings = Vec::new();
        for (index, raw) in rows.iter().enumerate() {
            let row = object_row(PROVIDER, raw)?;
            let (Some(code), Some(value)) = (
                row.string(&["comGroupCode", "indexCode", "indexId"]),
                row.f64(&["indexValue", "closeIndex", "value"]),
            ) else {
                return Err(parse_error(
                    PROVIDER,
                    "index row is missing comGroupCode or indexValue",
                    raw,
                ));
            };

            match MarketIndex::new(code, value) {
                Ok(level) => indices.push(
                    level
                        .with_change(
                            row.f64(&["indexChange", "change"]),
                            row.f64(&["percentIndexChange", "percentChange"]),
                        )
                        .with_turnover(
                            row.u64(&["totalMatchVolume", "totalVolume"]),
                            row.f64(&["totalMatchValue", "totalValue"]),
                        )
                        .with_trading_date(row.date(&["tradingDate", "date"])),
                ),
                Err(error) => warnings.push(DataWarning::RowDropped {
                    index,
                    reason: error.to_string(),
                }),
            }
        }

        Ok(Batch::new(indices).with_warnings(warnings))
    }
}

fn report_name(statement: StatementType) -> &'static str {
    match statement {
        StatementType::BalanceSheet => "BalanceSheet",
        StatementType::IncomeStatement => "IncomeStatement",
        StatementType::CashFlow => "CashFlow",
        StatementType::Ratio => "FinancialRatio",
    }
}

/// Trade time is either epoch millis or an `HH:MM:SS` clock string on the
/// row's trading date (today when absent).
fn tick_timestamp(row: Row<'_>) -> Option<PrimitiveDateTime> {
    match row.field(&["t", "time", "tradingTime"])? {
        Value::Number(number) => number.as_i64().and_then(local_datetime_from_millis),
        Value::String(text) => match parse_clock_time(text) {
            Some(time) => {
                let date = row
                    .date(&["tradingDate", "date"])
                    .unwrap_or_else(local_today);
                Some(PrimitiveDateTime::new(date, time))
            }
            None => text
                .trim()
                .parse::<i64>()
                .ok()
                .and_then(local_datetime_from_millis),
        },
        _ => None,
    }
}

fn level_fields(side: BookSide, level: usize) -> ([String; 3], [String; 3]) {
    match side {
        BookSide::Bid => (
            [
                format!("bidPrice{level}"),
                format!("best{level}Bid"),
                format!("bp{level}"),
            ],
            [
                format!("bidVol{level}"),
                format!("best{level}BidVol"),
                format!("bv{level}"),
            ],
        ),
        BookSide::Ask => (
            [
                format!("offerPrice{level}"),
                format!("askPrice{level}"),
                format!("best{level}Offer"),
            ],
            [
                format!("offerVol{level}"),
                format!("askVol{level}"),
                format!("best{level}OfferVol"),
            ],
        ),
    }
}

/// Ranked bid and ask levels from numbered book fields. Empty levels
/// (missing or zero price) are skipped without consuming a rank.
fn book_levels(
    symbol: &Symbol,
    row: Row<'_>,
) -> Result<(Vec<DepthLevel>, Vec<DepthLevel>), SourceError> {
    let mut sides = [Vec::new(), Vec::new()];
    for (slot, side) in [BookSide::Bid, BookSide::Ask].into_iter().enumerate() {
        let mut rank = 0_u8;
        for level in 1..=BOOK_DEPTH {
            let (price_fields, volume_fields) = level_fields(side, level);
            let price_names: Vec<&str> = price_fields.iter().map(String::as_str).collect();
            let volume_names: Vec<&str> = volume_fields.iter().map(String::as_str).collect();

            let Some(price) = row.f64(&price_names).filter(|price| *price > 0.0) else {
                continue;
            };
            let volume = row.u64(&volume_names).unwrap_or(0);
            rank += 1;
            let depth = DepthLevel::new(symbol.clone(), side, price, volume, rank)
                .map_err(|error| parse_error(PROVIDER, &error.to_string(), row.raw()))?;
            sides[slot].push(depth);
        }
    }
    let [bids, asks] = sides;
    Ok((bids, asks))
}

fn board_row(symbol: &Symbol, raw: &Value) -> Result<PriceBoardRow, SourceError> {
    let row = object_row(PROVIDER, raw)?;
    let (Some(reference), Some(ceiling), Some(floor)) = (
        row.f64(&["r", "refPrice", "referencePrice"]),
        row.f64(&["c", "ceiling", "ceilingPrice"]),
        row.f64(&["f", "floor", "floorPrice"]),
    ) else {
        return Err(parse_error(
            PROVIDER,
            "price board row is missing reference, ceiling or floor",
            raw,
        ));
    };
    let (bids, asks) = book_levels(symbol, row)?;

    PriceBoardRow::new(
        symbol.clone(),
        row.f64(&["mp", "matchedPrice", "lastPrice"])
            .filter(|price| *price > 0.0),
        reference,
        ceiling,
        floor,
        bids,
        asks,
        row.f64(&["frr", "foreignRoom", "currentRoom"]),
        row.u64(&["mtq", "totalVolume", "nmTotalTradedQty"])
            .unwrap_or(0),
    )
    .map_err(|error| parse_error(PROVIDER, &error.to_string(), raw))
}

fn parse_shareholder(raw: &Value) -> Option<Shareholder> {
    let row = Row::new(raw)?;
    let name = row.string(&["name", "ownerName", "shareholderName"])?;
    let percent = row
        .f64(&["percentage", "ownershipPercentage", "percent"])
        .or_else(|| row.f64(&["ownership", "rate"]).map(|fraction| fraction * 100.0))?;
    Shareholder::new(name, percent)
        .map_err(|error| tracing::warn!(provider = %PROVIDER, "shareholder skipped: {error}"))
        .ok()
}

fn parse_event(raw: &Value) -> Option<CompanyEvent> {
    let row = Row::new(raw)?;
    Some(CompanyEvent {
        date: row.date(&["eventDate", "exrightDate", "publicDate", "date"])?,
        description: row.string(&["eventName", "eventTitle", "description", "title"])?,
    })
}

fn parse_dividend(raw: &Value) -> Option<Dividend> {
    let row = Row::new(raw)?;
    let ex_date = row.date(&["exrightDate", "exDate", "exDividendDate"])?;
    let amount = row.f64(&["cashDividend", "value", "amount", "dividendValue"])?;
    let kind = row
        .str(&["dividendType", "type", "issueMethod"])
        .map(DividendKind::from_provider)
        .unwrap_or(DividendKind::Other);
    Dividend::new(ex_date, amount, kind)
        .map_err(|error| tracing::warn!(provider = %PROVIDER, "dividend skipped: {error}"))
        .ok()
}

impl DataSource for SsiAdapter {
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
        req: IntradayRequest,
    ) -> SourceFuture<'a, Batch<IntradayTick>> {
        Box::pin(self.intraday(req))
    }

    fn fetch_depth<'a>(&'a self, symbol: Symbol) -> SourceFuture<'a, Batch<DepthLevel>> {
        Box::pin(self.depth(symbol))
    }

    fn fetch_symbols<'a>(&'a self) -> SourceFuture<'a, Batch<SymbolListing>> {
        Box::pin(self.symbols())
    }

    fn fetch_industries<'a>(
        &'a self,
        language: Language,
    ) -> SourceFuture<'a, Batch<IndustryGroup>> {
        Box::pin(self.industries(language))
    }

    fn fetch_statement<'a>(
        &'a self,
        req: StatementRequest,
    ) -> SourceFuture<'a, Batch<FinancialStatementLine>> {
        Box::pin(self.statement(req))
    }

    fn fetch_company_overview<'a>(&'a self, symbol: Symbol) -> SourceFuture<'a, CompanyProfile> {
        Box::pin(self.company_overview(symbol))
    }

    fn fetch_price_board<'a>(
        &'a self,
        req: PriceBoardRequest,
    ) -> SourceFuture<'a, Batch<PriceBoardRow>> {
        Box::pin(self.price_board(req))
    }

    fn fetch_ratio_comparison<'a>(
        &'a self,
        req: RatioComparisonRequest,
    ) -> SourceFuture<'a, Batch<RatioComparisonLine>> {
        Box::pin(self.ratio_comparison(req))
    }

    fn fetch_top_movers<'a>(&'a self, req: TopMoverRequest) -> SourceFuture<'a, Batch<TopMover>> {
        Box::pin(self.top_movers(req))
    }

    fn fetch_foreign_trade<'a>(
        &'a self,
        req: ForeignTradeRequest,
    ) -> SourceFuture<'a, Batch<ForeignTradeRow>> {
        Box::pin(self.foreign_trade(req))
    }

    fn fetch_market_indices<'a>(&'a self) -> SourceFuture<'a, Batch<MarketIndex>> {
        Box::pin(self.market_indices())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::macros::{date, datetime};

    use super::*;
    use crate::adapters::test_support::{FixedWorkbookDecoder, RecordingHttpClient};
    use crate::data_source::{SourceErrorKind, TransportFailure};
    use crate::retry::RetryConfig;
    use crate::workbook::Cell;
    use crate::{ForeignTradeCriterion, MarketScope, MoverKind, TimeRange};

    fn adapter(client: RecordingHttpClient) -> (SsiAdapter, Arc<RecordingHttpClient>) {
        adapter_with_sheets(client, Vec::new())
    }

    fn adapter_with_sheets(
        client: RecordingHttpClient,
        sheets: Vec<Sheet>,
    ) -> (SsiAdapter, Arc<RecordingHttpClient>) {
        let client = Arc::new(client);
        let adapter = SsiAdapter::new(
            ProviderConfig::ssi_default().with_retry(RetryConfig::no_retry()),
            client.clone(),
            Arc::new(FixedWorkbookDecoder { sheets }),
        );
        (adapter, client)
    }

    fn symbol(value: &str) -> Symbol {
        Symbol::parse(value).expect("valid symbol")
    }

    fn quote_row(day: time::Date, close: f64) -> serde_json::Value {
        json!({
            "tradingDate": local_midnight_millis(day),
            "priceOpen": close - 500.0,
            "priceHigh": close + 1_000.0,
            "priceLow": close - 1_000.0,
            "priceClose": close,
            "totalVolume": 1_200_000
        })
    }

    #[tokio::test]
    async fn history_returns_sorted_weekday_bars_within_range() {
        let client = RecordingHttpClient::new().json(
            "historical-quotes",
            json!({"data": [
                quote_row(date!(2024 - 01 - 05), 91_000.0),
                quote_row(date!(2024 - 01 - 03), 89_500.0),
                quote_row(date!(2024 - 01 - 04), 90_200.0),
                quote_row(date!(2024 - 01 - 02), 88_000.0),
                quote_row(date!(2023 - 12 - 29), 87_000.0),
            ]}),
        );
        let (adapter, client) = adapter(client);
        let request = HistoryRequest::new(
            symbol("VCB"),
            date!(2024 - 01 - 01),
            date!(2024 - 01 - 05),
            Interval::OneDay,
        )
        .expect("valid request");

        let batch = adapter.fetch_history(request).await.expect("history should load");

        let dates: Vec<time::Date> = batch.iter().map(|bar| bar.date).collect();
        assert_eq!(
            dates,
            vec![
                date!(2024 - 01 - 02),
                date!(2024 - 01 - 03),
                date!(2024 - 01 - 04),
                date!(2024 - 01 - 05),
            ]
        );
        assert_eq!(batch.warnings, vec![DataWarning::RowsOutsideRange { dropped: 1 }]);

        let requests = client.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0]
            .url
            .ends_with("iboard-query.ssi.com.vn/stock/vcb/historical-quotes"));
        assert_eq!(
            requests[0].query_value("startDate"),
            Some(local_midnight_millis(date!(2024 - 01 - 01)).to_string().as_str())
        );
        assert_eq!(
            requests[0].headers.get("x-fiin-key").map(String::as_str),
            Some("KEY")
        );
    }

    /// Serves `total_rows` consecutive daily bars in `HISTORY_PAGE_SIZE` pages.
    #[derive(Default)]
    struct PagedHistoryClient {
        total_rows: usize,
        requests: std::sync::Mutex<Vec<HttpRequest>>,
    }

    impl HttpClient for PagedHistoryClient {
        fn execute<'a>(
            &'a self,
            request: HttpRequest,
        ) -> std::pin::Pin<
            Box<
                dyn std::future::Future<Output = Result<HttpResponse, crate::HttpError>>
                    + Send
                    + 'a,
            >,
        > {
            let page: usize = request
                .query_value("pageIndex")
                .and_then(|page| page.parse().ok())
                .unwrap_or(1);
            let first = (page - 1) * HISTORY_PAGE_SIZE;
            let last = (page * HISTORY_PAGE_SIZE).min(self.total_rows);
            let rows: Vec<serde_json::Value> = (first..last)
                .map(|offset| {
                    quote_row(
                        date!(1990 - 01 - 01) + time::Duration::days(offset as i64),
                        50_000.0,
                    )
                })
                .collect();
            self.requests
                .lock()
                .expect("request store should not be poisoned")
                .push(request);
            let body = json!({ "data": rows }).to_string();
            Box::pin(async move { Ok(HttpResponse::ok_json(body)) })
        }
    }

    async fn paged_history(total_rows: usize) -> (Batch<PriceBar>, usize) {
        let client = Arc::new(PagedHistoryClient {
            total_rows,
            ..PagedHistoryClient::default()
        });
        let adapter = SsiAdapter::new(
            ProviderConfig::ssi_default().with_retry(RetryConfig::no_retry()),
            client.clone(),
            Arc::new(FixedWorkbookDecoder::default()),
        );
        let request = HistoryRequest::new(
            symbol("VCB"),
            date!(1990 - 01 - 01),
            date!(2030 - 12 - 31),
            Interval::OneDay,
        )
        .expect("valid request");

        let batch = adapter.fetch_history(request).await.expect("history should load");
        let calls = client
            .requests
            .lock()
            .expect("request store should not be poisoned")
            .len();
        (batch, calls)
    }

    #[tokio::test]
    async fn history_follows_pages_until_a_short_page() {
        let (batch, calls) = paged_history(1_500).await;

        assert_eq!(calls, 2);
        assert_eq!(batch.len(), 1_500);
        assert!(batch.warnings.is_empty());
    }

    #[tokio::test]
    async fn history_reports_truncation_at_the_page_limit() {
        let (batch, calls) = paged_history(12_000).await;

        assert_eq!(calls, HISTORY_MAX_PAGES);
        assert_eq!(batch.len(), HISTORY_MAX_PAGES * HISTORY_PAGE_SIZE);
        assert_eq!(
            batch.warnings,
            vec![DataWarning::ResultTruncated {
                limit: HISTORY_MAX_PAGES * HISTORY_PAGE_SIZE
            }]
        );
    }

    #[tokio::test]
    async fn history_rejects_intraday_interval_before_any_request() {
        let (adapter, client) = adapter(RecordingHttpClient::new());
        let request = HistoryRequest::new(
            symbol("VCB"),
            date!(2024 - 01 - 01),
            date!(2024 - 01 - 05),
            Interval::OneMinute,
        )
        .expect("valid request");

        let error = adapter.fetch_history(request).await.expect_err("must fail");

        assert_eq!(error.kind(), SourceErrorKind::UnsupportedInterval);
        assert!(client.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn history_without_rows_is_an_empty_batch() {
        let client = RecordingHttpClient::new().json("historical-quotes", json!({"data": []}));
        let (adapter, _) = adapter(client);
        let request = HistoryRequest::new(
            symbol("VCB"),
            date!(2024 - 01 - 06),
            date!(2024 - 01 - 07),
            Interval::OneDay,
        )
        .expect("valid request");

        let batch = adapter.fetch_history(request).await.expect("no rows is not an error");
        assert!(batch.is_unavailable());
    }

    #[tokio::test]
    async fn history_row_without_prices_is_a_parse_error_with_fragment() {
        let client = RecordingHttpClient::new().json(
            "historical-quotes",
            json!({"data": [{"tradingDate": "2024-01-02", "closePriceRenamed": 1}]}),
        );
        let (adapter, _) = adapter(client);
        let request = HistoryRequest::new(
            symbol("VCB"),
            date!(2024 - 01 - 01),
            date!(2024 - 01 - 05),
            Interval::OneDay,
        )
        .expect("valid request");

        let error = adapter.fetch_history(request).await.expect_err("must fail");
        assert_eq!(error.kind(), SourceErrorKind::AdapterParse);
        assert!(error
            .fragment()
            .is_some_and(|fragment| fragment.contains("closePriceRenamed")));
    }

    #[tokio::test]
    async fn intraday_clamps_page_size_and_orders_ticks() {
        let client = RecordingHttpClient::new().json(
            "intraday-trades",
            json!({"data": [
                {"p": 90_100, "v": 200, "t": "09:15:02", "s": "B", "tradingDate": "2024-03-01"},
                {"p": "90,000", "v": 100, "t": "09:15:00", "s": "S", "tradingDate": "2024-03-01"},
            ]}),
        );
        let (adapter, client) = adapter(client);
        let request = IntradayRequest::new(symbol("FPT"), 5_000).expect("valid request");

        let batch = adapter.fetch_intraday(request).await.expect("ticks should load");

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.items[0].timestamp, datetime!(2024 - 03 - 01 09:15:00));
        assert_eq!(batch.items[0].side, TradeSide::Sell);
        assert_eq!(batch.items[1].side, TradeSide::Buy);
        assert_eq!(
            batch.warnings,
            vec![DataWarning::PageSizeClamped {
                requested: 5_000,
                applied: INTRADAY_MAX_PAGE_SIZE
            }]
        );
        assert_eq!(client.recorded_requests()[0].query_value("pageSize"), Some("1000"));
    }

    #[tokio::test]
    async fn depth_ranks_levels_per_side() {
        let client = RecordingHttpClient::new().json(
            "price-depth",
            json!({"data": {
                "bidPrice1": 90_000, "bidVol1": 1_000,
                "bidPrice2": 89_900, "bidVol2": 2_000,
                "bidPrice3": 0,
                "offerPrice1": 90_100, "offerVol1": 500
            }}),
        );
        let (adapter, _) = adapter(client);

        let batch = adapter.fetch_depth(symbol("VCB")).await.expect("depth should load");

        let levels: Vec<(BookSide, u8, f64)> = batch
            .iter()
            .map(|level| (level.side, level.rank, level.price))
            .collect();
        assert_eq!(
            levels,
            vec![
                (BookSide::Bid, 1, 90_000.0),
                (BookSide::Bid, 2, 89_900.0),
                (BookSide::Ask, 1, 90_100.0),
            ]
        );
    }

    #[tokio::test]
    async fn symbols_drop_rows_without_valid_tickers() {
        let client = RecordingHttpClient::new().json(
            "GetListOrganization",
            json!({"items": [
                {"ticker": "VCB", "organName": "Vietcombank", "comGroupCode": "HOSE", "icbName": "Ngân hàng"},
                {"ticker": "BOND-01", "comGroupCode": "HNX"},
                {"organName": "No ticker"}
            ]}),
        );
        let (adapter, _) = adapter(client);

        let batch = adapter.fetch_symbols().await.expect("listing should load");

        assert_eq!(batch.len(), 1);
        assert_eq!(batch.items[0].exchange, Exchange::Hose);
        assert_eq!(batch.items[0].industry.as_deref(), Some("Ngân hàng"));
        assert_eq!(batch.warnings.len(), 2);
    }

    #[tokio::test]
    async fn industries_are_sorted_by_order() {
        let client = RecordingHttpClient::new().json(
            "GetAllCompanyGroup",
            json!({"items": [
                {"comGroupCode": "VN30", "parentComGroupCode": "HOSE", "comGroupOrder": 2},
                {"comGroupCode": "HOSE", "parentComGroupCode": null, "comGroupOrder": 1},
            ]}),
        );
        let (adapter, client) = adapter(client);

        let batch = adapter
            .fetch_industries(Language::En)
            .await
            .expect("groups should load");

        let codes: Vec<&str> = batch.iter().map(|group| group.code.as_str()).collect();
        assert_eq!(codes, vec!["HOSE", "VN30"]);
        assert_eq!(client.recorded_requests()[0].query_value("language"), Some("en"));
    }

    fn statement_sheet() -> Vec<Sheet> {
        vec![Sheet {
            name: String::from("Sheet1"),
            rows: vec![
                vec![Cell::Text(String::from("Đơn vị: Tỷ VND"))],
                vec![
                    Cell::Text(String::from("Chỉ số")),
                    Cell::Text(String::from("Q4/2023")),
                    Cell::Text(String::from("Q1/2024")),
                ],
                vec![
                    Cell::Text(String::from("Tổng tài sản")),
                    Cell::Number(1_839_613.0),
                    Cell::Number(1_889_114.0),
                ],
            ],
        }]
    }

    #[tokio::test]
    async fn statement_downloads_workbook_and_maps_lines() {
        let client = RecordingHttpClient::new()
            .route("DownloadBalanceSheet", HttpResponse::ok_bytes(b"PK\x03\x04".to_vec()));
        let (adapter, client) = adapter_with_sheets(client, statement_sheet());
        let request = StatementRequest::new(
            symbol("VCB"),
            StatementType::BalanceSheet,
            Frequency::Quarterly,
            Language::Vi,
        );

        let batch = adapter
            .fetch_statement(request)
            .await
            .expect("statement should load");

        assert_eq!(batch.len(), 2);
        assert!(batch.iter().all(|line| line.unit == "billion"));
        let recorded = &client.recorded_requests()[0];
        assert_eq!(recorded.query_value("OrganCode"), Some("VCB"));
        assert_eq!(recorded.query_value("Frequency"), Some("Quarterly"));
    }

    #[tokio::test]
    async fn ratio_request_lists_every_ratio_code() {
        let client = RecordingHttpClient::new()
            .route("DownloadFinancialRatio2", HttpResponse::ok_bytes(b"PK".to_vec()));
        let (adapter, client) = adapter_with_sheets(client, statement_sheet());
        let request = StatementRequest::new(
            symbol("FPT"),
            StatementType::Ratio,
            Frequency::Yearly,
            Language::Vi,
        );

        adapter
            .fetch_statement(request)
            .await
            .expect("ratios should load");

        let recorded = &client.recorded_requests()[0];
        let codes = recorded
            .query
            .iter()
            .filter(|(key, _)| key == "Ratios")
            .count();
        assert_eq!(codes, RATIO_CODES.len());
        assert_eq!(recorded.query_value("CompareToIndustry"), Some("false"));
    }

    #[tokio::test]
    async fn statement_without_header_is_a_report_format_error() {
        let client = RecordingHttpClient::new()
            .route("DownloadCashFlow", HttpResponse::ok_bytes(b"PK".to_vec()));
        let sheets = vec![Sheet {
            name: String::from("Sheet1"),
            rows: vec![vec![Cell::Text(String::from("Tiền")), Cell::Number(1.0)]],
        }];
        let (adapter, _) = adapter_with_sheets(client, sheets);
        let request = StatementRequest::new(
            symbol("VCB"),
            StatementType::CashFlow,
            Frequency::Quarterly,
            Language::Vi,
        );

        let error = adapter.fetch_statement(request).await.expect_err("must fail");
        assert_eq!(error.kind(), SourceErrorKind::ReportFormat);
    }

    #[tokio::test]
    async fn html_instead_of_workbook_is_a_parse_error() {
        let client = RecordingHttpClient::new().route(
            "DownloadIncomeStatement",
            HttpResponse::ok_bytes(b"<html>login required</html>".to_vec()),
        );
        let (adapter, _) = adapter_with_sheets(client, statement_sheet());
        let request = StatementRequest::new(
            symbol("VCB"),
            StatementType::IncomeStatement,
            Frequency::Yearly,
            Language::Vi,
        );

        let error = adapter.fetch_statement(request).await.expect_err("must fail");
        assert_eq!(error.kind(), SourceErrorKind::AdapterParse);
        assert_eq!(error.fragment(), Some("<html>login required</html>"));
    }

    #[tokio::test]
    async fn ratio_comparison_sends_peers_and_attributes_columns() {
        let client = RecordingHttpClient::new()
            .route("DownloadFinancialRatio2", HttpResponse::ok_bytes(b"PK".to_vec()));
        let sheets = vec![Sheet {
            name: String::from("Sheet1"),
            rows: vec![
                vec![
                    Cell::Empty,
                    Cell::Text(String::from("VCB")),
                    Cell::Text(String::from("BID")),
                    Cell::Text(String::from("Trung bình ngành")),
                ],
                vec![
                    Cell::Text(String::from("Chỉ số")),
                    Cell::Text(String::from("2023")),
                    Cell::Text(String::from("2023")),
                    Cell::Text(String::from("2023")),
                ],
                vec![
                    Cell::Text(String::from("ROE")),
                    Cell::Number(0.21),
                    Cell::Number(0.19),
                    Cell::Number(0.16),
                ],
            ],
        }];
        let (adapter, client) = adapter_with_sheets(client, sheets);
        let request = RatioComparisonRequest::new(symbol("VCB"), Frequency::Yearly, Language::Vi)
            .with_peers([symbol("BID"), symbol("VCB")]);

        let batch = adapter
            .fetch_ratio_comparison(request)
            .await
            .expect("comparison should load");

        let subjects: Vec<String> = batch.iter().map(|line| line.subject.to_string()).collect();
        assert_eq!(subjects, vec!["VCB", "BID", "industry"]);
        let recorded = &client.recorded_requests()[0];
        assert_eq!(recorded.query_value("CompareToIndustry"), Some("true"));
        let peers: Vec<&str> = recorded
            .query
            .iter()
            .filter(|(key, _)| key == "CompareToCompanies")
            .map(|(_, value)| value.as_str())
            .collect();
        assert_eq!(peers, vec!["BID"]);
    }

    #[tokio::test]
    async fn top_movers_rank_rows_in_provider_order() {
        let client = RecordingHttpClient::new().json(
            "TopMover/GetTopLoss",
            json!({"items": [
                {"ticker": "HPG", "comGroupCode": "HOSE", "closePrice": 27_500,
                 "priceChange": -1_900, "percentPriceChange": -0.0646,
                 "totalMatchVolume": 48_000_000, "totalMatchValue": 1.3e12},
                {"ticker": "", "closePrice": 10_000},
                {"ticker": "NVL", "comGroupCode": "HOSE", "closePrice": 15_200,
                 "priceChange": -1_100, "percentPriceChange": -0.0675}
            ]}),
        );
        let (adapter, client) = adapter(client);
        let request = TopMoverRequest::new(MarketScope::Hose, MoverKind::Losers)
            .with_range(TimeRange::OneWeek);

        let batch = adapter
            .fetch_top_movers(request)
            .await
            .expect("rankings should load");

        let ranked: Vec<(u32, &str)> = batch
            .iter()
            .map(|mover| (mover.rank, mover.symbol.as_str()))
            .collect();
        assert_eq!(ranked, vec![(1, "HPG"), (2, "NVL")]);
        assert_eq!(batch.items[0].exchange, Some(Exchange::Hose));
        assert_eq!(batch.items[0].volume, Some(48_000_000));
        assert!(matches!(
            batch.warnings.as_slice(),
            [DataWarning::RowDropped { index: 1, .. }]
        ));
        let recorded = &client.recorded_requests()[0];
        assert_eq!(recorded.query_value("ComGroupCode"), Some("HOSE"));
        assert_eq!(recorded.query_value("TimeRange"), Some("OneWeek"));
        assert_eq!(recorded.query_value("language"), Some("vi"));
    }

    #[tokio::test]
    async fn empty_ranking_is_reported_unavailable() {
        let client = RecordingHttpClient::new().json("TopMover/GetTopGain", json!({"items": []}));
        let (adapter, _) = adapter(client);

        let batch = adapter
            .fetch_top_movers(TopMoverRequest::default())
            .await
            .expect("empty ranking is not an error");

        assert!(batch.is_empty());
        assert!(matches!(
            batch.warnings.as_slice(),
            [DataWarning::DataUnavailable {
                operation: Operation::TopMovers,
                ..
            }]
        ));
    }

    #[tokio::test]
    async fn foreign_trade_routes_venues_and_groups() {
        let client = RecordingHttpClient::new()
            .json(
                "stock/exchange/hose",
                json!({"data": [
                    {"ss": "VNM", "fBVol": 1_200_000, "fSVolume": 300_000,
                     "fBValue": 8.1e10, "fSValue": 2.0e10, "frr": 2.5e8}
                ]}),
            )
            .json(
                "stock/group/vn30",
                json!({"data": [{"ss": "FPT", "fBVol": 10, "fSVolume": 20}]}),
            );
        let (adapter, client) = adapter(client);

        let batch = adapter
            .fetch_foreign_trade(ForeignTradeRequest::new(
                MarketScope::Hose,
                ForeignTradeCriterion::SellValue,
            ))
            .await
            .expect("venue heatmap should load");
        let row = &batch.items[0];
        assert_eq!(row.symbol.as_str(), "VNM");
        assert_eq!(row.net_volume(), 900_000);
        assert_eq!(row.current_room, Some(2.5e8));

        let group = BoardScope::parse("VN30").expect("group code");
        let batch = adapter
            .fetch_foreign_trade(ForeignTradeRequest::new(group, ForeignTradeCriterion::BuyVolume))
            .await
            .expect("group heatmap should load");
        assert_eq!(batch.items[0].sell_value, 0.0);

        let recorded = client.recorded_requests();
        assert_eq!(recorded[0].query_value("Exchange"), Some("HOSE"));
        assert_eq!(recorded[0].query_value("Criteria"), Some("FrSellVal"));
        assert!(recorded[1].url.ends_with("stock/group/vn30"));
        assert_eq!(recorded[1].query_value("Exchange"), Some("VN30"));
    }

    #[tokio::test]
    async fn foreign_row_without_flow_fields_is_a_parse_error() {
        let client = RecordingHttpClient::new()
            .json("stock/exchange/all", json!({"data": [{"ss": "VNM", "lastPrice": 1}]}));
        let (adapter, _) = adapter(client);

        let error = adapter
            .fetch_foreign_trade(ForeignTradeRequest::new(
                MarketScope::All,
                ForeignTradeCriterion::BuyValue,
            ))
            .await
            .expect_err("must fail");

        assert_eq!(error.kind(), SourceErrorKind::AdapterParse);
    }

    #[tokio::test]
    async fn market_indices_map_latest_levels() {
        let client = RecordingHttpClient::new().json(
            "GetLatestIndices",
            json!({"items": [
                {"comGroupCode": "VNINDEX", "indexValue": 1_254.3, "indexChange": -3.2,
                 "percentIndexChange": -0.0025, "totalMatchVolume": 650_000_000,
                 "totalMatchValue": 1.5e13, "tradingDate": "2024-05-10T00:00:00"},
                {"comGroupCode": "VN30", "indexValue": -1}
            ]}),
        );
        let (adapter, client) = adapter(client);

        let batch = adapter
            .fetch_market_indices()
            .await
            .expect("indices should load");

        assert_eq!(batch.len(), 1);
        let index = &batch.items[0];
        assert_eq!(index.code, "VNINDEX");
        assert_eq!(index.change, Some(-3.2));
        assert_eq!(index.trading_date, Some(date!(2024 - 05 - 10)));
        assert!(matches!(
            batch.warnings.as_slice(),
            [DataWarning::RowDropped { index: 1, .. }]
        ));
        let recorded = &client.recorded_requests()[0];
        assert_eq!(recorded.query_value("pageSize"), Some("999999"));
        assert_eq!(recorded.query_value("status"), Some("1"));
    }

    #[tokio::test]
    async fn company_overview_maps_nested_sections() {
        let client = RecordingHttpClient::new().json(
            "GetCompanyProfile",
            json!({"items": [{
                "organName": "Ngân hàng TMCP Ngoại thương Việt Nam",
                "foundingDate": "1963-04-01",
                "icbName": "Ngân hàng",
                "shareholders": [
                    {"name": "Ngân hàng Nhà nước", "percentage": 74.8},
                    {"name": "Mizuho", "ownership": 0.15},
                    {"name": "Broken", "percentage": 180}
                ],
                "events": [
                    {"eventDate": "2024-05-10", "eventName": "ĐHCĐ thường niên"},
                    {"eventDate": "2023-11-01", "eventName": "Chia cổ tức"}
                ],
                "dividends": [
                    {"exrightDate": "2023-10-20", "cashDividend": 800, "dividendType": "Cash"}
                ]
            }]}),
        );
        let (adapter, _) = adapter(client);

        let profile = adapter
            .fetch_company_overview(symbol("VCB"))
            .await
            .expect("profile should load");

        assert_eq!(profile.founded, Some(date!(1963 - 04 - 01)));
        assert_eq!(profile.shareholders.len(), 2);
        assert!((profile.shareholders[1].percent - 15.0).abs() < 1e-9);
        assert_eq!(profile.events[0].date, date!(2023 - 11 - 01));
        assert_eq!(profile.dividends[0].kind, DividendKind::Cash);
    }

    #[tokio::test]
    async fn company_overview_without_profile_is_data_unavailable() {
        let client = RecordingHttpClient::new().json("GetCompanyProfile", json!({"items": []}));
        let (adapter, _) = adapter(client);

        let error = adapter
            .fetch_company_overview(symbol("VCB"))
            .await
            .expect_err("must fail");
        assert_eq!(error.kind(), SourceErrorKind::DataUnavailable);
    }

    #[tokio::test]
    async fn empty_price_board_makes_no_request() {
        let (adapter, client) = adapter(RecordingHttpClient::new());

        let batch = adapter
            .fetch_price_board(PriceBoardRequest::new(Vec::<String>::new()))
            .await
            .expect("empty board is not an error");

        assert!(batch.is_empty());
        assert!(batch.warnings.is_empty());
        assert!(client.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn price_board_omits_unknown_and_malformed_symbols() {
        let client = RecordingHttpClient::new().json(
            "price-board",
            json!({"data": [
                {"ss": "VCB", "mp": 91_000, "r": 90_000, "c": 96_300, "f": 83_700,
                 "best1Bid": 90_900, "best1BidVol": 1_500, "best1Offer": 91_000, "best1OfferVol": 700,
                 "frr": 150_000_000, "mtq": 1_250_300},
                {"ss": "FPT", "mp": 100_000}
            ]}),
        );
        let (adapter, client) = adapter(client);

        let batch = adapter
            .fetch_price_board(PriceBoardRequest::new(["vcb", "XYZ", "FPT", "bad symbol"]))
            .await
            .expect("partial board is not an error");

        assert_eq!(batch.len(), 1);
        let row = &batch.items[0];
        assert_eq!(row.symbol.as_str(), "VCB");
        assert_eq!(row.bids.len(), 1);
        assert_eq!(row.asks[0].price, 91_000.0);
        let omitted: Vec<&str> = batch
            .warnings
            .iter()
            .filter_map(|warning| match warning {
                DataWarning::SymbolOmitted { symbol, .. } => Some(symbol.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(omitted, vec!["bad symbol", "XYZ", "FPT"]);
        assert_eq!(
            client.recorded_requests()[0].query_value("symbols"),
            Some("vcb,xyz,fpt")
        );
    }

    #[tokio::test]
    async fn server_error_surfaces_as_transport_error() {
        let client = RecordingHttpClient::new()
            .route("price-depth", HttpResponse::new(503, b"busy".to_vec()));
        let (adapter, _) = adapter(client);

        let error = adapter.fetch_depth(symbol("VCB")).await.expect_err("must fail");
        assert_eq!(
            error.kind(),
            SourceErrorKind::Transport(TransportFailure::HttpStatus(503))
        );
        assert!(error.retryable());
    }
}
