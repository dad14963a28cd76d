use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::{Date, PrimitiveDateTime};

use crate::domain::timestamp::{iso_date, iso_datetime};
use crate::{Symbol, ValidationError};

/// Daily (or coarser) OHLCV bar. Daily bars carry a date only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub symbol: Symbol,
    #[serde(with = "iso_date")]
    pub date: Date,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl PriceBar {
    /// Builds a bar, enforcing `high >= max(open, close) >= min(open, close) >= low >= 0`.
    pub fn new(
        symbol: Symbol,
        date: Date,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Result<Self, ValidationError> {
        validate_non_negative("open", open)?;
        validate_non_negative("high", high)?;
        validate_non_negative("low", low)?;
        validate_non_negative("close", close)?;

        if high < low {
            return Err(ValidationError::InvalidBarRange);
        }

        if open < low || open > high || close < low || close > high {
            return Err(ValidationError::InvalidBarBounds);
        }

        Ok(Self {
            symbol,
            date,
            open,
            high,
            low,
            close,
            volume,
        })
    }
}

/// Aggressor side of a matched trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeSide {
    Buy,
    Sell,
    Unknown,
}

impl TradeSide {
    /// Maps the side markers providers use (`B`/`S`, `BU`/`SD`, `buy`/`sell`).
    pub fn from_provider(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "B" | "BU" | "BUY" => Self::Buy,
            "S" | "SD" | "SELL" => Self::Sell,
            _ => Self::Unknown,
        }
    }
}

/// Single matched trade from the intraday tape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntradayTick {
    pub symbol: Symbol,
    #[serde(with = "iso_datetime")]
    pub timestamp: PrimitiveDateTime,
    pub price: f64,
    pub volume: u64,
    pub side: TradeSide,
}

impl IntradayTick {
    pub fn new(
        symbol: Symbol,
        timestamp: PrimitiveDateTime,
        price: f64,
        volume: u64,
        side: TradeSide,
    ) -> Result<Self, ValidationError> {
        validate_non_negative("price", price)?;
        Ok(Self {
            symbol,
            timestamp,
            price,
            volume,
            side,
        })
    }
}

/// Order book side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookSide {
    Bid,
    Ask,
}

/// One price level of the order book; rank 1 is the best price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthLevel {
    pub symbol: Symbol,
    pub side: BookSide,
    pub price: f64,
    pub volume: u64,
    pub rank: u8,
}

impl DepthLevel {
    pub fn new(
        symbol: Symbol,
        side: BookSide,
        price: f64,
        volume: u64,
        rank: u8,
    ) -> Result<Self, ValidationError> {
        validate_non_negative("price", price)?;
        if rank == 0 {
            return Err(ValidationError::InvalidDepthRank);
        }
        Ok(Self {
            symbol,
            side,
            price,
            volume,
            rank,
        })
    }
}

/// Listing venue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Exchange {
    Hose,
    Hnx,
    Upcom,
    Other(String),
}

impl Exchange {
    pub fn from_provider(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "HOSE" | "HSX" => Self::Hose,
            "HNX" => Self::Hnx,
            "UPCOM" => Self::Upcom,
            other => Self::Other(other.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Hose => "HOSE",
            Self::Hnx => "HNX",
            Self::Upcom => "UPCOM",
            Self::Other(value) => value.as_str(),
        }
    }
}

impl Display for Exchange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Active,
    Delisted,
    Unknown,
}

impl ListingStatus {
    pub fn from_provider(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "listed" | "active" | "1" => Self::Active,
            "delisted" | "inactive" | "0" => Self::Delisted,
            _ => Self::Unknown,
        }
    }
}

/// Symbol directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolListing {
    pub symbol: Symbol,
    pub name: Option<String>,
    pub exchange: Exchange,
    pub industry: Option<String>,
    pub status: ListingStatus,
}

/// Industry classification node (ICB-style tree).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndustryGroup {
    pub code: String,
    pub parent_code: Option<String>,
    pub order: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementType {
    BalanceSheet,
    IncomeStatement,
    CashFlow,
    Ratio,
}

impl StatementType {
    pub const ALL: [Self; 4] = [
        Self::BalanceSheet,
        Self::IncomeStatement,
        Self::CashFlow,
        Self::Ratio,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BalanceSheet => "balance_sheet",
            Self::IncomeStatement => "income_statement",
            Self::CashFlow => "cash_flow",
            Self::Ratio => "ratio",
        }
    }
}

impl Display for StatementType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reporting period granularity for financial statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frequency {
    Quarterly,
    Yearly,
}

impl Frequency {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Quarterly => "Quarterly",
            Self::Yearly => "Yearly",
        }
    }
}

impl Display for Frequency {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "quarterly" | "quarter" | "q" => Ok(Self::Quarterly),
            "yearly" | "year" | "annual" | "y" => Ok(Self::Yearly),
            other => Err(ValidationError::InvalidFrequency {
                value: other.to_owned(),
            }),
        }
    }
}

/// Response language for label-bearing endpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Vi,
    En,
}

impl Language {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vi => "vi",
            Self::En => "en",
        }
    }
}

impl Display for Language {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "vi" => Ok(Self::Vi),
            "en" => Ok(Self::En),
            other => Err(ValidationError::InvalidLanguage {
                value: other.to_owned(),
            }),
        }
    }
}

/// Fiscal period: a year, optionally narrowed to a quarter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Period {
    pub year: i32,
    pub quarter: Option<u8>,
}

impl Period {
    pub fn new(year: i32, quarter: Option<u8>) -> Result<Self, ValidationError> {
        if let Some(value) = quarter {
            if !(1..=4).contains(&value) {
                return Err(ValidationError::InvalidQuarter { value });
            }
        }
        Ok(Self { year, quarter })
    }

    pub const fn yearly(year: i32) -> Self {
        Self {
            year,
            quarter: None,
        }
    }

    /// Reads report column headers such as `Q1/2024`, `Quý 1 2024`, `Q1-2024`,
    /// `2024`, `Năm 2024` or `FY2024`. Returns `None` for non-period labels.
    pub fn parse_label(label: &str) -> Option<Self> {
        let upper = label.trim().to_uppercase();
        if upper.is_empty() {
            return None;
        }

        let mut year = None;
        let mut quarter = None;
        let mut run = String::new();
        let mut runs = Vec::new();
        for ch in upper.chars() {
            if ch.is_ascii_digit() {
                run.push(ch);
            } else if !run.is_empty() {
                runs.push(std::mem::take(&mut run));
            }
        }
        if !run.is_empty() {
            runs.push(run);
        }

        for digits in runs {
            match digits.len() {
                4 => {
                    let value: i32 = digits.parse().ok()?;
                    if !(1900..=2100).contains(&value) || year.is_some() {
                        return None;
                    }
                    year = Some(value);
                }
                1 => {
                    let value: u8 = digits.parse().ok()?;
                    if quarter.is_some() {
                        return None;
                    }
                    quarter = Some(value);
                }
                _ => return None,
            }
        }

        let year = year?;
        match quarter {
            Some(value) if upper.contains('Q') => Self::new(year, Some(value)).ok(),
            Some(_) => None,
            None => Some(Self::yearly(year)),
        }
    }
}

impl Display for Period {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.quarter {
            Some(quarter) => write!(f, "{}-Q{quarter}", self.year),
            None => write!(f, "{}", self.year),
        }
    }
}

/// One cell of a financial statement: a labeled line item for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialStatementLine {
    pub symbol: Symbol,
    pub period: Period,
    pub statement: StatementType,
    pub line_item: String,
    pub value: f64,
    /// Scale of `value`: `one`, `thousand`, `million`, `billion` or `ratio`.
    pub unit: String,
    pub currency: String,
}

impl FinancialStatementLine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        symbol: Symbol,
        period: Period,
        statement: StatementType,
        line_item: impl Into<String>,
        value: f64,
        unit: impl Into<String>,
        currency: impl AsRef<str>,
    ) -> Result<Self, ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::NonFiniteValue { field: "value" });
        }
        Ok(Self {
            symbol,
            period,
            statement,
            line_item: line_item.into(),
            value,
            unit: unit.into(),
            currency: validate_currency_code(currency.as_ref())?,
        })
    }
}

/// Whose figures a ratio-comparison column holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "symbol")]
pub enum ComparisonSubject {
    Company(Symbol),
    /// Industry average published next to the company figures.
    Industry,
}

impl Display for ComparisonSubject {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Company(symbol) => f.write_str(symbol.as_str()),
            Self::Industry => f.write_str("industry"),
        }
    }
}

/// One ratio for one subject and period in a peer/industry comparison.
/// `(subject, period, line_item)` is unique within a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioComparisonLine {
    pub subject: ComparisonSubject,
    pub period: Period,
    pub line_item: String,
    pub value: f64,
    pub unit: String,
}

impl RatioComparisonLine {
    pub fn new(
        subject: ComparisonSubject,
        period: Period,
        line_item: impl Into<String>,
        value: f64,
        unit: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::NonFiniteValue { field: "value" });
        }
        Ok(Self {
            subject,
            period,
            line_item: line_item.into(),
            value,
            unit: unit.into(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shareholder {
    pub name: String,
    /// Ownership in percent (0..=100).
    pub percent: f64,
}

impl Shareholder {
    pub fn new(name: impl Into<String>, percent: f64) -> Result<Self, ValidationError> {
        if !percent.is_finite() || !(0.0..=100.0).contains(&percent) {
            return Err(ValidationError::InvalidOwnership { value: percent });
        }
        Ok(Self {
            name: name.into(),
            percent,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyEvent {
    #[serde(with = "iso_date")]
    pub date: Date,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DividendKind {
    Cash,
    Stock,
    Other,
}

impl DividendKind {
    pub fn from_provider(value: &str) -> Self {
        let lower = value.trim().to_lowercase();
        if lower.contains("cash") || lower.contains("tiền") {
            Self::Cash
        } else if lower.contains("share") || lower.contains("stock") || lower.contains("cổ phiếu") {
            Self::Stock
        } else {
            Self::Other
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dividend {
    #[serde(with = "iso_date")]
    pub ex_date: Date,
    pub amount: f64,
    pub kind: DividendKind,
}

impl Dividend {
    pub fn new(ex_date: Date, amount: f64, kind: DividendKind) -> Result<Self, ValidationError> {
        validate_non_negative("amount", amount)?;
        Ok(Self {
            ex_date,
            amount,
            kind,
        })
    }
}

/// Company metadata bundle returned by overview calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub symbol: Symbol,
    pub name: String,
    #[serde(with = "iso_date::option")]
    pub founded: Option<Date>,
    pub industry: Option<String>,
    pub shareholders: Vec<Shareholder>,
    pub events: Vec<CompanyEvent>,
    pub dividends: Vec<Dividend>,
}

/// Live board snapshot for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBoardRow {
    pub symbol: Symbol,
    /// Absent before the first match of the session.
    pub last_price: Option<f64>,
    pub reference_price: f64,
    pub ceiling: f64,
    pub floor: f64,
    pub bids: Vec<DepthLevel>,
    pub asks: Vec<DepthLevel>,
    pub foreign_room: Option<f64>,
    pub total_volume: u64,
}

impl PriceBoardRow {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        symbol: Symbol,
        last_price: Option<f64>,
        reference_price: f64,
        ceiling: f64,
        floor: f64,
        bids: Vec<DepthLevel>,
        asks: Vec<DepthLevel>,
        foreign_room: Option<f64>,
        total_volume: u64,
    ) -> Result<Self, ValidationError> {
        validate_optional_non_negative("last_price", last_price)?;
        validate_non_negative("reference_price", reference_price)?;
        validate_non_negative("ceiling", ceiling)?;
        validate_non_negative("floor", floor)?;
        validate_optional_non_negative("foreign_room", foreign_room)?;

        Ok(Self {
            symbol,
            last_price,
            reference_price,
            ceiling,
            floor,
            bids,
            asks,
            foreign_room,
            total_volume,
        })
    }
}

/// Validate and normalize currency to uppercase 3-letter code.
pub fn validate_currency_code(input: &str) -> Result<String, ValidationError> {
    let normalized = input.trim().to_ascii_uppercase();
    let is_valid = normalized.len() == 3 && normalized.chars().all(|ch| ch.is_ascii_alphabetic());

    if !is_valid {
        return Err(ValidationError::InvalidCurrency {
            value: input.to_owned(),
        });
    }

    Ok(normalized)
}

pub(super) fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}

pub(super) fn validate_optional_non_negative(
    field: &'static str,
    value: Option<f64>,
) -> Result<(), ValidationError> {
    if let Some(value) = value {
        validate_non_negative(field, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn vcb() -> Symbol {
        Symbol::parse("VCB").expect("valid symbol")
    }

    #[test]
    fn validates_currency() {
        assert_eq!(validate_currency_code("vnd").expect("must normalize"), "VND");
        assert!(matches!(
            validate_currency_code("VNDC"),
            Err(ValidationError::InvalidCurrency { .. })
        ));
    }

    #[test]
    fn rejects_invalid_bar_bounds() {
        let err = PriceBar::new(vcb(), date!(2024 - 01 - 02), 10.0, 12.0, 9.0, 12.5, 10)
            .expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidBarBounds));
    }

    #[test]
    fn rejects_negative_low() {
        let err = PriceBar::new(vcb(), date!(2024 - 01 - 02), 1.0, 2.0, -1.0, 1.5, 10)
            .expect_err("must fail");
        assert!(matches!(err, ValidationError::NegativeValue { field: "low" }));
    }

    #[test]
    fn rejects_zero_depth_rank() {
        let err = DepthLevel::new(vcb(), BookSide::Bid, 90_000.0, 100, 0).expect_err("must fail");
        assert_eq!(err, ValidationError::InvalidDepthRank);
    }

    #[test]
    fn maps_provider_markers() {
        assert_eq!(TradeSide::from_provider("b"), TradeSide::Buy);
        assert_eq!(TradeSide::from_provider("SD"), TradeSide::Sell);
        assert_eq!(TradeSide::from_provider("ATO"), TradeSide::Unknown);
        assert_eq!(Exchange::from_provider("hsx"), Exchange::Hose);
        assert_eq!(Exchange::from_provider("otc"), Exchange::Other(String::from("OTC")));
        assert_eq!(ListingStatus::from_provider("LISTED"), ListingStatus::Active);
        assert_eq!(DividendKind::from_provider("Cổ tức bằng tiền"), DividendKind::Cash);
    }

    #[test]
    fn parses_period_labels() {
        let q1 = Period::new(2024, Some(1)).expect("valid period");
        assert_eq!(Period::parse_label("Q1/2024"), Some(q1));
        assert_eq!(Period::parse_label("Q1 2024"), Some(q1));
        assert_eq!(Period::parse_label("Quý 1/2024"), Some(q1));
        assert_eq!(Period::parse_label("2023"), Some(Period::yearly(2023)));
        assert_eq!(Period::parse_label("Năm 2023"), Some(Period::yearly(2023)));
        assert_eq!(Period::parse_label("FY2023"), Some(Period::yearly(2023)));
        assert_eq!(Period::parse_label("Chỉ số"), None);
        assert_eq!(Period::parse_label("Q5/2024"), None);
        assert_eq!(Period::parse_label("12345"), None);
    }

    #[test]
    fn period_display_and_order() {
        let q4 = Period::new(2023, Some(4)).expect("valid");
        let q1 = Period::new(2024, Some(1)).expect("valid");
        assert_eq!(q4.to_string(), "2023-Q4");
        assert!(q4 < q1);
    }

    #[test]
    fn parses_frequency_and_language() {
        assert_eq!(Frequency::from_str("quarterly").expect("valid"), Frequency::Quarterly);
        assert_eq!(Frequency::from_str("Yearly").expect("valid"), Frequency::Yearly);
        assert!(Frequency::from_str("monthly").is_err());
        assert_eq!(Language::from_str("EN").expect("valid"), Language::En);
        assert!(matches!(
            Language::from_str("fr"),
            Err(ValidationError::InvalidLanguage { .. })
        ));
    }

    #[test]
    fn rejects_out_of_range_ownership() {
        assert!(Shareholder::new("State Bank", 74.8).is_ok());
        assert!(Shareholder::new("Typo", 140.0).is_err());
    }
}
