use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::Date;

use super::models::{validate_non_negative, validate_optional_non_negative};
use crate::domain::timestamp::iso_date;
use crate::{Exchange, Symbol, ValidationError};

/// Market-wide scope for ranking endpoints: the whole market or one venue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketScope {
    #[default]
    All,
    Hose,
    Hnx,
    Upcom,
}

impl MarketScope {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "All",
            Self::Hose => "HOSE",
            Self::Hnx => "HNX",
            Self::Upcom => "UPCOM",
        }
    }
}

impl Display for MarketScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MarketScope {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ALL" => Ok(Self::All),
            "HOSE" | "HSX" => Ok(Self::Hose),
            "HNX" => Ok(Self::Hnx),
            "UPCOM" => Ok(Self::Upcom),
            other => Err(ValidationError::InvalidMarketScope {
                value: other.to_owned(),
            }),
        }
    }
}

/// Scope of a board snapshot: a venue, or an index basket such as `VN30`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardScope {
    Market(MarketScope),
    Group(Symbol),
}

impl BoardScope {
    /// Venue names map to [`BoardScope::Market`]; anything else must be a
    /// valid group code.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        match MarketScope::from_str(input) {
            Ok(scope) => Ok(Self::Market(scope)),
            Err(_) => Symbol::parse(input).map(Self::Group),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::Market(scope) => scope.as_str(),
            Self::Group(group) => group.as_str(),
        }
    }
}

impl Default for BoardScope {
    fn default() -> Self {
        Self::Market(MarketScope::Hose)
    }
}

impl From<MarketScope> for BoardScope {
    fn from(scope: MarketScope) -> Self {
        Self::Market(scope)
    }
}

/// Ranking criterion for top movers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoverKind {
    #[default]
    Gainers,
    Losers,
    Value,
    Volume,
}

impl MoverKind {
    pub const ALL: [Self; 4] = [Self::Gainers, Self::Losers, Self::Value, Self::Volume];

    /// Endpoint suffix, `TopMover/Get{…}`.
    pub const fn endpoint(self) -> &'static str {
        match self {
            Self::Gainers => "TopGain",
            Self::Losers => "TopLoss",
            Self::Value => "TopValue",
            Self::Volume => "TopVolume",
        }
    }
}

impl FromStr for MoverKind {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "gainers" | "topgain" | "gain" => Ok(Self::Gainers),
            "losers" | "toploss" | "loss" => Ok(Self::Losers),
            "value" | "topvalue" => Ok(Self::Value),
            "volume" | "topvolume" => Ok(Self::Volume),
            other => Err(ValidationError::InvalidMoverKind {
                value: other.to_owned(),
            }),
        }
    }
}

/// Look-back window for rankings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeRange {
    #[default]
    OneDay,
    OneWeek,
    OneMonth,
}

impl TimeRange {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OneDay => "OneDay",
            Self::OneWeek => "OneWeek",
            Self::OneMonth => "OneMonth",
        }
    }
}

impl Display for TimeRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Heatmap metric for foreign investor flows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForeignTradeCriterion {
    #[default]
    BuyValue,
    SellValue,
    BuyVolume,
    SellVolume,
}

impl ForeignTradeCriterion {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BuyValue => "FrBuyVal",
            Self::SellValue => "FrSellVal",
            Self::BuyVolume => "FrBuyVol",
            Self::SellVolume => "FrSellVol",
        }
    }
}

impl Display for ForeignTradeCriterion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a top-movers ranking. `rank` starts at 1 in provider order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopMover {
    pub rank: u32,
    pub symbol: Symbol,
    pub exchange: Option<Exchange>,
    pub price: f64,
    pub change: Option<f64>,
    pub change_percent: Option<f64>,
    pub volume: Option<u64>,
    pub value: Option<f64>,
}

impl TopMover {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        rank: u32,
        symbol: Symbol,
        exchange: Option<Exchange>,
        price: f64,
        change: Option<f64>,
        change_percent: Option<f64>,
        volume: Option<u64>,
        value: Option<f64>,
    ) -> Result<Self, ValidationError> {
        if rank == 0 {
            return Err(ValidationError::InvalidRank);
        }
        validate_non_negative("price", price)?;
        validate_optional_non_negative("value", value)?;
        if change.is_some_and(|change| !change.is_finite()) {
            return Err(ValidationError::NonFiniteValue { field: "change" });
        }
        if change_percent.is_some_and(|percent| !percent.is_finite()) {
            return Err(ValidationError::NonFiniteValue {
                field: "change_percent",
            });
        }

        Ok(Self {
            rank,
            symbol,
            exchange,
            price,
            change,
            change_percent,
            volume,
            value,
        })
    }
}

/// Foreign investor activity for one symbol in the current session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignTradeRow {
    pub symbol: Symbol,
    pub buy_volume: u64,
    pub sell_volume: u64,
    pub buy_value: f64,
    pub sell_value: f64,
    pub current_room: Option<f64>,
}

impl ForeignTradeRow {
    pub fn new(
        symbol: Symbol,
        buy_volume: u64,
        sell_volume: u64,
        buy_value: f64,
        sell_value: f64,
        current_room: Option<f64>,
    ) -> Result<Self, ValidationError> {
        validate_non_negative("buy_value", buy_value)?;
        validate_non_negative("sell_value", sell_value)?;
        validate_optional_non_negative("current_room", current_room)?;

        Ok(Self {
            symbol,
            buy_volume,
            sell_volume,
            buy_value,
            sell_value,
            current_room,
        })
    }

    pub fn net_value(&self) -> f64 {
        self.buy_value - self.sell_value
    }

    pub fn net_volume(&self) -> i64 {
        self.buy_volume as i64 - self.sell_volume as i64
    }
}

/// Latest level of a market index (VNINDEX, VN30, HNXIndex, …).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketIndex {
    pub code: String,
    pub value: f64,
    pub change: Option<f64>,
    pub change_percent: Option<f64>,
    pub volume: Option<u64>,
    pub traded_value: Option<f64>,
    #[serde(with = "iso_date::option")]
    pub trading_date: Option<Date>,
}

impl MarketIndex {
    pub fn new(code: impl Into<String>, value: f64) -> Result<Self, ValidationError> {
        validate_non_negative("value", value)?;
        Ok(Self {
            code: code.into(),
            value,
            change: None,
            change_percent: None,
            volume: None,
            traded_value: None,
            trading_date: None,
        })
    }

    pub fn with_change(mut self, change: Option<f64>, change_percent: Option<f64>) -> Self {
        self.change = change.filter(|value| value.is_finite());
        self.change_percent = change_percent.filter(|value| value.is_finite());
        self
    }

    pub fn with_turnover(mut self, volume: Option<u64>, traded_value: Option<f64>) -> Self {
        self.volume = volume;
        self.traded_value = traded_value.filter(|value| value.is_finite() && *value >= 0.0);
        self
    }

    pub fn with_trading_date(mut self, trading_date: Option<Date>) -> Self {
        self.trading_date = trading_date;
        self
    }
}
