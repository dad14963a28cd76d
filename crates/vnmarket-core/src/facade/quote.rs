use std::sync::Arc;

use time::Date;

use super::Binding;
use crate::data_source::{Batch, HistoryRequest, IntradayRequest, Operation, SourceError};
use crate::domain::timestamp::{local_today, trailing_year};
use crate::registry::SourceRegistry;
use crate::{DepthLevel, Interval, IntradayTick, PriceBar, Symbol};

/// History parameters; unset dates default to the trailing year ending today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryOptions {
    pub start: Option<Date>,
    pub end: Option<Date>,
    pub interval: Interval,
    pub count_back: Option<usize>,
}

impl Default for HistoryOptions {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            interval: Interval::OneDay,
            count_back: None,
        }
    }
}

impl HistoryOptions {
    /// Concrete `[start, end]` with defaults applied against `today`.
    pub fn resolve_range(&self, today: Date) -> (Date, Date) {
        let end = self.end.unwrap_or(today);
        let start = self.start.unwrap_or_else(|| trailing_year(end).0);
        (start, end)
    }
}

/// Prices: daily history, the intraday tape and order-book depth.
#[derive(Clone)]
pub struct Quote {
    binding: Binding,
}

impl Quote {
    pub fn new(
        registry: Arc<SourceRegistry>,
        source: &str,
        symbol: &str,
    ) -> Result<Self, SourceError> {
        Ok(Self {
            binding: Binding::new(registry, source, symbol)?,
        })
    }

    pub fn symbol(&self) -> &Symbol {
        &self.binding.symbol
    }

    pub fn source(&self) -> &str {
        &self.binding.source
    }

    pub async fn history(
        &self,
        start: Option<Date>,
        end: Option<Date>,
        interval: Interval,
    ) -> Result<Batch<PriceBar>, SourceError> {
        self.history_with(HistoryOptions {
            start,
            end,
            interval,
            count_back: None,
        })
        .await
    }

    pub async fn history_with(&self, options: HistoryOptions) -> Result<Batch<PriceBar>, SourceError> {
        let adapter = self.binding.adapter(Operation::History)?;
        let (start, end) = options.resolve_range(local_today());
        let mut request =
            HistoryRequest::new(self.binding.symbol.clone(), start, end, options.interval)?;
        if let Some(count_back) = options.count_back {
            request = request.with_count_back(count_back);
        }
        adapter.fetch_history(request).await
    }

    /// One page of matched trades; `page_size` above the provider cap is
    /// clamped by the adapter.
    pub async fn intraday(
        &self,
        page_size: usize,
        page: usize,
    ) -> Result<Batch<IntradayTick>, SourceError> {
        let adapter = self.binding.adapter(Operation::Intraday)?;
        let request = IntradayRequest::new(self.binding.symbol.clone(), page_size)?.with_page(page);
        adapter.fetch_intraday(request).await
    }

    pub async fn depth(&self) -> Result<Batch<DepthLevel>, SourceError> {
        let adapter = self.binding.adapter(Operation::Depth)?;
        adapter.fetch_depth(self.binding.symbol.clone()).await
    }
}
