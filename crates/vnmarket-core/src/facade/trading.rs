use std::sync::Arc;

use super::Binding;
use crate::data_source::{
    Batch, ForeignTradeRequest, Operation, PriceBoardRequest, SourceError, TopMoverRequest,
};
use crate::registry::SourceRegistry;
use crate::{
    BoardScope, ForeignTradeCriterion, ForeignTradeRow, MarketIndex, MarketScope, MoverKind,
    PriceBoardRow, TopMover,
};

#[derive(Clone)]
pub struct Trading {
    binding: Binding,
}

impl Trading {
    pub fn new(
        registry: Arc<SourceRegistry>,
        source: &str,
        symbol: &str,
    ) -> Result<Self, SourceError> {
        Ok(Self {
            binding: Binding::new(registry, source, symbol)?,
        })
    }

    /// Live board rows for `symbols`, deduplicated, in request order.
    /// Malformed or unknown symbols are omitted with a warning.
    pub async fn price_board<I, S>(&self, symbols: I) -> Result<Batch<PriceBoardRow>, SourceError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let adapter = self.binding.adapter(Operation::PriceBoard)?;
        adapter
            .fetch_price_board(PriceBoardRequest::new(symbols))
            .await
    }

    /// Board row for the bound symbol only.
    pub async fn own_price_board(&self) -> Result<Batch<PriceBoardRow>, SourceError> {
        self.price_board([self.binding.symbol.as_str()]).await
    }

    /// One-day ranking for `scope`.
    pub async fn top_movers(
        &self,
        scope: MarketScope,
        kind: MoverKind,
    ) -> Result<Batch<TopMover>, SourceError> {
        self.top_movers_with(TopMoverRequest::new(scope, kind)).await
    }

    pub async fn top_movers_with(
        &self,
        request: TopMoverRequest,
    ) -> Result<Batch<TopMover>, SourceError> {
        let adapter = self.binding.adapter(Operation::TopMovers)?;
        adapter.fetch_top_movers(request).await
    }

    /// Foreign investor flows for a venue or an index basket.
    pub async fn foreign_trade(
        &self,
        scope: impl Into<BoardScope>,
        criterion: ForeignTradeCriterion,
    ) -> Result<Batch<ForeignTradeRow>, SourceError> {
        let adapter = self.binding.adapter(Operation::ForeignTrade)?;
        adapter
            .fetch_foreign_trade(ForeignTradeRequest::new(scope, criterion))
            .await
    }

    pub async fn market_indices(&self) -> Result<Batch<MarketIndex>, SourceError> {
        let adapter = self.binding.adapter(Operation::MarketIndices)?;
        adapter.fetch_market_indices().await
    }
}
