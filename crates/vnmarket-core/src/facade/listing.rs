use std::sync::Arc;

use super::Binding;
use crate::data_source::{Batch, Operation, SourceError};
use crate::registry::SourceRegistry;
use crate::{Exchange, IndustryGroup, Language, SymbolListing};

/// Symbol directory and industry classification.
#[derive(Clone)]
pub struct Listing {
    binding: Binding,
}

impl Listing {
    pub fn new(
        registry: Arc<SourceRegistry>,
        source: &str,
        symbol: &str,
    ) -> Result<Self, SourceError> {
        Ok(Self {
            binding: Binding::new(registry, source, symbol)?,
        })
    }

    pub async fn all_symbols(&self) -> Result<Batch<SymbolListing>, SourceError> {
        let adapter = self.binding.adapter(Operation::Symbols)?;
        adapter.fetch_symbols().await
    }

    /// Directory entries listed on `exchange`; warnings are kept.
    pub async fn symbols_by_exchange(
        &self,
        exchange: Exchange,
    ) -> Result<Batch<SymbolListing>, SourceError> {
        let Batch { items, warnings } = self.all_symbols().await?;
        let items = items
            .into_iter()
            .filter(|listing| listing.exchange == exchange)
            .collect();
        Ok(Batch { items, warnings })
    }

    pub async fn industries(&self, language: Language) -> Result<Batch<IndustryGroup>, SourceError> {
        let adapter = self.binding.adapter(Operation::Industries)?;
        adapter.fetch_industries(language).await
    }
}
