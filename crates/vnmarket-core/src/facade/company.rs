use std::sync::Arc;

use super::Binding;
use crate::data_source::{Operation, SourceError};
use crate::registry::SourceRegistry;
use crate::CompanyProfile;

#[derive(Clone)]
pub struct Company {
    binding: Binding,
}

impl Company {
    pub fn new(
        registry: Arc<SourceRegistry>,
        source: &str,
        symbol: &str,
    ) -> Result<Self, SourceError> {
        Ok(Self {
            binding: Binding::new(registry, source, symbol)?,
        })
    }

    /// Profile with shareholders, events and dividends. A provider with no
    /// record for the symbol fails with `DataUnavailable`.
    pub async fn overview(&self) -> Result<CompanyProfile, SourceError> {
        let adapter = self.binding.adapter(Operation::CompanyOverview)?;
        adapter
            .fetch_company_overview(self.binding.symbol.clone())
            .await
    }
}
