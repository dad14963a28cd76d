use std::sync::Arc;

use super::Binding;
use crate::data_source::{Batch, Operation, RatioComparisonRequest, SourceError, StatementRequest};
use crate::registry::SourceRegistry;
use crate::{
    FinancialStatementLine, Frequency, Language, RatioComparisonLine, StatementType, Symbol,
};

/// Financial statements and ratios. The language is passed through to the
/// provider untouched.
#[derive(Clone)]
pub struct Finance {
    binding: Binding,
}

impl Finance {
    pub fn new(
        registry: Arc<SourceRegistry>,
        source: &str,
        symbol: &str,
    ) -> Result<Self, SourceError> {
        Ok(Self {
            binding: Binding::new(registry, source, symbol)?,
        })
    }

    pub async fn statement(
        &self,
        statement: StatementType,
        frequency: Frequency,
        language: Language,
    ) -> Result<Batch<FinancialStatementLine>, SourceError> {
        let adapter = self.binding.adapter(Operation::Statement)?;
        let request =
            StatementRequest::new(self.binding.symbol.clone(), statement, frequency, language);
        adapter.fetch_statement(request).await
    }

    pub async fn balance_sheet(
        &self,
        frequency: Frequency,
        language: Language,
    ) -> Result<Batch<FinancialStatementLine>, SourceError> {
        self.statement(StatementType::BalanceSheet, frequency, language)
            .await
    }

    pub async fn income_statement(
        &self,
        frequency: Frequency,
        language: Language,
    ) -> Result<Batch<FinancialStatementLine>, SourceError> {
        self.statement(StatementType::IncomeStatement, frequency, language)
            .await
    }

    pub async fn cash_flow(
        &self,
        frequency: Frequency,
        language: Language,
    ) -> Result<Batch<FinancialStatementLine>, SourceError> {
        self.statement(StatementType::CashFlow, frequency, language)
            .await
    }

    pub async fn ratios(
        &self,
        frequency: Frequency,
        language: Language,
    ) -> Result<Batch<FinancialStatementLine>, SourceError> {
        self.statement(StatementType::Ratio, frequency, language)
            .await
    }

    /// Ratios of the bound symbol next to `peers` and, when
    /// `compare_to_industry` is set, the industry average. Each line names
    /// its subject.
    pub async fn ratio_comparison<I, S>(
        &self,
        peers: I,
        compare_to_industry: bool,
        frequency: Frequency,
        language: Language,
    ) -> Result<Batch<RatioComparisonLine>, SourceError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let peers = peers
            .into_iter()
            .map(|peer| Symbol::parse(peer.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        let adapter = self.binding.adapter(Operation::RatioComparison)?;
        let request = RatioComparisonRequest::new(self.binding.symbol.clone(), frequency, language)
            .with_peers(peers)
            .with_industry(compare_to_industry);
        adapter.fetch_ratio_comparison(request).await
    }
}
