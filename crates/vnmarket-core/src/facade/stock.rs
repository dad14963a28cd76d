use std::sync::Arc;

use super::{Company, Finance, Listing, Quote, Trading};
use crate::data_source::SourceError;
use crate::registry::SourceRegistry;

/// Every façade for one `(source, symbol)` pair.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use vnmarket_core::{Frequency, Interval, Language, SourceRegistryBuilder, Stock};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let registry = Arc::new(SourceRegistryBuilder::from_env()?.build());
/// let stock = Stock::new(registry, "ssi", "VCB")?;
/// let bars = stock.quote().history(None, None, Interval::OneDay).await?;
/// let sheet = stock
///     .finance()
///     .balance_sheet(Frequency::Quarterly, Language::Vi)
///     .await?;
/// println!("{} bars, {} statement lines", bars.len(), sheet.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Stock {
    quote: Quote,
    listing: Listing,
    finance: Finance,
    company: Company,
    trading: Trading,
}

impl Stock {
    /// Fails with `UnknownSource` when `source` is not registered and with
    /// `InvalidRequest` when `symbol` is malformed.
    pub fn new(
        registry: Arc<SourceRegistry>,
        source: &str,
        symbol: &str,
    ) -> Result<Self, SourceError> {
        registry.resolve(source)?;
        Ok(Self {
            quote: Quote::new(Arc::clone(&registry), source, symbol)?,
            listing: Listing::new(Arc::clone(&registry), source, symbol)?,
            finance: Finance::new(Arc::clone(&registry), source, symbol)?,
            company: Company::new(Arc::clone(&registry), source, symbol)?,
            trading: Trading::new(registry, source, symbol)?,
        })
    }

    pub fn quote(&self) -> &Quote {
        &self.quote
    }

    pub fn listing(&self) -> &Listing {
        &self.listing
    }

    pub fn finance(&self) -> &Finance {
        &self.finance
    }

    pub fn company(&self) -> &Company {
        &self.company
    }

    pub fn trading(&self) -> &Trading {
        &self.trading
    }
}
