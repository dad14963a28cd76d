//! # Domain Façades
//!
//! Thin per-domain dispatch objects. Each one binds a source identifier and a
//! symbol, resolves the adapter through the [`SourceRegistry`] on every call,
//! checks the operation against the adapter's capabilities and returns the
//! adapter's canonical records unchanged.
//!
//! | Façade | Operations |
//! |--------|------------|
//! | [`Quote`] | `history`, `intraday`, `depth` |
//! | [`Listing`] | `all_symbols`, `symbols_by_exchange`, `industries` |
//! | [`Finance`] | `balance_sheet`, `income_statement`, `cash_flow`, `ratios`, `ratio_comparison` |
//! | [`Company`] | `overview` |
//! | [`Trading`] | `price_board`, `top_movers`, `foreign_trade`, `market_indices` |
//!
//! [`Stock`] bundles all five for one `(source, symbol)` pair.

mod company;
mod finance;
mod listing;
mod quote;
mod stock;
mod trading;

use std::sync::Arc;

pub use company::Company;
pub use finance::Finance;
pub use listing::Listing;
pub use quote::{HistoryOptions, Quote};
pub use stock::Stock;
pub use trading::Trading;

use crate::data_source::{DataSource, Operation, SourceError};
use crate::registry::SourceRegistry;
use crate::Symbol;

/// `(registry, source, symbol)` shared by every façade.
#[derive(Clone)]
struct Binding {
    registry: Arc<SourceRegistry>,
    source: String,
    symbol: Symbol,
}

impl Binding {
    fn new(registry: Arc<SourceRegistry>, source: &str, symbol: &str) -> Result<Self, SourceError> {
        Ok(Self {
            registry,
            source: source.trim().to_owned(),
            symbol: Symbol::parse(symbol)?,
        })
    }

    fn adapter(&self, operation: Operation) -> Result<Arc<dyn DataSource>, SourceError> {
        self.registry.ensure_supported(&self.source, operation)
    }
}
