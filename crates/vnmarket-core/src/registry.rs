use std::collections::BTreeMap;
use std::sync::Arc;

use crate::adapters::{SsiAdapter, VndAdapter};
use crate::config::RegistryConfig;
use crate::data_source::{CapabilitySet, DataSource, Operation, SourceError};
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::workbook::WorkbookDecoder;
use crate::{CoreError, ProviderId};

/// Immutable map from provider id to one shared adapter instance.
///
/// Resolving the same identifier twice returns the same `Arc`, so callers can
/// hold on to an adapter or resolve it per call interchangeably.
pub struct SourceRegistry {
    adapters: BTreeMap<ProviderId, Arc<dyn DataSource>>,
}

impl SourceRegistry {
    pub fn new(adapters: Vec<Arc<dyn DataSource>>) -> Self {
        let adapters = adapters
            .into_iter()
            .map(|adapter| (adapter.id(), adapter))
            .collect();
        Self { adapters }
    }

    /// Look up a source by its case-insensitive identifier.
    pub fn resolve(&self, source_id: &str) -> Result<Arc<dyn DataSource>, SourceError> {
        let adapter = source_id
            .parse::<ProviderId>()
            .ok()
            .and_then(|provider| self.adapters.get(&provider));

        match adapter {
            Some(adapter) => Ok(Arc::clone(adapter)),
            None => {
                let error = SourceError::unknown_source(source_id);
                tracing::warn!("{error}");
                Err(error)
            }
        }
    }

    /// Whether `source_id` resolves and declares `operation`.
    pub fn supports(&self, source_id: &str, operation: Operation) -> bool {
        source_id
            .parse::<ProviderId>()
            .ok()
            .and_then(|provider| self.adapters.get(&provider))
            .is_some_and(|adapter| adapter.capabilities().supports(operation))
    }

    /// Resolve `source_id` and fail fast when it cannot serve `operation`.
    pub fn ensure_supported(
        &self,
        source_id: &str,
        operation: Operation,
    ) -> Result<Arc<dyn DataSource>, SourceError> {
        let adapter = self.resolve(source_id)?;
        if adapter.capabilities().supports(operation) {
            return Ok(adapter);
        }

        let error = SourceError::unsupported_operation(adapter.id(), operation);
        tracing::debug!("{error}");
        Err(error)
    }

    /// Registered providers and their capabilities, in id order.
    pub fn sources(&self) -> Vec<(ProviderId, CapabilitySet)> {
        self.adapters
            .iter()
            .map(|(provider, adapter)| (*provider, adapter.capabilities()))
            .collect()
    }
}

/// Builds a [`SourceRegistry`] from configuration and shared collaborators.
///
/// ```rust,no_run
/// use vnmarket_core::SourceRegistryBuilder;
///
/// # fn main() -> Result<(), vnmarket_core::CoreError> {
/// let registry = SourceRegistryBuilder::from_env()?.build();
/// assert!(registry.resolve("SSI").is_ok());
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct SourceRegistryBuilder {
    config: RegistryConfig,
    http_client: Option<Arc<dyn HttpClient>>,
    workbook_decoder: Option<Arc<dyn WorkbookDecoder>>,
    overrides: Vec<Arc<dyn DataSource>>,
}

impl SourceRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default endpoints with the `VNMARKET_*` environment overrides applied.
    pub fn from_env() -> Result<Self, CoreError> {
        Ok(Self::new().with_config(RegistryConfig::default().with_env_overrides()?))
    }

    pub fn with_config(mut self, config: RegistryConfig) -> Self {
        self.config = config;
        self
    }

    /// Transport shared by every built-in adapter.
    pub fn with_http_client(mut self, http_client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(http_client);
        self
    }

    pub fn with_workbook_decoder(mut self, decoder: Arc<dyn WorkbookDecoder>) -> Self {
        self.workbook_decoder = Some(decoder);
        self
    }

    /// Register a custom adapter; it replaces the built-in one with the same id.
    pub fn with_adapter(mut self, adapter: Arc<dyn DataSource>) -> Self {
        self.overrides.push(adapter);
        self
    }

    pub fn build(self) -> SourceRegistry {
        let http_client = self
            .http_client
            .unwrap_or_else(|| Arc::new(ReqwestHttpClient::new()));
        let workbook_decoder = self.workbook_decoder.unwrap_or_else(default_workbook_decoder);

        let mut adapters: Vec<Arc<dyn DataSource>> = vec![
            Arc::new(SsiAdapter::new(
                self.config.ssi,
                Arc::clone(&http_client),
                workbook_decoder,
            )),
            Arc::new(VndAdapter::new(self.config.vnd, http_client)),
        ];
        adapters.extend(self.overrides);

        let registry = SourceRegistry::new(adapters);
        tracing::debug!(
            sources = ?registry.adapters.keys().collect::<Vec<_>>(),
            "source registry built"
        );
        registry
    }
}

#[cfg(feature = "xlsx")]
fn default_workbook_decoder() -> Arc<dyn WorkbookDecoder> {
    Arc::new(crate::workbook::XlsxWorkbookDecoder)
}

#[cfg(not(feature = "xlsx"))]
fn default_workbook_decoder() -> Arc<dyn WorkbookDecoder> {
    Arc::new(crate::workbook::UnsupportedWorkbookDecoder)
}
