//! Caller-facing facade wiring configuration into the two subsystems.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::backend::{
    BackendOperation, BackendSelector, HealthCache, HealthProbe, HealthStatus, OfflineProbe,
    RestProbe,
};
use crate::config::EngineConfig;
use crate::pipeline::{
    ExtractionOutcome, ExtractionPipeline, GateValidator, HttpVisionProvider, ImagePayload,
    PipelineFailure, PromptLibrary, ProviderChain, VisionProvider,
};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no vision providers configured")]
    NoProviders,

    #[error("gate provider '{0}' is not in the provider list")]
    UnknownGateProvider(String),

    #[error("http client setup failed: {0}")]
    Client(String),
}

/// The subsystem's two entry points behind one explicitly constructed
/// object: `classify_and_extract` for photos, `read_with_fallback` for
/// data operations. Everything inside is injectable; `from_parts` exists
/// for embedding tests that substitute doubles.
pub struct Engine {
    health: Arc<HealthCache>,
    selector: BackendSelector,
    pipeline: ExtractionPipeline,
}

impl Engine {
    /// Wire up an engine from configuration.
    pub fn from_config(config: EngineConfig) -> Result<Self, EngineError> {
        if config.providers.is_empty() {
            return Err(EngineError::NoProviders);
        }

        let mut providers: Vec<Arc<dyn VisionProvider>> = Vec::new();
        for provider_config in &config.providers {
            providers.push(Arc::new(
                HttpVisionProvider::new(provider_config.clone(), config.call_timeout)
                    .map_err(|e| EngineError::Client(e.to_string()))?,
            ));
        }

        // The gate runs on the configured provider, or the highest-priority
        // one when unspecified.
        let gate_provider = match &config.gate_provider {
            Some(id) => providers
                .iter()
                .find(|p| p.id() == id.as_str())
                .cloned()
                .ok_or_else(|| EngineError::UnknownGateProvider(id.clone()))?,
            None => providers
                .iter()
                .min_by_key(|p| p.priority())
                .cloned()
                .ok_or(EngineError::NoProviders)?,
        };

        let prompts = PromptLibrary::default();
        let gate = GateValidator::new(gate_provider, prompts.gate.clone(), config.call_timeout);
        let chain = ProviderChain::new(providers, config.call_timeout);
        let pipeline = ExtractionPipeline::new(gate, chain, config.sanitizer.clone(), prompts);

        let probe: Arc<dyn HealthProbe> = match &config.store {
            Some(store) => Arc::new(
                RestProbe::new(store, config.call_timeout)
                    .map_err(|e| EngineError::Client(e.to_string()))?,
            ),
            None => {
                tracing::info!("no primary store configured, running fallback-only");
                Arc::new(OfflineProbe)
            }
        };
        let health = Arc::new(HealthCache::new(probe, config.health_ttl));

        Ok(Self::from_parts(pipeline, health))
    }

    /// Assemble an engine from already-built parts.
    pub fn from_parts(pipeline: ExtractionPipeline, health: Arc<HealthCache>) -> Self {
        Self {
            selector: BackendSelector::new(health.clone()),
            health,
            pipeline,
        }
    }

    /// Gate, then extract: the full two-stage photo analysis.
    pub async fn classify_and_extract(
        &self,
        image: &ImagePayload,
    ) -> Result<ExtractionOutcome, PipelineFailure> {
        self.pipeline.extract(image).await
    }

    /// Run a data operation against the primary store, transparently
    /// falling back per the cached health verdict.
    pub async fn read_with_fallback<T, E: fmt::Display>(
        &self,
        op: BackendOperation<'_, T, E>,
    ) -> Result<T, E> {
        self.selector.execute(op).await
    }

    /// Cached backend status, for a connectivity indicator. Never probes.
    pub async fn backend_status(&self) -> HealthStatus {
        self.health.current_status().await
    }

    /// Discard the health verdict after an externally confirmed failure.
    pub async fn force_recheck(&self) {
        self.health.force_recheck().await;
    }
}

/// Install a `tracing` subscriber honoring `RUST_LOG`, defaulting to info
/// for this crate. The embedding app may install its own instead.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("nutrilens=info")),
        )
        .init();
}
