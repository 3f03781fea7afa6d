//! Nutrilens — the resilient core of a nutrition coaching client.
//!
//! Two subsystems behind narrow interfaces:
//!
//! - **Backend selection**: every data read/write names a primary (hosted
//!   store) and a fallback (local dataset) implementation; a TTL-cached,
//!   single-flight health verdict decides which runs, and a primary failure
//!   demotes the verdict instead of surfacing to the caller.
//! - **Photo analysis**: a permissive, fail-open gate decides whether an
//!   image is worth an expensive structured-extraction call; extraction
//!   walks an ordered chain of interchangeable vision providers, parses
//!   their loosely-structured output defensively, and bounds-checks every
//!   number before anything is trusted.
//!
//! UI, persistence, and auth live in the embedding app; this crate exposes
//! exactly two operations via [`engine::Engine`]: `classify_and_extract`
//! and `read_with_fallback`.

pub mod backend;
pub mod config;
pub mod engine;
pub mod pipeline;

pub use backend::{
    BackendOperation, BackendSelector, HealthCache, HealthProbe, HealthStatus, OfflineProbe,
    ProbeOutcome, RestProbe,
};
pub use config::{EngineConfig, PrimaryStoreConfig, ProviderConfig, ProviderDialect};
pub use engine::{init_tracing, Engine, EngineError};
pub use pipeline::{
    AttemptFailure, ClassificationVerdict, ExtractedItem, ExtractionOutcome, ExtractionPipeline,
    GateValidator, ImagePayload, PipelineFailure, PromptLibrary, ProviderChain, SanitizerPolicy,
    VisionProvider,
};
