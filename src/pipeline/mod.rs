//! Two-stage, multi-provider image analysis pipeline.
//!
//! A permissive Stage-1 gate decides whether an image is worth an expensive
//! structured-extraction call; Stage 2 walks an ordered provider chain,
//! defensively parses whatever the first responsive provider returns, and
//! bounds-checks every number before the caller sees it.

pub mod chain;
pub mod confidence;
pub mod extract;
pub mod gate;
pub mod parser;
pub mod prompt;
pub mod provider;
pub mod sanitize;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use chain::{AttemptFailure, ProviderChain};
pub use extract::ExtractionPipeline;
pub use gate::GateValidator;
pub use prompt::PromptLibrary;
pub use provider::{HttpVisionProvider, ProviderError, VisionProvider};
pub use sanitize::SanitizerPolicy;
pub use types::{
    ClassificationVerdict, ExtractedItem, ExtractionOutcome, ImagePayload, RawProviderResponse,
};

use thiserror::Error;

/// Terminal failure of one pipeline invocation.
///
/// Every variant carries the last provider attempted (`"none"` when no
/// provider was reached) so diagnostics can say where the run died. None of
/// these are retried automatically — a new user action starts a fresh
/// attempt.
#[derive(Debug, Error)]
pub enum PipelineFailure {
    /// The gate, or a provider itself, judged the image not to be food.
    #[error("image not recognized as food (via {last_provider})")]
    NotAValidSubject {
        last_provider: String,
        detail: Option<String>,
    },

    /// Every configured provider failed; per-attempt reasons inside.
    #[error("all {} providers failed (last: {last_provider})", .attempts.len())]
    AllProvidersExhausted {
        last_provider: String,
        attempts: Vec<AttemptFailure>,
    },

    /// The accepted reply could not be decoded, strictly or permissively.
    #[error("undecodable payload from {last_provider}")]
    MalformedResponse {
        last_provider: String,
        detail: Option<String>,
    },

    /// A strict sanitizer bound was violated.
    #[error("implausible nutrition values from {last_provider}")]
    OutOfBoundsValues {
        last_provider: String,
        detail: Option<String>,
    },

    /// Network-level failure outside the chain's per-attempt handling.
    #[error("transport failure (via {last_provider})")]
    TransportError {
        last_provider: String,
        detail: Option<String>,
    },
}

impl PipelineFailure {
    /// The last provider attempted when the pipeline died.
    pub fn last_provider(&self) -> &str {
        match self {
            Self::NotAValidSubject { last_provider, .. }
            | Self::AllProvidersExhausted { last_provider, .. }
            | Self::MalformedResponse { last_provider, .. }
            | Self::OutOfBoundsValues { last_provider, .. }
            | Self::TransportError { last_provider, .. } => last_provider,
        }
    }

    /// Short, actionable message for the logging screen. Distinct per
    /// failure kind: "retake the photo" advice differs from "try again
    /// later" advice.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotAValidSubject { .. } => {
                "This doesn't look like food. Try photographing your meal directly."
            }
            Self::AllProvidersExhausted { .. } | Self::TransportError { .. } => {
                "Temporarily unable to analyze the photo. Please try again."
            }
            Self::MalformedResponse { .. } | Self::OutOfBoundsValues { .. } => {
                "The analysis came back unusable. Try a clearer photo."
            }
        }
    }
}
