//! Stage-2 orchestrator: gate → provider chain → parse → sanitize → score.

use super::chain::ProviderChain;
use super::confidence::{
    aggregate_confidence, DEFAULT_ITEM_CONFIDENCE, DEFAULT_PROVIDER_CONFIDENCE,
};
use super::gate::GateValidator;
use super::parser::{parse_provider_payload, ParsedPayload};
use super::prompt::PromptLibrary;
use super::sanitize::{sanitize_items, SanitizerPolicy};
use super::types::{ExtractionOutcome, ImagePayload};
use super::PipelineFailure;

/// Two-stage image analysis pipeline.
///
/// Stage 1 must pass before any extraction provider is paid for; a
/// provider-asserted refusal in Stage 2 is authoritative even after the
/// gate passed.
pub struct ExtractionPipeline {
    gate: GateValidator,
    chain: ProviderChain,
    policy: SanitizerPolicy,
    prompts: PromptLibrary,
}

impl ExtractionPipeline {
    pub fn new(
        gate: GateValidator,
        chain: ProviderChain,
        policy: SanitizerPolicy,
        prompts: PromptLibrary,
    ) -> Self {
        Self {
            gate,
            chain,
            policy,
            prompts,
        }
    }

    /// Full pipeline run for one image.
    pub async fn extract(
        &self,
        image: &ImagePayload,
    ) -> Result<ExtractionOutcome, PipelineFailure> {
        // Stage 1: cheap pre-filter, evaluated exactly once per image.
        let verdict = self.gate.classify(image).await;
        if !verdict.is_valid_subject {
            return Err(PipelineFailure::NotAValidSubject {
                last_provider: self.gate.provider_id().to_owned(),
                detail: verdict.reject_reason,
            });
        }

        if self.chain.is_empty() {
            return Err(PipelineFailure::TransportError {
                last_provider: "none".to_owned(),
                detail: Some("no extraction providers configured".to_owned()),
            });
        }

        // Stage 2: ordered fallback until one provider answers.
        let (response, provider_id) = self
            .chain
            .invoke_in_order(&self.prompts.extraction, image)
            .await
            .map_err(|attempts| {
                let last_provider = attempts
                    .last()
                    .map(|a| a.provider_id.clone())
                    .unwrap_or_else(|| "none".to_owned());
                PipelineFailure::AllProvidersExhausted {
                    last_provider,
                    attempts,
                }
            })?;

        let parsed = parse_provider_payload(&response.raw_text).map_err(|error| {
            PipelineFailure::MalformedResponse {
                last_provider: provider_id.clone(),
                detail: Some(error.to_string()),
            }
        })?;

        let wire_items = match parsed {
            ParsedPayload::Refusal { subject, detail } => {
                return Err(PipelineFailure::NotAValidSubject {
                    last_provider: provider_id,
                    detail: Some(match subject {
                        Some(object) => format!("{detail} ({object})"),
                        None => detail,
                    }),
                });
            }
            ParsedPayload::Items(items) => items,
        };

        if wire_items.is_empty() {
            return Err(PipelineFailure::MalformedResponse {
                last_provider: provider_id,
                detail: Some("empty item list".to_owned()),
            });
        }

        let item_confidences: Vec<f32> = wire_items
            .iter()
            .map(|item| item.confidence.unwrap_or(DEFAULT_ITEM_CONFIDENCE))
            .collect();

        let items = wire_items.into_iter().map(|w| w.into_item()).collect();
        let items = sanitize_items(items, &self.policy).map_err(|violation| {
            PipelineFailure::OutOfBoundsValues {
                last_provider: provider_id.clone(),
                detail: Some(violation.to_string()),
            }
        })?;

        let confidence =
            aggregate_confidence(DEFAULT_PROVIDER_CONFIDENCE, &item_confidences);
        tracing::info!(
            provider = %provider_id,
            items = items.len(),
            confidence,
            "extraction complete"
        );

        Ok(ExtractionOutcome {
            items,
            confidence,
            provider_id,
        })
    }
}
