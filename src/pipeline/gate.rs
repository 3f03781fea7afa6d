//! Stage-1 gate: a cheap, fail-open binary pre-filter.
//!
//! Exactly one designated fast provider is asked whether the image could be
//! food. Every internal error path — transport failure, timeout, mangled
//! verdict — maps to *accept*: a false rejection silently discards a
//! legitimate meal photo, while a false acceptance costs one Stage-2 call
//! whose own validation can still catch it. The gate never retries across
//! providers; it is a pre-filter, not the source of truth.

use std::sync::Arc;
use std::time::Duration;

use super::parser::parse_gate_verdict;
use super::provider::VisionProvider;
use super::types::{ClassificationVerdict, ImagePayload};

pub struct GateValidator {
    provider: Arc<dyn VisionProvider>,
    instruction: String,
    call_timeout: Duration,
}

impl GateValidator {
    pub fn new(
        provider: Arc<dyn VisionProvider>,
        instruction: String,
        call_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            instruction,
            call_timeout,
        }
    }

    pub fn provider_id(&self) -> &str {
        self.provider.id()
    }

    /// Classify one image. Always completes with a verdict, never an error.
    pub async fn classify(&self, image: &ImagePayload) -> ClassificationVerdict {
        let reply = match tokio::time::timeout(
            self.call_timeout,
            self.provider.invoke(&self.instruction, image),
        )
        .await
        {
            Ok(Ok(response)) => response.raw_text,
            Ok(Err(error)) => {
                tracing::debug!(
                    provider = %self.provider.id(),
                    error = %error,
                    "gate call failed, failing open"
                );
                return ClassificationVerdict::accept();
            }
            Err(_elapsed) => {
                tracing::debug!(
                    provider = %self.provider.id(),
                    "gate call timed out, failing open"
                );
                return ClassificationVerdict::accept();
            }
        };

        let Some(wire) = parse_gate_verdict(&reply) else {
            tracing::debug!(
                provider = %self.provider.id(),
                "gate verdict undecodable, failing open"
            );
            return ClassificationVerdict::accept();
        };

        // Only an explicit false rejects; missing or malformed means accept.
        if wire.is_food == Some(false) {
            let label = wire.object.clone();
            tracing::info!(
                provider = %self.provider.id(),
                subject = label.as_deref().unwrap_or("unknown"),
                "gate rejected image as non-food"
            );
            ClassificationVerdict {
                is_valid_subject: false,
                reject_reason: Some(match &label {
                    Some(object) => format!("recognized as non-food: {object}"),
                    None => "recognized as non-food".to_owned(),
                }),
                subject_label: label,
            }
        } else {
            ClassificationVerdict {
                is_valid_subject: true,
                subject_label: wire.object,
                reject_reason: None,
            }
        }
    }
}
