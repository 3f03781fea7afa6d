//! Ordered fallback across interchangeable vision providers.
//!
//! Strictly sequential: providers are billed, rate-limited resources, so the
//! chain stops at the first usable answer instead of racing them. Ordering
//! is fixed by configured priority, never adapted from past performance.

use std::sync::Arc;
use std::time::Duration;

use super::provider::VisionProvider;
use super::types::{ImagePayload, RawProviderResponse};

/// Why one provider attempt failed, kept for the terminal failure report.
#[derive(Debug, Clone)]
pub struct AttemptFailure {
    pub provider_id: String,
    pub reason: String,
}

impl std::fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.provider_id, self.reason)
    }
}

/// Immutable, priority-ordered provider list.
pub struct ProviderChain {
    providers: Vec<Arc<dyn VisionProvider>>,
    call_timeout: Duration,
}

impl ProviderChain {
    /// Build a chain; providers are sorted by priority once, here.
    pub fn new(mut providers: Vec<Arc<dyn VisionProvider>>, call_timeout: Duration) -> Self {
        providers.sort_by_key(|p| p.priority());
        Self {
            providers,
            call_timeout,
        }
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Provider ids in fallback order.
    pub fn provider_ids(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    /// Try each provider in order; return the first reply, or every
    /// per-attempt failure if none answered.
    pub async fn invoke_in_order(
        &self,
        instruction: &str,
        image: &ImagePayload,
    ) -> Result<(RawProviderResponse, String), Vec<AttemptFailure>> {
        let mut attempts = Vec::new();

        for provider in &self.providers {
            let id = provider.id().to_owned();
            match tokio::time::timeout(self.call_timeout, provider.invoke(instruction, image))
                .await
            {
                Ok(Ok(response)) => {
                    tracing::debug!(
                        provider = %id,
                        status = response.http_status,
                        attempt = attempts.len() + 1,
                        "provider answered"
                    );
                    return Ok((response, id));
                }
                Ok(Err(error)) => {
                    tracing::warn!(provider = %id, error = %error, "provider attempt failed");
                    attempts.push(AttemptFailure {
                        provider_id: id,
                        reason: error.to_string(),
                    });
                }
                Err(_elapsed) => {
                    tracing::warn!(
                        provider = %id,
                        timeout_secs = self.call_timeout.as_secs(),
                        "provider attempt timed out"
                    );
                    attempts.push(AttemptFailure {
                        provider_id: id,
                        reason: format!(
                            "timed out after {}s",
                            self.call_timeout.as_secs()
                        ),
                    });
                }
            }
        }

        Err(attempts)
    }
}
