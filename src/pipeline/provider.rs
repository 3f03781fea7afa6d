//! Vision-inference providers.
//!
//! `VisionProvider` is the seam the chain and gate work against; tests
//! substitute doubles. `HttpVisionProvider` is the production impl: one
//! config-driven client per provider, speaking either of the two wire
//! dialects the coaching backends use and normalizing both to
//! `RawProviderResponse`.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::{ProviderConfig, ProviderDialect};

use super::types::{ImagePayload, RawProviderResponse};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("cannot reach provider endpoint: {0}")]
    Connect(String),

    #[error("request timed out")]
    Timeout,

    #[error("provider returned status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("provider response carries no text content")]
    EmptyResponse,

    #[error("http client error: {0}")]
    Client(String),
}

/// An interchangeable vision-inference endpoint.
#[async_trait]
pub trait VisionProvider: Send + Sync {
    fn id(&self) -> &str;

    /// Fallback order: lower is tried first.
    fn priority(&self) -> u32;

    /// Send one instruction plus image and normalize the reply.
    async fn invoke(
        &self,
        instruction: &str,
        image: &ImagePayload,
    ) -> Result<RawProviderResponse, ProviderError>;
}

/// Config-driven HTTP provider.
pub struct HttpVisionProvider {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl HttpVisionProvider {
    /// Build a provider with its own bounded-timeout client.
    pub fn new(config: ProviderConfig, call_timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(call_timeout)
            .build()
            .map_err(|e| ProviderError::Client(e.to_string()))?;
        Ok(Self { config, client })
    }

    /// Request body for this provider's dialect.
    fn request_body(&self, instruction: &str, image: &ImagePayload) -> Value {
        match self.config.dialect {
            ProviderDialect::OpenAiChat => json!({
                "model": self.config.model,
                "max_tokens": 1500,
                "temperature": 0.1,
                "messages": [{
                    "role": "user",
                    "content": [
                        { "type": "text", "text": instruction },
                        {
                            "type": "image_url",
                            "image_url": {
                                "url": format!(
                                    "data:{};base64,{}",
                                    image.mime_type(),
                                    image.to_base64()
                                ),
                                "detail": "high"
                            }
                        }
                    ]
                }]
            }),
            ProviderDialect::GeminiGenerate => json!({
                "contents": [{
                    "parts": [
                        { "text": instruction },
                        {
                            "inline_data": {
                                "mime_type": image.mime_type(),
                                "data": image.to_base64()
                            }
                        }
                    ]
                }],
                "generationConfig": {
                    "temperature": 0.1,
                    "maxOutputTokens": 1500
                }
            }),
        }
    }

    /// Pull the model's text out of a dialect-specific response envelope.
    fn extract_text(dialect: ProviderDialect, body: &Value) -> Option<String> {
        let text = match dialect {
            ProviderDialect::OpenAiChat => body
                .pointer("/choices/0/message/content")?
                .as_str()?,
            ProviderDialect::GeminiGenerate => body
                .pointer("/candidates/0/content/parts/0/text")?
                .as_str()?,
        };
        Some(text.to_owned())
    }
}

#[async_trait]
impl VisionProvider for HttpVisionProvider {
    fn id(&self) -> &str {
        &self.config.id
    }

    fn priority(&self) -> u32 {
        self.config.priority
    }

    async fn invoke(
        &self,
        instruction: &str,
        image: &ImagePayload,
    ) -> Result<RawProviderResponse, ProviderError> {
        // A configured per-provider template takes precedence over the
        // shared one the caller passes in.
        let instruction = self
            .config
            .instruction_override
            .as_deref()
            .unwrap_or(instruction);

        let mut request = self
            .client
            .post(&self.config.endpoint)
            .json(&self.request_body(instruction, image));
        request = match self.config.dialect {
            ProviderDialect::OpenAiChat => request.bearer_auth(&self.config.api_key),
            ProviderDialect::GeminiGenerate => {
                request.query(&[("key", self.config.api_key.as_str())])
            }
        };

        let response = request.send().await.map_err(|e| {
            if e.is_connect() {
                ProviderError::Connect(e.to_string())
            } else if e.is_timeout() {
                ProviderError::Timeout
            } else {
                ProviderError::Client(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Client(e.to_string()))?;
        let raw_text = Self::extract_text(self.config.dialect, &body)
            .ok_or(ProviderError::EmptyResponse)?;

        Ok(RawProviderResponse {
            raw_text,
            http_status: status.as_u16(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(dialect: ProviderDialect) -> ProviderConfig {
        ProviderConfig {
            id: "test".into(),
            priority: 0,
            dialect,
            endpoint: "https://example.test/v1".into(),
            api_key: "k".into(),
            model: "vision-model".into(),
            instruction_override: None,
        }
    }

    fn provider(dialect: ProviderDialect) -> HttpVisionProvider {
        HttpVisionProvider::new(config(dialect), Duration::from_secs(10)).unwrap()
    }

    #[test]
    fn openai_body_shape() {
        let body = provider(ProviderDialect::OpenAiChat)
            .request_body("describe the meal", &ImagePayload::jpeg(vec![1, 2, 3]));
        assert_eq!(body["model"], "vision-model");
        assert_eq!(
            body["messages"][0]["content"][0]["text"],
            "describe the meal"
        );
        let url = body["messages"][0]["content"][1]["image_url"]["url"]
            .as_str()
            .unwrap();
        assert!(url.starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn gemini_body_shape() {
        let body = provider(ProviderDialect::GeminiGenerate)
            .request_body("describe the meal", &ImagePayload::jpeg(vec![1, 2, 3]));
        assert_eq!(body["contents"][0]["parts"][0]["text"], "describe the meal");
        assert_eq!(
            body["contents"][0]["parts"][1]["inline_data"]["mime_type"],
            "image/jpeg"
        );
        assert!(body["generationConfig"]["maxOutputTokens"].is_number());
    }

    #[test]
    fn extracts_text_from_openai_envelope() {
        let envelope = json!({
            "choices": [{ "message": { "role": "assistant", "content": "[]" } }]
        });
        let text = HttpVisionProvider::extract_text(ProviderDialect::OpenAiChat, &envelope);
        assert_eq!(text.as_deref(), Some("[]"));
    }

    #[test]
    fn extracts_text_from_gemini_envelope() {
        let envelope = json!({
            "candidates": [{ "content": { "parts": [{ "text": "hello" }] } }]
        });
        let text =
            HttpVisionProvider::extract_text(ProviderDialect::GeminiGenerate, &envelope);
        assert_eq!(text.as_deref(), Some("hello"));
    }

    #[test]
    fn missing_content_yields_none() {
        let envelope = json!({ "candidates": [] });
        assert!(
            HttpVisionProvider::extract_text(ProviderDialect::GeminiGenerate, &envelope)
                .is_none()
        );
    }
}
