//! Engine configuration — environment-driven, nothing hardcoded at call sites.
//!
//! All tunables the rest of the crate consumes live here: health-check TTL,
//! per-call timeout, the ordered provider list with credentials, and the
//! sanitizer bounds. `EngineConfig::from_env()` mirrors how the client app
//! ships configuration; `Default` gives sane values for tests and local runs.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pipeline::sanitize::SanitizerPolicy;

/// Default health verdict TTL: 30 seconds.
pub const DEFAULT_HEALTH_TTL_SECS: u64 = 30;

/// Default bound for every network call (probe and provider alike).
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 30;

/// Wire dialect a vision provider speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderDialect {
    /// OpenAI-style `chat/completions` with an `image_url` data URI part.
    OpenAiChat,
    /// Gemini-style `generateContent` with an `inline_data` part.
    GeminiGenerate,
}

/// One configured vision-inference provider.
///
/// Adding or removing a provider is a configuration change, not a code
/// change: the dialect selects the wire format, `priority` the fallback
/// order (lower = tried first), and `instruction_override` swaps the
/// shared extraction template for a provider-specific one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub id: String,
    pub priority: u32,
    pub dialect: ProviderDialect,
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    #[serde(default)]
    pub instruction_override: Option<String>,
}

/// Connection details for the hosted primary data store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimaryStoreConfig {
    pub base_url: String,
    pub api_key: String,
    /// Table used for the minimal health-probe read.
    pub probe_table: String,
}

/// Top-level engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long a health verdict is trusted before re-probing.
    pub health_ttl: Duration,
    /// Bounded timeout applied to every probe and provider call.
    pub call_timeout: Duration,
    /// Vision providers in fallback order (sorted by `priority` at build).
    pub providers: Vec<ProviderConfig>,
    /// Provider id used for the cheap Stage-1 gate. `None` picks the
    /// highest-priority provider.
    pub gate_provider: Option<String>,
    /// Hosted store; `None` means the engine runs fallback-only.
    pub store: Option<PrimaryStoreConfig>,
    /// Numeric bounds the sanitizer enforces on extracted items.
    pub sanitizer: SanitizerPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            health_ttl: Duration::from_secs(DEFAULT_HEALTH_TTL_SECS),
            call_timeout: Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS),
            providers: Vec::new(),
            gate_provider: None,
            store: None,
            sanitizer: SanitizerPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Build a configuration from environment variables.
    ///
    /// Recognized variables:
    /// - `NUTRILENS_HEALTH_TTL_SECS`, `NUTRILENS_CALL_TIMEOUT_SECS`
    /// - `OPENAI_API_KEY`, `GEMINI_API_KEY`, `DEEPSEEK_API_KEY` — each present
    ///   key enables one provider, in that fallback order
    /// - `NUTRILENS_GATE_PROVIDER` — provider id for the Stage-1 gate
    /// - `SUPABASE_URL` + `SUPABASE_ANON_KEY` — primary store
    /// - `NUTRILENS_PROBE_TABLE` — probe table name (default `users`)
    pub fn from_env() -> Self {
        let mut config = Self {
            health_ttl: Duration::from_secs(env_u64(
                "NUTRILENS_HEALTH_TTL_SECS",
                DEFAULT_HEALTH_TTL_SECS,
            )),
            call_timeout: Duration::from_secs(env_u64(
                "NUTRILENS_CALL_TIMEOUT_SECS",
                DEFAULT_CALL_TIMEOUT_SECS,
            )),
            ..Self::default()
        };

        if let Ok(key) = env::var("OPENAI_API_KEY") {
            config.providers.push(ProviderConfig {
                id: "openai".into(),
                priority: 0,
                dialect: ProviderDialect::OpenAiChat,
                endpoint: "https://api.openai.com/v1/chat/completions".into(),
                api_key: key,
                model: "gpt-4o".into(),
                instruction_override: None,
            });
        }
        if let Ok(key) = env::var("GEMINI_API_KEY") {
            config.providers.push(ProviderConfig {
                id: "gemini".into(),
                priority: 1,
                dialect: ProviderDialect::GeminiGenerate,
                endpoint:
                    "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro-vision:generateContent"
                        .into(),
                api_key: key,
                model: "gemini-pro-vision".into(),
                instruction_override: None,
            });
        }
        if let Ok(key) = env::var("DEEPSEEK_API_KEY") {
            config.providers.push(ProviderConfig {
                id: "deepseek".into(),
                priority: 2,
                dialect: ProviderDialect::OpenAiChat,
                endpoint: "https://api.deepseek.com/v1/chat/completions".into(),
                api_key: key,
                model: "deepseek-vl-chat".into(),
                instruction_override: None,
            });
        }

        config.gate_provider = env::var("NUTRILENS_GATE_PROVIDER").ok();

        if let (Ok(base_url), Ok(api_key)) =
            (env::var("SUPABASE_URL"), env::var("SUPABASE_ANON_KEY"))
        {
            config.store = Some(PrimaryStoreConfig {
                base_url,
                api_key,
                probe_table: env::var("NUTRILENS_PROBE_TABLE")
                    .unwrap_or_else(|_| "users".into()),
            });
        }

        config
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ttl_is_thirty_seconds() {
        let config = EngineConfig::default();
        assert_eq!(config.health_ttl, Duration::from_secs(30));
    }

    #[test]
    fn default_has_no_providers_or_store() {
        let config = EngineConfig::default();
        assert!(config.providers.is_empty());
        assert!(config.store.is_none());
    }

    #[test]
    fn provider_config_round_trips_through_json() {
        let provider = ProviderConfig {
            id: "openai".into(),
            priority: 0,
            dialect: ProviderDialect::OpenAiChat,
            endpoint: "https://api.openai.com/v1/chat/completions".into(),
            api_key: "sk-test".into(),
            model: "gpt-4o".into(),
            instruction_override: None,
        };
        let json = serde_json::to_string(&provider).unwrap();
        let back: ProviderConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, "openai");
        assert_eq!(back.dialect, ProviderDialect::OpenAiChat);
    }

    #[test]
    fn instruction_override_defaults_to_none_when_absent() {
        let json = r#"{
            "id": "gemini",
            "priority": 1,
            "dialect": "gemini_generate",
            "endpoint": "https://example.test/generate",
            "api_key": "k",
            "model": "gemini-pro-vision"
        }"#;
        let provider: ProviderConfig = serde_json::from_str(json).unwrap();
        assert!(provider.instruction_override.is_none());
    }
}
