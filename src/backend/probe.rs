//! Production health probes.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::PrimaryStoreConfig;

use super::health::{HealthProbe, ProbeOutcome};

/// Minimal single-row read against the hosted store's REST surface.
///
/// The probe asks for at most one row of one column; its cost is a rounding
/// error next to any real operation. An empty table answers with a
/// "no rows" status, which still proves the store is up.
pub struct RestProbe {
    url: String,
    api_key: String,
    client: reqwest::Client,
}

impl RestProbe {
    pub fn new(store: &PrimaryStoreConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            url: format!(
                "{}/rest/v1/{}?select=id&limit=1",
                store.base_url.trim_end_matches('/'),
                store.probe_table
            ),
            api_key: store.api_key.clone(),
            client,
        })
    }
}

#[async_trait]
impl HealthProbe for RestProbe {
    async fn probe(&self) -> ProbeOutcome {
        let result = self
            .client
            .get(&self.url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .send()
            .await;

        match result {
            // Any HTTP answer except an auth rejection proves reachability;
            // only hard connectivity or auth failures demote.
            Ok(response) => match response.status().as_u16() {
                401 | 403 => ProbeOutcome::Unreachable {
                    reason: format!("auth rejected ({})", response.status()),
                },
                _ => ProbeOutcome::Reachable,
            },
            Err(error) if error.is_connect() => ProbeOutcome::Unreachable {
                reason: format!("connect failed: {error}"),
            },
            Err(error) if error.is_timeout() => ProbeOutcome::Unreachable {
                reason: "probe timed out".into(),
            },
            Err(_) => ProbeOutcome::Reachable,
        }
    }
}

/// Probe for deployments with no primary store configured: always
/// unreachable, so every operation takes its fallback path.
pub struct OfflineProbe;

#[async_trait]
impl HealthProbe for OfflineProbe {
    async fn probe(&self) -> ProbeOutcome {
        ProbeOutcome::Unreachable {
            reason: "no primary store configured".into(),
        }
    }
}
