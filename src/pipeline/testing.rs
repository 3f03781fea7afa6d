//! Scripted provider double shared by the chain, gate, and pipeline tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::provider::{ProviderError, VisionProvider};
use super::types::{ImagePayload, RawProviderResponse};

enum Mode {
    Reply(String),
    Fail(String),
    Hang,
}

/// A provider that replies, fails, or hangs on every invocation, counting
/// how often it was called.
pub(crate) struct ScriptedProvider {
    id: String,
    priority: u32,
    mode: Mode,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn replying(id: &str, priority: u32, raw_text: &str) -> Self {
        Self {
            id: id.into(),
            priority,
            mode: Mode::Reply(raw_text.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(id: &str, priority: u32, reason: &str) -> Self {
        Self {
            id: id.into(),
            priority,
            mode: Mode::Fail(reason.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn hanging(id: &str, priority: u32) -> Self {
        Self {
            id: id.into(),
            priority,
            mode: Mode::Hang,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisionProvider for ScriptedProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    async fn invoke(
        &self,
        _instruction: &str,
        _image: &ImagePayload,
    ) -> Result<RawProviderResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.mode {
            Mode::Reply(text) => Ok(RawProviderResponse {
                raw_text: text.clone(),
                http_status: 200,
            }),
            Mode::Fail(reason) => Err(ProviderError::Connect(reason.clone())),
            Mode::Hang => std::future::pending().await,
        }
    }
}
