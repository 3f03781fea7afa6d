//! Time-windowed health verdict for the primary data store.
//!
//! One probe round-trip per TTL window, whatever the call rate. The single
//! mutable datum is the cached verdict; the mutex is held across the whole
//! check-TTL / probe / store sequence, so concurrent callers in an expired
//! window await the one in-flight probe instead of issuing their own
//! (single-flight).
//!
//! Explicitly constructed and injectable — no global state. Callers own the
//! cache and hand it to the selector by `Arc`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Reported reachability, including "never probed".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Reachable,
    Unreachable,
    Unknown,
}

/// Outcome of one probe round-trip.
///
/// Classification rule: anything that proves the store answered — success
/// or an application-level status such as "no rows" — counts as reachable.
/// Only hard connectivity failures (connect error, timeout) and auth
/// rejections count as unreachable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Reachable,
    Unreachable { reason: String },
}

/// The cheap reachability check against the primary store.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self) -> ProbeOutcome;
}

/// Cached verdict. Uses the tokio clock so TTL expiry is testable under a
/// paused runtime.
#[derive(Debug, Clone, Copy)]
struct HealthVerdict {
    reachable: bool,
    checked_at: Instant,
}

/// Memoized, TTL-bounded reachability verdict.
pub struct HealthCache {
    probe: Arc<dyn HealthProbe>,
    ttl: Duration,
    verdict: Mutex<Option<HealthVerdict>>,
}

impl HealthCache {
    pub fn new(probe: Arc<dyn HealthProbe>, ttl: Duration) -> Self {
        Self {
            probe,
            ttl,
            verdict: Mutex::new(None),
        }
    }

    /// Current verdict, probing first if none is cached or the cached one
    /// has outlived the TTL. A stale verdict is never returned.
    pub async fn is_primary_reachable(&self) -> bool {
        let mut slot = self.verdict.lock().await;

        if let Some(verdict) = *slot {
            if verdict.checked_at.elapsed() < self.ttl {
                return verdict.reachable;
            }
        }

        let reachable = match self.probe.probe().await {
            ProbeOutcome::Reachable => {
                tracing::debug!("primary store reachable");
                true
            }
            ProbeOutcome::Unreachable { reason } => {
                tracing::warn!(reason = %reason, "primary store unreachable");
                false
            }
        };
        *slot = Some(HealthVerdict {
            reachable,
            checked_at: Instant::now(),
        });
        reachable
    }

    /// Discard the cached verdict so the next caller re-probes immediately
    /// instead of waiting out the TTL. Used after a confirmed runtime
    /// failure on the primary path.
    pub async fn force_recheck(&self) {
        *self.verdict.lock().await = None;
    }

    /// Cached status without probing. A verdict past its TTL reports
    /// `Unknown` — it must never be trusted.
    pub async fn current_status(&self) -> HealthStatus {
        match *self.verdict.lock().await {
            Some(verdict) if verdict.checked_at.elapsed() < self.ttl => {
                if verdict.reachable {
                    HealthStatus::Reachable
                } else {
                    HealthStatus::Unreachable
                }
            }
            _ => HealthStatus::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use super::*;

    /// Probe double: scripted outcome plus a call counter.
    struct CountingProbe {
        reachable: AtomicBool,
        calls: AtomicUsize,
    }

    impl CountingProbe {
        fn new(reachable: bool) -> Self {
            Self {
                reachable: AtomicBool::new(reachable),
                calls: AtomicUsize::new(0),
            }
        }

        fn set_reachable(&self, value: bool) {
            self.reachable.store(value, Ordering::SeqCst);
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HealthProbe for CountingProbe {
        async fn probe(&self) -> ProbeOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.reachable.load(Ordering::SeqCst) {
                ProbeOutcome::Reachable
            } else {
                ProbeOutcome::Unreachable {
                    reason: "connection refused".into(),
                }
            }
        }
    }

    const TTL: Duration = Duration::from_secs(30);

    #[tokio::test]
    async fn verdict_is_cached_within_ttl() {
        let probe = Arc::new(CountingProbe::new(true));
        let cache = HealthCache::new(probe.clone(), TTL);

        assert!(cache.is_primary_reachable().await);
        assert!(cache.is_primary_reachable().await);
        assert!(cache.is_primary_reachable().await);
        assert_eq!(probe.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_verdict_is_reprobed_after_ttl() {
        let probe = Arc::new(CountingProbe::new(true));
        let cache = HealthCache::new(probe.clone(), TTL);

        assert!(cache.is_primary_reachable().await);
        tokio::time::advance(TTL + Duration::from_secs(1)).await;

        // The store went down meanwhile; the stale verdict must not mask it.
        probe.set_reachable(false);
        assert!(!cache.is_primary_reachable().await);
        assert_eq!(probe.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn verdict_just_inside_ttl_is_still_trusted() {
        let probe = Arc::new(CountingProbe::new(true));
        let cache = HealthCache::new(probe.clone(), TTL);

        cache.is_primary_reachable().await;
        tokio::time::advance(TTL - Duration::from_secs(1)).await;
        cache.is_primary_reachable().await;
        assert_eq!(probe.calls(), 1);
    }

    #[tokio::test]
    async fn force_recheck_discards_the_verdict() {
        let probe = Arc::new(CountingProbe::new(true));
        let cache = HealthCache::new(probe.clone(), TTL);

        cache.is_primary_reachable().await;
        cache.force_recheck().await;
        cache.is_primary_reachable().await;
        assert_eq!(probe.calls(), 2);
    }

    #[tokio::test]
    async fn current_status_reports_without_probing() {
        let probe = Arc::new(CountingProbe::new(false));
        let cache = HealthCache::new(probe.clone(), TTL);

        assert_eq!(cache.current_status().await, HealthStatus::Unknown);
        assert_eq!(probe.calls(), 0);

        cache.is_primary_reachable().await;
        assert_eq!(cache.current_status().await, HealthStatus::Unreachable);
        assert_eq!(probe.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn current_status_goes_unknown_once_stale() {
        let probe = Arc::new(CountingProbe::new(true));
        let cache = HealthCache::new(probe, TTL);

        cache.is_primary_reachable().await;
        assert_eq!(cache.current_status().await, HealthStatus::Reachable);

        tokio::time::advance(TTL + Duration::from_secs(1)).await;
        assert_eq!(cache.current_status().await, HealthStatus::Unknown);
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_probe() {
        let probe = Arc::new(CountingProbe::new(false));
        let cache = Arc::new(HealthCache::new(probe.clone(), TTL));

        let (a, b) = tokio::join!(
            cache.is_primary_reachable(),
            cache.is_primary_reachable()
        );
        assert!(!a);
        assert!(!b);
        assert_eq!(probe.calls(), 1, "single-flight: exactly one round-trip");
    }
}
