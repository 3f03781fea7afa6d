//! Availability-aware routing between the primary store and a local
//! fallback dataset.
//!
//! The health verdict is advisory, not authoritative: a primary-call
//! failure always wins, demoting the cached verdict immediately so repeated
//! failures inside one TTL window do not each cost a primary round-trip.
//! "Primary unavailable" is a logical condition the selector absorbs; only
//! a fallback failure reaches the caller.

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use super::health::HealthCache;

/// One logical read/write: a primary and a fallback implementation with
/// the same return shape, plus a name for diagnostics. Immutable once
/// constructed; consumed by a single `execute` call.
pub struct BackendOperation<'a, T, E> {
    name: &'a str,
    primary: Box<dyn FnOnce() -> BoxFuture<'a, Result<T, E>> + Send + 'a>,
    fallback: Box<dyn FnOnce() -> BoxFuture<'a, Result<T, E>> + Send + 'a>,
}

impl<'a, T, E> BackendOperation<'a, T, E> {
    pub fn new<P, PFut, F, FFut>(name: &'a str, primary: P, fallback: F) -> Self
    where
        P: FnOnce() -> PFut + Send + 'a,
        PFut: std::future::Future<Output = Result<T, E>> + Send + 'a,
        F: FnOnce() -> FFut + Send + 'a,
        FFut: std::future::Future<Output = Result<T, E>> + Send + 'a,
    {
        Self {
            name,
            primary: Box::new(move || primary().boxed()),
            fallback: Box::new(move || fallback().boxed()),
        }
    }

    pub fn name(&self) -> &str {
        self.name
    }
}

/// Routes operations according to the shared health verdict.
pub struct BackendSelector {
    health: Arc<HealthCache>,
}

impl BackendSelector {
    pub fn new(health: Arc<HealthCache>) -> Self {
        Self { health }
    }

    pub fn health(&self) -> &HealthCache {
        &self.health
    }

    /// Run one operation, best-effort.
    ///
    /// Known-unreachable primary: straight to the fallback. Otherwise try
    /// the primary; on failure, demote the verdict once and run the
    /// fallback, swallowing the primary's error into telemetry. Only a
    /// fallback failure propagates.
    pub async fn execute<T, E: fmt::Display>(
        &self,
        op: BackendOperation<'_, T, E>,
    ) -> Result<T, E> {
        if !self.health.is_primary_reachable().await {
            tracing::info!(
                operation = %op.name,
                "primary known unreachable, using fallback"
            );
            return (op.fallback)().await;
        }

        match (op.primary)().await {
            Ok(value) => {
                tracing::debug!(operation = %op.name, "completed on primary");
                Ok(value)
            }
            Err(error) => {
                tracing::warn!(
                    operation = %op.name,
                    error = %error,
                    "primary failed, demoting verdict and using fallback"
                );
                self.health.force_recheck().await;
                (op.fallback)().await
            }
        }
    }
}
