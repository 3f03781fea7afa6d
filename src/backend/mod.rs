//! Availability-aware backend selection: a TTL-cached health verdict plus
//! transparent primary/fallback routing.

pub mod health;
pub mod probe;
pub mod selector;

pub use health::{HealthCache, HealthProbe, HealthStatus, ProbeOutcome};
pub use probe::{OfflineProbe, RestProbe};
pub use selector::{BackendOperation, BackendSelector};
