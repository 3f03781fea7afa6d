//! Aggregate confidence for an accepted extraction.

/// Assumed provider-level confidence when the provider reports none.
pub const DEFAULT_PROVIDER_CONFIDENCE: f32 = 0.90;

/// Assumed per-item confidence when an item carries none.
pub const DEFAULT_ITEM_CONFIDENCE: f32 = 0.80;

/// Confidence thresholds for caller-side presentation.
pub mod thresholds {
    /// Below this: flag the extraction for manual review.
    pub const LOW: f32 = 0.50;

    /// Above this: high confidence in the item list.
    pub const HIGH: f32 = 0.85;
}

/// Aggregate score: the minimum of the provider confidence and the weakest
/// per-item confidence, clamped into [0, 1]. A single doubtful item drags
/// the whole result down — callers must not trust an average that hides it.
pub fn aggregate_confidence(provider_confidence: f32, item_confidences: &[f32]) -> f32 {
    let weakest = item_confidences
        .iter()
        .copied()
        .fold(provider_confidence, f32::min);
    weakest.clamp(0.0, 1.0)
}
