//! Numeric bounds enforcement on extracted items.
//!
//! Applied to every parsed payload before the caller sees it. Never trust a
//! provider-asserted number. One authoritative policy table, explicit per
//! field:
//!
//! | field                  | policy   | bound                               |
//! |------------------------|----------|-------------------------------------|
//! | `energy_kcal`          | strict   | `0 <= v <= max_energy_kcal`         |
//! | `mass_grams`           | strict   | `0 < v <= max_mass_grams`           |
//! | `protein/carb/fat`     | strict   | `v >= 0`                            |
//! | macro-nutrient sum     | strict   | `sum <= mass_grams * macro_tolerance` |
//! | `water_grams`          | advisory | clipped into `[0, mass_grams]`      |
//! | `name`                 | advisory | empty replaced with a placeholder   |
//!
//! Strict fields reject the whole item list (the caller gets a typed
//! failure); advisory fields are clipped in place. Clipping is a pure clamp
//! with no rounding, so sanitizing an already-valid list is the identity.

use thiserror::Error;

use super::types::ExtractedItem;

/// Shown when a provider omits or blanks an item name.
const UNNAMED_ITEM: &str = "unidentified item";

/// Bounds the sanitizer enforces. Tunable via configuration; defaults
/// reflect plausible single-meal extremes.
#[derive(Debug, Clone)]
pub struct SanitizerPolicy {
    /// Hard ceiling on per-item energy.
    pub max_energy_kcal: f64,
    /// Hard ceiling on per-item mass.
    pub max_mass_grams: f64,
    /// Macro-nutrient masses may sum to at most `mass_grams` times this
    /// factor. Above 1.0 to allow for water content and rounding.
    pub macro_tolerance: f64,
}

impl Default for SanitizerPolicy {
    fn default() -> Self {
        Self {
            max_energy_kcal: 9_000.0,
            max_mass_grams: 5_000.0,
            macro_tolerance: 1.1,
        }
    }
}

/// A strict-field violation. Carries the item name and the offending field
/// for the failure detail string.
#[derive(Debug, Clone, Error)]
#[error("{field} out of bounds for '{item}': {detail}")]
pub struct BoundsViolation {
    pub item: String,
    pub field: &'static str,
    pub detail: String,
}

/// Validate and clip a parsed item list.
///
/// Returns the sanitized list, or the first strict-field violation found.
/// Idempotent: running it again on its own output returns an identical list.
pub fn sanitize_items(
    items: Vec<ExtractedItem>,
    policy: &SanitizerPolicy,
) -> Result<Vec<ExtractedItem>, BoundsViolation> {
    items
        .into_iter()
        .map(|item| sanitize_item(item, policy))
        .collect()
}

fn sanitize_item(
    mut item: ExtractedItem,
    policy: &SanitizerPolicy,
) -> Result<ExtractedItem, BoundsViolation> {
    let name = if item.name.trim().is_empty() {
        UNNAMED_ITEM.to_owned()
    } else {
        item.name.trim().to_owned()
    };

    if !(item.mass_grams > 0.0 && item.mass_grams <= policy.max_mass_grams) {
        return Err(BoundsViolation {
            item: name,
            field: "mass_grams",
            detail: format!(
                "{} outside (0, {}]",
                item.mass_grams, policy.max_mass_grams
            ),
        });
    }
    if !(item.energy_kcal >= 0.0 && item.energy_kcal <= policy.max_energy_kcal) {
        return Err(BoundsViolation {
            item: name,
            field: "energy_kcal",
            detail: format!(
                "{} outside [0, {}]",
                item.energy_kcal, policy.max_energy_kcal
            ),
        });
    }
    for (field, value) in [
        ("protein_grams", item.protein_grams),
        ("carb_grams", item.carb_grams),
        ("fat_grams", item.fat_grams),
    ] {
        if !(value >= 0.0) {
            return Err(BoundsViolation {
                item: name,
                field,
                detail: format!("{value} is negative"),
            });
        }
    }

    let macro_sum = item.protein_grams + item.carb_grams + item.fat_grams;
    let macro_ceiling = item.mass_grams * policy.macro_tolerance;
    if macro_sum > macro_ceiling {
        return Err(BoundsViolation {
            item: name,
            field: "macro sum",
            detail: format!("{macro_sum}g exceeds {macro_ceiling}g ceiling"),
        });
    }

    // Advisory fields: clip, never reject.
    item.name = name;
    item.water_grams = item.water_grams.clamp(0.0, item.mass_grams);

    Ok(item)
}
