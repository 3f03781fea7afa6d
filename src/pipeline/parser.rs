//! Defensive parsing of provider output.
//!
//! Providers return loosely-structured text: sometimes a bare JSON array,
//! sometimes JSON wrapped in prose or a code fence, sometimes an explicit
//! refusal object. Decoding is a tagged two-step: a strict decode against
//! the expected shape first, then a named permissive pass that locates the
//! first balanced JSON array or object substring. Nothing a provider
//! asserts is trusted here — numeric bounds are the sanitizer's job.

use serde::Deserialize;
use thiserror::Error;

use super::types::ExtractedItem;

/// One item as providers report it, field names per the extraction template.
#[derive(Debug, Clone, Deserialize)]
pub struct WireItem {
    pub name: String,
    pub weight: f64,
    pub calories: f64,
    #[serde(default)]
    pub proteins: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub fats: f64,
    #[serde(default)]
    pub water: f64,
    pub confidence: Option<f32>,
}

impl WireItem {
    pub fn into_item(self) -> ExtractedItem {
        ExtractedItem {
            name: self.name,
            mass_grams: self.weight,
            energy_kcal: self.calories,
            protein_grams: self.proteins,
            carb_grams: self.carbs,
            fat_grams: self.fats,
            water_grams: self.water,
        }
    }
}

/// Decoded Stage-2 payload: either items or a provider-asserted refusal.
#[derive(Debug)]
pub enum ParsedPayload {
    Items(Vec<WireItem>),
    /// The provider itself judged the image not to be food. Authoritative
    /// even after the gate passed.
    Refusal {
        subject: Option<String>,
        detail: String,
    },
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no decodable JSON payload in provider response")]
    Undecodable,
}

/// Compact Stage-1 gate reply. Every field optional: a missing or mangled
/// verdict must not turn into a rejection.
#[derive(Debug, Deserialize)]
pub struct GateWire {
    #[serde(rename = "isFood")]
    pub is_food: Option<bool>,
    pub object: Option<String>,
}

/// Decode a Stage-2 provider response.
///
/// Order: strict array decode, strict object decode (refusal or single
/// item), then the permissive pass over the first balanced `[...]` and
/// `{...}` substrings.
pub fn parse_provider_payload(raw: &str) -> Result<ParsedPayload, ParseError> {
    let trimmed = raw.trim();

    if let Ok(items) = serde_json::from_str::<Vec<WireItem>>(trimmed) {
        return Ok(ParsedPayload::Items(items));
    }
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(parsed) = classify_object(&value) {
            return Ok(parsed);
        }
    }

    if let Some(slice) = balanced_slice(trimmed, '[', ']') {
        if let Ok(items) = serde_json::from_str::<Vec<WireItem>>(slice) {
            return Ok(ParsedPayload::Items(items));
        }
    }
    if let Some(slice) = balanced_slice(trimmed, '{', '}') {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(slice) {
            if let Some(parsed) = classify_object(&value) {
                return Ok(parsed);
            }
        }
    }

    Err(ParseError::Undecodable)
}

/// Decode a Stage-1 gate reply. `None` means no usable verdict — the
/// caller fails open.
pub fn parse_gate_verdict(raw: &str) -> Option<GateWire> {
    let trimmed = raw.trim();
    if let Ok(wire) = serde_json::from_str::<GateWire>(trimmed) {
        return Some(wire);
    }
    let slice = balanced_slice(trimmed, '{', '}')?;
    serde_json::from_str(slice).ok()
}

/// Interpret a decoded JSON object: refusal payload or a single bare item.
fn classify_object(value: &serde_json::Value) -> Option<ParsedPayload> {
    let object = value.as_object()?;

    if let Some(error) = object.get("error").and_then(|v| v.as_str()) {
        return Some(ParsedPayload::Refusal {
            subject: object
                .get("object")
                .and_then(|v| v.as_str())
                .map(str::to_owned),
            detail: error.to_owned(),
        });
    }
    if object.get("isFood").and_then(|v| v.as_bool()) == Some(false) {
        return Some(ParsedPayload::Refusal {
            subject: object
                .get("object")
                .and_then(|v| v.as_str())
                .map(str::to_owned),
            detail: "provider classified image as non-food".to_owned(),
        });
    }

    // Some providers answer with a single item object instead of an array.
    serde_json::from_value::<WireItem>(value.clone())
        .ok()
        .map(|item| ParsedPayload::Items(vec![item]))
}

/// First balanced `open..close` substring, skipping JSON string literals so
/// brackets inside quoted text do not unbalance the scan.
fn balanced_slice(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        if ch == '"' {
            in_string = true;
        } else if ch == open {
            depth += 1;
        } else if ch == close {
            depth -= 1;
            if depth == 0 {
                return Some(&text[start..start + offset + ch.len_utf8()]);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const SINGLE_ITEM_ARRAY: &str = r#"[
        {"name": "margherita pizza", "weight": 300, "calories": 750,
         "proteins": 30, "carbs": 90, "fats": 28, "water": 120, "confidence": 0.92}
    ]"#;

    #[test]
    fn strict_array_decodes() {
        let parsed = parse_provider_payload(SINGLE_ITEM_ARRAY).unwrap();
        let ParsedPayload::Items(items) = parsed else {
            panic!("expected items");
        };
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "margherita pizza");
        assert_eq!(items[0].confidence, Some(0.92));
    }

    #[test]
    fn permissive_pass_recovers_array_embedded_in_prose() {
        let raw = format!(
            "Here is what I found in the photo:\n\n{SINGLE_ITEM_ARRAY}\n\nEnjoy your meal!"
        );
        let parsed = parse_provider_payload(&raw).unwrap();
        let ParsedPayload::Items(items) = parsed else {
            panic!("expected items");
        };
        assert_eq!(items[0].weight, 300.0);
    }

    #[test]
    fn permissive_pass_recovers_array_in_code_fence() {
        let raw = format!("```json\n{SINGLE_ITEM_ARRAY}\n```");
        let parsed = parse_provider_payload(&raw).unwrap();
        assert!(matches!(parsed, ParsedPayload::Items(items) if items.len() == 1));
    }

    #[test]
    fn refusal_object_is_detected() {
        let raw = r#"{"error": "NOT_FOOD", "object": "a television remote"}"#;
        let parsed = parse_provider_payload(raw).unwrap();
        let ParsedPayload::Refusal { subject, detail } = parsed else {
            panic!("expected refusal");
        };
        assert_eq!(subject.as_deref(), Some("a television remote"));
        assert_eq!(detail, "NOT_FOOD");
    }

    #[test]
    fn refusal_embedded_in_prose_is_detected() {
        let raw = "I cannot help with that.\n{\"error\": \"NOT_FOOD\", \"object\": \"shoes\"}";
        let parsed = parse_provider_payload(raw).unwrap();
        assert!(matches!(parsed, ParsedPayload::Refusal { .. }));
    }

    #[test]
    fn is_food_false_object_counts_as_refusal() {
        let raw = r#"{"isFood": false, "object": "a laptop"}"#;
        let parsed = parse_provider_payload(raw).unwrap();
        let ParsedPayload::Refusal { subject, .. } = parsed else {
            panic!("expected refusal");
        };
        assert_eq!(subject.as_deref(), Some("a laptop"));
    }

    #[test]
    fn single_bare_item_object_is_accepted() {
        let raw = r#"{"name": "banana", "weight": 120, "calories": 105}"#;
        let parsed = parse_provider_payload(raw).unwrap();
        let ParsedPayload::Items(items) = parsed else {
            panic!("expected items");
        };
        assert_eq!(items.len(), 1);
        // Missing macro fields default to zero.
        assert_eq!(items[0].proteins, 0.0);
        assert!(items[0].confidence.is_none());
    }

    #[test]
    fn pure_prose_is_undecodable() {
        let raw = "The image shows a delicious plate of pasta with tomato sauce.";
        assert!(matches!(
            parse_provider_payload(raw),
            Err(ParseError::Undecodable)
        ));
    }

    #[test]
    fn brackets_inside_strings_do_not_unbalance_the_scan() {
        let raw = r#"note [draft]: [{"name": "rice [steamed]", "weight": 200, "calories": 260}]"#;
        // The first '[' opens "[draft]", which is not a decodable array; the
        // object fallback must still recover the item, with the bracketed
        // text inside its name intact.
        let parsed = parse_provider_payload(raw).unwrap();
        let ParsedPayload::Items(items) = parsed else {
            panic!("expected items");
        };
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "rice [steamed]");
    }

    #[test]
    fn unterminated_array_yields_no_slice() {
        assert!(balanced_slice(r#"[{"name": "x""#, '[', ']').is_none());
    }

    #[test]
    fn gate_verdict_strict_and_embedded() {
        let strict = parse_gate_verdict(r#"{"isFood": true, "object": "pizza"}"#).unwrap();
        assert_eq!(strict.is_food, Some(true));
        assert_eq!(strict.object.as_deref(), Some("pizza"));

        let embedded =
            parse_gate_verdict("Sure! {\"isFood\": false, \"object\": \"a foot\"}").unwrap();
        assert_eq!(embedded.is_food, Some(false));
    }

    #[test]
    fn gate_verdict_prose_yields_none() {
        assert!(parse_gate_verdict("definitely food, looks tasty").is_none());
    }

    #[test]
    fn wire_item_converts_to_domain_fields() {
        let wire = WireItem {
            name: "apple".into(),
            weight: 180.0,
            calories: 95.0,
            proteins: 0.5,
            carbs: 25.0,
            fats: 0.3,
            water: 150.0,
            confidence: Some(0.9),
        };
        let item = wire.into_item();
        assert_eq!(item.mass_grams, 180.0);
        assert_eq!(item.energy_kcal, 95.0);
        assert_eq!(item.water_grams, 150.0);
    }
}
