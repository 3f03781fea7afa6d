//! Instruction templates for both pipeline stages, kept as data.
//!
//! The gate instruction is intentionally asymmetric: accept broadly, reject
//! only subjects on an enumerated denylist. A false rejection silently
//! discards a legitimate meal photo; a false acceptance costs one Stage-2
//! call that the sanitizer can still catch. The extraction instruction pins
//! the exact JSON shapes the parser understands, including the refusal
//! object a provider may answer with.

/// Categories the gate may reject outright. Everything else passes.
pub const GATE_DENYLIST: &[&str] = &[
    "human body parts (hands, feet, faces)",
    "phones, computers, and other electronics",
    "clothing, shoes, and bags",
    "vehicles",
    "live animals",
    "furniture and household objects",
];

/// Marker string providers use to refuse an image as non-food.
pub const REFUSAL_MARKER: &str = "NOT_FOOD";

/// Instruction set for both stages, overridable per deployment.
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    pub gate: String,
    pub extraction: String,
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self {
            gate: gate_instruction(),
            extraction: extraction_instruction(),
        }
    }
}

/// Stage-1 instruction: permissive binary check with a compact reply shape.
pub fn gate_instruction() -> String {
    let denylist = GATE_DENYLIST
        .iter()
        .map(|category| format!("- {category}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Could this image contain food or drink?\n\
         Answer with exactly one JSON object: {{\"isFood\": true/false, \"object\": \"what you see\"}}\n\
         Say false ONLY if the image clearly shows one of:\n{denylist}\n\
         If there is any doubt at all, answer {{\"isFood\": true}}."
    )
}

/// Stage-2 instruction: structured nutrition extraction with a pinned schema.
pub fn extraction_instruction() -> String {
    format!(
        "You are a nutritionist. Identify every food or drink item in the image.\n\
         Reply with ONLY a JSON array, one object per item:\n\
         [{{\"name\": \"item name\", \"weight\": grams, \"calories\": kcal, \
         \"proteins\": grams, \"carbs\": grams, \"fats\": grams, \
         \"water\": grams, \"confidence\": 0.0-1.0}}]\n\
         Estimate weights from visible portion sizes. Macro-nutrient masses \
         must be consistent with the total weight.\n\
         If the image clearly contains no food or drink, reply instead with:\n\
         {{\"error\": \"{REFUSAL_MARKER}\", \"object\": \"what the image shows\"}}"
    )
}
