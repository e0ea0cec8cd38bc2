use medbill_core::{Amount, AmountCategory, ClassifiedAmount};
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::ai::{AiError, CompletionBackend};
use crate::fallback;
use crate::types::{Classification, ClassificationMethod};

/// Confidence used when the model's reply omits one.
pub const DEFAULT_MODEL_CONFIDENCE: f64 = 0.75;

#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error(transparent)]
    Ai(#[from] AiError),
    #[error("No JSON object in model reply")]
    NoJson,
    #[error("Malformed JSON in model reply: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Model reply violates schema: {0}")]
    Schema(String),
}

/// Classify amounts by context. Tries the model first; any failure on that
/// path is logged and answered by the keyword fallback instead.
pub async fn classify_amounts<C: CompletionBackend + ?Sized>(
    backend: &C,
    text: &str,
    amounts: &[Amount],
) -> Classification {
    if amounts.is_empty() {
        return Classification::empty();
    }

    match classify_with_model(backend, text, amounts).await {
        Ok(classification) => {
            info!(
                model = backend.model_name(),
                amounts = classification.amounts.len(),
                "classified by model"
            );
            classification
        }
        Err(e) => {
            warn!(model = backend.model_name(), error = %e, "model classification failed, using keyword fallback");
            fallback::classify(text, amounts)
        }
    }
}

async fn classify_with_model<C: CompletionBackend + ?Sized>(
    backend: &C,
    text: &str,
    amounts: &[Amount],
) -> Result<Classification, ClassificationError> {
    let prompt = build_prompt(text, amounts);
    let reply = backend.complete(&prompt).await?;
    parse_model_reply(&reply)
}

pub fn build_prompt(text: &str, amounts: &[Amount]) -> String {
    let amount_list = serde_json::to_string(amounts).unwrap_or_else(|_| "[]".to_string());
    let categories: String = AmountCategory::ALL
        .iter()
        .map(|c| format!("- {}: {}\n", c.label(), c.description()))
        .collect();

    format!(
        "Analyze this medical bill/receipt text and classify the amounts by their context.\n\
         \n\
         Text: {text}\n\
         \n\
         Amounts found: {amount_list}\n\
         \n\
         Common medical bill categories:\n\
         {categories}\n\
         For each amount, identify its type based on the surrounding text context.\n\
         \n\
         Return ONLY a valid JSON object in this exact format:\n\
         {{\n  \"amounts\": [\n    {{\"type\": \"category_name\", \"value\": amount_number}},\n    ...\n  ],\n  \"confidence\": 0.XX\n}}"
    )
}

#[derive(Deserialize)]
struct ModelReply {
    amounts: Vec<ModelAmount>,
    #[serde(default)]
    confidence: Option<f64>,
}

#[derive(Deserialize)]
struct ModelAmount {
    #[serde(rename = "type")]
    label: String,
    value: Amount,
}

/// Parse the first balanced JSON object in a model reply and validate it.
/// Nothing from a reply is used unless the whole object validates.
pub fn parse_model_reply(reply: &str) -> Result<Classification, ClassificationError> {
    let span = first_json_object(reply).ok_or(ClassificationError::NoJson)?;
    let parsed: ModelReply = serde_json::from_str(span)?;

    let amounts = parsed
        .amounts
        .into_iter()
        .map(|a| {
            let value = a.value.normalized();
            if value.is_positive() {
                Ok(ClassifiedAmount::new(AmountCategory::from_label(&a.label), value))
            } else {
                Err(ClassificationError::Schema(format!("non-positive value {value}")))
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    let confidence = parsed
        .confidence
        .map_or(DEFAULT_MODEL_CONFIDENCE, |c| c.clamp(0.0, 1.0));

    Ok(Classification { amounts, confidence, method: ClassificationMethod::Model })
}

/// The first `{...}` span whose braces balance, ignoring braces inside JSON
/// strings.
pub fn first_json_object(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
