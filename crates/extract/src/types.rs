use medbill_core::{Amount, ClassifiedAmount, Currency, ExtractionReport, NoAmountsFound};
use serde::{Deserialize, Serialize};

/// Output of token extraction when the document carries numeric text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedTokens {
    pub raw_tokens: Vec<String>,
    pub currency_hint: Currency,
    /// Acquisition confidence, rounded to two decimals.
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TokenExtraction {
    Tokens(ExtractedTokens),
    NoAmounts(NoAmountsFound),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Normalized {
    pub normalized_amounts: Vec<Amount>,
    pub normalization_confidence: f64,
}

/// Which path produced a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClassificationMethod {
    /// No amounts, nothing to classify.
    #[default]
    Empty,
    Model,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub amounts: Vec<ClassifiedAmount>,
    pub confidence: f64,
    #[serde(skip)]
    pub method: ClassificationMethod,
}

impl Classification {
    pub fn empty() -> Self {
        Self { amounts: vec![], confidence: 0.0, method: ClassificationMethod::Empty }
    }
}

/// Result of running the whole pipeline over one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PipelineOutcome {
    Report(ExtractionReport),
    NoAmounts(NoAmountsFound),
}

pub(crate) fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
