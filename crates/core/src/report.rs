use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::category::AmountCategory;
use crate::currency::Currency;

/// A value paired with the role it plays on the bill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedAmount {
    #[serde(rename = "type")]
    pub category: AmountCategory,
    pub value: Amount,
}

impl ClassifiedAmount {
    pub fn new(category: AmountCategory, value: Amount) -> Self {
        Self { category, value }
    }
}

/// A classified amount with the source excerpt that justifies it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalAmount {
    #[serde(rename = "type")]
    pub category: AmountCategory,
    pub value: Amount,
    /// `text: '<line excerpt>'`, or `unknown` when no line carries the value.
    pub source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Ok,
    NoAmountsFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoAmountsReason {
    #[serde(rename = "document too noisy")]
    TooNoisy,
    #[serde(rename = "no numeric values detected")]
    NoNumericValues,
}

impl std::fmt::Display for NoAmountsReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NoAmountsReason::TooNoisy => write!(f, "document too noisy"),
            NoAmountsReason::NoNumericValues => write!(f, "no numeric values detected"),
        }
    }
}

/// Terminal, non-error outcome: the document holds nothing to extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoAmountsFound {
    pub status: ReportStatus,
    pub reason: NoAmountsReason,
}

impl NoAmountsFound {
    pub fn new(reason: NoAmountsReason) -> Self {
        Self { status: ReportStatus::NoAmountsFound, reason }
    }
}

/// The final answer for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub currency: Currency,
    pub amounts: Vec<FinalAmount>,
    pub status: ReportStatus,
    /// Classification confidence in [0, 1]. Absent when the report was
    /// assembled on its own rather than by the full pipeline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
}
