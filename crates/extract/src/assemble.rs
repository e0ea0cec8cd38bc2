use medbill_core::{ClassifiedAmount, Currency, ExtractionReport, FinalAmount, ReportStatus};

use crate::locate::first_line_with;

/// Longest line excerpt quoted as provenance, in characters.
pub const PROVENANCE_MAX_CHARS: usize = 50;
pub const UNKNOWN_SOURCE: &str = "unknown";

/// Attach provenance to each classified amount and build the report.
/// `confidence_score` is left for the caller to fill in.
pub fn assemble(text: &str, currency: Currency, classified: &[ClassifiedAmount]) -> ExtractionReport {
    let amounts = classified
        .iter()
        .map(|c| FinalAmount {
            category: c.category,
            value: c.value,
            source: provenance(text, &c.value.integer_text()),
        })
        .collect();

    ExtractionReport {
        currency,
        amounts,
        status: ReportStatus::Ok,
        confidence_score: None,
    }
}

/// `text: '<excerpt>'` for the first line holding `digits`, else `unknown`.
pub fn provenance(text: &str, digits: &str) -> String {
    match first_line_with(text, digits) {
        Some(line) => {
            let excerpt: String = line.trim().chars().take(PROVENANCE_MAX_CHARS).collect();
            format!("text: '{excerpt}'")
        }
        None => UNKNOWN_SOURCE.to_string(),
    }
}
