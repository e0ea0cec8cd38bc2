use medbill_core::Amount;
use tracing::debug;

use crate::types::Normalized;

/// Glyphs OCR commonly substitutes for digits, with the digit they stand for.
pub const OCR_GLYPH_FIXES: [(char, char); 4] = [('l', '1'), ('I', '1'), ('O', '0'), ('o', '0')];

/// Thousands separators dropped before parsing.
const GROUP_SEPARATORS: [char; 1] = [','];

/// Confidence reported whenever at least one token survives normalization.
pub const NORMALIZATION_CONFIDENCE: f64 = 0.82;

/// Turn raw tokens into positive amounts, in order. Percentages, unparseable
/// tokens and non-positive values are dropped without error.
pub fn normalize_tokens<S: AsRef<str>>(tokens: &[S]) -> Normalized {
    let normalized_amounts: Vec<Amount> = tokens
        .iter()
        .filter_map(|t| normalize_token(t.as_ref()))
        .collect();

    debug!(
        tokens = tokens.len(),
        amounts = normalized_amounts.len(),
        "tokens normalized"
    );

    let normalization_confidence = if normalized_amounts.is_empty() {
        0.0
    } else {
        NORMALIZATION_CONFIDENCE
    };

    Normalized { normalized_amounts, normalization_confidence }
}

pub fn normalize_token(token: &str) -> Option<Amount> {
    if token.contains('%') {
        return None;
    }
    let cleaned = repair_glyphs(token);
    Amount::parse(&cleaned).filter(|a| a.is_positive())
}

/// Apply [`OCR_GLYPH_FIXES`] and strip group separators.
pub fn repair_glyphs(token: &str) -> String {
    token
        .chars()
        .filter(|c| !GROUP_SEPARATORS.contains(c))
        .map(|c| {
            OCR_GLYPH_FIXES
                .iter()
                .find(|(glyph, _)| *glyph == c)
                .map_or(c, |(_, digit)| *digit)
        })
        .collect()
}
