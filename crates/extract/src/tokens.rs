use std::collections::HashSet;

use medbill_core::{Currency, NoAmountsFound, NoAmountsReason};
use regex::Regex;
use tracing::debug;

use crate::types::{round2, ExtractedTokens, TokenExtraction};

/// Documents shorter than this (trimmed, in characters) are treated as noise.
pub const MIN_TEXT_CHARS: usize = 5;

re!(re_plain_number, r"\d+(?:\.\d+)?%?");
re!(re_leading_one_glyph, r"[lI]\d+");
re!(re_trailing_one_glyph, r"\d+[lI]");
re!(re_leading_zero_glyph, r"[Oo]\d+");

// Codes may follow a digit directly ("2940USD") but not other letters ("Doctors").
re!(re_inr, r"(?i)(?:^|[^a-z])(?:INR|Rs\.?)|₹");
re!(re_usd, r"(?i)(?:^|[^a-z])USD|\$");
re!(re_eur, r"(?i)(?:^|[^a-z])EUR|€");

/// Numeric-looking token shapes, scanned in this order. The last three catch
/// OCR reading `1` as `l`/`I` and `0` as `O`/`o`.
pub const TOKEN_PATTERNS: [fn() -> &'static Regex; 4] = [
    re_plain_number,
    re_leading_one_glyph,
    re_trailing_one_glyph,
    re_leading_zero_glyph,
];

/// Currency markers in priority order; the first one present wins.
pub const CURRENCY_PATTERNS: [(Currency, fn() -> &'static Regex); 3] = [
    (Currency::Inr, re_inr),
    (Currency::Usd, re_usd),
    (Currency::Eur, re_eur),
];

/// Pull raw numeric tokens and a currency hint out of document text.
pub fn extract_tokens(text: &str, confidence: f64) -> TokenExtraction {
    if text.trim().chars().count() < MIN_TEXT_CHARS {
        return TokenExtraction::NoAmounts(NoAmountsFound::new(NoAmountsReason::TooNoisy));
    }

    let raw_tokens = scan_tokens(text);
    if raw_tokens.is_empty() {
        return TokenExtraction::NoAmounts(NoAmountsFound::new(NoAmountsReason::NoNumericValues));
    }

    let currency_hint = detect_currency(text);
    debug!(tokens = raw_tokens.len(), currency = %currency_hint, "tokens extracted");

    TokenExtraction::Tokens(ExtractedTokens {
        raw_tokens,
        currency_hint,
        confidence: round2(confidence),
    })
}

/// All pattern matches, pattern by pattern, de-duplicated in first-seen order.
pub fn scan_tokens(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    TOKEN_PATTERNS
        .iter()
        .flat_map(|pattern| pattern().find_iter(text))
        .map(|m| m.as_str())
        .filter(|token| seen.insert(*token))
        .map(str::to_string)
        .collect()
}

pub fn detect_currency(text: &str) -> Currency {
    CURRENCY_PATTERNS
        .iter()
        .find(|(_, pattern)| pattern().is_match(text))
        .map(|(currency, _)| *currency)
        .unwrap_or_default()
}
