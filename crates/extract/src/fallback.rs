//! Deterministic keyword-proximity classifier, used whenever the model path
//! fails or is not configured.

use std::sync::OnceLock;

use medbill_core::{Amount, AmountCategory, ClassifiedAmount};
use regex::Regex;

use crate::locate::standalone_occurrences;
use crate::types::{Classification, ClassificationMethod};

pub const FALLBACK_CONFIDENCE: f64 = 0.70;

/// Most characters allowed between a keyword and the amount it labels.
pub const PROXIMITY_WINDOW: usize = 40;

/// Category keywords in priority order. Priority only breaks ties between
/// keywords at the same distance from the amount.
pub const CATEGORY_KEYWORDS: [(AmountCategory, &[&str]); 7] = [
    (AmountCategory::TotalBill, &["total", "grand total", "amount", "bill"]),
    (AmountCategory::Paid, &["paid", "payment", "received"]),
    (AmountCategory::Due, &["due", "balance", "outstanding", "pending"]),
    (AmountCategory::Discount, &["discount", "off"]),
    (AmountCategory::ConsultationFee, &["consultation", "doctor", "visit"]),
    (AmountCategory::MedicineCost, &["medicine", "药", "drugs", "pharmacy"]),
    (AmountCategory::TestCost, &["test", "lab", "x-ray", "scan"]),
];

fn keyword_rules() -> &'static [(AmountCategory, Regex)] {
    static RULES: OnceLock<Vec<(AmountCategory, Regex)>> = OnceLock::new();
    RULES.get_or_init(|| {
        CATEGORY_KEYWORDS
            .iter()
            .map(|(category, keywords)| {
                let alternatives: Vec<String> = keywords.iter().map(|k| keyword_pattern(k)).collect();
                let pattern = format!("(?i)(?:{})", alternatives.join("|"));
                (*category, Regex::new(&pattern).expect("invalid keyword regex"))
            })
            .collect()
    })
}

/// Latin keywords must start a word (`lab` matches "Lab Tests", not "Collab");
/// CJK keywords match anywhere.
fn keyword_pattern(keyword: &str) -> String {
    let escaped = regex::escape(keyword);
    if keyword.starts_with(|c: char| c.is_ascii_alphanumeric()) {
        format!(r"\b{escaped}")
    } else {
        escaped
    }
}

pub fn classify(text: &str, amounts: &[Amount]) -> Classification {
    let amounts = amounts
        .iter()
        .map(|a| ClassifiedAmount::new(categorize(text, *a), *a))
        .collect();
    Classification {
        amounts,
        confidence: FALLBACK_CONFIDENCE,
        method: ClassificationMethod::Fallback,
    }
}

/// Label one amount by the nearest category keyword on the same line as one
/// of its occurrences.
pub fn categorize(text: &str, amount: Amount) -> AmountCategory {
    let digits = amount.integer_text();
    let rules = keyword_rules();

    // (distance in chars, priority); smaller wins on both.
    let mut best: Option<(usize, usize)> = None;

    for line in text.lines() {
        for hit in standalone_occurrences(line, &digits) {
            for (priority, (_, re)) in rules.iter().enumerate() {
                for kw in re.find_iter(line) {
                    let gap = if kw.end() <= hit.start {
                        &line[kw.end()..hit.start]
                    } else if kw.start() >= hit.end {
                        &line[hit.end..kw.start()]
                    } else {
                        continue;
                    };
                    let distance = gap.chars().count();
                    if distance > PROXIMITY_WINDOW {
                        continue;
                    }
                    let candidate = (distance, priority);
                    if best.map_or(true, |b| candidate < b) {
                        best = Some(candidate);
                    }
                }
            }
        }
    }

    best.map_or(AmountCategory::Other, |(_, priority)| rules[priority].0)
}
