//! Finding an amount's digits inside document text.

use std::ops::Range;

/// Byte ranges where `digits` appears in `haystack` as a number of its own,
/// not as a piece of a longer figure (`940` inside `2940` or `2,940`).
pub fn standalone_occurrences<'a>(
    haystack: &'a str,
    digits: &'a str,
) -> impl Iterator<Item = Range<usize>> + 'a {
    let bytes = haystack.as_bytes();
    haystack
        .match_indices(digits)
        .map(|(start, m)| start..start + m.len())
        .filter(move |r| !digits.is_empty() && !continues_left(bytes, r.start) && !continues_right(bytes, r.end))
}

/// First line holding the digits. A line where they stand alone beats an
/// earlier line where they only appear inside a longer number.
pub fn first_line_with<'a>(text: &'a str, digits: &str) -> Option<&'a str> {
    if digits.is_empty() {
        return None;
    }
    text.lines()
        .find(|line| standalone_occurrences(line, digits).next().is_some())
        .or_else(|| text.lines().find(|line| line.contains(digits)))
}

fn continues_left(bytes: &[u8], start: usize) -> bool {
    match start.checked_sub(1).map(|i| bytes[i]) {
        Some(b) if b.is_ascii_digit() => true,
        Some(b',') | Some(b'.') => start >= 2 && bytes[start - 2].is_ascii_digit(),
        _ => false,
    }
}

fn continues_right(bytes: &[u8], end: usize) -> bool {
    match bytes.get(end) {
        Some(b) if b.is_ascii_digit() => true,
        Some(&b',') => bytes.get(end + 1).is_some_and(u8::is_ascii_digit),
        _ => false,
    }
}
