//! Token estimation

/// Estimate tokens as `ceil(chars / 4)`.
///
/// Counts Unicode code points, not bytes; byte length over-counts for
/// multi-byte UTF-8 content (CJK text, emoji).
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}
