//! Numeric normalization of NF-e values.
//!
//! Rounding is half away from zero (`1.005 -> 1.01`), done on `Decimal` so
//! that the textual result never carries binary floating point noise.

use std::str::FromStr;

use roxmltree::Node;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::ExtractionError;

/// Parse the decimal text of an NF-e numeric element.
pub fn parse_decimal(text: &str) -> Option<Decimal> {
    let text = text.trim();
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

/// Render `value` with exactly `digits` fractional digits.
pub fn format_fixed(value: Decimal, digits: u32) -> String {
    let mut rounded = value.round_dp_with_strategy(digits, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(digits);
    if rounded.is_zero() {
        rounded.set_sign_positive(true);
    }
    rounded.to_string()
}

/// Round numeric text to `digits`, or `None` if it is not a number.
pub fn round_text(text: &str, digits: u32) -> Option<String> {
    parse_decimal(text).map(|value| format_fixed(value, digits))
}

/// Rounded text of a present node, `None` for an absent one.
///
/// A present node whose text is not a number is an error: it marks a
/// malformed document, not a missing field.
pub fn optional_rounded(
    node: Option<Node<'_, '_>>,
    digits: u32,
    path: &str,
) -> Result<Option<String>, ExtractionError> {
    let Some(node) = node else {
        return Ok(None);
    };
    let text = node.text().unwrap_or_default();
    round_text(text, digits)
        .map(Some)
        .ok_or_else(|| ExtractionError::InvalidNumber {
            path: path.to_string(),
            value: text.to_string(),
        })
}
