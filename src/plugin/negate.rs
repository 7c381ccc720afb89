//! Negating theme values for `-` prefixed utilities.

use super::data_types::numeric_prefix_len;

/// Negate a CSS value.
///
/// `0` stays `0`. Plain numbers (with an optional unit) flip their sign.
/// Values built from `var()`, `calc()`, `min()`, `max()` or `clamp()` are
/// wrapped in `calc(<value> * -1)`. Anything else cannot be negated.
pub fn negate_value(value: &str) -> Option<String> {
    let value = value.trim();
    if value == "0" {
        return Some("0".to_string());
    }

    if is_plain_number(value) {
        return Some(match value.strip_prefix('-') {
            Some(positive) => positive.to_string(),
            None => format!("-{}", value.strip_prefix('+').unwrap_or(value)),
        });
    }

    const NUMERIC_FUNCTIONS: [&str; 5] = ["var(", "calc(", "min(", "max(", "clamp("];
    if NUMERIC_FUNCTIONS.iter().any(|f| value.contains(f)) {
        return Some(format!("calc({value} * -1)"));
    }

    None
}

/// A number with an optional `%` or word unit.
fn is_plain_number(value: &str) -> bool {
    let Some(len) = numeric_prefix_len(value) else {
        return false;
    };
    let unit = &value[len..];
    unit.is_empty() || unit == "%" || unit.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
