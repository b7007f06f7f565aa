//! Typing of raw header tokens.
//!
//! A token is numeric-like when, after dropping one leading sign and every
//! `.`, what remains is a non-empty run of ASCII digits. Numeric-like tokens
//! become floats and narrow to integers when they have no fractional part.

use crate::models::{ArrayValue, Scalar};

/// Numeric-likeness test shared by header values and data cells
pub fn is_numeric_like(raw: &str) -> bool {
    let unsigned = raw
        .strip_prefix('-')
        .or_else(|| raw.strip_prefix('+'))
        .unwrap_or(raw);
    let mut digits = unsigned.chars().filter(|c| *c != '.').peekable();
    digits.peek().is_some() && digits.all(|c| c.is_ascii_digit())
}

/// Parse a numeric-like token; `None` for tokens like `1.2.3`
pub fn parse_numeric(raw: &str) -> Option<f64> {
    if is_numeric_like(raw) {
        raw.parse::<f64>().ok()
    } else {
        None
    }
}

/// Integer value of `value` when it has no fractional part and fits in `i64`
pub fn narrow_to_int(value: f64) -> Option<i64> {
    // 2^63 is exactly representable, anything at or above it overflows
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if value.is_finite() && value == value.trunc() && value >= -LIMIT && value < LIMIT {
        Some(value as i64)
    } else {
        None
    }
}

/// Type a single token
pub fn coerce_scalar(raw: &str) -> Scalar {
    match parse_numeric(raw) {
        Some(value) => match narrow_to_int(value) {
            Some(int) => Scalar::Int(int),
            None => Scalar::Float(value),
        },
        None => Scalar::Str(raw.to_string()),
    }
}

/// Type a token vector as a whole
///
/// Either every element is numeric or the whole vector stays textual. Empty
/// tokens do not break numeric typing; they become NaN, which also keeps the
/// vector from narrowing to integers. A vector of only empty tokens is
/// textual.
pub fn coerce_array<S: AsRef<str>>(raws: &[S]) -> ArrayValue {
    let mut values = Vec::with_capacity(raws.len());
    let mut saw_number = false;

    for raw in raws {
        let raw = raw.as_ref();
        if raw.is_empty() {
            values.push(f64::NAN);
            continue;
        }
        match parse_numeric(raw) {
            Some(value) => {
                saw_number = true;
                values.push(value);
            }
            None => return strings(raws),
        }
    }

    if !saw_number {
        return strings(raws);
    }

    let ints: Option<Vec<i64>> = values.iter().map(|v| narrow_to_int(*v)).collect();
    match ints {
        Some(ints) => ArrayValue::Int(ints),
        None => ArrayValue::Float(values),
    }
}

fn strings<S: AsRef<str>>(raws: &[S]) -> ArrayValue {
    ArrayValue::Str(raws.iter().map(|s| s.as_ref().to_string()).collect())
}
