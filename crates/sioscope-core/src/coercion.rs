//! Type coercion applied to builder field text before a payload is built.
//!
//! Rules, first match wins:
//! 1. `true` / `false` (any case) become booleans.
//! 2. Text that fully parses as a number becomes a number, unless the field
//!    is [`PASSWORD_FIELD`].
//! 3. Everything else stays a string.
//!
//! Numeric parsing follows JavaScript `Number()`: surrounding whitespace is
//! ignored and `0x`/`0o`/`0b` literals are accepted. `Infinity` is left as
//! text since JSON has no representation for it.

use indexmap::IndexMap;
use serde_json::{Map, Number, Value};

/// Field whose value is never coerced to a number.
pub const PASSWORD_FIELD: &str = "Password";

/// Coerces the raw text of a single field.
pub fn coerce_field(name: &str, raw: &str) -> Value {
    let lowered = raw.to_lowercase();
    if lowered == "true" {
        return Value::Bool(true);
    }
    if lowered == "false" {
        return Value::Bool(false);
    }
    if name != PASSWORD_FIELD {
        if let Some(number) = parse_js_number(raw) {
            return Value::Number(number);
        }
    }
    Value::String(raw.to_string())
}

/// Coerces every field, preserving field order.
pub fn coerce_fields(values: &IndexMap<String, String>) -> Map<String, Value> {
    values
        .iter()
        .map(|(name, raw)| (name.clone(), coerce_field(name, raw)))
        .collect()
}

fn parse_js_number(raw: &str) -> Option<Number> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }
    let value = match parse_radix_literal(text) {
        Some(value) => value,
        None => parse_decimal(text)?,
    };
    to_json_number(value)
}

fn parse_radix_literal(text: &str) -> Option<f64> {
    let radix = match text.get(..2)? {
        "0x" | "0X" => 16,
        "0o" | "0O" => 8,
        "0b" | "0B" => 2,
        _ => return None,
    };
    let digits = &text[2..];
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    u64::from_str_radix(digits, radix).ok().map(|v| v as f64)
}

/// `[+-]? (digits [. digits?] | . digits) ([eE] [+-]? digits)?`
fn parse_decimal(text: &str) -> Option<f64> {
    let bytes = text.as_bytes();
    let mut i = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }

    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let int_digits = i - int_start;

    let mut frac_digits = 0;
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        frac_digits = i - frac_start;
    }

    if int_digits == 0 && frac_digits == 0 {
        return None;
    }

    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        i += 1;
        if i < bytes.len() && matches!(bytes[i], b'+' | b'-') {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return None;
        }
    }

    if i != bytes.len() {
        return None;
    }
    text.parse::<f64>().ok()
}

fn to_json_number(value: f64) -> Option<Number> {
    if !value.is_finite() {
        return None;
    }
    // 2^53: integers below this are exact in f64
    if value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 {
        return Some(Number::from(value as i64));
    }
    Number::from_f64(value)
}
