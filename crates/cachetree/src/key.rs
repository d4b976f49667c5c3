//! Canonical keys for field values
//!
//! Field values are coerced to their canonical text form before they are used
//! as tree keys, so `1`, `1.0` and `"1"` all address the same branch and a
//! missing field addresses the literal `undefined` branch. Text that is a
//! canonical array index (`0` ..= `u32::MAX - 1`, no leading zeros) becomes
//! [`Key::Index`]; everything else is [`Key::Name`]. Siblings iterate indices
//! first, in ascending order, then names in first-insertion order.

use std::fmt;

use serde_json::{Number, Value};

/// Text used for a field the record or filter does not carry
pub const UNDEFINED: &str = "undefined";

/// Canonical, comparable form of a field value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// Non-negative integer key, iterated in ascending order
    Index(u32),
    /// Any other key, iterated in insertion order
    Name(String),
}

impl Key {
    /// Canonical key for an optional field value
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            None => Self::from_text(UNDEFINED.to_string()),
            Some(value) => Self::from_text(canonical_text(value)),
        }
    }

    fn from_text(text: String) -> Self {
        match parse_index(&text) {
            Some(index) => Key::Index(index),
            None => Key::Name(text),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(index) => write!(f, "{}", index),
            Key::Name(name) => f.write_str(name),
        }
    }
}

fn parse_index(text: &str) -> Option<u32> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if text.len() > 1 && text.starts_with('0') {
        return None;
    }
    text.parse::<u32>().ok().filter(|&n| n != u32::MAX)
}

fn canonical_text(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number_text(n),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => canonical_text(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

fn number_text(n: &Number) -> String {
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    match n.as_f64() {
        // Integral and below 1e21, so exact in i128; `-0.0` becomes `0`
        Some(f) if f.fract() == 0.0 && f.abs() < 1e21 => (f as i128).to_string(),
        Some(f) if f.abs() >= 1e21 || f.abs() < 1e-6 => exponent_text(f),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

/// Shortest exponent form with an explicit sign: `1e-7`, `1.5e+21`
fn exponent_text(f: f64) -> String {
    let text = format!("{:e}", f);
    match text.split_once('e') {
        Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
        _ => text,
    }
}
