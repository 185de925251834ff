use std::{fmt::Display, str::FromStr};

/// A dynamically typed option value coerced from a command line literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Integers widen to floats; nothing else converts.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Bool(b) => b.fmt(formatter),
            Value::Int(i) => i.fmt(formatter),
            // Debug keeps the fractional part, so "10.0" does not come back as an integer.
            Value::Float(f) => write!(formatter, "{:?}", f),
            Value::Str(str) => str.fmt(formatter),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn looks_like_decimal(value: &str) -> bool {
    // f64::from_str also takes "inf" and "NaN", which stay strings here.
    value.chars().any(|c| c.is_ascii_digit())
        && value
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        if let Some(b) = parse_bool(value) {
            return Value::Bool(b);
        }
        if let Ok(i) = i64::from_str(value) {
            return Value::Int(i);
        }
        if looks_like_decimal(value) {
            if let Ok(f) = f64::from_str(value) {
                return Value::Float(f);
            }
        }
        Value::Str(value.to_string())
    }
}
