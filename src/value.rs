//! Typed value model for the score language.
//!
//! `ParamValue` is the runtime representation for every literal the lexer and
//! parser can produce: it is pervasively dynamic by design (spec §9) because
//! the same shape backs source literals, node params, and automation values.

use serde::{Deserialize, Serialize};

/// A numeric magnitude paired with a free-form unit tag (`s`, `ms`, `min`,
/// `h`, `beats`, `Hz`, `dB`, or any other string, preserved verbatim).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitNumber {
    pub value: f64,
    pub unit: String,
}

impl UnitNumber {
    pub fn new(value: f64, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: unit.into(),
        }
    }

    pub fn unitless(value: f64) -> Self {
        Self {
            value,
            unit: String::new(),
        }
    }

    pub fn is_hz(&self) -> bool {
        self.unit == "Hz"
    }

    pub fn is_beats(&self) -> bool {
        self.unit == "beats"
    }
}

/// A call-form value such as `stem("name")`, `fixed(2s)`, or `euclid(3,8,0)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub callee: String,
    pub args: Vec<ParamValue>,
}

/// The typed sum over every literal the score language can produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParamValue {
    Null,
    Bool(bool),
    Number(f64),
    Unit(UnitNumber),
    String(String),
    Identifier(String),
    List(Vec<ParamValue>),
    Object(std::collections::BTreeMap<String, ParamValue>),
    Call(Call),
}

impl ParamValue {
    pub fn call(callee: impl Into<String>, args: Vec<ParamValue>) -> Self {
        ParamValue::Call(Call {
            callee: callee.into(),
            args,
        })
    }

    pub fn is_identifier(&self, expected: &str) -> bool {
        matches!(self, ParamValue::Identifier(s) if s == expected)
    }

    pub fn is_number_like(&self) -> bool {
        matches!(self, ParamValue::Number(_) | ParamValue::Unit(_))
    }

    /// Numeric magnitude for `Number`/`Unit`, ignoring any unit tag.
    pub fn try_number(&self) -> Option<f64> {
        match self {
            ParamValue::Number(n) => Some(*n),
            ParamValue::Unit(u) => Some(u.value),
            _ => None,
        }
    }

    /// Numeric magnitude, falling back to `fallback` for non-numeric values.
    pub fn as_number_or(&self, fallback: f64) -> f64 {
        self.try_number().unwrap_or(fallback)
    }

    /// Text content for `String`/`Identifier` values, `DebugString()`-style
    /// rendering otherwise (ported from `ParamValue::DebugString`).
    pub fn as_text(&self) -> String {
        match self {
            ParamValue::String(s) | ParamValue::Identifier(s) => s.clone(),
            ParamValue::Null => "null".to_string(),
            ParamValue::Bool(b) => b.to_string(),
            ParamValue::Number(n) => n.to_string(),
            ParamValue::Unit(u) => format!("{}{}", u.value, u.unit),
            ParamValue::List(_) => "[...]".to_string(),
            ParamValue::Object(_) => "{...}".to_string(),
            ParamValue::Call(c) => format!("{}(...)", c.callee),
        }
    }

    /// Converts to a `UnitNumber`, defaulting the unit for bare numbers.
    pub fn as_unit_or(&self, default_unit: &str) -> UnitNumber {
        match self {
            ParamValue::Unit(u) => u.clone(),
            ParamValue::Number(n) => UnitNumber::new(*n, default_unit),
            _ => UnitNumber::new(0.0, default_unit),
        }
    }

    pub fn as_object(&self) -> Option<&std::collections::BTreeMap<String, ParamValue>> {
        match self {
            ParamValue::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ParamValue]> {
        match self {
            ParamValue::List(l) => Some(l),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_number_roundtrips_through_as_unit_or() {
        let v = ParamValue::Unit(UnitNumber::new(100.0, "ms"));
        let u = v.as_unit_or("s");
        assert_eq!(u.value, 100.0);
        assert_eq!(u.unit, "ms");
    }

    #[test]
    fn bare_number_gets_default_unit() {
        let v = ParamValue::Number(2.0);
        let u = v.as_unit_or("beats");
        assert_eq!(u.unit, "beats");
    }

    #[test]
    fn text_extraction_matches_variant() {
        assert_eq!(ParamValue::String("hi".into()).as_text(), "hi");
        assert_eq!(ParamValue::Identifier("C4".into()).as_text(), "C4");
        assert_eq!(ParamValue::Bool(true).as_text(), "true");
    }

    #[test]
    fn number_like_predicate() {
        assert!(ParamValue::Number(1.0).is_number_like());
        assert!(ParamValue::Unit(UnitNumber::unitless(1.0)).is_number_like());
        assert!(!ParamValue::String("x".into()).is_number_like());
    }
}
