use std::fmt::{Display, Formatter};

use serde_json::Value as JsonValue;

/// Literal argument inside a clause.
///
/// `Unset` is the "not yet specified" slot a freshly created filter carries before the user picks
/// a value. It is written as JSON `null`, which is what an unspecified array element serializes to.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Unset,
    Int(i64),
    /// Integers above `i64::MAX`, kept exact.
    UInt(u64),
    Float(f64),
    Str(String),
    Bool(bool),
}

impl Value {
    pub fn is_unset(&self) -> bool { matches!(self, Value::Unset) }

    pub fn from_json(v: &JsonValue) -> Result<Value, String> {
        match v {
            JsonValue::Null => Ok(Value::Unset),
            JsonValue::Bool(b) => Ok(Value::Bool(*b)),
            JsonValue::String(s) => Ok(Value::Str(s.clone())),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() { Ok(Value::Int(i)) }
                else if let Some(u) = n.as_u64() { Ok(Value::UInt(u)) }
                else if let Some(f) = n.as_f64() { Ok(Value::Float(f)) }
                else { Err(format!("unsupported number literal {}", n)) }
            }
            JsonValue::Array(_) | JsonValue::Object(_) => Err(format!("expected a literal value, got {}", v)),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Unset => JsonValue::Null,
            Value::Int(i) => JsonValue::from(*i),
            Value::UInt(u) => JsonValue::from(*u),
            // non-finite floats have no JSON form
            Value::Float(f) => serde_json::Number::from_f64(*f).map(JsonValue::Number).unwrap_or(JsonValue::Null),
            Value::Str(s) => JsonValue::String(s.clone()),
            Value::Bool(b) => JsonValue::Bool(*b),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Unset => Ok(()),
            Value::Int(i) => write!(f, "{}", i),
            Value::UInt(u) => write!(f, "{}", u),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{}", s),
            Value::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for Value { fn from(s: &str) -> Self { Value::Str(s.to_string()) } }
impl From<String> for Value { fn from(s: String) -> Self { Value::Str(s) } }
impl From<i64> for Value { fn from(i: i64) -> Self { Value::Int(i) } }
impl From<i32> for Value { fn from(i: i32) -> Self { Value::Int(i as i64) } }
impl From<u64> for Value {
    fn from(u: u64) -> Self { i64::try_from(u).map(Value::Int).unwrap_or(Value::UInt(u)) }
}
impl From<f64> for Value { fn from(f: f64) -> Self { Value::Float(f) } }
impl From<bool> for Value { fn from(b: bool) -> Self { Value::Bool(b) } }
