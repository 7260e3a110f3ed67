use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::clause::{FieldRef, Value};
use super::{FieldId, TableId};

/// Numeric base types; anything deriving from `type/Number` in the type hierarchy.
const NUMERIC_TYPES: &[&str] = &["type/Number", "type/Integer", "type/BigInteger", "type/Float", "type/Decimal"];

pub const PK_SEMANTIC_TYPE: &str = "type/PK";

/// How the server caches distinct values for a field.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldValuesMode {
    /// Distinct values are cached and small enough to list.
    List,
    /// Too many values; callers search instead.
    Search,
    #[default]
    None,
    Other(String),
}

impl FieldValuesMode {
    pub fn as_str(&self) -> &str {
        match self {
            FieldValuesMode::List => "list",
            FieldValuesMode::Search => "search",
            FieldValuesMode::None => "none",
            FieldValuesMode::Other(s) => s.as_str(),
        }
    }

    pub fn is_list(&self) -> bool { matches!(self, FieldValuesMode::List) }
}

impl From<&str> for FieldValuesMode {
    fn from(s: &str) -> Self {
        match s {
            "list" => FieldValuesMode::List,
            "search" => FieldValuesMode::Search,
            "none" => FieldValuesMode::None,
            other => FieldValuesMode::Other(other.to_string()),
        }
    }
}

impl Serialize for FieldValuesMode {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> { s.serialize_str(self.as_str()) }
}

impl<'de> Deserialize<'de> for FieldValuesMode {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        // null and missing both mean "none"
        let raw: Option<String> = Option::deserialize(d)?;
        Ok(raw.as_deref().map(FieldValuesMode::from).unwrap_or_default())
    }
}

/// One cached distinct value: `[raw]` or `[raw, "display"]` on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValue {
    pub raw: Value,
    pub display: Option<String>,
}

impl FieldValue {
    pub fn new(raw: impl Into<Value>) -> Self { Self { raw: raw.into(), display: None } }

    pub fn label(&self) -> String { self.display.clone().unwrap_or_else(|| self.raw.to_string()) }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let mut row = vec![self.raw.to_json()];
        if let Some(d) = &self.display { row.push(serde_json::Value::String(d.clone())); }
        row.serialize(s)
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let row: Vec<serde_json::Value> = Vec::deserialize(d)?;
        let mut it = row.into_iter();
        let Some(raw) = it.next() else { return Err(serde::de::Error::custom("empty field value tuple")); };
        let raw = Value::from_json(&raw).map_err(serde::de::Error::custom)?;
        let display = it.next().and_then(|v| v.as_str().map(|s| s.to_string()));
        Ok(FieldValue { raw, display })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: FieldId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_id: Option<TableId>,
    pub base_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_type: Option<String>,
    #[serde(default)]
    pub has_field_values: FieldValuesMode,
    /// Cached distinct values in source order; empty when never loaded.
    #[serde(default)]
    pub values: Vec<FieldValue>,
}

impl Field {
    pub fn new<S: Into<String>>(id: FieldId, name: S, base_type: S) -> Self {
        Field {
            id,
            name: name.into(),
            display_name: None,
            table_id: None,
            base_type: base_type.into(),
            effective_type: None,
            semantic_type: None,
            has_field_values: FieldValuesMode::None,
            values: Vec::new(),
        }
    }

    pub fn with_semantic_type<S: Into<String>>(mut self, t: S) -> Self { self.semantic_type = Some(t.into()); self }
    pub fn with_table(mut self, table_id: TableId) -> Self { self.table_id = Some(table_id); self }
    pub fn with_values_mode(mut self, mode: FieldValuesMode) -> Self { self.has_field_values = mode; self }
    pub fn with_values<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.values = values.into_iter().map(FieldValue::new).collect();
        self
    }

    pub fn is_pk(&self) -> bool { self.semantic_type.as_deref() == Some(PK_SEMANTIC_TYPE) }

    pub fn is_numeric(&self) -> bool {
        let t = self.effective_type.as_deref().unwrap_or(self.base_type.as_str());
        NUMERIC_TYPES.contains(&t)
    }

    pub fn display_name(&self) -> String {
        match &self.display_name {
            Some(d) if !d.is_empty() => d.clone(),
            _ => humanize(&self.name),
        }
    }

    /// `["field", id, null]`
    pub fn reference(&self) -> FieldRef { FieldRef::new(self.id) }

    pub fn raw_values(&self) -> impl Iterator<Item = &Value> { self.values.iter().map(|v| &v.raw) }
}

/// `small_category_field` -> `Small Category Field`
fn humanize(name: &str) -> String {
    name.split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut cs = w.chars();
            match cs.next() {
                Some(first) => first.to_uppercase().chain(cs).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
