use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};

use crate::error::{QueryError, QueryResult};
use crate::metadata::FieldId;

pub const FIELD_TAG: &str = "field";

/// `["field", <id>, <options | null>]`
///
/// Options carry temporal bucketing, binning or join aliases. They are kept exactly as received so
/// the reference re-encodes unchanged; equality ignores the difference between `null` and `{}`.
#[derive(Debug, Clone)]
pub struct FieldRef {
    id: FieldId,
    options: Option<Map<String, JsonValue>>,
}

impl FieldRef {
    pub fn new(id: FieldId) -> Self { FieldRef { id, options: None } }

    pub fn with_options(id: FieldId, options: Map<String, JsonValue>) -> Self { FieldRef { id, options: Some(options) } }

    pub fn field_id(&self) -> FieldId { self.id }

    pub fn options(&self) -> Option<&Map<String, JsonValue>> { self.options.as_ref().filter(|m| !m.is_empty()) }

    pub fn option(&self, key: &str) -> Option<&JsonValue> { self.options().and_then(|m| m.get(key)) }

    pub fn temporal_unit(&self) -> Option<&str> { self.option("temporal-unit").and_then(|v| v.as_str()) }

    pub fn join_alias(&self) -> Option<&str> { self.option("join-alias").and_then(|v| v.as_str()) }

    pub fn from_json(v: &JsonValue) -> QueryResult<FieldRef> {
        let Some(parts) = v.as_array() else {
            return Err(QueryError::malformed(format!("field reference must be an array, got {}", v)));
        };
        if parts.len() != 3 {
            return Err(QueryError::malformed(format!("field reference must have 3 elements, got {}", parts.len())));
        }
        if parts[0].as_str() != Some(FIELD_TAG) {
            return Err(QueryError::malformed(format!("unsupported reference kind {}", parts[0])));
        }
        let Some(id) = parts[1].as_i64() else {
            return Err(QueryError::malformed(format!("field id must be an integer, got {}", parts[1])));
        };
        let options = match &parts[2] {
            JsonValue::Null => None,
            JsonValue::Object(m) => Some(m.clone()),
            other => return Err(QueryError::malformed(format!("field options must be an object or null, got {}", other))),
        };
        Ok(FieldRef { id, options })
    }

    pub fn to_json(&self) -> JsonValue {
        let opts = self.options.clone().map(JsonValue::Object).unwrap_or(JsonValue::Null);
        JsonValue::Array(vec![JsonValue::String(FIELD_TAG.into()), JsonValue::from(self.id), opts])
    }
}

impl PartialEq for FieldRef {
    fn eq(&self, other: &Self) -> bool { self.id == other.id && self.options() == other.options() }
}

impl Eq for FieldRef {}

impl Serialize for FieldRef {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> { self.to_json().serialize(s) }
}

impl<'de> Deserialize<'de> for FieldRef {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = JsonValue::deserialize(d)?;
        FieldRef::from_json(&raw).map_err(serde::de::Error::custom)
    }
}
