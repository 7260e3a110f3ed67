use serde_json::{Map, Value as JsonValue};

use crate::error::{QueryError, QueryResult};

/// Inner `native` object: raw query text plus whatever else the editor stores (template tags, collection).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NativeQuery {
    pub query: String,
    pub extra: Map<String, JsonValue>,
}

impl NativeQuery {
    pub fn new<S: Into<String>>(query: S) -> Self { NativeQuery { query: query.into(), extra: Map::new() } }

    pub fn template_tags(&self) -> Option<&Map<String, JsonValue>> { self.extra.get("template-tags").and_then(|v| v.as_object()) }

    pub fn from_json(v: &JsonValue) -> QueryResult<Self> {
        let Some(obj) = v.as_object() else {
            return Err(QueryError::malformed(format!("native query must be an object, got {}", v)));
        };
        let mut extra = obj.clone();
        let query = match extra.remove("query") {
            Some(JsonValue::String(s)) => s,
            None | Some(JsonValue::Null) => String::new(),
            Some(other) => return Err(QueryError::malformed(format!("native query text must be a string, got {}", other))),
        };
        Ok(NativeQuery { query, extra })
    }

    pub fn to_json(&self) -> JsonValue {
        let mut obj = self.extra.clone();
        obj.insert("query".into(), JsonValue::String(self.query.clone()));
        JsonValue::Object(obj)
    }
}
