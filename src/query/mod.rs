//!
//! query
//! -----
//! `DatasetQuery` is what a card persists as its `dataset_query`: either a structured query built
//! from clauses, or native query text. Both variants share a database id and parameter bindings.
//!
//! Wire shapes:
//!   {"type":"query",  "database":D, "query":{"source-table":T, "filter":...}, "parameters":[...]}
//!   {"type":"native", "database":D, "native":{"query":"..."},                 "parameters":[...]}
//! A structured query sent for writeback additionally carries `create_row` or `update_row`.
//!
//! Decoding followed by encoding reproduces the input for any document in canonical (sorted-key)
//! form; keys the model does not understand are carried through untouched.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};

use crate::error::{QueryError, QueryResult};
use crate::metadata::DatabaseId;

mod native;
mod structured;

pub use native::NativeQuery;
pub use structured::{SlotId, StructuredQuery};

/// Column name -> new value for a written row.
pub type RowValues = Map<String, JsonValue>;

const CREATE_ROW_KEY: &str = "create_row";
const UPDATE_ROW_KEY: &str = "update_row";

/// Row payload riding on a structured query sent to the writeback endpoints.
#[derive(Debug, Clone, PartialEq)]
pub enum RowChange {
    Create(RowValues),
    Update(RowValues),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StructuredDatasetQuery {
    pub database: Option<DatabaseId>,
    pub query: StructuredQuery,
    pub parameters: Option<Vec<JsonValue>>,
    pub row_change: Option<RowChange>,
    /// Top-level keys not modeled here, e.g. `middleware`.
    pub extra: Map<String, JsonValue>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NativeDatasetQuery {
    pub database: Option<DatabaseId>,
    pub native: NativeQuery,
    pub parameters: Option<Vec<JsonValue>>,
    pub extra: Map<String, JsonValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DatasetQuery {
    Structured(StructuredDatasetQuery),
    Native(NativeDatasetQuery),
}

impl StructuredDatasetQuery {
    pub fn new(database: DatabaseId, query: StructuredQuery) -> Self {
        StructuredDatasetQuery { database: Some(database), query, ..Default::default() }
    }

    pub fn with_query(&self, query: StructuredQuery) -> Self { StructuredDatasetQuery { query, ..self.clone() } }

    pub fn with_row_change(&self, change: RowChange) -> Self { StructuredDatasetQuery { row_change: Some(change), ..self.clone() } }
}

impl NativeDatasetQuery {
    pub fn new<S: Into<String>>(database: DatabaseId, text: S) -> Self {
        NativeDatasetQuery { database: Some(database), native: NativeQuery::new(text), ..Default::default() }
    }
}

impl DatasetQuery {
    pub fn database(&self) -> Option<DatabaseId> {
        match self {
            DatasetQuery::Structured(q) => q.database,
            DatasetQuery::Native(q) => q.database,
        }
    }

    pub fn parameters(&self) -> &[JsonValue] {
        let p = match self {
            DatasetQuery::Structured(q) => &q.parameters,
            DatasetQuery::Native(q) => &q.parameters,
        };
        p.as_deref().unwrap_or(&[])
    }

    pub fn with_parameters(&self, parameters: Vec<JsonValue>) -> Self {
        match self {
            DatasetQuery::Structured(q) => DatasetQuery::Structured(StructuredDatasetQuery { parameters: Some(parameters), ..q.clone() }),
            DatasetQuery::Native(q) => DatasetQuery::Native(NativeDatasetQuery { parameters: Some(parameters), ..q.clone() }),
        }
    }

    pub fn is_structured(&self) -> bool { matches!(self, DatasetQuery::Structured(_)) }

    pub fn as_structured(&self) -> Option<&StructuredDatasetQuery> {
        match self {
            DatasetQuery::Structured(q) => Some(q),
            DatasetQuery::Native(_) => None,
        }
    }

    pub fn as_native(&self) -> Option<&NativeDatasetQuery> {
        match self {
            DatasetQuery::Native(q) => Some(q),
            DatasetQuery::Structured(_) => None,
        }
    }

    pub fn from_json(v: &JsonValue) -> QueryResult<Self> {
        let Some(obj) = v.as_object() else {
            return Err(QueryError::malformed(format!("dataset query must be an object, got {}", v)));
        };
        let mut extra = obj.clone();
        extra.remove("type");
        let database = match obj.get("database") {
            None | Some(JsonValue::Null) => None,
            Some(d) => Some(d.as_i64().ok_or_else(|| QueryError::malformed(format!("database must be an integer, got {}", d)))?),
        };
        // a null database stays in `extra` and re-encodes as null
        if database.is_some() { extra.remove("database"); }
        let parameters = match obj.get("parameters") {
            None | Some(JsonValue::Null) => None,
            Some(JsonValue::Array(ps)) => Some(ps.clone()),
            Some(other) => return Err(QueryError::malformed(format!("parameters must be an array, got {}", other))),
        };
        if parameters.is_some() { extra.remove("parameters"); }
        match obj.get("type").and_then(|t| t.as_str()) {
            Some("query") => {
                let query = StructuredQuery::from_json(obj.get("query").unwrap_or(&JsonValue::Object(Map::new())))?;
                let row_change = match (obj.get(CREATE_ROW_KEY), obj.get(UPDATE_ROW_KEY)) {
                    (Some(c), None) => Some(RowChange::Create(row_values(c)?)),
                    (None, Some(u)) => Some(RowChange::Update(row_values(u)?)),
                    (None, None) => None,
                    (Some(_), Some(_)) => return Err(QueryError::malformed("query carries both create_row and update_row")),
                };
                for key in ["query", CREATE_ROW_KEY, UPDATE_ROW_KEY] { extra.remove(key); }
                Ok(DatasetQuery::Structured(StructuredDatasetQuery { database, query, parameters, row_change, extra }))
            }
            Some("native") => {
                let native = NativeQuery::from_json(obj.get("native").unwrap_or(&JsonValue::Object(Map::new())))?;
                extra.remove("native");
                Ok(DatasetQuery::Native(NativeDatasetQuery { database, native, parameters, extra }))
            }
            other => Err(QueryError::malformed(format!("unknown dataset query type {:?}", other))),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        let mut obj = match self {
            DatasetQuery::Structured(q) => q.extra.clone(),
            DatasetQuery::Native(q) => q.extra.clone(),
        };
        let (database, parameters) = match self {
            DatasetQuery::Structured(q) => {
                obj.insert("type".into(), JsonValue::String("query".into()));
                obj.insert("query".into(), q.query.to_json());
                match &q.row_change {
                    Some(RowChange::Create(v)) => { obj.insert(CREATE_ROW_KEY.into(), JsonValue::Object(v.clone())); }
                    Some(RowChange::Update(v)) => { obj.insert(UPDATE_ROW_KEY.into(), JsonValue::Object(v.clone())); }
                    None => {}
                }
                (q.database, &q.parameters)
            }
            DatasetQuery::Native(q) => {
                obj.insert("type".into(), JsonValue::String("native".into()));
                obj.insert("native".into(), q.native.to_json());
                (q.database, &q.parameters)
            }
        };
        if let Some(d) = database { obj.insert("database".into(), JsonValue::from(d)); }
        if let Some(p) = parameters { obj.insert("parameters".into(), JsonValue::Array(p.clone())); }
        JsonValue::Object(obj)
    }
}

fn row_values(v: &JsonValue) -> QueryResult<RowValues> {
    v.as_object().cloned().ok_or_else(|| QueryError::malformed(format!("row values must be an object, got {}", v)))
}

impl From<StructuredDatasetQuery> for DatasetQuery {
    fn from(q: StructuredDatasetQuery) -> Self { DatasetQuery::Structured(q) }
}

impl From<NativeDatasetQuery> for DatasetQuery {
    fn from(q: NativeDatasetQuery) -> Self { DatasetQuery::Native(q) }
}

impl Serialize for DatasetQuery {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> { self.to_json().serialize(s) }
}

impl<'de> Deserialize<'de> for DatasetQuery {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = JsonValue::deserialize(d)?;
        DatasetQuery::from_json(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod query_tests;
