//! Shared fixtures: a trimmed sample database plus fake fetch/transport collaborators.
#![allow(dead_code)]

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value as JsonValue};
use tokio::sync::Notify;

use dataset_query::actions::{MutationOutcome, MutationTransport};
use dataset_query::metadata::{Field, FieldId, FieldValue, FieldValuesMode, Metadata, Table, PK_SEMANTIC_TYPE};
use dataset_query::query::{DatasetQuery, StructuredDatasetQuery};
use dataset_query::{QueryError, QueryResult};

pub const SMALL: FieldId = 137;
pub const LARGE: FieldId = 138;
pub const EMPTY: FieldId = 139;

pub fn turtles() -> Vec<&'static str> { vec!["Michaelangelo", "Donatello", "Raphael", "Leonardo"] }

fn category(id: FieldId, name: &str) -> Field {
    Field::new(id, name, "type/Text").with_semantic_type("type/Category").with_table(8).with_values_mode(FieldValuesMode::List)
}

pub fn metadata(large_count: usize) -> Metadata {
    Metadata::new(vec![orders_table(), people_log_table()])
        .with_field(category(SMALL, "small_category_field").with_values(turtles()))
        .with_field(category(LARGE, "large_category_field").with_values((0..large_count).map(|i| format!("{}_{}", turtles()[i % 4], i))))
        .with_field(category(EMPTY, "empty_category_field"))
}

/// ORDERS with an integer PK.
pub fn orders_table() -> Table {
    Table::new(
        8,
        5,
        "ORDERS",
        vec![
            Field::new(80, "ID", "type/BigInteger").with_semantic_type(PK_SEMANTIC_TYPE),
            Field::new(81, "NAME", "type/Text"),
        ],
    )
}

/// PRODUCTS keyed by a text SKU.
pub fn products_table() -> Table {
    Table::new(
        9,
        5,
        "PRODUCTS",
        vec![Field::new(90, "SKU", "type/Text").with_semantic_type(PK_SEMANTIC_TYPE), Field::new(91, "TITLE", "type/Text")],
    )
}

/// An append-only log table with no PK.
pub fn people_log_table() -> Table {
    Table::new(10, 5, "PEOPLE_LOG", vec![Field::new(100, "MESSAGE", "type/Text")])
}

pub fn values(v: JsonValue) -> serde_json::Map<String, JsonValue> { v.as_object().cloned().unwrap_or_default() }

pub fn card_json() -> JsonValue {
    json!({
        "dataset_query": {"database": 5, "query": {"source-table": 8}, "type": "query"},
        "display": "table",
        "visualization_settings": {}
    })
}

/// Records every call; optionally blocks each fetch until `gate` is notified.
pub struct FakeFetcher {
    pub calls: Mutex<Vec<FieldId>>,
    pub gate: Option<Arc<Notify>>,
    pub response: QueryResult<Vec<FieldValue>>,
}

impl FakeFetcher {
    pub fn returning(values: Vec<&str>) -> Self {
        FakeFetcher { calls: Mutex::new(Vec::new()), gate: None, response: Ok(values.into_iter().map(FieldValue::new).collect()) }
    }

    pub fn failing(msg: &str) -> Self {
        FakeFetcher { calls: Mutex::new(Vec::new()), gate: None, response: Err(QueryError::fetch(msg)) }
    }

    pub fn gated(mut self, gate: Arc<Notify>) -> Self { self.gate = Some(gate); self }

    pub fn call_count(&self) -> usize { self.calls.lock().len() }
}

impl dataset_query::picker::FieldValuesFetcher for FakeFetcher {
    fn fetch_field_values(&self, field_id: FieldId) -> impl Future<Output = QueryResult<Vec<FieldValue>>> + Send {
        self.calls.lock().push(field_id);
        let gate = self.gate.clone();
        let response = self.response.clone();
        async move {
            if let Some(g) = gate { g.notified().await; }
            response
        }
    }
}

pub struct FakeTransport {
    pub calls: Mutex<Vec<(&'static str, JsonValue)>>,
    pub rows_affected: usize,
    pub fail: bool,
}

impl FakeTransport {
    pub fn affecting(rows_affected: usize) -> Self { FakeTransport { calls: Mutex::new(Vec::new()), rows_affected, fail: false } }

    pub fn failing() -> Self { FakeTransport { calls: Mutex::new(Vec::new()), rows_affected: 0, fail: true } }

    pub fn call_count(&self) -> usize { self.calls.lock().len() }

    fn record(&self, kind: &'static str, query: &StructuredDatasetQuery) -> QueryResult<MutationOutcome> {
        self.calls.lock().push((kind, DatasetQuery::Structured(query.clone()).to_json()));
        if self.fail { return Err(QueryError::transport("connection refused")); }
        Ok(MutationOutcome::new(self.rows_affected))
    }
}

impl MutationTransport for FakeTransport {
    fn execute_create(&self, query: &StructuredDatasetQuery) -> impl Future<Output = QueryResult<MutationOutcome>> + Send {
        let r = self.record("create", query);
        async move { r }
    }

    fn execute_update(&self, query: &StructuredDatasetQuery) -> impl Future<Output = QueryResult<MutationOutcome>> + Send {
        let r = self.record("update", query);
        async move { r }
    }

    fn execute_delete(&self, query: &StructuredDatasetQuery) -> impl Future<Output = QueryResult<MutationOutcome>> + Send {
        let r = self.record("delete", query);
        async move { r }
    }
}
