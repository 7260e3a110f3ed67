use super::*;
use crate::clause::{FieldRef, Filter, Value};
use crate::error::QueryError;
use crate::metadata::{Field, Metadata, Table};
use serde_json::json;

fn donatello() -> Filter { Filter::equals(FieldRef::new(137), "Donatello") }

#[test]
fn structured_round_trip_reproduces_filter_list() {
    let raw = json!({
        "type": "query",
        "database": 5,
        "query": {
            "source-table": 8,
            "aggregation": [["count"]],
            "filter": ["and",
                ["=", ["field", 137, null], "Donatello", "Leonardo"],
                ["is-empty", ["field", 139, null]],
                ["between", ["field", 3, {"temporal-unit": "day"}], "2020-01-01", "2020-02-01"]
            ]
        },
        "parameters": []
    });
    let q = DatasetQuery::from_json(&raw).unwrap();
    let s = q.as_structured().unwrap();
    assert_eq!(s.query.filters().count(), 3);
    assert_eq!(s.query.clause("aggregation"), Some(&json!([["count"]])));
    assert_eq!(q.to_json(), raw);
    assert_eq!(serde_json::to_string(&q).unwrap(), serde_json::to_string(&raw).unwrap());

    let back = DatasetQuery::from_json(&q.to_json()).unwrap();
    let before: Vec<&Filter> = s.query.filters().collect();
    let after: Vec<&Filter> = back.as_structured().unwrap().query.filters().collect();
    assert_eq!(before, after);
}

#[test]
fn single_and_empty_filter_lists_encode_compactly() {
    let q = StructuredQuery::new(8);
    assert_eq!(q.to_json(), json!({"source-table": 8}));
    let (one, _) = q.add_filter(donatello());
    assert_eq!(one.to_json(), json!({"source-table": 8, "filter": ["=", ["field", 137, null], "Donatello"]}));
    let decoded = StructuredQuery::from_json(&one.to_json()).unwrap();
    assert_eq!(decoded, one);
}

#[test]
fn update_targets_only_the_addressed_slot() {
    let q = StructuredQuery::new(8);
    let (q, first) = q.add_filter(donatello());
    let (q, second) = q.add_filter(donatello());
    assert_ne!(first, second);

    let edited = q.update_filter(second, donatello().with_arguments(vec!["Leonardo".into()]).unwrap()).unwrap();
    assert_eq!(edited.filter(first).unwrap().arguments(), &[Value::from("Donatello")]);
    assert_eq!(edited.filter(second).unwrap().arguments(), &[Value::from("Leonardo")]);
    // the pre-edit query is unchanged
    assert_eq!(q.filter(second).unwrap().arguments(), &[Value::from("Donatello")]);
}

#[test]
fn removed_slots_are_not_reused() {
    let (q, a) = StructuredQuery::new(8).add_filter(donatello());
    let q = q.remove_filter(a).unwrap();
    let (q, b) = q.add_filter(donatello());
    assert_ne!(a, b);
    assert_eq!(q.update_filter(a, donatello()).unwrap_err(), QueryError::UnknownSlot(a));
    assert_eq!(q.remove_filter(a).unwrap_err(), QueryError::UnknownSlot(a));
    assert!(!q.clear_filters().has_filters());
}

#[test]
fn validate_reports_stale_field_references() {
    let table = Table::new(8, 5, "ORDERS", vec![Field::new(137, "category", "type/Text")]);
    let m = Metadata::new(vec![table]);
    let (ok, _) = StructuredQuery::new(8).add_filter(donatello());
    assert!(ok.validate(&m).is_ok());
    let (stale, _) = ok.add_filter(Filter::equals(FieldRef::new(999), 1));
    assert_eq!(stale.validate(&m).unwrap_err(), QueryError::UnknownField(999));
    assert_eq!(StructuredQuery::new(77).validate(&m).unwrap_err(), QueryError::UnknownTable(77));
}

#[test]
fn native_query_keeps_template_tags() {
    let raw = json!({
        "type": "native",
        "database": 1,
        "native": {"query": "select * from orders where {{id}}", "template-tags": {"id": {"type": "number"}}},
        "parameters": [{"type": "number", "value": 3}]
    });
    let q = DatasetQuery::from_json(&raw).unwrap();
    let n = q.as_native().unwrap();
    assert!(n.native.template_tags().unwrap().contains_key("id"));
    assert_eq!(q.parameters().len(), 1);
    assert_eq!(q.to_json(), raw);
    assert!(q.as_structured().is_none());
}

#[test]
fn row_change_payload_rides_at_top_level() {
    let mut values = RowValues::new();
    values.insert("name".into(), json!("x"));
    let q: DatasetQuery = StructuredDatasetQuery::new(5, StructuredQuery::new(8)).with_row_change(RowChange::Update(values)).into();
    let raw = q.to_json();
    assert_eq!(raw["update_row"], json!({"name": "x"}));
    assert_eq!(DatasetQuery::from_json(&raw).unwrap(), q);
}

#[test]
fn rejects_unknown_types_and_compound_or() {
    assert!(DatasetQuery::from_json(&json!({"type": "mbql"})).is_err());
    let or = json!({"type": "query", "query": {"filter": ["or", ["=", ["field", 1, null], 1], ["=", ["field", 2, null], 2]]}});
    assert!(matches!(DatasetQuery::from_json(&or), Err(QueryError::MalformedClause(_))));
}

#[test]
fn with_parameters_returns_new_value() {
    let q = DatasetQuery::from(NativeDatasetQuery::new(1, "select 1"));
    let p = q.with_parameters(vec![json!({"id": "a"})]);
    assert!(q.parameters().is_empty());
    assert_eq!(p.parameters().len(), 1);
    assert_eq!(p.database(), Some(1));
}

#[test]
fn single_clause_and_wrapper_is_kept_until_edited() {
    let raw = json!({"source-table": 8, "filter": ["and", ["=", ["field", 3, null], 1]]});
    let q = StructuredQuery::from_json(&raw).unwrap();
    assert_eq!(q.filters().count(), 1);
    assert_eq!(q.to_json(), raw);
    assert_eq!(StructuredQuery::from_json(&json!({"filter": ["and"]})).unwrap().to_json(), json!({"filter": ["and"]}));

    // once the list changes the compact shape is used again
    let slot = q.slots().next().unwrap();
    let edited = q.update_filter(slot, donatello()).unwrap();
    assert_eq!(edited.to_json(), json!({"source-table": 8, "filter": ["=", ["field", 137, null], "Donatello"]}));
}

#[test]
fn null_filter_and_source_table_survive_round_trip() {
    let raw = json!({"source-table": null, "filter": null, "limit": 10});
    let q = StructuredQuery::from_json(&raw).unwrap();
    assert!(!q.has_filters());
    assert_eq!(q.source_table(), None);
    assert_eq!(q.to_json(), raw);

    let (added, _) = q.add_filter(donatello());
    assert_eq!(added.to_json()["filter"], json!(["=", ["field", 137, null], "Donatello"]));
    assert_eq!(q.clear_filters().to_json(), json!({"source-table": null, "limit": 10}));
}

#[test]
fn integers_above_i64_max_stay_exact() {
    let raw = json!({
        "type": "query",
        "database": 5,
        "query": {"source-table": 8, "filter": ["=", ["field", 3, null], 18446744073709551615u64, -4, 2.5]}
    });
    let q = DatasetQuery::from_json(&raw).unwrap();
    let f = q.as_structured().unwrap().query.filters().next().unwrap().clone();
    assert_eq!(f.arguments(), &[Value::UInt(u64::MAX), Value::Int(-4), Value::Float(2.5)]);
    assert_eq!(q.to_json(), raw);
    assert_eq!(serde_json::to_string(&q).unwrap(), serde_json::to_string(&raw).unwrap());
}

#[test]
fn unknown_top_level_keys_and_null_database_pass_through() {
    let raw = json!({
        "type": "native",
        "database": null,
        "native": {"query": "select 1"},
        "middleware": {"js-int-to-string?": true},
        "parameters": null
    });
    let q = DatasetQuery::from_json(&raw).unwrap();
    assert_eq!(q.database(), None);
    assert!(q.parameters().is_empty());
    assert_eq!(q.to_json(), raw);

    let bound = q.with_parameters(vec![json!({"id": "p1"})]);
    assert_eq!(bound.to_json()["parameters"], json!([{"id": "p1"}]));
    assert_eq!(bound.to_json()["middleware"], json!({"js-int-to-string?": true}));
}
