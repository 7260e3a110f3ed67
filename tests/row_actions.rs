//! Row writeback: builders, primary key coercion and follow-up signals.

mod common;

use serde_json::json;

use common::{values, FakeTransport};
use dataset_query::actions::{
    build_delete, build_insert, build_update, create_row_from_data_app, delete_row, delete_row_from_data_app,
    delete_row_from_object_detail, update_row, update_row_from_data_app, DeleteRowPayload, FollowUp, InsertRowPayload,
    MutationOutcome, RowId, UpdateRowPayload,
};
use dataset_query::card::{Card, DashCard};
use dataset_query::clause::Value;
use dataset_query::query::{DatasetQuery, RowChange};
use dataset_query::QueryError;

fn dash_card() -> DashCard {
    let mut card: Card = serde_json::from_value(common::card_json()).unwrap();
    card.id = Some(12);
    DashCard { id: 34, dashboard_id: Some(1), card }
}

#[test]
fn insert_carries_create_row_without_filter() {
    let table = common::orders_table();
    let q = build_insert(&table, values(json!({"NAME": "x"})));
    assert!(!q.query.has_filters());
    assert_eq!(
        DatasetQuery::Structured(q).to_json(),
        json!({"type": "query", "database": 5, "query": {"source-table": 8}, "create_row": {"NAME": "x"}})
    );
}

#[test]
fn update_parses_string_id_for_numeric_pk() {
    let table = common::orders_table();
    let q = build_update(&table, "42", values(json!({"name": "x"}))).unwrap();
    let filters: Vec<_> = q.query.filters().collect();
    assert_eq!(filters.len(), 1);
    assert_eq!(filters[0].to_json(), json!(["=", ["field", 80, null], 42]));
    assert_eq!(filters[0].arguments(), &[Value::Int(42)]);
    assert_eq!(q.row_change, Some(RowChange::Update(values(json!({"name": "x"})))));
}

#[test]
fn text_pk_keeps_string_id() {
    let table = common::products_table();
    let q = build_delete(&table, "0001").unwrap();
    assert_eq!(q.query.filters().next().unwrap().to_json(), json!(["=", ["field", 90, null], "0001"]));
    let q = build_delete(&common::orders_table(), RowId::Int(7)).unwrap();
    assert_eq!(q.query.filters().next().unwrap().arguments(), &[Value::Int(7)]);
}

#[test]
fn non_integer_id_for_numeric_pk_is_rejected() {
    let err = build_update(&common::orders_table(), "abc", values(json!({}))).unwrap_err();
    assert_eq!(err, QueryError::InvalidPrimaryKey { field: 80, value: "abc".into() });
}

#[test]
fn missing_pk_fails_for_update_and_delete() {
    let table = common::people_log_table();
    assert_eq!(build_delete(&table, 1i64).unwrap_err(), QueryError::NoPrimaryKey { table: 10, action: "delete" });
    assert_eq!(build_update(&table, 1i64, values(json!({}))).unwrap_err(), QueryError::NoPrimaryKey { table: 10, action: "update" });
    // inserts do not need a key
    assert!(build_insert(&table, values(json!({"MESSAGE": "hi"}))).row_change.is_some());
}

#[tokio::test]
async fn delete_without_pk_never_reaches_transport() {
    let table = common::people_log_table();
    let transport = FakeTransport::affecting(1);
    let res = delete_row(&transport, DeleteRowPayload { table: &table, id: RowId::Int(1) }).await;
    assert!(matches!(res, Err(QueryError::NoPrimaryKey { .. })));
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn update_sends_filter_and_payload() {
    let table = common::orders_table();
    let transport = FakeTransport::affecting(1);
    let outcome = update_row(&transport, UpdateRowPayload { table: &table, id: "42".into(), values: values(json!({"NAME": "y"})) }).await.unwrap();
    assert!(outcome.affected());
    let calls = transport.calls.lock();
    assert_eq!(calls[0].0, "update");
    assert_eq!(calls[0].1["query"]["filter"], json!(["=", ["field", 80, null], 42]));
    assert_eq!(calls[0].1["update_row"], json!({"NAME": "y"}));
}

#[tokio::test]
async fn data_app_mutations_reload_the_card_only_when_rows_changed() {
    let table = common::orders_table();
    let dc = dash_card();
    let reload = FollowUp::ReloadCard { card_id: Some(12), dashcard_id: 34, reload: true, ignore_cache: true };

    let hit = FakeTransport::affecting(1);
    let r = create_row_from_data_app(&hit, InsertRowPayload { table: &table, values: values(json!({"NAME": "a"})) }, &dc).await.unwrap();
    assert_eq!(r.follow_ups, vec![reload.clone()]);
    let r = update_row_from_data_app(&hit, UpdateRowPayload { table: &table, id: RowId::Int(1), values: values(json!({})) }, &dc).await.unwrap();
    assert_eq!(r.follow_ups, vec![reload.clone()]);

    let miss = FakeTransport::affecting(0);
    let r = delete_row_from_data_app(&miss, DeleteRowPayload { table: &table, id: RowId::Int(1) }, &dc).await.unwrap();
    assert!(r.follow_ups.is_empty());
    assert_eq!(r.outcome, MutationOutcome::new(0));
}

#[tokio::test]
async fn object_detail_delete_closes_and_reruns() {
    let table = common::orders_table();
    let r = delete_row_from_object_detail(&FakeTransport::affecting(1), DeleteRowPayload { table: &table, id: "3".into() }).await.unwrap();
    assert_eq!(r.follow_ups, vec![FollowUp::RowDeletedFromObjectDetail, FollowUp::CloseObjectDetail, FollowUp::RunQuestionQuery]);

    let r = delete_row_from_object_detail(&FakeTransport::affecting(0), DeleteRowPayload { table: &table, id: "3".into() }).await.unwrap();
    assert_eq!(r.follow_ups, vec![FollowUp::RowDeletedFromObjectDetail]);
}

#[tokio::test]
async fn transport_failure_surfaces_without_follow_ups() {
    let table = common::orders_table();
    let transport = FakeTransport::failing();
    let res = delete_row_from_object_detail(&transport, DeleteRowPayload { table: &table, id: "3".into() }).await;
    assert!(matches!(res, Err(QueryError::Transport(_))));
    assert_eq!(transport.call_count(), 1);
}

#[test]
fn outcome_parsing_from_server_responses() {
    assert!(MutationOutcome::from_create_response(&json!({"created-row": {"id": 9}})).affected());
    assert!(!MutationOutcome::from_create_response(&json!({"created-row": {"id": null}})).affected());
    assert_eq!(MutationOutcome::from_update_response(&json!({"rows-updated": [1, 2]})).rows_affected, 2);
    assert_eq!(MutationOutcome::from_delete_response(&json!({"rows-deleted": []})).rows_affected, 0);
    assert_eq!(MutationOutcome::from_delete_response(&json!({})).rows_affected, 0);
}
