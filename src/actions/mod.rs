//!
//! actions
//! -------
//! Row writeback: build the insert/update/delete query, hand it to the mutation transport, and
//! report which follow-up effects the caller owes the UI (reload a dashboard card, close the
//! object detail view, re-run the question). The core never performs those effects itself.

use std::future::Future;

use serde_json::Value as JsonValue;
use tracing::info;

use crate::card::{CardId, DashCard, DashCardId};
use crate::error::QueryResult;
use crate::query::StructuredDatasetQuery;

mod builders;

pub use builders::{
    build_delete, build_insert, build_update, coerce_primary_key, primary_key_filter, DeleteRowPayload, InsertRowPayload,
    RowId, UpdateRowPayload,
};

/// Writeback endpoints. Errors are expected as `QueryError::Transport`; a failed call is
/// assumed to have changed nothing.
pub trait MutationTransport {
    fn execute_create(&self, query: &StructuredDatasetQuery) -> impl Future<Output = QueryResult<MutationOutcome>> + Send;
    fn execute_update(&self, query: &StructuredDatasetQuery) -> impl Future<Output = QueryResult<MutationOutcome>> + Send;
    fn execute_delete(&self, query: &StructuredDatasetQuery) -> impl Future<Output = QueryResult<MutationOutcome>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MutationOutcome {
    pub rows_affected: usize,
}

impl MutationOutcome {
    pub fn new(rows_affected: usize) -> Self { MutationOutcome { rows_affected } }

    pub fn affected(&self) -> bool { self.rows_affected > 0 }

    /// `{"created-row": {"id": ...}}`
    pub fn from_create_response(resp: &JsonValue) -> Self {
        let created = resp.get("created-row").and_then(|r| r.get("id")).map(|id| !id.is_null()).unwrap_or(false);
        MutationOutcome::new(usize::from(created))
    }

    /// `{"rows-updated": [...]}`
    pub fn from_update_response(resp: &JsonValue) -> Self { MutationOutcome::new(array_len(resp, "rows-updated")) }

    /// `{"rows-deleted": [...]}`
    pub fn from_delete_response(resp: &JsonValue) -> Self { MutationOutcome::new(array_len(resp, "rows-deleted")) }
}

fn array_len(resp: &JsonValue, key: &str) -> usize {
    resp.get(key).and_then(|v| v.as_array()).map(|a| a.len()).unwrap_or(0)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowUp {
    /// Re-fetch a dashboard card's data, bypassing any result cache.
    ReloadCard { card_id: Option<CardId>, dashcard_id: DashCardId, reload: bool, ignore_cache: bool },
    /// Recorded for every delete issued from the object detail view, whatever the outcome.
    RowDeletedFromObjectDetail,
    CloseObjectDetail,
    RunQuestionQuery,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationResult {
    pub outcome: MutationOutcome,
    pub follow_ups: Vec<FollowUp>,
}

impl MutationResult {
    fn for_dashcard(outcome: MutationOutcome, dash_card: &DashCard) -> Self {
        let follow_ups = if outcome.affected() {
            vec![FollowUp::ReloadCard { card_id: dash_card.card.id, dashcard_id: dash_card.id, reload: true, ignore_cache: true }]
        } else {
            Vec::new()
        };
        MutationResult { outcome, follow_ups }
    }
}

pub async fn create_row<T: MutationTransport>(transport: &T, payload: InsertRowPayload<'_>) -> QueryResult<MutationOutcome> {
    let table_id = payload.table.id;
    let query = payload.into_query();
    info!(target: "dataset_query::actions", "create row table={}", table_id);
    transport.execute_create(&query).await
}

pub async fn update_row<T: MutationTransport>(transport: &T, payload: UpdateRowPayload<'_>) -> QueryResult<MutationOutcome> {
    let table_id = payload.table.id;
    let query = payload.into_query()?;
    info!(target: "dataset_query::actions", "update row table={}", table_id);
    transport.execute_update(&query).await
}

pub async fn delete_row<T: MutationTransport>(transport: &T, payload: DeleteRowPayload<'_>) -> QueryResult<MutationOutcome> {
    let table_id = payload.table.id;
    let query = payload.into_query()?;
    info!(target: "dataset_query::actions", "delete row table={}", table_id);
    transport.execute_delete(&query).await
}

pub async fn create_row_from_data_app<T: MutationTransport>(transport: &T, payload: InsertRowPayload<'_>, dash_card: &DashCard) -> QueryResult<MutationResult> {
    let outcome = create_row(transport, payload).await?;
    Ok(MutationResult::for_dashcard(outcome, dash_card))
}

pub async fn update_row_from_data_app<T: MutationTransport>(transport: &T, payload: UpdateRowPayload<'_>, dash_card: &DashCard) -> QueryResult<MutationResult> {
    let outcome = update_row(transport, payload).await?;
    Ok(MutationResult::for_dashcard(outcome, dash_card))
}

pub async fn delete_row_from_data_app<T: MutationTransport>(transport: &T, payload: DeleteRowPayload<'_>, dash_card: &DashCard) -> QueryResult<MutationResult> {
    let outcome = delete_row(transport, payload).await?;
    Ok(MutationResult::for_dashcard(outcome, dash_card))
}

pub async fn delete_row_from_object_detail<T: MutationTransport>(transport: &T, payload: DeleteRowPayload<'_>) -> QueryResult<MutationResult> {
    let outcome = delete_row(transport, payload).await?;
    let mut follow_ups = vec![FollowUp::RowDeletedFromObjectDetail];
    if outcome.affected() {
        follow_ups.push(FollowUp::CloseObjectDetail);
        follow_ups.push(FollowUp::RunQuestionQuery);
    }
    Ok(MutationResult { outcome, follow_ups })
}
