use std::collections::HashMap;
use std::future::Future;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::QueryResult;
use crate::metadata::{FieldId, FieldValue};

/// Value-fetch capability supplied by the caller (usually an HTTP client).
pub trait FieldValuesFetcher {
    fn fetch_field_values(&self, field_id: FieldId) -> impl Future<Output = QueryResult<Vec<FieldValue>>> + Send;
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchStatus {
    InFlight,
    Loaded(Vec<FieldValue>),
    /// Fetch succeeded but the field has no values.
    Empty,
    Failed(String),
}

/// Proof of having started the current request for a field. Only the holder of the most
/// recent ticket may store a result.
#[derive(Debug, PartialEq, Eq)]
pub struct FetchTicket {
    field_id: FieldId,
    generation: u64,
}

impl FetchTicket {
    pub fn field_id(&self) -> FieldId { self.field_id }
}

#[derive(Debug)]
struct Entry {
    generation: u64,
    status: FetchStatus,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<FieldId, Entry>,
    next_generation: u64,
}

/// Per-session, per-field fetch bookkeeping.
///
/// A field gets at most one request per "needs data" transition: `begin` hands out a ticket only
/// when the field has no entry at all. Resolved entries (loaded, empty, failed) stay put until
/// `invalidate` (metadata refresh) or `retry` (explicit user action) clears them.
#[derive(Debug, Default)]
pub struct FieldValuesRegistry {
    inner: Mutex<Inner>,
}

impl FieldValuesRegistry {
    pub fn new() -> Self { Self::default() }

    pub fn begin(&self, field_id: FieldId) -> Option<FetchTicket> {
        let mut g = self.inner.lock();
        if g.entries.contains_key(&field_id) { return None; }
        let generation = g.next_generation;
        g.next_generation += 1;
        g.entries.insert(field_id, Entry { generation, status: FetchStatus::InFlight });
        debug!(target: "dataset_query::picker", "fetch begin field={} generation={}", field_id, generation);
        Some(FetchTicket { field_id, generation })
    }

    /// Like `begin`, but the returned handle abandons the request if dropped before completing.
    pub fn begin_pending(&self, field_id: FieldId) -> Option<PendingFetch<'_>> {
        self.begin(field_id).map(|ticket| PendingFetch { registry: self, ticket: Some(ticket) })
    }

    /// Store a fetch result. Returns false (and drops the result) when the ticket is no longer
    /// the most recent request for its field.
    pub fn complete(&self, ticket: FetchTicket, result: QueryResult<Vec<FieldValue>>) -> bool {
        let mut g = self.inner.lock();
        let Some(entry) = g.entries.get_mut(&ticket.field_id) else {
            warn!(target: "dataset_query::picker", "discarding stale field values field={} generation={} (invalidated)", ticket.field_id, ticket.generation);
            return false;
        };
        if entry.generation != ticket.generation || entry.status != FetchStatus::InFlight {
            warn!(target: "dataset_query::picker", "discarding stale field values field={} generation={} current={}", ticket.field_id, ticket.generation, entry.generation);
            return false;
        }
        entry.status = match result {
            Ok(values) if values.is_empty() => FetchStatus::Empty,
            Ok(values) => FetchStatus::Loaded(values),
            Err(e) => {
                warn!(target: "dataset_query::picker", "field values fetch failed field={}: {}", ticket.field_id, e);
                FetchStatus::Failed(e.to_string())
            }
        };
        true
    }

    /// Forget a request that will never complete (its future was dropped). Only the current
    /// in-flight ticket clears anything; the next `begin` then starts afresh.
    pub fn abandon(&self, ticket: FetchTicket) -> bool {
        let mut g = self.inner.lock();
        let current = matches!(
            g.entries.get(&ticket.field_id),
            Some(e) if e.generation == ticket.generation && e.status == FetchStatus::InFlight
        );
        if current {
            g.entries.remove(&ticket.field_id);
            debug!(target: "dataset_query::picker", "fetch abandoned field={} generation={}", ticket.field_id, ticket.generation);
        }
        current
    }

    pub fn status(&self, field_id: FieldId) -> Option<FetchStatus> {
        self.inner.lock().entries.get(&field_id).map(|e| e.status.clone())
    }

    pub fn is_in_flight(&self, field_id: FieldId) -> bool {
        matches!(self.status(field_id), Some(FetchStatus::InFlight))
    }

    /// Forget everything about `field_id`; an outstanding request's result will be discarded.
    pub fn invalidate(&self, field_id: FieldId) {
        if self.inner.lock().entries.remove(&field_id).is_some() {
            debug!(target: "dataset_query::picker", "fetch state invalidated field={}", field_id);
        }
    }

    /// Clear a failed or empty result so the next load fetches again. In-flight and loaded
    /// entries are left alone.
    pub fn retry(&self, field_id: FieldId) -> bool {
        let mut g = self.inner.lock();
        let resettable = matches!(g.entries.get(&field_id).map(|e| &e.status), Some(FetchStatus::Failed(_)) | Some(FetchStatus::Empty));
        if resettable { g.entries.remove(&field_id); }
        resettable
    }
}

/// An outstanding request held by the task awaiting it. Dropping it without `complete`
/// (cancelled future, outer timeout, `select!`) abandons the ticket.
#[derive(Debug)]
pub struct PendingFetch<'r> {
    registry: &'r FieldValuesRegistry,
    ticket: Option<FetchTicket>,
}

impl PendingFetch<'_> {
    pub fn complete(mut self, result: QueryResult<Vec<FieldValue>>) -> bool {
        match self.ticket.take() {
            Some(ticket) => self.registry.complete(ticket, result),
            None => false,
        }
    }
}

impl Drop for PendingFetch<'_> {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            self.registry.abandon(ticket);
        }
    }
}
