//!
//! picker
//! ------
//! Decides how a categorical filter is rendered: inline toggles for small value sets, a hand-off
//! to the generic search picker for large ones, and loading / warning states while values are
//! fetched. The decision depends only on the cached values, the per-field fetch state held in a
//! caller-owned `FieldValuesRegistry`, and `MAX_INLINE_CATEGORIES`.

use std::time::Duration;

use tracing::{debug, info};

use crate::clause::{Filter, FilterOp, Value};
use crate::dimension::Dimension;
use crate::error::{QueryError, QueryResult};
use crate::metadata::FieldValue;

mod registry;

pub use registry::{FetchStatus, FetchTicket, FieldValuesFetcher, FieldValuesRegistry, PendingFetch};

/// Largest value set rendered as inline toggles. The UI layer reads this same constant.
pub const MAX_INLINE_CATEGORIES: usize = 12;

#[derive(Debug, Clone, PartialEq)]
pub struct InlineOption {
    pub value: Value,
    pub label: String,
    pub checked: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PickerWarning {
    /// Fetch succeeded with no values.
    NoValues,
    FetchFailed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PickerState {
    Inline(Vec<InlineOption>),
    Loading,
    Warning(PickerWarning),
    /// Too many values; use the search-based picker.
    Delegate,
}

/// Result of toggling one value.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterChange {
    Updated(Filter),
    /// Selection became empty; the caller drops the argument instead of keeping a
    /// zero-argument equality filter.
    Cleared,
}

/// Cardinality rule. `Inline` up to and including `limit` values, `Delegate` above it, `Loading`
/// when there is nothing to show yet.
pub fn classify_values(values: &[FieldValue], selected: &[Value], limit: usize) -> PickerState {
    if values.is_empty() { return PickerState::Loading; }
    if values.len() > limit { return PickerState::Delegate; }
    let options = values
        .iter()
        .map(|v| InlineOption { value: v.raw.clone(), label: v.label(), checked: selected.contains(&v.raw) })
        .collect();
    PickerState::Inline(options)
}

pub struct InlineCategoryPicker<'m> {
    dimension: Dimension<'m>,
    filter: Filter,
    limit: usize,
}

impl<'m> InlineCategoryPicker<'m> {
    /// `filter` must reference the dimension's field.
    pub fn new(dimension: Dimension<'m>, filter: Filter) -> QueryResult<Self> {
        let filter_field = filter.field_ref().field_id();
        if filter_field != dimension.field_id() {
            return Err(QueryError::malformed(format!(
                "filter on field {} cannot drive a picker for field {}",
                filter_field,
                dimension.field_id()
            )));
        }
        Ok(InlineCategoryPicker { dimension, filter, limit: MAX_INLINE_CATEGORIES })
    }

    pub fn with_limit(mut self, limit: usize) -> Self { self.limit = limit; self }

    pub fn dimension(&self) -> &Dimension<'m> { &self.dimension }

    pub fn filter(&self) -> &Filter { &self.filter }

    /// Values currently selected in the filter, unset slots excluded.
    pub fn selected(&self) -> Vec<Value> { self.filter.values().cloned().collect() }

    /// Pure classification against the metadata cache, falling back to fetched values.
    pub fn state(&self, registry: &FieldValuesRegistry) -> PickerState {
        let field = self.dimension.field();
        let selected = self.selected();
        if !field.values.is_empty() {
            return classify_values(&field.values, &selected, self.limit);
        }
        if !field.has_field_values.is_list() {
            // nothing cached and nothing to fetch inline; let the search picker deal with it
            return PickerState::Delegate;
        }
        match registry.status(field.id) {
            Some(FetchStatus::Loaded(values)) => classify_values(&values, &selected, self.limit),
            Some(FetchStatus::Empty) => PickerState::Warning(PickerWarning::NoValues),
            Some(FetchStatus::Failed(msg)) => PickerState::Warning(PickerWarning::FetchFailed(msg)),
            Some(FetchStatus::InFlight) | None => PickerState::Loading,
        }
    }

    /// Classify and, if values are missing, fetch them. Issues at most one request per field no
    /// matter how often it is called while the first is outstanding or after it resolved.
    pub async fn load<F: FieldValuesFetcher>(&self, registry: &FieldValuesRegistry, fetcher: &F, timeout: Option<Duration>) -> PickerState {
        let state = self.state(registry);
        if state != PickerState::Loading { return state; }
        let field_id = self.dimension.field_id();
        let Some(pending) = registry.begin_pending(field_id) else {
            return self.state(registry);
        };
        info!(target: "dataset_query::picker", "fetching field values field={}", field_id);
        let result = match timeout {
            Some(t) => match tokio::time::timeout(t, fetcher.fetch_field_values(field_id)).await {
                Ok(r) => r,
                Err(_) => Err(QueryError::Timeout(field_id)),
            },
            None => fetcher.fetch_field_values(field_id).await,
        };
        pending.complete(result);
        let state = self.state(registry);
        debug!(target: "dataset_query::picker", "field={} classified after fetch as {:?}", field_id, state_kind(&state));
        state
    }

    /// `(value, checked)` for each inline toggle; empty unless the state is `Inline`.
    pub fn options(&self, registry: &FieldValuesRegistry) -> Vec<(Value, bool)> {
        match self.state(registry) {
            PickerState::Inline(options) => options.into_iter().map(|o| (o.value, o.checked)).collect(),
            _ => Vec::new(),
        }
    }

    /// Add `value` to the selection if absent, remove it if present.
    pub fn toggle(&self, value: &Value) -> QueryResult<FilterChange> {
        let mut selected = self.selected();
        match selected.iter().position(|v| v == value) {
            Some(i) => { selected.remove(i); }
            None => selected.push(value.clone()),
        }
        if selected.is_empty() {
            return Ok(FilterChange::Cleared);
        }
        let next = match self.filter.operator() {
            FilterOp::Eq | FilterOp::Ne => self.filter.with_arguments(selected)?,
            _ => Filter::new(FilterOp::Eq, self.filter.field_ref().clone(), selected)?,
        };
        Ok(FilterChange::Updated(next))
    }
}

fn state_kind(state: &PickerState) -> &'static str {
    match state {
        PickerState::Inline(_) => "inline",
        PickerState::Loading => "loading",
        PickerState::Warning(_) => "warning",
        PickerState::Delegate => "delegate",
    }
}
