use std::fmt::{Display, Formatter};

use serde_json::{Map, Value as JsonValue};
use tracing::debug;

use crate::clause::Filter;
use crate::error::{QueryError, QueryResult};
use crate::metadata::{MetadataProvider, TableId};

const SOURCE_TABLE_KEY: &str = "source-table";
const FILTER_KEY: &str = "filter";
const AND: &str = "and";

/// Opaque handle to one filter position inside a `StructuredQuery`.
///
/// Assigned at insertion and never reused by that query or queries derived from it, so two
/// structurally identical filters remain separately addressable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(u32);

impl Display for SlotId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { write!(f, "#{}", self.0) }
}

/// How the `filter` key looked when the query was decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterForm {
    Null,
    Bare,
    And,
}

/// Inner `query` object of a structured dataset query.
///
/// Every edit returns a new value. Filters keep insertion order, which is also display order.
/// Keys the core does not model (aggregation, breakout, limit, joins, ...) are carried opaquely.
#[derive(Debug, Clone, Default)]
pub struct StructuredQuery {
    source_table: Option<TableId>,
    filters: Vec<(SlotId, Filter)>,
    next_slot: u32,
    extra: Map<String, JsonValue>,
    /// Decoded `filter` shape, written back as-is until the filter list is edited.
    filter_form: Option<FilterForm>,
}

impl PartialEq for StructuredQuery {
    // slot ids are per-instance bookkeeping, not part of the query's value
    fn eq(&self, other: &Self) -> bool {
        self.source_table == other.source_table
            && self.extra == other.extra
            && self.filters.len() == other.filters.len()
            && self.filters().zip(other.filters()).all(|(a, b)| a == b)
    }
}

impl StructuredQuery {
    pub fn new(source_table: TableId) -> Self { StructuredQuery { source_table: Some(source_table), ..Default::default() } }

    pub fn source_table(&self) -> Option<TableId> { self.source_table }

    pub fn with_source_table(&self, table: TableId) -> Self { StructuredQuery { source_table: Some(table), ..self.clone() } }

    pub fn filters(&self) -> impl Iterator<Item = &Filter> + '_ { self.filters.iter().map(|(_, f)| f) }

    pub fn slots(&self) -> impl Iterator<Item = SlotId> + '_ { self.filters.iter().map(|(s, _)| *s) }

    pub fn filter(&self, slot: SlotId) -> Option<&Filter> {
        self.filters.iter().find(|(s, _)| *s == slot).map(|(_, f)| f)
    }

    pub fn has_filters(&self) -> bool { !self.filters.is_empty() }

    pub fn add_filter(&self, filter: Filter) -> (Self, SlotId) {
        let slot = SlotId(self.next_slot);
        let mut next = self.clone();
        next.filters.push((slot, filter));
        next.next_slot += 1;
        next.filter_form = None;
        (next, slot)
    }

    /// Replace the filter in `slot` only; an identical filter in another slot is untouched.
    pub fn update_filter(&self, slot: SlotId, filter: Filter) -> QueryResult<Self> {
        let mut next = self.clone();
        let Some(entry) = next.filters.iter_mut().find(|(s, _)| *s == slot) else {
            return Err(QueryError::UnknownSlot(slot));
        };
        entry.1 = filter;
        next.filter_form = None;
        Ok(next)
    }

    pub fn remove_filter(&self, slot: SlotId) -> QueryResult<Self> {
        let mut next = self.clone();
        let before = next.filters.len();
        next.filters.retain(|(s, _)| *s != slot);
        if next.filters.len() == before { return Err(QueryError::UnknownSlot(slot)); }
        next.filter_form = None;
        Ok(next)
    }

    pub fn clear_filters(&self) -> Self {
        let mut next = self.clone();
        next.filters.clear();
        next.filter_form = None;
        next
    }

    /// Opaque clause by wire key, e.g. `"aggregation"`.
    pub fn clause(&self, key: &str) -> Option<&JsonValue> { self.extra.get(key) }

    pub fn with_clause(&self, key: &str, value: JsonValue) -> QueryResult<Self> {
        if key == SOURCE_TABLE_KEY || key == FILTER_KEY {
            return Err(QueryError::malformed(format!("'{}' is managed by the query model", key)));
        }
        let mut next = self.clone();
        next.extra.insert(key.to_string(), value);
        Ok(next)
    }

    /// Check every filter binds against `metadata`, and the source table exists.
    pub fn validate<M: MetadataProvider + ?Sized>(&self, metadata: &M) -> QueryResult<()> {
        if let Some(t) = self.source_table { metadata.get_table(t)?; }
        for f in self.filters() { f.dimension(metadata)?; }
        Ok(())
    }

    pub fn from_json(v: &JsonValue) -> QueryResult<Self> {
        let Some(obj) = v.as_object() else {
            return Err(QueryError::malformed(format!("structured query must be an object, got {}", v)));
        };
        let mut extra = obj.clone();
        // an explicit null source-table stays in `extra` so it re-encodes unchanged
        let source_table = match extra.get(SOURCE_TABLE_KEY) {
            None | Some(JsonValue::Null) => None,
            Some(t) => Some(t.as_i64().ok_or_else(|| QueryError::malformed(format!("source-table must be an integer, got {}", t)))?),
        };
        if source_table.is_some() { extra.remove(SOURCE_TABLE_KEY); }
        let (filters, filter_form) = match extra.remove(FILTER_KEY) {
            None => (Vec::new(), None),
            Some(JsonValue::Null) => (Vec::new(), Some(FilterForm::Null)),
            Some(raw) => decode_filter_list(&raw)?,
        };
        let next_slot = filters.len() as u32;
        let filters = filters.into_iter().enumerate().map(|(i, f)| (SlotId(i as u32), f)).collect();
        Ok(StructuredQuery { source_table, filters, next_slot, extra, filter_form })
    }

    pub fn to_json(&self) -> JsonValue {
        let mut obj = self.extra.clone();
        if let Some(t) = self.source_table { obj.insert(SOURCE_TABLE_KEY.into(), JsonValue::from(t)); }
        match (self.filters.len(), self.filter_form) {
            (0, Some(FilterForm::Null)) => { obj.insert(FILTER_KEY.into(), JsonValue::Null); }
            (0, Some(FilterForm::And)) => { obj.insert(FILTER_KEY.into(), JsonValue::Array(vec![JsonValue::String(AND.into())])); }
            (0, _) => {}
            (1, form) if form != Some(FilterForm::And) => { obj.insert(FILTER_KEY.into(), self.filters[0].1.to_json()); }
            _ => {
                let mut all = vec![JsonValue::String(AND.into())];
                all.extend(self.filters().map(Filter::to_json));
                obj.insert(FILTER_KEY.into(), JsonValue::Array(all));
            }
        }
        JsonValue::Object(obj)
    }
}

/// Top-level `["and", c1, c2, ...]` is the filter list; anything else is a single clause.
fn decode_filter_list(raw: &JsonValue) -> QueryResult<(Vec<Filter>, Option<FilterForm>)> {
    match raw.as_array() {
        Some(parts) if parts.first().and_then(|v| v.as_str()) == Some(AND) => {
            let out = parts[1..].iter().map(Filter::from_json).collect::<QueryResult<Vec<_>>>()?;
            debug!(target: "dataset_query::query", "decoded compound filter with {} clauses", out.len());
            Ok((out, Some(FilterForm::And)))
        }
        _ => Ok((vec![Filter::from_json(raw)?], Some(FilterForm::Bare))),
    }
}
