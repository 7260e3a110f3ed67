use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clause::{Filter, Value};
use crate::error::{QueryError, QueryResult};
use crate::metadata::{Field, Table};
use crate::query::{RowChange, RowValues, StructuredDatasetQuery, StructuredQuery};

/// Primary key value exactly as the UI handed it over, before coercion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RowId {
    Int(i64),
    Str(String),
}

impl From<i64> for RowId { fn from(i: i64) -> Self { RowId::Int(i) } }
impl From<&str> for RowId { fn from(s: &str) -> Self { RowId::Str(s.to_string()) } }
impl From<String> for RowId { fn from(s: String) -> Self { RowId::Str(s) } }

#[derive(Debug, Clone)]
pub struct InsertRowPayload<'t> {
    pub table: &'t Table,
    pub values: RowValues,
}

#[derive(Debug, Clone)]
pub struct UpdateRowPayload<'t> {
    pub table: &'t Table,
    pub id: RowId,
    pub values: RowValues,
}

#[derive(Debug, Clone)]
pub struct DeleteRowPayload<'t> {
    pub table: &'t Table,
    pub id: RowId,
}

impl InsertRowPayload<'_> {
    pub fn into_query(self) -> StructuredDatasetQuery { build_insert(self.table, self.values) }
}

impl UpdateRowPayload<'_> {
    pub fn into_query(self) -> QueryResult<StructuredDatasetQuery> { build_update(self.table, self.id, self.values) }
}

impl DeleteRowPayload<'_> {
    pub fn into_query(self) -> QueryResult<StructuredDatasetQuery> { build_delete(self.table, self.id) }
}

fn base_query(table: &Table) -> StructuredDatasetQuery {
    StructuredDatasetQuery::new(table.db_id, StructuredQuery::new(table.id))
}

/// `create_row` query over the table; no filter, the row does not exist yet.
pub fn build_insert(table: &Table, values: RowValues) -> StructuredDatasetQuery {
    base_query(table).with_row_change(RowChange::Create(values))
}

pub fn build_update(table: &Table, id: impl Into<RowId>, values: RowValues) -> QueryResult<StructuredDatasetQuery> {
    let filter = primary_key_filter(table, id.into(), "update")?;
    let q = base_query(table);
    let (inner, _) = q.query.add_filter(filter);
    Ok(q.with_query(inner).with_row_change(RowChange::Update(values)))
}

pub fn build_delete(table: &Table, id: impl Into<RowId>) -> QueryResult<StructuredDatasetQuery> {
    let filter = primary_key_filter(table, id.into(), "delete")?;
    let q = base_query(table);
    let (inner, _) = q.query.add_filter(filter);
    Ok(q.with_query(inner))
}

/// `["=", pk-ref, id]`; fails when the table has no primary key or the id cannot match it.
pub fn primary_key_filter(table: &Table, id: RowId, action: &'static str) -> QueryResult<Filter> {
    let Some(pk) = table.primary_key() else {
        return Err(QueryError::NoPrimaryKey { table: table.id, action });
    };
    let value = coerce_primary_key(pk, id)?;
    debug!(target: "dataset_query::actions", "{} row: table={} pk_field={} pk={}", action, table.id, pk.id, value);
    Ok(Filter::equals(pk.reference(), value))
}

/// Numeric PKs get string ids parsed to integers; everything else passes through.
/// A string that is not an integer is rejected rather than sent as an unmatchable predicate.
pub fn coerce_primary_key(pk: &Field, id: RowId) -> QueryResult<Value> {
    match id {
        RowId::Str(s) if pk.is_numeric() => match s.trim().parse::<i64>() {
            Ok(i) => Ok(Value::Int(i)),
            Err(_) => Err(QueryError::InvalidPrimaryKey { field: pk.id, value: s }),
        },
        RowId::Str(s) => Ok(Value::Str(s)),
        RowId::Int(i) => Ok(Value::Int(i)),
    }
}
