//!
//! metadata
//! --------
//! Read-mostly snapshot of tables and fields as loaded from the server. A snapshot is never edited
//! in place: a refresh builds a new `Metadata` and swaps it into `SharedMetadata` wholesale.
//!
//! Field ids are global (unique across tables), so a field may be looked up without knowing its
//! table. Fields that arrive without a table (e.g. nested-query columns) can still be registered.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{QueryError, QueryResult};
use crate::picker::FieldValuesRegistry;

mod field;
mod table;

pub use field::{Field, FieldValue, FieldValuesMode, PK_SEMANTIC_TYPE};
pub use table::Table;

pub type FieldId = i64;
pub type TableId = i64;
pub type DatabaseId = i64;

/// Lookup surface consumed by clause construction and dimension resolution.
/// Snapshots may be stale; callers recover from `UnknownField` by refreshing.
pub trait MetadataProvider {
    fn table(&self, id: TableId) -> Option<&Table>;
    fn field(&self, id: FieldId) -> Option<&Field>;

    fn get_table(&self, id: TableId) -> QueryResult<&Table> { self.table(id).ok_or(QueryError::UnknownTable(id)) }
    fn get_field(&self, id: FieldId) -> QueryResult<&Field> { self.field(id).ok_or(QueryError::UnknownField(id)) }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "MetadataDoc", into = "MetadataDoc")]
pub struct Metadata {
    tables: BTreeMap<TableId, Table>,
    // Flat field index; table fields are copied in so lookups never walk tables.
    fields: HashMap<FieldId, Field>,
}

#[derive(Serialize, Deserialize)]
struct MetadataDoc {
    #[serde(default)]
    tables: Vec<Table>,
    #[serde(default)]
    fields: Vec<Field>,
}

impl From<MetadataDoc> for Metadata {
    fn from(doc: MetadataDoc) -> Self {
        let mut m = Metadata::new(doc.tables);
        for f in doc.fields { m.fields.entry(f.id).or_insert(f); }
        m
    }
}

impl From<Metadata> for MetadataDoc {
    fn from(m: Metadata) -> Self {
        let table_fields: std::collections::HashSet<FieldId> =
            m.tables.values().flat_map(|t| t.fields.iter().map(|f| f.id)).collect();
        let mut loose: Vec<Field> = m.fields.into_values().filter(|f| !table_fields.contains(&f.id)).collect();
        loose.sort_by_key(|f| f.id);
        MetadataDoc { tables: m.tables.into_values().collect(), fields: loose }
    }
}

impl Metadata {
    pub fn new(tables: Vec<Table>) -> Self {
        let mut m = Metadata::default();
        for t in tables { m.insert_table(t); }
        m
    }

    fn insert_table(&mut self, table: Table) {
        for f in &table.fields { self.fields.insert(f.id, f.clone()); }
        self.tables.insert(table.id, table);
    }

    /// Builder-style registration of a field outside any table.
    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.insert(field.id, field);
        self
    }

    pub fn with_table(mut self, table: Table) -> Self {
        self.insert_table(table);
        self
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> { self.tables.values() }

    pub fn field_ids(&self) -> impl Iterator<Item = FieldId> + '_ { self.fields.keys().copied() }
}

impl MetadataProvider for Metadata {
    fn table(&self, id: TableId) -> Option<&Table> { self.tables.get(&id) }
    fn field(&self, id: FieldId) -> Option<&Field> { self.fields.get(&id) }
}

/// Session-wide metadata handle: readers take a cheap `Arc` snapshot, refresh swaps the whole thing.
#[derive(Clone, Default)]
pub struct SharedMetadata(pub Arc<RwLock<Arc<Metadata>>>);

impl SharedMetadata {
    pub fn new(metadata: Metadata) -> Self { SharedMetadata(Arc::new(RwLock::new(Arc::new(metadata)))) }

    pub fn snapshot(&self) -> Arc<Metadata> { self.0.read().clone() }

    /// Replace the snapshot. Any field whose cached values changed (or that disappeared) gets its
    /// value-fetch state invalidated so a late result for the superseded request is discarded.
    /// Returns the invalidated field ids in ascending order.
    pub fn refresh(&self, next: Metadata, registry: &FieldValuesRegistry) -> Vec<FieldId> {
        let mut changed: Vec<FieldId> = {
            let current = self.0.read();
            current
                .fields
                .values()
                .filter(|f| next.field(f.id).map(|n| n.values != f.values).unwrap_or(true))
                .map(|f| f.id)
                .collect()
        };
        changed.sort_unstable();
        for id in &changed { registry.invalidate(*id); }
        *self.0.write() = Arc::new(next);
        debug!(target: "dataset_query::metadata", "metadata refreshed: invalidated_fields={:?}", changed);
        changed
    }
}
