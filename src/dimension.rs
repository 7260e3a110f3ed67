//! Dimension: a field reference resolved against the current metadata snapshot.
//! Built per render or per build call and thrown away; it borrows the snapshot and holds no state.

use crate::clause::{FieldRef, Filter, FilterOp, Value};
use crate::error::QueryResult;
use crate::metadata::{Field, FieldId, MetadataProvider};

#[derive(Debug, Clone)]
pub struct Dimension<'m> {
    field: &'m Field,
    // kept as given so temporal-unit / join-alias options survive into built clauses
    reference: FieldRef,
}

impl<'m> Dimension<'m> {
    pub fn resolve<M: MetadataProvider + ?Sized>(reference: &FieldRef, metadata: &'m M) -> QueryResult<Dimension<'m>> {
        let field = metadata.get_field(reference.field_id())?;
        Ok(Dimension { field, reference: reference.clone() })
    }

    /// Resolve a plain `["field", id, null]` dimension.
    pub fn for_field<M: MetadataProvider + ?Sized>(id: FieldId, metadata: &'m M) -> QueryResult<Dimension<'m>> {
        Dimension::resolve(&FieldRef::new(id), metadata)
    }

    pub fn field(&self) -> &'m Field { self.field }

    pub fn field_id(&self) -> FieldId { self.field.id }

    pub fn field_ref(&self) -> &FieldRef { &self.reference }

    pub fn display_name(&self) -> String {
        match self.reference.temporal_unit() {
            Some(unit) => format!("{}: {}", self.field.display_name(), unit.replace('-', " ")),
            None => self.field.display_name(),
        }
    }

    /// List-mode field whose distinct values have not been loaded yet.
    pub fn needs_value_fetch(&self) -> bool {
        self.field.has_field_values.is_list() && self.field.values.is_empty()
    }

    pub fn cached_values(&self) -> Vec<Value> { self.field.raw_values().cloned().collect() }

    /// Fresh `["=", ref, <unset>]` filter on this dimension.
    pub fn default_filter(&self) -> Filter { Filter::equals(self.reference.clone(), Value::Unset) }

    /// Operators offered for the field's type.
    pub fn filter_operators(&self) -> Vec<FilterOp> {
        use FilterOp::*;
        if self.field.is_numeric() {
            vec![Eq, Ne, Gt, Lt, Between, Ge, Le, IsNull, NotNull]
        } else {
            vec![Eq, Ne, Contains, DoesNotContain, IsNull, NotNull, IsEmpty, NotEmpty, StartsWith, EndsWith]
        }
    }
}
