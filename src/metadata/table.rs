use serde::{Deserialize, Serialize};

use super::{DatabaseId, Field, FieldId, TableId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub id: TableId,
    pub db_id: DatabaseId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Ordered as the source reports them; ids unique within the table.
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl Table {
    pub fn new<S: Into<String>>(id: TableId, db_id: DatabaseId, name: S, fields: Vec<Field>) -> Self {
        let fields = fields.into_iter().map(|f| if f.table_id.is_none() { f.with_table(id) } else { f }).collect();
        Table { id, db_id, name: name.into(), display_name: None, fields }
    }

    /// First field flagged as PK. Tables without one are valid but cannot be written back to.
    pub fn primary_key(&self) -> Option<&Field> { self.fields.iter().find(|f| f.is_pk()) }

    pub fn field(&self, id: FieldId) -> Option<&Field> { self.fields.iter().find(|f| f.id == id) }
}
