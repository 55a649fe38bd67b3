use crate::db::schema::{FieldDescriptor, FieldKind, Record, optional_id_value};
use rusqlite::Row;
use rusqlite::types::Value;

/// Spending category. `parent` points at another category's id; `None` marks a
/// root of the category forest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub pk: i64,
    pub name: String,
    pub parent: Option<i64>,
}

impl Category {
    pub fn new(name: impl Into<String>, parent: Option<i64>) -> Self {
        Self {
            pk: 0,
            name: name.into(),
            parent,
        }
    }
}

impl Record for Category {
    const TYPE_NAME: &'static str = "Category";

    fn descriptors() -> &'static [FieldDescriptor] {
        const FIELDS: &[FieldDescriptor] = &[
            FieldDescriptor::identity("pk"),
            FieldDescriptor::value("name", FieldKind::Text),
            FieldDescriptor::value("parent", FieldKind::Integer),
        ];
        FIELDS
    }

    fn pk(&self) -> i64 {
        self.pk
    }

    fn set_pk(&mut self, pk: i64) {
        self.pk = pk;
    }

    fn values(&self) -> Vec<Value> {
        vec![Value::Text(self.name.clone()), optional_id_value(self.parent)]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Category {
            pk: row.get(0)?,
            name: row.get(1)?,
            parent: row.get(2)?,
        })
    }
}
