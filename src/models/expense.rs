use crate::db::schema::{
    FieldDescriptor, FieldKind, Record, decimal_value, read_decimal, read_timestamp,
    timestamp_value,
};
use chrono::NaiveDateTime;
use rusqlite::Row;
use rusqlite::types::Value;
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expense {
    pub pk: i64,
    pub amount: Decimal,
    /// Category name, not id.
    pub category: String,
    pub expense_date: NaiveDateTime,
    pub comment: String,
}

impl Expense {
    pub fn new(
        amount: Decimal,
        category: String,
        expense_date: NaiveDateTime,
        comment: String,
    ) -> Self {
        Self {
            pk: 0,
            amount,
            category,
            expense_date,
            comment,
        }
    }
}

impl Record for Expense {
    const TYPE_NAME: &'static str = "Expense";

    fn descriptors() -> &'static [FieldDescriptor] {
        const FIELDS: &[FieldDescriptor] = &[
            FieldDescriptor::identity("pk"),
            FieldDescriptor::value("amount", FieldKind::Decimal),
            FieldDescriptor::value("category", FieldKind::Text),
            FieldDescriptor::value("expense_date", FieldKind::Timestamp),
            FieldDescriptor::value("comment", FieldKind::Text),
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
        vec![
            decimal_value(self.amount),
            Value::Text(self.category.clone()),
            timestamp_value(self.expense_date),
            Value::Text(self.comment.clone()),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Expense {
            pk: row.get(0)?,
            amount: read_decimal(row, 1)?,
            category: row.get(2)?,
            expense_date: read_timestamp(row, 3)?,
            comment: row.get(4)?,
        })
    }
}
