//! Record schema derivation.
//!
//! Every persisted type declares its fields once through [`Record::descriptors`].
//! [`Schema::derive`] checks that declaration and turns it into the table name,
//! the identity column and the ordered value columns the store binds and reads.

use crate::error::{Error, Result};
use chrono::NaiveDateTime;
use rusqlite::Row;
use rusqlite::types::{Type, Value};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::str::FromStr;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Semantic type of a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    Decimal,
    Text,
    Timestamp,
}

impl FieldKind {
    pub fn column_type(self) -> &'static str {
        match self {
            FieldKind::Integer => "INTEGER",
            FieldKind::Decimal | FieldKind::Text | FieldKind::Timestamp => "TEXT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
    pub identity: bool,
}

impl FieldDescriptor {
    pub const fn identity(name: &'static str) -> Self {
        Self { name, kind: FieldKind::Integer, identity: true }
    }

    pub const fn value(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind, identity: false }
    }
}

/// A value type persisted in its own table by [`crate::db::store::Store`].
pub trait Record: Sized {
    /// Type name; the table is named after it in lower case.
    const TYPE_NAME: &'static str;

    fn descriptors() -> &'static [FieldDescriptor];

    /// Zero means "not persisted yet".
    fn pk(&self) -> i64;

    fn set_pk(&mut self, pk: i64);

    /// Value fields in declaration order. `Value::Null` marks an unset field.
    fn values(&self) -> Vec<Value>;

    /// Rebuilds a record from a row laid out as identity column, then value
    /// columns in declaration order.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub table: String,
    pub identity: &'static str,
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn derive<R: Record>() -> Result<Schema> {
        let fail = |reason: String| Error::Schema { record: R::TYPE_NAME.to_string(), reason };

        let table = R::TYPE_NAME.to_lowercase();
        if !is_identifier(&table) {
            return Err(fail(format!("'{}' is not a valid table name", table)));
        }

        let mut identity = None;
        let mut fields = Vec::new();
        let mut seen = HashSet::new();
        for descriptor in R::descriptors() {
            if !is_identifier(descriptor.name) {
                return Err(fail(format!("'{}' is not a valid column name", descriptor.name)));
            }
            if !seen.insert(descriptor.name) {
                return Err(fail(format!("field '{}' is declared twice", descriptor.name)));
            }
            if descriptor.identity {
                if identity.is_some() {
                    return Err(fail("more than one identity field".to_string()));
                }
                if descriptor.kind != FieldKind::Integer {
                    return Err(fail(format!(
                        "identity field '{}' must be an integer",
                        descriptor.name
                    )));
                }
                identity = Some(descriptor.name);
            } else {
                fields.push(Field { name: descriptor.name, kind: descriptor.kind });
            }
        }

        let identity = identity.ok_or_else(|| fail("no identity field declared".to_string()))?;
        if fields.is_empty() {
            return Err(fail("no value fields declared".to_string()));
        }

        Ok(Schema { table, identity, fields })
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.name).collect()
    }

    /// `pk, name, parent` style list used by SELECT statements.
    pub fn select_list(&self) -> String {
        let mut columns = vec![self.identity];
        columns.extend(self.column_names());
        columns.join(", ")
    }

    pub fn create_table_sql(&self) -> String {
        let columns: Vec<String> = self
            .fields
            .iter()
            .map(|f| format!("{} {}", f.name, f.kind.column_type()))
            .collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({} INTEGER PRIMARY KEY, {})",
            self.table,
            self.identity,
            columns.join(", ")
        )
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

pub fn decimal_value(amount: Decimal) -> Value {
    Value::Text(amount.to_string())
}

pub fn timestamp_value(at: NaiveDateTime) -> Value {
    Value::Text(at.format(TIMESTAMP_FORMAT).to_string())
}

pub fn optional_id_value(id: Option<i64>) -> Value {
    id.map(Value::Integer).unwrap_or(Value::Null)
}

pub fn read_decimal(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub fn read_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
