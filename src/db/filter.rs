//! WHERE clause construction for `Store::get_all`.

use crate::db::schema::{FieldKind, Schema};
use crate::error::{Error, Result};
use rusqlite::types::Value;

/// Restricts the rows returned by `Store::get_all`.
///
/// Equality conditions are AND-combined; a condition whose value is `None` is
/// ignored. A raw fragment covers what equality cannot express (ranges,
/// subqueries) and is AND-joined after the equality conditions. The fragment is
/// a bare predicate without `WHERE`; its `?` placeholders are bound from its own
/// parameter list.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    equals: Vec<(String, Value)>,
    fragment: Option<(String, Vec<Value>)>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<Option<Value>>) -> Self {
        if let Some(value) = value.into() {
            self.equals.push((field.to_string(), value));
        }
        self
    }

    pub fn raw(mut self, predicate: impl Into<String>, params: Vec<Value>) -> Self {
        self.fragment = Some((predicate.into(), params));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.equals.is_empty() && self.fragment.is_none()
    }

    /// Returns the clause (empty or starting with ` WHERE `) and its parameters
    /// in placeholder order.
    pub fn to_sql(&self, schema: &Schema) -> Result<(String, Vec<Value>)> {
        let mut predicates = Vec::new();
        let mut params = Vec::new();

        for (field, value) in &self.equals {
            let kind = if field == schema.identity {
                FieldKind::Integer
            } else {
                schema
                    .field(field)
                    .ok_or_else(|| Error::UnknownField {
                        table: schema.table.clone(),
                        field: field.clone(),
                    })?
                    .kind
            };
            predicates.push(match kind {
                FieldKind::Decimal => format!("(CAST({} AS REAL) = CAST(? AS REAL))", field),
                _ => format!("({} = ?)", field),
            });
            params.push(value.clone());
        }

        if let Some((predicate, fragment_params)) = &self.fragment {
            predicates.push(format!("({})", predicate));
            params.extend(fragment_params.iter().cloned());
        }

        if predicates.is_empty() {
            return Ok((String::new(), params));
        }
        Ok((format!(" WHERE {}", predicates.join(" AND ")), params))
    }
}
