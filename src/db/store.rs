//! Generic CRUD over one table per record type.

use crate::db::connection::establish_connection;
use crate::db::filter::Filter;
use crate::db::schema::{Record, Schema};
use crate::error::{Error, Result};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params_from_iter};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Store bound to the table of record type `R`.
///
/// Each operation opens its own connection and drops it before returning, so
/// no handle outlives a call even when a statement fails halfway.
pub struct Store<R: Record> {
    db_path: PathBuf,
    schema: Schema,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> Store<R> {
    /// Derives the schema of `R` and makes sure its table exists.
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let store = Self {
            db_path: db_path.as_ref().to_path_buf(),
            schema: Schema::derive::<R>()?,
            _record: PhantomData,
        };
        store.create_table()?;
        Ok(store)
    }

    fn connect(&self) -> Result<Connection> {
        Ok(establish_connection(&self.db_path)?)
    }

    pub fn create_table(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(&self.schema.create_table_sql(), [])?;
        debug!(table = %self.schema.table, "table ensured");
        Ok(())
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn drop_table(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(&format!("DROP TABLE IF EXISTS {}", self.schema.table), [])?;
        debug!(table = %self.schema.table, "table dropped");
        Ok(())
    }

    /// Inserts `record` and writes the generated identity back onto it.
    pub fn add(&self, record: &mut R) -> Result<i64> {
        if record.pk() != 0 {
            return Err(Error::IdentityAlreadySet {
                table: self.schema.table.clone(),
                pk: record.pk(),
            });
        }
        let values = self.checked_values(record)?;
        let columns = self.schema.column_names();
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.schema.table,
            columns.join(", "),
            placeholders
        );

        let conn = self.connect()?;
        conn.execute(&sql, params_from_iter(values))?;
        let pk = conn.last_insert_rowid();
        record.set_pk(pk);
        debug!(table = %self.schema.table, pk, "record added");
        Ok(pk)
    }

    pub fn get(&self, pk: i64) -> Result<Option<R>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?1",
            self.schema.select_list(),
            self.schema.table,
            self.schema.identity
        );
        let conn = self.connect()?;
        let record = conn.query_row(&sql, [pk], |row| R::from_row(row)).optional()?;
        Ok(record)
    }

    /// Returns every row matching `filter`, in storage order.
    pub fn get_all(&self, filter: &Filter) -> Result<Vec<R>> {
        let (clause, params) = filter.to_sql(&self.schema)?;
        let sql = format!(
            "SELECT {} FROM {}{}",
            self.schema.select_list(),
            self.schema.table,
            clause
        );

        let conn = self.connect()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(params), |row| R::from_row(row))?;

        let mut records = Vec::new();
        for record in rows {
            records.push(record?);
        }
        debug!(
            table = %self.schema.table,
            filtered = !filter.is_empty(),
            count = records.len(),
            "records fetched"
        );
        Ok(records)
    }

    /// Overwrites the stored row from `record`. Unset (`Null`) fields keep
    /// their stored value.
    pub fn update(&self, record: &R) -> Result<()> {
        let pk = record.pk();
        if pk == 0 {
            return Err(self.missing_identity("update"));
        }

        let mut assignments = Vec::new();
        let mut params = Vec::new();
        for (field, value) in self.schema.fields.iter().zip(self.checked_values(record)?) {
            if value == Value::Null {
                continue;
            }
            assignments.push(format!("{} = ?", field.name));
            params.push(value);
        }

        let conn = self.connect()?;
        if assignments.is_empty() {
            return self.ensure_exists(&conn, pk);
        }
        params.push(Value::Integer(pk));
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?",
            self.schema.table,
            assignments.join(", "),
            self.schema.identity
        );
        let rows = conn.execute(&sql, params_from_iter(params))?;
        if rows == 0 {
            return Err(self.not_found(pk));
        }
        debug!(table = %self.schema.table, pk, "record updated");
        Ok(())
    }

    pub fn delete(&self, pk: i64) -> Result<()> {
        if pk == 0 {
            return Err(self.missing_identity("delete"));
        }
        let conn = self.connect()?;
        let rows = conn.execute(
            &format!("DELETE FROM {} WHERE {} = ?1", self.schema.table, self.schema.identity),
            [pk],
        )?;
        if rows == 0 {
            return Err(self.not_found(pk));
        }
        debug!(table = %self.schema.table, pk, "record deleted");
        Ok(())
    }

    fn checked_values(&self, record: &R) -> Result<Vec<Value>> {
        let values = record.values();
        if values.len() != self.schema.fields.len() {
            return Err(Error::Schema {
                record: R::TYPE_NAME.to_string(),
                reason: format!(
                    "expected {} values, got {}",
                    self.schema.fields.len(),
                    values.len()
                ),
            });
        }
        Ok(values)
    }

    fn ensure_exists(&self, conn: &Connection, pk: i64) -> Result<()> {
        let found = conn
            .query_row(
                &format!("SELECT 1 FROM {} WHERE {} = ?1", self.schema.table, self.schema.identity),
                [pk],
                |_| Ok(()),
            )
            .optional()?;
        found.ok_or_else(|| self.not_found(pk))
    }

    fn missing_identity(&self, action: &'static str) -> Error {
        Error::MissingIdentity { table: self.schema.table.clone(), action }
    }

    fn not_found(&self, pk: i64) -> Error {
        Error::NotFound { table: self.schema.table.clone(), pk }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::test_db_path;
    use crate::db::schema::{FieldDescriptor, FieldKind};
    use crate::models::category::Category;
    use crate::models::expense::Expense;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn create_test_expense(amount: i64, category: &str) -> Expense {
        Expense::new(
            Decimal::new(amount, 0),
            category.to_string(),
            NaiveDate::from_ymd_opt(2025, 1, 15).unwrap().and_hms_opt(12, 30, 0).unwrap(),
            "Test expense".to_string(),
        )
    }

    fn row_count<R: Record>(store: &Store<R>) -> usize {
        store.get_all(&Filter::all()).unwrap().len()
    }

    struct Unkeyed;

    impl Record for Unkeyed {
        const TYPE_NAME: &'static str = "Unkeyed";

        fn descriptors() -> &'static [FieldDescriptor] {
            const FIELDS: &[FieldDescriptor] = &[FieldDescriptor::value("note", FieldKind::Text)];
            FIELDS
        }

        fn pk(&self) -> i64 {
            0
        }

        fn set_pk(&mut self, _pk: i64) {}

        fn values(&self) -> Vec<Value> {
            vec![]
        }

        fn from_row(_row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
            Ok(Unkeyed)
        }
    }

    #[test]
    fn test_new_rejects_record_without_identity() {
        let (_dir, path) = test_db_path();
        let result = Store::<Unkeyed>::new(&path);
        assert!(matches!(result, Err(Error::Schema { .. })));
        assert!(!path.exists());
    }

    #[test]
    fn test_add_assigns_identity_and_get_returns_equal_record() {
        let (_dir, path) = test_db_path();
        let store: Store<Expense> = Store::new(&path).unwrap();
        let mut expense = create_test_expense(42, "Food");

        let pk = store.add(&mut expense).unwrap();
        assert!(pk > 0);
        assert_eq!(expense.pk, pk);

        let stored = store.get(pk).unwrap().unwrap();
        assert_eq!(stored, expense);
    }

    #[test]
    fn test_add_with_identity_fails_without_writing() {
        let (_dir, path) = test_db_path();
        let store: Store<Expense> = Store::new(&path).unwrap();
        let mut expense = create_test_expense(10, "Food");
        expense.pk = 7;

        let result = store.add(&mut expense);
        assert!(matches!(result, Err(Error::IdentityAlreadySet { pk: 7, .. })));
        assert_eq!(row_count(&store), 0);
    }

    #[test]
    fn test_get_missing_returns_none() {
        let (_dir, path) = test_db_path();
        let store: Store<Expense> = Store::new(&path).unwrap();
        assert!(store.get(99).unwrap().is_none());
    }

    #[test]
    fn test_update_without_identity_fails() {
        let (_dir, path) = test_db_path();
        let store: Store<Expense> = Store::new(&path).unwrap();
        let mut stored = create_test_expense(10, "Food");
        store.add(&mut stored).unwrap();

        let result = store.update(&create_test_expense(99, "Rent"));
        assert!(matches!(result, Err(Error::MissingIdentity { action: "update", .. })));
        assert_eq!(store.get(stored.pk).unwrap().unwrap(), stored);
    }

    #[test]
    fn test_update_overwrites_fields() {
        let (_dir, path) = test_db_path();
        let store: Store<Expense> = Store::new(&path).unwrap();
        let mut expense = create_test_expense(10, "Food");
        store.add(&mut expense).unwrap();

        expense.amount = Decimal::new(1250, 2);
        expense.comment = "Lunch".to_string();
        store.update(&expense).unwrap();

        let stored = store.get(expense.pk).unwrap().unwrap();
        assert_eq!(stored.amount, Decimal::new(1250, 2));
        assert_eq!(stored.comment, "Lunch");
    }

    #[test]
    fn test_update_skips_unset_fields() {
        let (_dir, path) = test_db_path();
        let store: Store<Category> = Store::new(&path).unwrap();
        let mut food = Category::new("Food", None);
        store.add(&mut food).unwrap();
        let mut groceries = Category::new("Groceries", Some(food.pk));
        store.add(&mut groceries).unwrap();

        let mut renamed = Category::new("Supermarket", None);
        renamed.pk = groceries.pk;
        store.update(&renamed).unwrap();

        let stored = store.get(groceries.pk).unwrap().unwrap();
        assert_eq!(stored.name, "Supermarket");
        assert_eq!(stored.parent, Some(food.pk));
    }

    #[test]
    fn test_update_unknown_identity_is_not_found() {
        let (_dir, path) = test_db_path();
        let store: Store<Expense> = Store::new(&path).unwrap();
        let mut expense = create_test_expense(10, "Food");
        expense.pk = 12;

        let result = store.update(&expense);
        assert!(matches!(result, Err(Error::NotFound { pk: 12, .. })));
    }

    #[test]
    fn test_delete_zero_fails_without_writing() {
        let (_dir, path) = test_db_path();
        let store: Store<Expense> = Store::new(&path).unwrap();
        store.add(&mut create_test_expense(10, "Food")).unwrap();

        let result = store.delete(0);
        assert!(matches!(result, Err(Error::MissingIdentity { action: "delete", .. })));
        assert_eq!(row_count(&store), 1);
    }

    #[test]
    fn test_delete_removes_record() {
        let (_dir, path) = test_db_path();
        let store: Store<Expense> = Store::new(&path).unwrap();
        let mut expense = create_test_expense(10, "Food");
        let pk = store.add(&mut expense).unwrap();

        store.delete(pk).unwrap();
        assert!(store.get(pk).unwrap().is_none());
    }

    #[test]
    fn test_delete_unknown_identity_is_not_found() {
        let (_dir, path) = test_db_path();
        let store: Store<Expense> = Store::new(&path).unwrap();
        let result = store.delete(5);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not found"));
    }

    #[test]
    fn test_get_all_with_equality_filter() {
        let (_dir, path) = test_db_path();
        let store: Store<Expense> = Store::new(&path).unwrap();
        store.add(&mut create_test_expense(10, "Food")).unwrap();
        store.add(&mut create_test_expense(20, "Transport")).unwrap();
        store.add(&mut create_test_expense(30, "Food")).unwrap();

        let food = store
            .get_all(&Filter::all().eq("category", Value::Text("Food".to_string())))
            .unwrap();
        assert_eq!(food.len(), 2);
        assert!(food.iter().all(|e| e.category == "Food"));

        let unfiltered = store.get_all(&Filter::all().eq("category", None::<Value>)).unwrap();
        assert_eq!(unfiltered.len(), 3);
    }

    #[test]
    fn test_get_all_decimal_filter_is_numeric() {
        let (_dir, path) = test_db_path();
        let store: Store<Expense> = Store::new(&path).unwrap();
        let mut expense = create_test_expense(0, "Food");
        expense.amount = Decimal::new(3000, 2);
        store.add(&mut expense).unwrap();

        let found = store
            .get_all(&Filter::all().eq("amount", Value::Text("30".to_string())))
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_get_all_with_fragment_and_equality() {
        let (_dir, path) = test_db_path();
        let store: Store<Expense> = Store::new(&path).unwrap();
        let mut early = create_test_expense(10, "Food");
        early.expense_date = NaiveDate::from_ymd_opt(2024, 12, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        store.add(&mut early).unwrap();
        store.add(&mut create_test_expense(20, "Food")).unwrap();
        store.add(&mut create_test_expense(30, "Rent")).unwrap();

        let filter = Filter::all()
            .eq("category", Value::Text("Food".to_string()))
            .raw("expense_date > ?", vec![Value::Text("2025-01-01 00:00:00".to_string())]);
        let found = store.get_all(&filter).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].amount, Decimal::new(20, 0));
    }

    #[test]
    fn test_table_create_and_drop_are_idempotent() {
        let (_dir, path) = test_db_path();
        let store: Store<Category> = Store::new(&path).unwrap();
        store.add(&mut Category::new("Food", None)).unwrap();

        store.create_table().unwrap();
        assert_eq!(row_count(&store), 1);

        store.drop_table().unwrap();
        store.drop_table().unwrap();
        assert!(store.get_all(&Filter::all()).is_err());

        store.create_table().unwrap();
        assert_eq!(row_count(&store), 0);
    }

    #[test]
    fn test_stores_share_one_database_file() {
        let (_dir, path) = test_db_path();
        let categories: Store<Category> = Store::new(&path).unwrap();
        let expenses: Store<Expense> = Store::new(&path).unwrap();
        categories.add(&mut Category::new("Food", None)).unwrap();
        expenses.add(&mut create_test_expense(10, "Food")).unwrap();

        assert_eq!(row_count(&categories), 1);
        assert_eq!(row_count(&expenses), 1);
    }
}
