//! The operations the presentation layer is allowed to call.

use crate::db::store::Store;
use crate::error::{Error, Result};
use crate::models::budget::{Budget, BudgetDuration};
use crate::models::category::Category;
use crate::models::expense::Expense;
use crate::operations::category::CategoryNode;
use crate::operations::{budget, category, expense, import};
use chrono::{Local, NaiveDateTime};
use rust_decimal::Decimal;
use std::path::Path;

/// Contract between the presentation layer and the domain. Every call is
/// synchronous and returns plain data.
///
/// `add_expense` leaves budgets alone; the caller follows it with
/// [`BookkeeperApi::update_budgets`]. Editing, deleting and importing expenses
/// keep the active budgets in step themselves.
pub trait BookkeeperApi {
    fn get_category_tree(&self) -> Result<Vec<CategoryNode>>;
    fn add_category(&self, name: &str, parent: Option<i64>) -> Result<i64>;
    fn edit_category(
        &self,
        id: i64,
        new_name: Option<&str>,
        new_parent: Option<i64>,
    ) -> Result<()>;
    fn delete_category(&self, id: i64) -> Result<()>;

    fn get_expenses(&self) -> Result<Vec<Expense>>;
    fn get_category_names(&self) -> Result<Vec<String>>;
    fn add_expense(
        &self,
        amount: Decimal,
        expense_date: NaiveDateTime,
        category: &str,
        comment: &str,
    ) -> Result<Expense>;
    /// Returns the expense as it was before the edit. The old amount is taken
    /// back from budgets active at the old date and the new amount added to
    /// those active at the new date.
    fn edit_expense(
        &self,
        pk: i64,
        amount: Decimal,
        expense_date: NaiveDateTime,
        category: &str,
        comment: &str,
    ) -> Result<Expense>;
    /// Removes an expense and takes its amount back from the budgets active at
    /// its date.
    fn delete_expense(&self, pk: i64) -> Result<Expense>;
    /// Stores every CSV row as an expense and adds each one to the budgets
    /// active at its date.
    fn import_expenses(&self, path: &Path) -> Result<Vec<Expense>>;
    /// Adds `value` to every budget whose window contains `date`.
    fn update_budgets(&self, value: Decimal, date: NaiveDateTime) -> Result<usize>;
    fn get_expense(&self, pk: i64) -> Result<Option<Expense>>;

    fn get_current_budgets(&self) -> Result<Vec<Budget>>;
    fn set_budget(&self, limits: Decimal, duration: BudgetDuration) -> Result<Budget>;
}

pub struct Bookkeeper {
    categories: Store<Category>,
    expenses: Store<Expense>,
    budgets: Store<Budget>,
}

impl Bookkeeper {
    /// Binds one store per record type to the database file, creating missing
    /// tables.
    pub fn open(db_path: &Path) -> Result<Self> {
        Ok(Self {
            categories: Store::new(db_path)?,
            expenses: Store::new(db_path)?,
            budgets: Store::new(db_path)?,
        })
    }
}

impl BookkeeperApi for Bookkeeper {
    fn get_category_tree(&self) -> Result<Vec<CategoryNode>> {
        category::get_category_tree(&self.categories)
    }

    fn add_category(&self, name: &str, parent: Option<i64>) -> Result<i64> {
        category::add_category(&self.categories, name, parent)
    }

    fn edit_category(
        &self,
        id: i64,
        new_name: Option<&str>,
        new_parent: Option<i64>,
    ) -> Result<()> {
        category::edit_category(&self.categories, id, new_name, new_parent)
    }

    fn delete_category(&self, id: i64) -> Result<()> {
        category::delete_category(&self.categories, id)
    }

    fn get_expenses(&self) -> Result<Vec<Expense>> {
        expense::get_expenses(&self.expenses)
    }

    fn get_category_names(&self) -> Result<Vec<String>> {
        category::get_category_names(&self.categories)
    }

    fn add_expense(
        &self,
        amount: Decimal,
        expense_date: NaiveDateTime,
        category: &str,
        comment: &str,
    ) -> Result<Expense> {
        expense::add_expense(&self.expenses, amount, expense_date, category, comment)
    }

    fn edit_expense(
        &self,
        pk: i64,
        amount: Decimal,
        expense_date: NaiveDateTime,
        category: &str,
        comment: &str,
    ) -> Result<Expense> {
        let previous =
            expense::edit_expense(&self.expenses, pk, amount, expense_date, category, comment)?;
        budget::update_budgets(&self.budgets, -previous.amount, previous.expense_date)?;
        let edited = expense::get_expense(&self.expenses, pk)?.ok_or_else(|| Error::NotFound {
            table: "expense".to_string(),
            pk,
        })?;
        budget::update_budgets(&self.budgets, edited.amount, edited.expense_date)?;
        Ok(previous)
    }

    fn delete_expense(&self, pk: i64) -> Result<Expense> {
        let removed = expense::delete_expense(&self.expenses, pk)?;
        budget::update_budgets(&self.budgets, -removed.amount, removed.expense_date)?;
        Ok(removed)
    }

    fn import_expenses(&self, path: &Path) -> Result<Vec<Expense>> {
        let imported = import::import_expenses_from_csv(&self.expenses, path)?;
        for expense in &imported {
            budget::update_budgets(&self.budgets, expense.amount, expense.expense_date)?;
        }
        Ok(imported)
    }

    fn update_budgets(&self, value: Decimal, date: NaiveDateTime) -> Result<usize> {
        budget::update_budgets(&self.budgets, value, date)
    }

    fn get_expense(&self, pk: i64) -> Result<Option<Expense>> {
        expense::get_expense(&self.expenses, pk)
    }

    fn get_current_budgets(&self) -> Result<Vec<Budget>> {
        budget::get_current_budgets(&self.budgets)
    }

    fn set_budget(&self, limits: Decimal, duration: BudgetDuration) -> Result<Budget> {
        let now = Local::now().naive_local();
        budget::set_budget(&self.budgets, &self.expenses, limits, duration, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::test_db_path;
    use chrono::Duration;
    use std::io::Write;

    #[test]
    fn test_open_creates_all_tables() {
        let (_dir, path) = test_db_path();
        let bookkeeper = Bookkeeper::open(&path).unwrap();

        assert!(bookkeeper.get_category_tree().unwrap().is_empty());
        assert!(bookkeeper.get_expenses().unwrap().is_empty());
        assert!(bookkeeper.get_current_budgets().unwrap().is_empty());
    }

    #[test]
    fn test_expense_added_today_counts_toward_new_budget() {
        let (_dir, path) = test_db_path();
        let bookkeeper = Bookkeeper::open(&path).unwrap();
        let soon = Local::now().naive_local() + Duration::hours(2);
        bookkeeper.add_expense(Decimal::new(12, 0), soon, "Food", "").unwrap();

        let budget = bookkeeper
            .set_budget(Decimal::new(100, 0), BudgetDuration::Week)
            .unwrap();
        assert_eq!(budget.amount, Decimal::new(12, 0));

        bookkeeper.update_budgets(Decimal::new(3, 0), soon).unwrap();
        let current = bookkeeper.get_current_budgets().unwrap();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].amount, Decimal::new(15, 0));
    }

    #[test]
    fn test_reopen_sees_stored_data() {
        let (_dir, path) = test_db_path();
        let food = Bookkeeper::open(&path).unwrap().add_category("Food", None).unwrap();

        let reopened = Bookkeeper::open(&path).unwrap();
        assert_eq!(reopened.get_category_names().unwrap(), vec!["Food"]);
        assert_eq!(reopened.get_category_tree().unwrap()[0].id, food);
    }

    fn day_budget_with_expense(bookkeeper: &Bookkeeper, amount: i64) -> (Expense, NaiveDateTime) {
        let soon = Local::now().naive_local() + Duration::hours(2);
        let expense = bookkeeper
            .add_expense(Decimal::new(amount, 0), soon, "Food", "")
            .unwrap();
        let budget = bookkeeper
            .set_budget(Decimal::new(100, 0), BudgetDuration::Day)
            .unwrap();
        assert_eq!(budget.amount, Decimal::new(amount, 0));
        (expense, soon)
    }

    fn day_amount(bookkeeper: &Bookkeeper) -> Decimal {
        bookkeeper.get_current_budgets().unwrap()[0].amount
    }

    #[test]
    fn test_delete_expense_takes_amount_back_from_budget() {
        let (_dir, path) = test_db_path();
        let bookkeeper = Bookkeeper::open(&path).unwrap();
        let (expense, _) = day_budget_with_expense(&bookkeeper, 40);

        bookkeeper.delete_expense(expense.pk).unwrap();
        assert_eq!(day_amount(&bookkeeper), Decimal::ZERO);
    }

    #[test]
    fn test_import_expenses_adds_to_budget() {
        let (_dir, path) = test_db_path();
        let bookkeeper = Bookkeeper::open(&path).unwrap();
        let (_, soon) = day_budget_with_expense(&bookkeeper, 40);

        let mut csv_file = tempfile::NamedTempFile::new().unwrap();
        writeln!(csv_file, "{},5,Food", soon.format("%Y-%m-%d %H:%M:%S")).unwrap();
        let imported = bookkeeper.import_expenses(csv_file.path()).unwrap();

        assert_eq!(imported.len(), 1);
        assert_eq!(day_amount(&bookkeeper), Decimal::new(45, 0));
    }

    #[test]
    fn test_edit_expense_moves_amount_between_windows() {
        let (_dir, path) = test_db_path();
        let bookkeeper = Bookkeeper::open(&path).unwrap();
        let (expense, soon) = day_budget_with_expense(&bookkeeper, 40);

        let previous = bookkeeper
            .edit_expense(expense.pk, Decimal::new(25, 0), soon, "Food", "")
            .unwrap();
        assert_eq!(previous.amount, Decimal::new(40, 0));
        assert_eq!(day_amount(&bookkeeper), Decimal::new(25, 0));

        let next_week = soon + Duration::days(7);
        bookkeeper
            .edit_expense(expense.pk, Decimal::new(25, 0), next_week, "Food", "")
            .unwrap();
        assert_eq!(day_amount(&bookkeeper), Decimal::ZERO);
    }

    #[test]
    fn test_edit_missing_expense_leaves_budget() {
        let (_dir, path) = test_db_path();
        let bookkeeper = Bookkeeper::open(&path).unwrap();
        let (_, soon) = day_budget_with_expense(&bookkeeper, 40);

        let result = bookkeeper.edit_expense(999, Decimal::new(1, 0), soon, "Food", "");
        assert!(matches!(result, Err(Error::NotFound { pk: 999, .. })));
        assert_eq!(day_amount(&bookkeeper), Decimal::new(40, 0));
    }
}
