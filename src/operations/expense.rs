use crate::db::filter::Filter;
use crate::db::schema::timestamp_value;
use crate::db::store::Store;
use crate::error::{Error, Result};
use crate::models::expense::Expense;
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::info;

const DATE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

/// Parses a user supplied amount. Amounts are non-negative decimals.
pub fn parse_amount(input: &str) -> Result<Decimal> {
    let amount = Decimal::from_str(input.trim()).map_err(|_| {
        Error::validation(format!("Invalid amount '{}'. Must be a valid number", input.trim()))
    })?;
    if amount.is_sign_negative() {
        return Err(Error::validation("Amount cannot be negative"));
    }
    Ok(amount)
}

/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM` or `YYYY-MM-DD HH:MM:SS`.
pub fn parse_expense_date(input: &str) -> Result<NaiveDateTime> {
    let input = input.trim();
    for format in DATE_TIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(parsed);
        }
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| {
            Error::validation("Invalid date format. Please use YYYY-MM-DD [HH:MM[:SS]].")
        })
}

pub fn get_expenses(store: &Store<Expense>) -> Result<Vec<Expense>> {
    store.get_all(&Filter::all())
}

pub fn get_expense(store: &Store<Expense>, pk: i64) -> Result<Option<Expense>> {
    store.get(pk)
}

/// Expenses dated in `(start, end]`.
pub fn get_expenses_in_range(
    store: &Store<Expense>,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<Vec<Expense>> {
    store.get_all(&Filter::all().raw(
        "expense_date > ? AND expense_date <= ?",
        vec![timestamp_value(start), timestamp_value(end)],
    ))
}

/// Stores a new expense. Budgets are not touched; callers recompute them with
/// `operations::budget::update_budgets`.
pub fn add_expense(
    store: &Store<Expense>,
    amount: Decimal,
    expense_date: NaiveDateTime,
    category: &str,
    comment: &str,
) -> Result<Expense> {
    let mut expense = validated_expense(amount, expense_date, category, comment)?;
    let pk = store.add(&mut expense)?;
    info!(pk, %amount, category = %expense.category, "expense added");
    Ok(expense)
}

/// Overwrites an existing expense and returns the previous version.
pub fn edit_expense(
    store: &Store<Expense>,
    pk: i64,
    amount: Decimal,
    expense_date: NaiveDateTime,
    category: &str,
    comment: &str,
) -> Result<Expense> {
    let previous = store.get(pk)?.ok_or_else(|| Error::NotFound {
        table: "expense".to_string(),
        pk,
    })?;
    let mut expense = validated_expense(amount, expense_date, category, comment)?;
    expense.pk = pk;
    store.update(&expense)?;
    info!(pk, %amount, "expense edited");
    Ok(previous)
}

/// Removes an expense and returns it.
pub fn delete_expense(store: &Store<Expense>, pk: i64) -> Result<Expense> {
    let expense = store.get(pk)?.ok_or_else(|| Error::NotFound {
        table: "expense".to_string(),
        pk,
    })?;
    store.delete(pk)?;
    info!(pk, "expense deleted");
    Ok(expense)
}

pub(crate) fn validated_expense(
    amount: Decimal,
    expense_date: NaiveDateTime,
    category: &str,
    comment: &str,
) -> Result<Expense> {
    if amount.is_sign_negative() {
        return Err(Error::validation("Amount cannot be negative"));
    }
    let category = category.trim();
    if category.is_empty() {
        return Err(Error::validation("Category cannot be empty"));
    }
    if comment.chars().count() > 255 {
        return Err(Error::validation("Comment too long"));
    }
    // stored with second precision
    let expense_date = expense_date.with_nanosecond(0).unwrap_or(expense_date);
    Ok(Expense::new(
        amount,
        category.to_string(),
        expense_date,
        comment.trim().to_string(),
    ))
}
