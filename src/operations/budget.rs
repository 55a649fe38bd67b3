use crate::db::filter::Filter;
use crate::db::schema::timestamp_value;
use crate::db::store::Store;
use crate::error::{Error, Result};
use crate::models::budget::{Budget, BudgetDuration};
use crate::models::expense::Expense;
use crate::operations::expense::get_expenses_in_range;
use chrono::{NaiveDateTime, Timelike};
use rusqlite::types::Value;
use rust_decimal::Decimal;
use tracing::{debug, info};

/// The budget with the latest `end` for each duration, in Day, Week, Month
/// order. Durations that were never set are omitted.
pub fn get_current_budgets(store: &Store<Budget>) -> Result<Vec<Budget>> {
    let mut current = Vec::new();
    for duration in BudgetDuration::ALL {
        let keyword = Value::Text(duration.as_str().to_string());
        let filter = Filter::all().eq("duration", keyword.clone()).raw(
            "end = (SELECT MAX(end) FROM budget WHERE duration = ?)",
            vec![keyword],
        );
        // several limits set within the same second share an end; the last one wins
        if let Some(budget) = store.get_all(&filter)?.into_iter().max_by_key(|b| b.pk) {
            current.push(budget);
        }
    }
    Ok(current)
}

/// Opens a new budget window of `duration` at `now`. The spent amount starts
/// from the expenses already dated inside `(now, end]`. Earlier budgets are kept
/// as history.
pub fn set_budget(
    budgets: &Store<Budget>,
    expenses: &Store<Expense>,
    limits: Decimal,
    duration: BudgetDuration,
    now: NaiveDateTime,
) -> Result<Budget> {
    if limits.is_sign_negative() {
        return Err(Error::validation("Budget cannot be negative"));
    }
    let start = now.with_nanosecond(0).unwrap_or(now);
    let end = duration
        .window_end(start)
        .ok_or_else(|| {
            Error::validation(format!("Cannot compute {} window from {}", duration, start))
        })?;

    let spent = get_expenses_in_range(expenses, start, end)?
        .iter()
        .fold(Decimal::ZERO, |acc, e| acc + e.amount);

    let mut budget = Budget::new(spent, limits, duration, start, end);
    budgets.add(&mut budget)?;
    info!(pk = budget.pk, %duration, %limits, %spent, "budget set");
    Ok(budget)
}

/// Budgets whose window `(start, end]` contains `date`.
pub fn get_active_budgets(store: &Store<Budget>, date: NaiveDateTime) -> Result<Vec<Budget>> {
    store.get_all(&Filter::all().raw(
        "start < ? AND end >= ?",
        vec![timestamp_value(date), timestamp_value(date)],
    ))
}

/// Adds `value` (negative to take an expense back) to every budget active at
/// `date`. Returns how many budgets changed.
pub fn update_budgets(store: &Store<Budget>, value: Decimal, date: NaiveDateTime) -> Result<usize> {
    let active = get_active_budgets(store, date)?;
    for mut budget in active.iter().cloned() {
        budget.amount += value;
        store.update(&budget)?;
        debug!(pk = budget.pk, amount = %budget.amount, "budget recomputed");
    }
    Ok(active.len())
}
