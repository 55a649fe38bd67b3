use super::expense::{parse_amount, parse_expense_date, validated_expense};
use crate::db::store::Store;
use crate::error::{Error, Result};
use crate::models::expense::Expense;
use std::fs::File;
use std::path::Path;
use tracing::info;

/// Imports expenses from a headerless CSV file with
/// `date,amount,category[,comment]` rows. Every row is validated before the
/// first one is stored. Budgets are left to the caller.
pub fn import_expenses_from_csv(store: &Store<Expense>, path: &Path) -> Result<Vec<Expense>> {
    let parsed = read_csv(path)?;
    let mut imported = Vec::with_capacity(parsed.len());
    for mut expense in parsed {
        store.add(&mut expense)?;
        imported.push(expense);
    }
    info!(count = imported.len(), path = %path.display(), "expenses imported");
    Ok(imported)
}

fn read_csv(path: &Path) -> Result<Vec<Expense>> {
    let file = File::open(path)?;

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .has_headers(false)
        .flexible(true)
        .from_reader(file);

    let mut expenses = Vec::new();

    for (line_index, result) in reader.records().enumerate() {
        let line = line_index + 1;
        let record = result?;

        if record.len() != 3 && record.len() != 4 {
            return Err(Error::validation(format!(
                "Invalid number of columns on line {}: expected 3 or 4, got {}",
                line,
                record.len()
            )));
        }

        let at_line = |e: Error| Error::validation(format!("Line {}: {}", line, e));
        let expense_date = parse_expense_date(&record[0]).map_err(at_line)?;
        let amount = parse_amount(&record[1]).map_err(at_line)?;
        let comment = record.get(3).unwrap_or("");
        let expense =
            validated_expense(amount, expense_date, &record[2], comment).map_err(at_line)?;

        expenses.push(expense);
    }

    Ok(expenses)
}
