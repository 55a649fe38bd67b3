use crate::bookkeeper::BookkeeperApi;
use crate::error::{Error, Result};
use crate::models::budget::{Budget, BudgetDuration};
use crate::models::expense::Expense;
use crate::operations::category::CategoryNode;
use crate::operations::expense::{parse_amount, parse_expense_date};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "bookkeeper", version, about = "Track expenses, categories and budgets")]
pub struct Cli {
    /// SQLite database file
    #[arg(long, global = true, env = "BOOKKEEPER_DB", default_value = "bookkeeper.db")]
    pub db: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage spending categories
    #[command(subcommand)]
    Category(CategoryCommand),
    /// Record and browse expenses
    #[command(subcommand)]
    Expense(ExpenseCommand),
    /// Show or set budgets
    #[command(subcommand)]
    Budget(BudgetCommand),
}

#[derive(Debug, Subcommand)]
pub enum CategoryCommand {
    /// Print the category tree
    Tree,
    Add {
        name: String,
        #[arg(long)]
        parent: Option<i64>,
    },
    Edit {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        parent: Option<i64>,
    },
    Delete { id: i64 },
}

#[derive(Debug, Subcommand)]
pub enum ExpenseCommand {
    List,
    /// List the category names an expense can use
    Categories,
    Show { id: i64 },
    Add {
        amount: String,
        category: String,
        /// YYYY-MM-DD [HH:MM[:SS]], defaults to now
        #[arg(long)]
        date: Option<String>,
        #[arg(long, default_value = "")]
        comment: String,
    },
    Edit {
        id: i64,
        #[arg(long)]
        amount: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        comment: Option<String>,
    },
    Delete { id: i64 },
    /// Import `date,amount,category[,comment]` rows from a CSV file
    Import { path: PathBuf },
}

#[derive(Debug, Subcommand)]
pub enum BudgetCommand {
    /// Show the current budget of each duration
    Show,
    Set {
        /// day, week or month
        duration: String,
        limit: String,
    },
}

pub fn run(api: &impl BookkeeperApi, command: Command) -> Result<()> {
    match command {
        Command::Category(command) => run_category(api, command),
        Command::Expense(command) => run_expense(api, command),
        Command::Budget(command) => run_budget(api, command),
    }
}

fn run_category(api: &impl BookkeeperApi, command: CategoryCommand) -> Result<()> {
    match command {
        CategoryCommand::Tree => {
            let tree = api.get_category_tree()?;
            if tree.is_empty() {
                println!("No categories yet.");
            }
            for node in &tree {
                print_node(node, 0);
            }
        }
        CategoryCommand::Add { name, parent } => {
            let id = api.add_category(&name, parent)?;
            println!("Category added with id {}.", id);
        }
        CategoryCommand::Edit { id, name, parent } => {
            api.edit_category(id, name.as_deref(), parent)?;
            println!("Category {} updated.", id);
        }
        CategoryCommand::Delete { id } => {
            api.delete_category(id)?;
            println!("Category {} deleted.", id);
        }
    }
    Ok(())
}

fn run_expense(api: &impl BookkeeperApi, command: ExpenseCommand) -> Result<()> {
    match command {
        ExpenseCommand::List => {
            let expenses = api.get_expenses()?;
            if expenses.is_empty() {
                println!("No expenses recorded.");
            }
            for expense in &expenses {
                println!("{}", format_expense(expense));
            }
        }
        ExpenseCommand::Categories => {
            for name in api.get_category_names()? {
                println!("{}", name);
            }
        }
        ExpenseCommand::Show { id } => match api.get_expense(id)? {
            Some(expense) => println!("{}", format_expense(&expense)),
            None => println!("Expense {} not found.", id),
        },
        ExpenseCommand::Add {
            amount,
            category,
            date,
            comment,
        } => {
            let amount = parse_amount(&amount)?;
            let date = match date {
                Some(date) => parse_expense_date(&date)?,
                None => Local::now().naive_local(),
            };
            let expense = api.add_expense(amount, date, &category, &comment)?;
            let budgets = api.update_budgets(expense.amount, expense.expense_date)?;
            println!("Expense added with id {} ({} budget(s) updated).", expense.pk, budgets);
        }
        ExpenseCommand::Edit {
            id,
            amount,
            category,
            date,
            comment,
        } => {
            let current = api.get_expense(id)?.ok_or_else(|| Error::NotFound {
                table: "expense".to_string(),
                pk: id,
            })?;
            let amount = match amount {
                Some(amount) => parse_amount(&amount)?,
                None => current.amount,
            };
            let date = match date {
                Some(date) => parse_expense_date(&date)?,
                None => current.expense_date,
            };
            let category = category.unwrap_or(current.category);
            let comment = comment.unwrap_or(current.comment);

            api.edit_expense(id, amount, date, &category, &comment)?;
            println!("Expense {} updated.", id);
        }
        ExpenseCommand::Delete { id } => {
            api.delete_expense(id)?;
            println!("Expense {} deleted.", id);
        }
        ExpenseCommand::Import { path } => {
            let imported = api.import_expenses(&path)?;
            println!("Successfully imported {} expenses.", imported.len());
        }
    }
    Ok(())
}

fn run_budget(api: &impl BookkeeperApi, command: BudgetCommand) -> Result<()> {
    match command {
        BudgetCommand::Show => {
            let budgets = api.get_current_budgets()?;
            if budgets.is_empty() {
                println!("No budgets set.");
            }
            for budget in &budgets {
                println!("{}", format_budget(budget));
            }
        }
        BudgetCommand::Set { duration, limit } => {
            let duration: BudgetDuration = duration.parse()?;
            let limit = parse_amount(&limit)?;
            let budget = api.set_budget(limit, duration)?;
            println!("{}", format_budget(&budget));
        }
    }
    Ok(())
}

fn print_node(node: &CategoryNode, depth: usize) {
    println!("{}{} [{}]", "  ".repeat(depth), node.name, node.id);
    for child in &node.children {
        print_node(child, depth + 1);
    }
}

fn format_expense(expense: &Expense) -> String {
    format!(
        "#{} {} {} {} {}",
        expense.pk,
        expense.expense_date.format("%Y-%m-%d %H:%M"),
        expense.amount,
        expense.category,
        expense.comment
    )
}

fn format_budget(budget: &Budget) -> String {
    let status = if budget.is_exceeded() { " (exceeded)" } else { "" };
    format!(
        "{:<5} spent {} of {}, {} left until {}{}",
        budget.duration.as_str(),
        budget.amount,
        budget.limits,
        budget.remaining(),
        budget.end.format("%Y-%m-%d %H:%M"),
        status
    )
}
