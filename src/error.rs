//! Error type shared by the store, the domain operations and the CLI.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot add {table} record: identity is already set to {pk}")]
    IdentityAlreadySet { table: String, pk: i64 },

    #[error("cannot {action} {table} record with unknown identity")]
    MissingIdentity { table: String, action: &'static str },

    #[error("{table} with id {pk} not found")]
    NotFound { table: String, pk: i64 },

    #[error("invalid record schema for {record}: {reason}")]
    Schema { record: String, reason: String },

    #[error("unknown field '{field}' for table {table}")]
    UnknownField { table: String, field: String },

    #[error("{0}")]
    Validation(String),

    #[error("category {0} still has sub-categories")]
    HasChildren(i64),

    #[error("category {child} cannot be placed under {parent}: it would create a cycle")]
    Cycle { child: i64, parent: i64 },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }
}
