use crate::db::schema::{
    FieldDescriptor, FieldKind, Record, decimal_value, read_decimal, read_timestamp,
    timestamp_value,
};
use crate::error::Error;
use chrono::{Duration, Months, NaiveDateTime};
use rusqlite::Row;
use rusqlite::types::{Type, Value};
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BudgetDuration {
    Day,
    Week,
    Month,
}

impl BudgetDuration {
    pub const ALL: [BudgetDuration; 3] =
        [BudgetDuration::Day, BudgetDuration::Week, BudgetDuration::Month];

    pub fn as_str(self) -> &'static str {
        match self {
            BudgetDuration::Day => "Day",
            BudgetDuration::Week => "Week",
            BudgetDuration::Month => "Month",
        }
    }

    /// End of a window opened at `start`. Months are calendar months, clamped
    /// to the last day of a shorter month.
    pub fn window_end(self, start: NaiveDateTime) -> Option<NaiveDateTime> {
        match self {
            BudgetDuration::Day => start.checked_add_signed(Duration::days(1)),
            BudgetDuration::Week => start.checked_add_signed(Duration::weeks(1)),
            BudgetDuration::Month => start.checked_add_months(Months::new(1)),
        }
    }
}

impl fmt::Display for BudgetDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BudgetDuration {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "day" => Ok(BudgetDuration::Day),
            "week" => Ok(BudgetDuration::Week),
            "month" => Ok(BudgetDuration::Month),
            _ => Err(Error::validation(format!(
                "Invalid duration '{}'. Use 'day', 'week' or 'month'",
                s
            ))),
        }
    }
}

/// Spending limit for one window. `amount` is what has been spent inside the
/// window so far, `limits` the ceiling set by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Budget {
    pub pk: i64,
    pub amount: Decimal,
    pub limits: Decimal,
    pub duration: BudgetDuration,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Budget {
    pub fn new(
        amount: Decimal,
        limits: Decimal,
        duration: BudgetDuration,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Self {
        Self {
            pk: 0,
            amount,
            limits,
            duration,
            start,
            end,
        }
    }

    pub fn remaining(&self) -> Decimal {
        self.limits - self.amount
    }

    pub fn is_exceeded(&self) -> bool {
        self.amount > self.limits
    }
}

impl Record for Budget {
    const TYPE_NAME: &'static str = "Budget";

    fn descriptors() -> &'static [FieldDescriptor] {
        const FIELDS: &[FieldDescriptor] = &[
            FieldDescriptor::identity("pk"),
            FieldDescriptor::value("amount", FieldKind::Decimal),
            FieldDescriptor::value("limits", FieldKind::Decimal),
            FieldDescriptor::value("duration", FieldKind::Text),
            FieldDescriptor::value("start", FieldKind::Timestamp),
            FieldDescriptor::value("end", FieldKind::Timestamp),
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
            decimal_value(self.limits),
            Value::Text(self.duration.as_str().to_string()),
            timestamp_value(self.start),
            timestamp_value(self.end),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let duration_str: String = row.get(3)?;
        let duration = BudgetDuration::from_str(&duration_str)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;

        Ok(Budget {
            pk: row.get(0)?,
            amount: read_decimal(row, 1)?,
            limits: read_decimal(row, 2)?,
            duration,
            start: read_timestamp(row, 4)?,
            end: read_timestamp(row, 5)?,
        })
    }
}
