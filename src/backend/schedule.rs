use std::str::FromStr;

use chrono::{DateTime, Utc};
use hifitime::prelude::Epoch;

use crate::error::Error;

/// Every hour on the hour
pub const DEFAULT_CRON: &str = "0 0 0/1 * * *";

/// Next trigger evaluation
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum NextRun {
    /// Schedule is invalid or will never fire again
    Invalid,
    /// Next trigger [Epoch]
    At(Epoch),
}

/// Cron schedule (with seconds field) and its evaluation basis.
#[derive(Debug, Clone)]
pub struct Schedule {
    expression: String,
    compiled: Option<cron::Schedule>,
    /// Next triggers are searched strictly after this [Epoch]
    pub basis: Epoch,
}

fn to_datetime(t: Epoch) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(t.to_unix_milliseconds().floor() as i64)
}

fn to_epoch(t: DateTime<Utc>) -> Epoch {
    Epoch::from_unix_milliseconds(t.timestamp_millis() as f64)
}

impl Schedule {
    /// Builds a new [Schedule]. An invalid expression is retained
    /// (it will evaluate to [NextRun::Invalid]), use [Schedule::replace]
    /// to obtain the parsing error.
    pub fn new(expression: &str, basis: Epoch) -> Self {
        let mut s = Self {
            expression: String::new(),
            compiled: None,
            basis,
        };
        let _ = s.replace(expression);
        s
    }

    /// Replaces the cron expression. On error,
    /// the schedule becomes invalid until replaced again.
    pub fn replace(&mut self, expression: &str) -> Result<(), Error> {
        let expression = expression.trim();
        self.expression = expression.to_string();

        match cron::Schedule::from_str(expression) {
            Ok(compiled) => {
                self.compiled = Some(compiled);
                Ok(())
            },
            Err(e) => {
                self.compiled = None;
                Err(Error::Schedule {
                    expression: expression.to_string(),
                    reason: e.to_string(),
                })
            },
        }
    }

    /// Cron expression, as provided
    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn is_valid(&self) -> bool {
        self.compiled.is_some()
    }

    /// First trigger strictly after `basis`
    pub fn next_trigger(&self, basis: Epoch) -> NextRun {
        let Some(compiled) = &self.compiled else {
            return NextRun::Invalid;
        };

        let Some(basis) = to_datetime(basis) else {
            return NextRun::Invalid;
        };

        match compiled.after(&basis).next() {
            Some(t) => NextRun::At(to_epoch(t)),
            None => NextRun::Invalid,
        }
    }
}
