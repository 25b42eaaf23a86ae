use std::{fmt, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::report::format_money;

/// Errors raised while validating raw user input before it reaches the ledger.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("not a number: {0:?}")]
    NotANumber(String),
    #[error("amount must be positive, got {0}")]
    NotPositive(Decimal),
    #[error("unknown transaction type {0:?} (expected spent or received)")]
    UnknownDirection(String),
}

/// A strictly positive money amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, InputError> {
        if value <= Decimal::ZERO {
            return Err(InputError::NotPositive(value));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = InputError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl FromStr for Amount {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('$');
        let value = Decimal::from_str(trimmed)
            .or_else(|_| Decimal::from_scientific(trimmed))
            .map_err(|_| InputError::NotANumber(s.trim().to_string()))?;
        Self::new(value)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_money(self.0))
    }
}

/// Which side of the log a transaction lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Spent,
    Received,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Spent => "spent",
            Direction::Received => "received",
        }
    }

    /// Sign applied to the amount when it hits the balance.
    pub fn signed(self, amount: Amount) -> Decimal {
        match self {
            Direction::Spent => -amount.value(),
            Direction::Received => amount.value(),
        }
    }
}

impl FromStr for Direction {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "spent" => Ok(Direction::Spent),
            "received" => Ok(Direction::Received),
            other => Err(InputError::UnknownDirection(other.to_string())),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
