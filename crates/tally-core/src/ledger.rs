use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::amount::{Amount, Direction};

/// Bank account.
pub const BANK: &str = "B";
/// Digital wallet.
pub const DIGITAL_WALLET: &str = "D";
/// Physical cash.
pub const PHYSICAL_CASH: &str = "P";

/// Categories seeded by [`Ledger::initialize`].
pub const KNOWN_CATEGORIES: [&str; 3] = [BANK, DIGITAL_WALLET, PHYSICAL_CASH];

/// Business-rule failures. None of them mutate the ledger.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("one or both account types are invalid ({from}, {to}); available accounts: {}", .available.join(", "))]
    UnknownCategory {
        from: String,
        to: String,
        available: Vec<String>,
    },
    #[error("insufficient funds in {category}: balance {balance:.2}, requested {requested:.2}")]
    InsufficientFunds {
        category: String,
        balance: Decimal,
        requested: Decimal,
    },
    #[error("balance of {category} would overflow")]
    Overflow { category: String },
}

/// One logged spend or receive event. The sign lives in which list holds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub amount: Amount,
    pub brief_info: String,
    pub personal_note: String,
    pub account_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transactions {
    #[serde(default)]
    pub spent: Vec<TransactionRecord>,
    #[serde(default)]
    pub received: Vec<TransactionRecord>,
}

/// Root persisted object. Both fields stay `None` until first touched so that a
/// fresh ledger serializes to `{}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balances: Option<BTreeMap<String, Decimal>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transactions: Option<Transactions>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current balance of a category, if it has ever been referenced.
    pub fn balance(&self, category: &str) -> Option<Decimal> {
        self.balances.as_ref()?.get(category).copied()
    }

    pub fn categories(&self) -> Vec<String> {
        self.balances
            .as_ref()
            .map(|b| b.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn spent(&self) -> &[TransactionRecord] {
        self.transactions
            .as_ref()
            .map(|t| t.spent.as_slice())
            .unwrap_or_default()
    }

    pub fn received(&self) -> &[TransactionRecord] {
        self.transactions
            .as_ref()
            .map(|t| t.received.as_slice())
            .unwrap_or_default()
    }

    /// Seeds the known categories at zero, leaving existing balances alone.
    /// Returns `true` when anything was added and the ledger needs saving.
    pub fn initialize(&mut self) -> bool {
        let balances = self.balances.get_or_insert_with(BTreeMap::new);
        let mut added = false;
        for category in KNOWN_CATEGORIES {
            if !balances.contains_key(category) {
                balances.insert(category.to_string(), Decimal::ZERO);
                added = true;
            }
        }
        if added {
            debug!("seeded default account categories");
        }
        added
    }

    /// Adds a signed delta to a category, creating it at zero first.
    /// Negative results are allowed here; a result outside the `Decimal` range
    /// is an error and leaves the ledger unchanged.
    pub fn update_balance(
        &mut self,
        category: &str,
        delta: Decimal,
    ) -> Result<Decimal, LedgerError> {
        let current = self.balance(category).unwrap_or(Decimal::ZERO);
        let updated = current
            .checked_add(delta)
            .ok_or_else(|| overflow(category))?;
        self.balances
            .get_or_insert_with(BTreeMap::new)
            .insert(category.to_string(), updated);
        debug!(category, balance = %updated, "balance updated");
        Ok(updated)
    }

    /// Applies a transaction to the category balance and logs it.
    /// Returns the category's new balance. On overflow nothing is logged.
    pub fn add_transaction(
        &mut self,
        direction: Direction,
        amount: Amount,
        brief_info: impl Into<String>,
        personal_note: impl Into<String>,
        category: &str,
    ) -> Result<Decimal, LedgerError> {
        let balance = self.update_balance(category, direction.signed(amount))?;
        let record = TransactionRecord {
            amount,
            brief_info: brief_info.into(),
            personal_note: personal_note.into(),
            account_type: category.to_string(),
        };
        let log = self.transactions.get_or_insert_with(Transactions::default);
        match direction {
            Direction::Spent => log.spent.push(record),
            Direction::Received => log.received.push(record),
        }
        Ok(balance)
    }

    /// Moves money between two existing categories.
    ///
    /// Only a `spent` record under `from` is logged; the receiving side gets no
    /// entry of its own.
    pub fn transfer_money(
        &mut self,
        from: &str,
        to: &str,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let (Some(available), Some(target)) = (self.balance(from), self.balance(to)) else {
            return Err(LedgerError::UnknownCategory {
                from: from.to_string(),
                to: to.to_string(),
                available: self.categories(),
            });
        };
        if available < amount.value() {
            return Err(LedgerError::InsufficientFunds {
                category: from.to_string(),
                balance: available,
                requested: amount.value(),
            });
        }

        // Both sides are computed before either is written.
        let debited = available
            .checked_sub(amount.value())
            .ok_or_else(|| overflow(from))?;
        let target = if from == to { debited } else { target };
        let credited = target
            .checked_add(amount.value())
            .ok_or_else(|| overflow(to))?;
        let balances = self.balances.get_or_insert_with(BTreeMap::new);
        balances.insert(from.to_string(), debited);
        balances.insert(to.to_string(), credited);

        self.transactions
            .get_or_insert_with(Transactions::default)
            .spent
            .push(TransactionRecord {
                amount,
                brief_info: format!("Transfer from {from} to {to}"),
                personal_note: "Transfer".to_string(),
                account_type: from.to_string(),
            });
        debug!(from, to, amount = %amount.value(), "transfer applied");
        Ok(())
    }
}

fn overflow(category: &str) -> LedgerError {
    LedgerError::Overflow {
        category: category.to_string(),
    }
}
