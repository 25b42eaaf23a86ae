//! Core ledger model for Tally: balances, transaction log, and the
//! persistence contract. Kept free of crypto and filesystem concerns.

pub mod amount;
pub mod ledger;
pub mod report;
pub mod storage;

pub use amount::{Amount, Direction, InputError};
pub use ledger::{Ledger, LedgerError, TransactionRecord, Transactions, KNOWN_CATEGORIES};
