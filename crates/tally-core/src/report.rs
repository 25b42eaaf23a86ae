//! Plain-text views over a ledger. Nothing here mutates state.

use std::fmt::Write as _;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::ledger::{Ledger, TransactionRecord};

/// Dollar amount rounded half away from zero to cents, e.g. `$-50.00`.
pub fn format_money(value: Decimal) -> String {
    let cents = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("${cents:.2}")
}

/// Balance overview, one `category: $amount` line per category.
pub fn render_balances(ledger: &Ledger) -> String {
    let mut out = String::from("Balance Overview:\n");
    match ledger.balances.as_ref().filter(|b| !b.is_empty()) {
        Some(balances) => {
            for (category, value) in balances {
                let _ = writeln!(out, "{category}: {}", format_money(*value));
            }
        }
        None => out.push_str("No balances recorded.\n"),
    }
    out
}

/// Spent and received logs in insertion order.
pub fn render_history(ledger: &Ledger) -> String {
    let Some(transactions) = ledger.transactions.as_ref() else {
        return "No transactions recorded.\n".to_string();
    };

    let mut out = String::from("Transaction History:\n");
    render_section(&mut out, "Spent", &transactions.spent);
    render_section(&mut out, "Received", &transactions.received);
    out
}

fn render_section(out: &mut String, title: &str, records: &[TransactionRecord]) {
    let _ = writeln!(out, "\n{title} Transactions:");
    if records.is_empty() {
        let _ = writeln!(out, "No {} transactions found.", title.to_lowercase());
        return;
    }
    for record in records {
        let _ = writeln!(out, "{}", render_record(record));
    }
}

fn render_record(record: &TransactionRecord) -> String {
    format!(
        "Amount: {}, Info: {}, Note: {}, Account: {}",
        record.amount, record.brief_info, record.personal_note, record.account_type
    )
}
