use std::io::{BufRead, Write};

use color_eyre::{eyre::eyre, Result};
use tally_core::{
    ledger::{BANK, DIGITAL_WALLET, PHYSICAL_CASH},
    report::{format_money, render_balances, render_history},
    storage::LedgerStore,
    Amount, Direction, Ledger,
};
use tracing::{debug, warn};

const MENU: &str = "\nOptions:
1. Print balance
2. Add transaction
3. Transfer money
4. View transaction history
5. Exit";

const TRANSFER_MENU: &str = "Transfer Options:
1. Bank to Digital Wallet (B to D)
2. Bank to Physical Cash (B to P)
3. Physical Cash or Digital Wallet to Bank (P or D to B)";

/// Numbered-menu session over any line source. Mutations stay in memory until
/// the user exits; end of input counts as exit.
pub struct Shell<'a, S: LedgerStore, R: BufRead, W: Write> {
    ledger: &'a mut Ledger,
    store: &'a S,
    input: R,
    output: W,
}

enum Flow {
    Continue,
    Exit,
}

impl<'a, S: LedgerStore, R: BufRead, W: Write> Shell<'a, S, R, W> {
    pub fn new(ledger: &'a mut Ledger, store: &'a S, input: R, output: W) -> Self {
        Self {
            ledger,
            store,
            input,
            output,
        }
    }

    pub fn run(mut self) -> Result<()> {
        loop {
            writeln!(self.output, "{MENU}")?;
            let Some(choice) = self.prompt("Enter choice: ")? else {
                return self.save_and_exit();
            };
            let flow = match choice.as_str() {
                "1" => self.print_balances()?,
                "2" => self.add_transaction()?,
                "3" => self.transfer()?,
                "4" => self.print_history()?,
                "5" => match self.store.save(self.ledger) {
                    Ok(()) => {
                        writeln!(self.output, "Data saved. Exiting...")?;
                        Flow::Exit
                    }
                    Err(err) => {
                        warn!("save failed: {err}");
                        writeln!(self.output, "Error writing data: {err}")?;
                        writeln!(
                            self.output,
                            "Your changes are still in memory; choose 5 to retry."
                        )?;
                        Flow::Continue
                    }
                },
                _ => {
                    writeln!(self.output, "Invalid choice, please try again.")?;
                    Flow::Continue
                }
            };
            if let Flow::Exit = flow {
                return Ok(());
            }
        }
    }

    fn save_and_exit(&mut self) -> Result<()> {
        debug!("input closed, saving before exit");
        self.store
            .save(self.ledger)
            .map_err(|e| eyre!("error writing data: {e}"))?;
        writeln!(self.output, "\nData saved. Exiting...")?;
        Ok(())
    }

    /// Prints `message` and reads one trimmed line; `None` on end of input.
    fn prompt(&mut self, message: &str) -> Result<Option<String>> {
        write!(self.output, "{message}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Like `prompt`, but parses the answer and reports parse errors.
    fn prompt_parsed<T>(&mut self, message: &str) -> Result<Option<T>>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        let Some(raw) = self.prompt(message)? else {
            return Ok(None);
        };
        match raw.parse() {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                writeln!(self.output, "Invalid input: {err}")?;
                Ok(None)
            }
        }
    }

    fn print_balances(&mut self) -> Result<Flow> {
        write!(self.output, "\n{}", render_balances(self.ledger))?;
        Ok(Flow::Continue)
    }

    fn print_history(&mut self) -> Result<Flow> {
        write!(self.output, "\n{}", render_history(self.ledger))?;
        Ok(Flow::Continue)
    }

    fn add_transaction(&mut self) -> Result<Flow> {
        let Some(direction) =
            self.prompt_parsed::<Direction>("Enter transaction type (spent/received): ")?
        else {
            return Ok(Flow::Continue);
        };
        let Some(amount) = self.prompt_parsed::<Amount>("Enter amount: ")? else {
            return Ok(Flow::Continue);
        };
        let Some(brief_info) = self.prompt("Enter brief info: ")? else {
            return Ok(Flow::Continue);
        };
        let Some(personal_note) = self.prompt("Enter personal note: ")? else {
            return Ok(Flow::Continue);
        };
        let Some(account) = self.prompt("Enter account type (P/B/D): ")? else {
            return Ok(Flow::Continue);
        };
        if account.is_empty() {
            writeln!(self.output, "Invalid input: account type is required")?;
            return Ok(Flow::Continue);
        }

        let balance = match self.ledger.add_transaction(
            direction,
            amount,
            brief_info,
            personal_note,
            &account,
        ) {
            Ok(balance) => balance,
            Err(err) => {
                writeln!(self.output, "Transaction failed: {err}")?;
                return Ok(Flow::Continue);
            }
        };
        writeln!(
            self.output,
            "Updated {account} balance: {}",
            format_money(balance)
        )?;
        writeln!(
            self.output,
            "Transaction added: {direction} {amount} to {account}"
        )?;
        Ok(Flow::Continue)
    }

    fn transfer(&mut self) -> Result<Flow> {
        writeln!(self.output, "{TRANSFER_MENU}")?;
        let Some(option) = self.prompt("Enter transfer option: ")? else {
            return Ok(Flow::Continue);
        };
        let (from, to, amount_prompt) = match option.as_str() {
            "1" => (BANK.to_string(), DIGITAL_WALLET, "Enter amount to transfer: "),
            "2" => (BANK.to_string(), PHYSICAL_CASH, "Enter amount to withdraw: "),
            "3" => {
                let Some(source) = self.prompt("Enter source account (P/D): ")? else {
                    return Ok(Flow::Continue);
                };
                (source, BANK, "Enter amount to transfer: ")
            }
            _ => {
                writeln!(self.output, "Invalid transfer option.")?;
                return Ok(Flow::Continue);
            }
        };
        let Some(amount) = self.prompt_parsed::<Amount>(amount_prompt)? else {
            return Ok(Flow::Continue);
        };

        match self.ledger.transfer_money(&from, to, amount) {
            Ok(()) => writeln!(self.output, "Transferred {amount} from {from} to {to}")?,
            Err(err) => writeln!(self.output, "Transfer failed: {err}")?,
        }
        Ok(Flow::Continue)
    }
}
