mod cli;
mod config;
mod shell;
mod storage;

use std::io;

use crate::cli::{Command, ConfigCommand};
use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use tally_core::{
    report::{format_money, render_balances, render_history},
    storage::{initialize_and_persist, LedgerStore},
    Amount, Direction, Ledger,
};
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Entry point wiring the CLI to the ledger and its encrypted store.
fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = cli::Cli::parse();
    let mut config = config::load()?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = Some(dir);
    }

    match cli.command.unwrap_or(Command::Shell) {
        Command::Shell => {
            let store = storage::store_from_config(&config)?;
            let mut ledger = open_ledger(&store, config.strict_load, Access::ReadWrite)?;
            let stdin = io::stdin();
            shell::Shell::new(&mut ledger, &store, stdin.lock(), io::stdout()).run()?
        }
        Command::Balance => {
            let store = storage::store_from_config(&config)?;
            let ledger = open_ledger(&store, config.strict_load, Access::ReadOnly)?;
            print!("{}", render_balances(&ledger));
        }
        Command::History => {
            let store = storage::store_from_config(&config)?;
            let ledger = open_ledger(&store, config.strict_load, Access::ReadOnly)?;
            print!("{}", render_history(&ledger));
        }
        Command::Add {
            direction,
            amount,
            account,
            info,
            note,
        } => {
            let store = storage::store_from_config(&config)?;
            let mut ledger = open_ledger(&store, config.strict_load, Access::ReadWrite)?;
            let balance = run_add(&mut ledger, &store, direction, amount, &account, info, note)?;
            println!("Transaction added: {direction} {amount} to {account}");
            println!("Updated {account} balance: {}", format_money(balance));
        }
        Command::Transfer { from, to, amount } => {
            let store = storage::store_from_config(&config)?;
            let mut ledger = open_ledger(&store, config.strict_load, Access::ReadWrite)?;
            run_transfer(&mut ledger, &store, &from, &to, amount)?;
            println!("Transferred {amount} from {from} to {to}");
        }
        Command::Check => run_check(&config)?,
        Command::Config(ConfigCommand::Init) => init_config(&config)?,
    }

    Ok(())
}

fn init_tracing() {
    // Respect user-provided filters; default to warn so the menu stays readable.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(io::stderr);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

/// Whether opening the ledger may write the seeded categories back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    ReadOnly,
    ReadWrite,
}

/// Loads the ledger and seeds the default categories.
///
/// With `ReadWrite` access the seeding is saved right away; a failure there is
/// logged, not fatal. Data that could not be read is never overwritten here.
fn open_ledger<S: LedgerStore>(store: &S, strict: bool, access: Access) -> Result<Ledger> {
    let (mut ledger, readable) = match store.load_strict() {
        Ok(ledger) => (ledger, true),
        Err(err) if strict => {
            return Err(eyre!("{err} (strict_load is enabled; refusing to start empty)"));
        }
        Err(err) => {
            warn!("error reading data, starting with an empty ledger: {err}");
            (Ledger::default(), false)
        }
    };
    if !readable || access == Access::ReadOnly {
        ledger.initialize();
    } else if let Err(err) = initialize_and_persist(&mut ledger, store) {
        warn!("could not save initialized balances: {err}");
    }
    Ok(ledger)
}

fn run_add<S: LedgerStore>(
    ledger: &mut Ledger,
    store: &S,
    direction: Direction,
    amount: Amount,
    account: &str,
    info: String,
    note: String,
) -> Result<rust_decimal::Decimal> {
    let balance = ledger.add_transaction(direction, amount, info, note, account)?;
    store
        .save(ledger)
        .map_err(|e| eyre!("error writing data: {e}"))?;
    Ok(balance)
}

fn run_transfer<S: LedgerStore>(
    ledger: &mut Ledger,
    store: &S,
    from: &str,
    to: &str,
    amount: Amount,
) -> Result<()> {
    ledger.transfer_money(from, to, amount)?;
    store
        .save(ledger)
        .map_err(|e| eyre!("error writing data: {e}"))
}

/// Reports on the key and data files without creating either.
fn run_check(config: &config::Config) -> Result<()> {
    let key_path = config.key_path();
    let data_path = config.data_path();
    if !key_path.exists() {
        println!("Key: missing ({})", key_path.display());
        if data_path.exists() {
            color_eyre::eyre::bail!(
                "data file {} exists but its key is missing; it cannot be decrypted",
                data_path.display()
            );
        }
        println!("Data: none yet ({})", data_path.display());
        return Ok(());
    }

    let store = storage::store_from_config(config)?;
    println!("Key: ok ({})", key_path.display());
    let ledger = store
        .load_strict()
        .map_err(|e| eyre!("data file {}: {e}", data_path.display()))?;
    println!(
        "Data: ok ({}) - {} accounts, {} spent, {} received",
        data_path.display(),
        ledger.categories().len(),
        ledger.spent().len(),
        ledger.received().len()
    );
    Ok(())
}

fn init_config(config: &config::Config) -> Result<()> {
    let path = config::write_default_if_missing(config)?;
    println!("Config initialized at {}", path.display());
    Ok(())
}
