use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::{info, warn};

use crate::ledger::Ledger;

/// Errors produced while writing a ledger snapshot.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Serialization, encryption, or I/O failure. Prior on-disk state is kept.
    #[error("storage failure: {reason}")]
    Storage { reason: String },
}

/// Errors produced while reading a ledger snapshot.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoadError {
    /// Data exists but cannot be decrypted or parsed (wrong key, tampering,
    /// truncation, malformed content).
    #[error("ledger data is unreadable: {reason}")]
    Unreadable { reason: String },
    /// The data could not be read at all.
    #[error("storage failure: {reason}")]
    Storage { reason: String },
}

/// Contract for encrypted-at-rest ledger persistence.
pub trait LedgerStore {
    /// Read the saved ledger. Absent or empty data is `Ok(Ledger::default())`;
    /// anything present but unreadable is an error.
    fn load_strict(&self) -> Result<Ledger, LoadError>;

    /// Persist a full snapshot, replacing the previous one.
    fn save(&self, ledger: &Ledger) -> Result<(), StoreError>;

    /// Read the saved ledger, falling back to an empty one on any failure.
    fn load(&self) -> Ledger {
        match self.load_strict() {
            Ok(ledger) => ledger,
            Err(err) => {
                warn!("error reading data, starting with an empty ledger: {err}");
                Ledger::default()
            }
        }
    }
}

/// Seeds the default categories and saves the ledger if anything was added.
pub fn initialize_and_persist<S: LedgerStore + ?Sized>(
    ledger: &mut Ledger,
    store: &S,
) -> Result<bool, StoreError> {
    if !ledger.initialize() {
        return Ok(false);
    }
    store.save(ledger)?;
    info!("initialized balances for B, D, and P");
    Ok(true)
}

/// In-memory store that simulates encryption for tests.
/// This is not cryptographically secure.
#[derive(Debug, Default, Clone)]
pub struct InMemoryLedgerStore {
    inner: Arc<Mutex<Option<Vec<u8>>>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the stored bytes with something that will not parse.
    pub fn corrupt(&self) {
        if let Ok(mut slot) = self.inner.lock() {
            *slot = Some(mask(b"\x00not-a-ledger"));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().map(|slot| slot.is_none()).unwrap_or(true)
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn load_strict(&self) -> Result<Ledger, LoadError> {
        let slot = self.inner.lock().map_err(|err| LoadError::Storage {
            reason: format!("lock poisoned: {err}"),
        })?;
        let Some(masked) = slot.as_ref().filter(|bytes| !bytes.is_empty()) else {
            return Ok(Ledger::default());
        };
        serde_json::from_slice(&unmask(masked)).map_err(|err| LoadError::Unreadable {
            reason: err.to_string(),
        })
    }

    fn save(&self, ledger: &Ledger) -> Result<(), StoreError> {
        let json = serde_json::to_vec(ledger).map_err(|err| StoreError::Storage {
            reason: err.to_string(),
        })?;
        let mut slot = self.inner.lock().map_err(|err| StoreError::Storage {
            reason: format!("lock poisoned: {err}"),
        })?;
        *slot = Some(mask(&json));
        Ok(())
    }
}

const MASK_BYTE: u8 = 0xA5;

fn mask(input: &[u8]) -> Vec<u8> {
    input.iter().map(|b| b ^ MASK_BYTE).collect()
}

fn unmask(input: &[u8]) -> Vec<u8> {
    mask(input) // XOR is its own inverse.
}
