use std::{
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use tally_core::{
    storage::{LedgerStore, LoadError, StoreError},
    Ledger,
};
use tempfile::NamedTempFile;
use tracing::{debug, instrument};

use crate::key_provider::{parent_dir, KeyMaterial, KeyProvider};

const NONCE_LEN: usize = 12;

/// AES-GCM encrypted ledger file implementing the shared `LedgerStore` contract.
/// The key comes from a `KeyProvider` on every operation.
pub struct EncryptedLedgerFile<P: KeyProvider> {
    path: PathBuf,
    key_provider: P,
}

impl<P: KeyProvider> EncryptedLedgerFile<P> {
    pub fn new(path: impl Into<PathBuf>, key_provider: P) -> Self {
        Self {
            path: path.into(),
            key_provider,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn cipher(&self) -> Result<Aes256Gcm, String> {
        let material = self
            .key_provider
            .load_or_create()
            .map_err(|e| format!("key provider: {e}"))?;
        build_cipher(&material)
    }
}

/// On-disk envelope. Both fields are base64url without padding.
#[derive(Debug, Serialize, Deserialize)]
struct StoredBlob {
    nonce: String,
    ciphertext: String,
}

impl<P: KeyProvider> LedgerStore for EncryptedLedgerFile<P> {
    #[instrument(skip_all, fields(path = %self.path.display()))]
    fn load_strict(&self) -> Result<Ledger, LoadError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("no data file yet");
                return Ok(Ledger::default());
            }
            Err(err) => {
                return Err(LoadError::Storage {
                    reason: err.to_string(),
                })
            }
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            debug!("data file is empty");
            return Ok(Ledger::default());
        }

        let blob: StoredBlob = serde_json::from_slice(&bytes).map_err(unreadable)?;
        let nonce_bytes = URL_SAFE_NO_PAD
            .decode(blob.nonce)
            .map_err(|e| unreadable(format!("nonce decode failed: {e}")))?;
        if nonce_bytes.len() != NONCE_LEN {
            return Err(unreadable(format!(
                "expected {NONCE_LEN}-byte nonce, got {}",
                nonce_bytes.len()
            )));
        }
        let ciphertext = URL_SAFE_NO_PAD
            .decode(blob.ciphertext)
            .map_err(|e| unreadable(format!("ciphertext decode failed: {e}")))?;

        let cipher = self
            .cipher()
            .map_err(|reason| LoadError::Storage { reason })?;
        let plaintext = cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
            .map_err(|e| unreadable(format!("decrypt failed: {e}")))?;

        serde_json::from_slice(&plaintext).map_err(unreadable)
    }

    #[instrument(skip_all, fields(path = %self.path.display()))]
    fn save(&self, ledger: &Ledger) -> Result<(), StoreError> {
        let json = serde_json::to_vec(ledger).map_err(storage_err)?;
        let cipher = self.cipher().map_err(storage_err)?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, json.as_ref())
            .map_err(|e| storage_err(format!("encrypt failed: {e}")))?;

        let blob = StoredBlob {
            nonce: URL_SAFE_NO_PAD.encode(nonce.as_slice()),
            ciphertext: URL_SAFE_NO_PAD.encode(ciphertext),
        };
        write_blob(&self.path, &blob)?;
        debug!("ledger saved");
        Ok(())
    }
}

/// Temp file in the same directory, then rename, so a failed write never
/// replaces the previous snapshot.
fn write_blob(path: &Path, blob: &StoredBlob) -> Result<(), StoreError> {
    let parent = parent_dir(path);
    fs::create_dir_all(parent).map_err(storage_err)?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(storage_err)?;
    let json = serde_json::to_vec(blob).map_err(storage_err)?;
    tmp.write_all(&json).map_err(storage_err)?;
    tmp.flush().map_err(storage_err)?;
    tmp.persist(path).map_err(|e| storage_err(e.error))?;
    Ok(())
}

fn build_cipher(material: &KeyMaterial) -> Result<Aes256Gcm, String> {
    Aes256Gcm::new_from_slice(&material.bytes).map_err(|e| format!("cipher init failed: {e}"))
}

fn storage_err<E: ToString>(err: E) -> StoreError {
    StoreError::Storage {
        reason: err.to_string(),
    }
}

fn unreadable<E: ToString>(err: E) -> LoadError {
    LoadError::Unreadable {
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use tally_core::{Amount, Direction};

    use super::*;
    use crate::key_provider::{FileKeyProvider, InMemoryKeyProvider, KeyError};

    fn sample_ledger() -> Ledger {
        let mut ledger = Ledger::new();
        ledger.initialize();
        let amount = |v| Amount::new(v).expect("positive");
        ledger
            .add_transaction(Direction::Received, amount(dec!(120)), "salary", "", "B")
            .expect("in range");
        ledger
            .add_transaction(Direction::Spent, amount(dec!(15.25)), "taxi", "late", "B")
            .expect("in range");
        ledger
            .add_transaction(Direction::Spent, amount(dec!(3)), "snack", "", "S")
            .expect("in range");
        ledger
            .transfer_money("B", "D", amount(dec!(20)))
            .expect("transfer");
        ledger
    }

    struct FailingKeyProvider;

    impl KeyProvider for FailingKeyProvider {
        fn load_or_create(&self) -> Result<KeyMaterial, KeyError> {
            Err(KeyError::Io("unavailable".into()))
        }
    }

    #[test]
    fn round_trip_encrypts_and_decrypts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = EncryptedLedgerFile::new(
            dir.path().join("data.txt"),
            InMemoryKeyProvider::default(),
        );
        let ledger = sample_ledger();

        store.save(&ledger).expect("save");
        let loaded = store.load_strict().expect("load");
        assert_eq!(loaded, ledger);
        assert_eq!(loaded.spent().len(), 3);
        assert_eq!(loaded.spent()[2].brief_info, "Transfer from B to D");

        // ensure plaintext is not present on disk
        let stored = fs::read_to_string(store.path()).expect("read ciphertext");
        assert!(!stored.contains("salary"), "plaintext must not be stored");
    }

    #[test]
    fn round_trip_survives_restart_with_key_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let key_path = dir.path().join("secret.key");
        let data_path = dir.path().join("data.txt");
        let ledger = sample_ledger();

        EncryptedLedgerFile::new(&data_path, FileKeyProvider::new(&key_path))
            .save(&ledger)
            .expect("save");
        let reopened = EncryptedLedgerFile::new(&data_path, FileKeyProvider::new(&key_path));
        assert_eq!(reopened.load_strict().expect("load"), ledger);
    }

    #[test]
    fn missing_or_empty_file_is_pre_initialization_ledger() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data.txt");
        let store = EncryptedLedgerFile::new(&path, InMemoryKeyProvider::default());

        let missing = store.load_strict().expect("missing is fine");
        assert!(missing.balances.is_none() && missing.transactions.is_none());

        fs::write(&path, b"").expect("empty file");
        let empty = store.load_strict().expect("empty is fine");
        assert!(empty.balances.is_none() && empty.transactions.is_none());
    }

    #[test]
    fn wrong_key_is_unreadable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data.txt");
        EncryptedLedgerFile::new(&path, InMemoryKeyProvider::default())
            .save(&sample_ledger())
            .expect("save");

        let other = EncryptedLedgerFile::new(&path, InMemoryKeyProvider::default());
        assert!(matches!(
            other.load_strict(),
            Err(LoadError::Unreadable { .. })
        ));
        assert_eq!(other.load(), Ledger::default());
    }

    #[test]
    fn tampered_ciphertext_is_detected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = EncryptedLedgerFile::new(
            dir.path().join("data.txt"),
            InMemoryKeyProvider::default(),
        );
        store.save(&sample_ledger()).expect("save");

        let raw = fs::read(store.path()).expect("read");
        let mut blob: StoredBlob = serde_json::from_slice(&raw).expect("envelope");
        let mut ciphertext = URL_SAFE_NO_PAD.decode(&blob.ciphertext).expect("b64");
        ciphertext[0] ^= 0x01;
        blob.ciphertext = URL_SAFE_NO_PAD.encode(ciphertext);
        fs::write(store.path(), serde_json::to_vec(&blob).expect("json")).expect("write");

        let err = store.load_strict().expect_err("tampering must fail");
        assert!(err.to_string().contains("decrypt failed"));
    }

    #[test]
    fn garbage_and_truncated_files_are_unreadable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = EncryptedLedgerFile::new(
            dir.path().join("data.txt"),
            InMemoryKeyProvider::default(),
        );

        fs::write(store.path(), b"definitely not json").expect("write");
        assert!(matches!(
            store.load_strict(),
            Err(LoadError::Unreadable { .. })
        ));

        store.save(&sample_ledger()).expect("save");
        let raw = fs::read(store.path()).expect("read");
        fs::write(store.path(), &raw[..raw.len() / 2]).expect("truncate");
        assert!(matches!(
            store.load_strict(),
            Err(LoadError::Unreadable { .. })
        ));
    }

    #[test]
    fn failed_save_keeps_previous_snapshot() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data.txt");
        let good = EncryptedLedgerFile::new(&path, InMemoryKeyProvider::default());
        good.save(&sample_ledger()).expect("save");
        let before = fs::read(&path).expect("read");

        let failing = EncryptedLedgerFile::new(&path, FailingKeyProvider);
        let err = failing.save(&Ledger::new()).expect_err("save should fail");
        assert!(matches!(err, StoreError::Storage { .. }));
        assert_eq!(fs::read(&path).expect("read again"), before);
        assert_eq!(good.load_strict().expect("still readable"), sample_ledger());
    }

    #[test]
    fn save_into_missing_directory_creates_it() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("ledger").join("data.txt");
        let store = EncryptedLedgerFile::new(&path, InMemoryKeyProvider::default());

        store.save(&Ledger::new()).expect("save");
        assert!(path.exists());
        assert_eq!(store.load_strict().expect("load"), Ledger::new());
    }
}
