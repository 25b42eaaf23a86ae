use crate::config::Config;
use color_eyre::Result;
#[cfg(test)]
use std::path::Path;
#[cfg(test)]
use tally_storage::key_provider::InMemoryKeyProvider;
use tally_storage::{
    key_provider::{FileKeyProvider, KeyProvider},
    ledger_file::EncryptedLedgerFile,
};
use tracing::debug;

/// Key provider for the configured key file.
pub fn key_provider(config: &Config) -> FileKeyProvider {
    FileKeyProvider::new(config.key_path())
}

/// Build the encrypted ledger file from config. The key is loaded (or generated)
/// up front so a broken key file fails at startup rather than on save.
pub fn store_from_config(config: &Config) -> Result<EncryptedLedgerFile<FileKeyProvider>> {
    let provider = key_provider(config);
    provider
        .load_or_create()
        .map_err(|e| color_eyre::eyre::eyre!("cannot load encryption key: {e}"))?;
    let path = config.data_path();
    debug!(?path, "opening encrypted ledger");
    Ok(EncryptedLedgerFile::new(path, provider))
}

/// Helper for tests to construct a store rooted at a temp dir with an in-memory key.
#[cfg(test)]
pub fn test_store(root: &Path) -> EncryptedLedgerFile<InMemoryKeyProvider> {
    EncryptedLedgerFile::new(root.join("data.txt"), InMemoryKeyProvider::default())
}
