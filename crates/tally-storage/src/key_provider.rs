use std::{
    fmt, fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use rand::{rngs::OsRng, RngCore};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, instrument};

/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;

/// Key material used for encryption at rest.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    pub bytes: [u8; KEY_LEN],
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial").finish_non_exhaustive()
    }
}

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("key file error: {0}")]
    Io(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("generation error: {0}")]
    Generation(String),
}

/// Provides the single symmetric key (a local file in production; memory in tests).
pub trait KeyProvider {
    /// Return the existing key, generating and persisting one on first use.
    fn load_or_create(&self) -> Result<KeyMaterial, KeyError>;
}

/// Key stored as raw bytes in a local file. Never rotated or overwritten.
#[derive(Debug, Clone)]
pub struct FileKeyProvider {
    path: PathBuf,
}

impl FileKeyProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyProvider for FileKeyProvider {
    #[instrument(skip_all, fields(path = %self.path.display()))]
    fn load_or_create(&self) -> Result<KeyMaterial, KeyError> {
        match fs::read(&self.path) {
            Ok(bytes) => {
                debug!("loaded existing key");
                decode_key(&bytes)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                let material = generate_key();
                if write_key_noclobber(&self.path, &material)? {
                    info!("generated new encryption key");
                    Ok(material)
                } else {
                    // Lost a race with another writer; theirs wins.
                    decode_key(&fs::read(&self.path).map_err(|e| KeyError::Io(e.to_string()))?)
                }
            }
            Err(err) => Err(KeyError::Io(err.to_string())),
        }
    }
}

/// In-memory key provider for tests and ephemeral sessions.
#[derive(Debug, Default, Clone)]
pub struct InMemoryKeyProvider {
    inner: Arc<Mutex<Option<KeyMaterial>>>,
}

impl KeyProvider for InMemoryKeyProvider {
    fn load_or_create(&self) -> Result<KeyMaterial, KeyError> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|err| KeyError::Generation(format!("lock poisoned: {err}")))?;

        if let Some(existing) = guard.clone() {
            return Ok(existing);
        }

        let material = generate_key();
        *guard = Some(material.clone());
        Ok(material)
    }
}

fn generate_key() -> KeyMaterial {
    let mut bytes = [0u8; KEY_LEN];
    OsRng.fill_bytes(&mut bytes);
    KeyMaterial { bytes }
}

fn decode_key(bytes: &[u8]) -> Result<KeyMaterial, KeyError> {
    let bytes: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
        KeyError::Decode(format!("expected {KEY_LEN} bytes, got {}", bytes.len()))
    })?;
    Ok(KeyMaterial { bytes })
}

/// Writes through a temp file (created 0600 on unix). Returns `false` if a key
/// file appeared at `path` in the meantime.
fn write_key_noclobber(path: &Path, material: &KeyMaterial) -> Result<bool, KeyError> {
    let parent = parent_dir(path);
    fs::create_dir_all(parent).map_err(|e| KeyError::Io(e.to_string()))?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| KeyError::Io(e.to_string()))?;
    tmp.write_all(&material.bytes)
        .map_err(|e| KeyError::Io(e.to_string()))?;
    tmp.flush().map_err(|e| KeyError::Io(e.to_string()))?;
    match tmp.persist_noclobber(path) {
        Ok(_) => Ok(true),
        Err(err) if err.error.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(err) => Err(KeyError::Io(err.error.to_string())),
    }
}

pub(crate) fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}
