use std::{
    fs,
    path::{Path, PathBuf},
};

use color_eyre::{eyre::WrapErr, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};

pub const DEFAULT_KEY_FILE: &str = "secret.key";
pub const DEFAULT_DATA_FILE: &str = "data.txt";

/// User-level configuration loaded from `~/.config/tally/config.toml` (platform-specific).
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Directory holding the key and data files. Defaults to the working directory.
    pub data_dir: Option<PathBuf>,
    /// Key file name, relative to `data_dir` unless absolute.
    pub key_file: Option<PathBuf>,
    /// Encrypted ledger file name, relative to `data_dir` unless absolute.
    pub data_file: Option<PathBuf>,
    /// Refuse to start when the data file exists but cannot be read, instead of
    /// starting from an empty ledger.
    #[serde(default)]
    pub strict_load: bool,
}

impl Config {
    pub fn key_path(&self) -> PathBuf {
        self.resolve(self.key_file.as_deref(), DEFAULT_KEY_FILE)
    }

    pub fn data_path(&self) -> PathBuf {
        self.resolve(self.data_file.as_deref(), DEFAULT_DATA_FILE)
    }

    fn resolve(&self, file: Option<&Path>, default: &str) -> PathBuf {
        let file = file.unwrap_or_else(|| Path::new(default));
        match &self.data_dir {
            Some(dir) => dir.join(file),
            None => file.to_path_buf(),
        }
    }
}

/// Reads `tally/config.toml` under the platform config dir. `--data-dir` is
/// applied by the caller on top of whatever this returns.
pub fn load() -> Result<Config> {
    load_from_path(default_path()?)
}

/// Reads a tally config file. A missing or blank file yields `Config::default()`,
/// which keeps `secret.key` and `data.txt` in the working directory with
/// lenient loading. Unknown keys are ignored; a malformed file is an error
/// naming the path.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents = fs::read_to_string(path)
        .wrap_err_with(|| format!("reading config {}", path.display()))?;
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    toml::from_str(&contents).wrap_err_with(|| format!("parsing config {}", path.display()))
}

/// `<config dir>/tally/config.toml`, e.g. `~/.config/tally/config.toml` on Linux.
pub fn default_path() -> Result<PathBuf> {
    let base = config_dir().ok_or_else(|| color_eyre::eyre::eyre!("no config dir available"))?;
    Ok(base.join("tally").join("config.toml"))
}

/// Write the given config to the default path unless a file is already there.
pub fn write_default_if_missing(config: &Config) -> Result<PathBuf> {
    write_if_missing(config, &default_path()?)
}

/// Never clobbers an existing file, to avoid losing user edits.
pub fn write_if_missing(config: &Config, path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return Ok(path.to_path_buf());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body = toml::to_string_pretty(config)?;
    fs::write(path, body)?;
    Ok(path.to_path_buf())
}
