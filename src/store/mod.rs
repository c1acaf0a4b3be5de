use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::account::Account;
use crate::credential::CredentialDigest;

pub type AccountMap = BTreeMap<CredentialDigest, Account>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed account data: {0}")]
    Json(#[from] serde_json::Error),
}

/// Backing storage for the whole ledger. Writes replace the full snapshot.
pub trait AccountStore {
    /// Reads every stored account. A store that was never written is empty, not an error.
    fn load_all(&self) -> Result<AccountMap, StoreError>;

    fn save_all(&mut self, accounts: &AccountMap) -> Result<(), StoreError>;
}

/// JSON object keyed by digest, one record per account.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl AccountStore for JsonFileStore {
    fn load_all(&self) -> Result<AccountMap, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no account file yet, starting empty");
                return Ok(AccountMap::new());
            }
            Err(err) => return Err(err.into()),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(AccountMap::new());
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn save_all(&mut self, accounts: &AccountMap) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.temp_path();
        let written = write_snapshot(&tmp, accounts).and_then(|()| {
            fs::rename(&tmp, &self.path)?;
            Ok(())
        });
        if written.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        written
    }
}

fn write_snapshot(path: &Path, accounts: &AccountMap) -> Result<(), StoreError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, accounts)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}

/// In-process store. `fail_writes` makes every subsequent save fail.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    accounts: AccountMap,
    fail_writes: bool,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_accounts(accounts: AccountMap) -> Self {
        Self {
            accounts,
            ..Self::default()
        }
    }

    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// The last successfully saved snapshot.
    pub fn accounts(&self) -> &AccountMap {
        &self.accounts
    }

    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl AccountStore for MemoryStore {
    fn load_all(&self) -> Result<AccountMap, StoreError> {
        Ok(self.accounts.clone())
    }

    fn save_all(&mut self, accounts: &AccountMap) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Io(io::Error::new(
                io::ErrorKind::Other,
                "writes disabled",
            )));
        }
        self.accounts = accounts.clone();
        self.saves += 1;
        Ok(())
    }
}
