use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

pub const PIN_LEN: usize = 4;

/// Lowercase hex SHA-256 of a PIN; the only key an [`Account`](crate::account::Account) is stored under.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct CredentialDigest(String);

impl CredentialDigest {
    /// Derives the digest of `pin`. Format is not checked here; see [`validate_pin`].
    pub fn derive(pin: &str) -> Self {
        let hash: [u8; 32] = Sha256::digest(pin.as_bytes()).into();
        Self(hex::encode(hash))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight hex characters, for log lines.
    pub fn short(&self) -> &str {
        &self.0[..8.min(self.0.len())]
    }
}

impl fmt::Display for CredentialDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CredentialDigest {
    fn from(value: String) -> Self {
        Self(value)
    }
}

pub fn validate_pin(pin: &str) -> Result<()> {
    if pin.len() == PIN_LEN && pin.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(Error::InvalidCredentialFormat)
    }
}
