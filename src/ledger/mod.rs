use tracing::{error, info, warn};

use crate::account::Account;
use crate::credential::{validate_pin, CredentialDigest};
use crate::error::Result;
use crate::store::{AccountMap, AccountStore};

/// In-memory account map mirrored to an injected [`AccountStore`].
///
/// The map only ever reflects what the store has accepted: every mutation
/// goes through [`Ledger::commit`], which writes the new snapshot first and
/// swaps it in afterwards.
pub struct Ledger<S: AccountStore> {
    accounts: AccountMap,
    store: S,
}

impl<S: AccountStore> Ledger<S> {
    pub fn load(store: S) -> Result<Self> {
        let accounts = store.load_all()?;
        info!(accounts = accounts.len(), "ledger loaded");
        Ok(Self { accounts, store })
    }

    /// Looks up the account for `pin`, creating and persisting a zeroed one
    /// on first use. The flag is `true` when the account was just created.
    pub fn resolve(&mut self, pin: &str) -> Result<(CredentialDigest, Account, bool)> {
        if let Err(err) = validate_pin(pin) {
            warn!("rejected malformed credential");
            return Err(err);
        }
        let digest = CredentialDigest::derive(pin);
        if let Some(account) = self.accounts.get(&digest) {
            return Ok((digest, account.clone(), false));
        }
        let account = Account::new();
        self.commit(&digest, account.clone())?;
        info!(digest = %digest.short(), "account created");
        Ok((digest, account, true))
    }

    pub fn get(&self, digest: &CredentialDigest) -> Option<&Account> {
        self.accounts.get(digest)
    }

    pub fn contains(&self, digest: &CredentialDigest) -> bool {
        self.accounts.contains_key(digest)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Persists `account` under `digest` together with the rest of the
    /// ledger. On failure nothing in memory changes and the error is returned.
    pub fn commit(&mut self, digest: &CredentialDigest, account: Account) -> Result<()> {
        let mut next = self.accounts.clone();
        next.insert(digest.clone(), account);
        if let Err(err) = self.store.save_all(&next) {
            error!(digest = %digest.short(), %err, "failed to persist ledger");
            return Err(err.into());
        }
        self.accounts = next;
        Ok(())
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }
}
