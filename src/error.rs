use thiserror::Error;

use crate::account::Amount;
use crate::store::StoreError;

/// Canonical error type returned by every ledger and session operation.
///
/// Every variant is recoverable at the front end. `Persistence` is the only
/// one that means a requested mutation was abandoned because it could not be
/// written; the in-memory state is left exactly as it was before the call.
#[derive(Debug, Error)]
pub enum Error {
    #[error("credential must be exactly 4 ASCII digits")]
    InvalidCredentialFormat,

    #[error("no active session")]
    NotAuthenticated,

    #[error("amount must be a positive number")]
    InvalidAmount,

    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: Amount, available: Amount },

    #[error("withdrawal exceeds the per-transaction daily limit of {limit}")]
    ExceedsDailyLimit { limit: Amount },

    #[error("withdrawal exceeds the monthly limit of {limit} ({already_withdrawn} already withdrawn)")]
    ExceedsMonthlyLimit {
        limit: Amount,
        already_withdrawn: Amount,
    },

    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, Error>;
