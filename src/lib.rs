//! PIN-keyed account ledger with time-windowed withdrawal limits.
//!
//! The crate is the state machine behind a single-user kiosk:
//!
//! * [`credential`] — PIN format check and the SHA-256 digest accounts are keyed by.
//! * [`account`] — the per-owner record and its on-disk JSON shape.
//! * [`policy`] — daily/monthly rollover and the ordered withdrawal rules.
//! * [`store`] — the load/save capability the ledger persists through.
//! * [`ledger`] — account lookup, creation on first use, and commit-then-swap persistence.
//! * [`session`] — login/deposit/withdraw/balance/logout over one active session.
//!
//! Nothing here prints or reads the terminal; the `pin-ledger` binary is one
//! possible front end.

pub mod account;
pub mod credential;
pub mod ledger;
pub mod policy;
pub mod session;
pub mod store;

mod error;

pub use account::{Account, Amount};
pub use credential::CredentialDigest;
pub use error::{Error, Result};
pub use ledger::Ledger;
pub use policy::{Decision, LimitPolicy, Limits, Rejection};
pub use session::{Clock, LoginOutcome, ManualClock, SessionController, SessionState, SystemClock};
pub use store::{AccountStore, JsonFileStore, MemoryStore, StoreError};
