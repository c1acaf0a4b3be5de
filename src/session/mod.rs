use std::cell::Cell;

use chrono::{Days, Local, NaiveDate};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::account::{Account, Amount};
use crate::credential::CredentialDigest;
use crate::error::{Error, Result};
use crate::ledger::Ledger;
use crate::policy::{parse_amount, Decision, LimitPolicy};
use crate::store::AccountStore;

/// Source of the calendar date the limit rules run against.
pub trait Clock {
    fn today(&self) -> NaiveDate;
}

/// Local wall-clock date.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A date that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    today: Cell<NaiveDate>,
}

impl ManualClock {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today: Cell::new(today),
        }
    }

    pub fn set(&self, today: NaiveDate) {
        self.today.set(today);
    }

    pub fn advance_days(&self, days: u64) {
        let next = self
            .today
            .get()
            .checked_add_days(Days::new(days))
            .unwrap_or(NaiveDate::MAX);
        self.today.set(next);
    }
}

impl Clock for ManualClock {
    fn today(&self) -> NaiveDate {
        self.today.get()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    LoggedOut,
    Authenticated(CredentialDigest),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoginOutcome {
    pub digest: CredentialDigest,
    pub is_new: bool,
}

/// Single-session front door to the ledger.
///
/// Every mutating call either commits to the store and returns `Ok`, or
/// returns an error with the ledger unchanged.
pub struct SessionController<S: AccountStore, C: Clock = SystemClock> {
    ledger: Ledger<S>,
    policy: LimitPolicy,
    clock: C,
    state: SessionState,
}

impl<S: AccountStore, C: Clock> SessionController<S, C> {
    pub fn new(ledger: Ledger<S>, policy: LimitPolicy, clock: C) -> Self {
        Self {
            ledger,
            policy,
            clock,
            state: SessionState::LoggedOut,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, SessionState::Authenticated(_))
    }

    pub fn current_digest(&self) -> Option<&CredentialDigest> {
        match &self.state {
            SessionState::Authenticated(digest) => Some(digest),
            SessionState::LoggedOut => None,
        }
    }

    pub fn policy(&self) -> &LimitPolicy {
        &self.policy
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn ledger(&self) -> &Ledger<S> {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut Ledger<S> {
        &mut self.ledger
    }

    /// Resolves (or creates) the account for `pin`, rolls its counters over
    /// to today and persists that before the session becomes authenticated.
    /// The rollover runs on every login, including a same-day one.
    pub fn login(&mut self, pin: &str) -> Result<LoginOutcome> {
        let (digest, mut account, is_new) = self.ledger.resolve(pin)?;
        self.policy.roll_over(&mut account, self.clock.today());
        self.ledger.commit(&digest, account)?;
        info!(digest = %digest.short(), is_new, "session opened");
        self.state = SessionState::Authenticated(digest.clone());
        Ok(LoginOutcome { digest, is_new })
    }

    /// Credits a positive amount and returns the new balance.
    pub fn deposit(&mut self, raw_amount: &str) -> Result<Amount> {
        let (digest, mut account) = self.active_account()?;
        let amount = parse_amount(raw_amount)
            .filter(|a| *a > Decimal::ZERO)
            .ok_or(Error::InvalidAmount)?;
        account.credit(amount)?;
        let balance = account.balance;
        self.ledger.commit(&digest, account)?;
        info!(digest = %digest.short(), %amount, %balance, "deposit");
        Ok(balance)
    }

    /// Runs the limit rules (rollover included) and, on approval, debits and returns the new
    /// balance. A rejection leaves the account exactly as it was.
    pub fn withdraw(&mut self, raw_amount: &str) -> Result<Amount> {
        let (digest, mut account) = self.active_account()?;
        let amount = parse_amount(raw_amount).ok_or(Error::InvalidAmount)?;

        match self.policy.evaluate(&mut account, amount, self.clock.today()) {
            Decision::Approved => {
                account.record_withdrawal(amount)?;
                let balance = account.balance;
                self.ledger.commit(&digest, account)?;
                info!(digest = %digest.short(), %amount, %balance, "withdrawal");
                Ok(balance)
            }
            Decision::Rejected(rejection) => {
                warn!(digest = %digest.short(), %amount, ?rejection, "withdrawal rejected");
                Err(rejection.into())
            }
        }
    }

    pub fn check_balance(&self) -> Result<Amount> {
        let (_, account) = self.active_account()?;
        Ok(account.balance)
    }

    pub fn logout(&mut self) {
        if let SessionState::Authenticated(digest) = &self.state {
            info!(digest = %digest.short(), "session closed");
        }
        self.state = SessionState::LoggedOut;
    }

    /// Working copy of the signed-in account.
    fn active_account(&self) -> Result<(CredentialDigest, Account)> {
        let digest = self.current_digest().ok_or(Error::NotAuthenticated)?;
        let account = self.ledger.get(digest).ok_or(Error::NotAuthenticated)?;
        Ok((digest.clone(), account.clone()))
    }
}
