use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use tracing::debug;

use crate::account::{Account, Amount};
use crate::error::Error;

pub const DEFAULT_DAILY_LIMIT: i64 = 25_000;
pub const DEFAULT_MONTHLY_LIMIT: i64 = 50_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limits {
    /// Ceiling on a single withdrawal. It is not a cumulative daily total.
    pub daily: Amount,
    /// Ceiling on the sum of withdrawals within one calendar month.
    pub monthly: Amount,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            daily: Decimal::from(DEFAULT_DAILY_LIMIT),
            monthly: Decimal::from(DEFAULT_MONTHLY_LIMIT),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    Approved,
    Rejected(Rejection),
}

impl Decision {
    pub fn is_approved(&self) -> bool {
        matches!(self, Decision::Approved)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rejection {
    InvalidAmount,
    InsufficientBalance { requested: Amount, available: Amount },
    ExceedsDailyLimit { limit: Amount },
    ExceedsMonthlyLimit { limit: Amount, already_withdrawn: Amount },
}

impl From<Rejection> for Error {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::InvalidAmount => Error::InvalidAmount,
            Rejection::InsufficientBalance {
                requested,
                available,
            } => Error::InsufficientBalance {
                requested,
                available,
            },
            Rejection::ExceedsDailyLimit { limit } => Error::ExceedsDailyLimit { limit },
            Rejection::ExceedsMonthlyLimit {
                limit,
                already_withdrawn,
            } => Error::ExceedsMonthlyLimit {
                limit,
                already_withdrawn,
            },
        }
    }
}

/// Withdrawal rules. Holds only the configured limits; the date is always
/// supplied by the caller.
#[derive(Clone, Copy, Debug, Default)]
pub struct LimitPolicy {
    limits: Limits,
}

impl LimitPolicy {
    pub fn new(limits: Limits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Zeroes the counters whose calendar period has elapsed and stamps
    /// `today` as the last reset. Running it twice on the same date is a no-op.
    pub fn roll_over(&self, account: &mut Account, today: NaiveDate) {
        if let Some(last) = account.last_reset {
            if (last.year(), last.month()) != (today.year(), today.month()) {
                debug!(%last, %today, "monthly withdrawal counter rolled over");
                account.monthly_withdrawn = Decimal::ZERO;
            }
        }
        if account.last_reset != Some(today) {
            account.daily_withdrawn = Decimal::ZERO;
        }
        account.last_reset = Some(today);
    }

    /// Rolls the counters over, then checks `amount` against the rules in
    /// order: positive, covered by the balance, under the per-transaction
    /// cap, under the monthly cap. The first failing rule decides.
    ///
    /// Approval does not debit; callers apply [`Account::record_withdrawal`].
    pub fn evaluate(&self, account: &mut Account, amount: Amount, today: NaiveDate) -> Decision {
        self.roll_over(account, today);

        if amount <= Decimal::ZERO {
            return Decision::Rejected(Rejection::InvalidAmount);
        }
        if amount > account.balance {
            return Decision::Rejected(Rejection::InsufficientBalance {
                requested: amount,
                available: account.balance,
            });
        }
        if amount > self.limits.daily {
            return Decision::Rejected(Rejection::ExceedsDailyLimit {
                limit: self.limits.daily,
            });
        }
        let after = account.monthly_withdrawn.checked_add(amount);
        if after.map_or(true, |total| total > self.limits.monthly) {
            return Decision::Rejected(Rejection::ExceedsMonthlyLimit {
                limit: self.limits.monthly,
                already_withdrawn: account.monthly_withdrawn,
            });
        }
        Decision::Approved
    }
}

/// Parses a raw amount as typed by the user. Sign is not checked here.
pub fn parse_amount(raw: &str) -> Option<Amount> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn funded(balance: Amount, today: NaiveDate) -> Account {
        Account {
            balance,
            last_reset: Some(today),
            ..Account::default()
        }
    }

    #[test]
    fn first_use_always_resets_and_stamps_date() {
        let policy = LimitPolicy::default();
        let mut account = Account {
            daily_withdrawn: dec!(10),
            monthly_withdrawn: dec!(20),
            ..Account::default()
        };
        policy.roll_over(&mut account, date(2024, 5, 1));
        assert_eq!(account.daily_withdrawn, dec!(0));
        // no previous month to compare against
        assert_eq!(account.monthly_withdrawn, dec!(20));
        assert_eq!(account.last_reset, Some(date(2024, 5, 1)));
    }

    #[test]
    fn day_boundary_resets_daily_only() {
        let policy = LimitPolicy::default();
        let mut account = Account {
            daily_withdrawn: dec!(100),
            monthly_withdrawn: dec!(300),
            last_reset: Some(date(2024, 5, 1)),
            ..Account::default()
        };
        policy.roll_over(&mut account, date(2024, 5, 2));
        assert_eq!(account.daily_withdrawn, dec!(0));
        assert_eq!(account.monthly_withdrawn, dec!(300));
        assert_eq!(account.last_reset, Some(date(2024, 5, 2)));
    }

    #[test]
    fn month_boundary_resets_both() {
        let policy = LimitPolicy::default();
        let mut account = Account {
            daily_withdrawn: dec!(100),
            monthly_withdrawn: dec!(300),
            last_reset: Some(date(2024, 5, 31)),
            ..Account::default()
        };
        policy.roll_over(&mut account, date(2024, 6, 1));
        assert_eq!(account.daily_withdrawn, dec!(0));
        assert_eq!(account.monthly_withdrawn, dec!(0));
    }

    #[test]
    fn same_month_of_another_year_still_resets_monthly() {
        let policy = LimitPolicy::default();
        let mut account = Account {
            monthly_withdrawn: dec!(300),
            last_reset: Some(date(2023, 5, 20)),
            ..Account::default()
        };
        policy.roll_over(&mut account, date(2024, 5, 20));
        assert_eq!(account.monthly_withdrawn, dec!(0));
    }

    #[test]
    fn roll_over_is_idempotent_on_the_same_date() {
        let policy = LimitPolicy::default();
        let today = date(2024, 5, 2);
        let mut account = Account {
            daily_withdrawn: dec!(100),
            monthly_withdrawn: dec!(300),
            last_reset: Some(today),
            ..Account::default()
        };
        policy.roll_over(&mut account, today);
        policy.roll_over(&mut account, today);
        assert_eq!(account.daily_withdrawn, dec!(100));
        assert_eq!(account.monthly_withdrawn, dec!(300));
    }

    #[test]
    fn non_positive_amounts_are_invalid() {
        let policy = LimitPolicy::default();
        let today = date(2024, 5, 2);
        let mut account = funded(dec!(100), today);
        for amount in [dec!(0), dec!(-5)] {
            assert_eq!(
                policy.evaluate(&mut account, amount, today),
                Decision::Rejected(Rejection::InvalidAmount)
            );
        }
        assert_eq!(account.balance, dec!(100));
    }

    #[test]
    fn balance_is_checked_before_limits() {
        let policy = LimitPolicy::default();
        let today = date(2024, 5, 2);
        let mut account = funded(dec!(100), today);
        assert_eq!(
            policy.evaluate(&mut account, dec!(30000), today),
            Decision::Rejected(Rejection::InsufficientBalance {
                requested: dec!(30000),
                available: dec!(100),
            })
        );
    }

    #[test]
    fn daily_cap_is_per_transaction() {
        let policy = LimitPolicy::default();
        let today = date(2024, 5, 2);
        let mut account = funded(dec!(100000), today);
        assert_eq!(
            policy.evaluate(&mut account, dec!(25000.01), today),
            Decision::Rejected(Rejection::ExceedsDailyLimit { limit: dec!(25000) })
        );
        assert!(policy.evaluate(&mut account, dec!(25000), today).is_approved());

        // a second full-cap withdrawal the same day is still allowed
        account.record_withdrawal(dec!(25000)).unwrap();
        assert!(policy.evaluate(&mut account, dec!(25000), today).is_approved());
    }

    #[test]
    fn daily_cap_is_checked_before_monthly_cap() {
        let policy = LimitPolicy::default();
        let today = date(2024, 5, 2);
        let mut account = funded(dec!(100000), today);
        account.monthly_withdrawn = dec!(49000);
        assert!(matches!(
            policy.evaluate(&mut account, dec!(26000), today),
            Decision::Rejected(Rejection::ExceedsDailyLimit { .. })
        ));
    }

    #[test]
    fn monthly_cap_is_cumulative() {
        let policy = LimitPolicy::default();
        let today = date(2024, 5, 2);
        let mut account = funded(dec!(100000), today);
        account.monthly_withdrawn = dec!(30000);
        assert_eq!(
            policy.evaluate(&mut account, dec!(21000), today),
            Decision::Rejected(Rejection::ExceedsMonthlyLimit {
                limit: dec!(50000),
                already_withdrawn: dec!(30000),
            })
        );
        assert!(policy.evaluate(&mut account, dec!(20000), today).is_approved());
    }

    #[test]
    fn custom_limits_are_honoured() {
        let policy = LimitPolicy::new(Limits {
            daily: dec!(100),
            monthly: dec!(150),
        });
        let today = date(2024, 5, 2);
        let mut account = funded(dec!(1000), today);
        assert!(matches!(
            policy.evaluate(&mut account, dec!(101), today),
            Decision::Rejected(Rejection::ExceedsDailyLimit { .. })
        ));
        account.record_withdrawal(dec!(100)).unwrap();
        assert!(matches!(
            policy.evaluate(&mut account, dec!(51), today),
            Decision::Rejected(Rejection::ExceedsMonthlyLimit { .. })
        ));
    }

    #[test]
    fn monthly_total_past_decimal_max_is_rejected() {
        let policy = LimitPolicy::new(Limits {
            daily: Decimal::MAX,
            monthly: Decimal::MAX,
        });
        let today = date(2024, 5, 2);
        let mut account = funded(Decimal::MAX, today);
        account.monthly_withdrawn = Decimal::MAX;
        assert!(matches!(
            policy.evaluate(&mut account, dec!(1), today),
            Decision::Rejected(Rejection::ExceedsMonthlyLimit { .. })
        ));
    }

    #[test]
    fn limits_reflect_configuration() {
        let limits = Limits {
            daily: dec!(10),
            monthly: dec!(20),
        };
        assert_eq!(LimitPolicy::new(limits).limits(), &limits);
        assert_eq!(LimitPolicy::default().limits().daily, dec!(25000));
    }

    #[test]
    fn parses_user_amounts() {
        assert_eq!(parse_amount("250"), Some(dec!(250)));
        assert_eq!(parse_amount(" 12.75\n"), Some(dec!(12.75)));
        assert_eq!(parse_amount("-3"), Some(dec!(-3)));
        assert_eq!(parse_amount("1e3"), Some(dec!(1000)));
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("ten"), None);
        assert_eq!(parse_amount("12,5"), None);
    }
}
