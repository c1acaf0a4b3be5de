use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub type Amount = Decimal;

/// Per-owner record. Field names follow the on-disk JSON layout; amounts are
/// written as JSON numbers carrying every digit of the decimal.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Account {
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub balance: Amount,
    #[serde(rename = "daily_withdrawal", with = "rust_decimal::serde::arbitrary_precision")]
    pub daily_withdrawn: Amount,
    #[serde(rename = "monthly_withdrawal", with = "rust_decimal::serde::arbitrary_precision")]
    pub monthly_withdrawn: Amount,
    #[serde(default, with = "serde_reset_date")]
    pub last_reset: Option<NaiveDate>,
}

impl Account {
    /// Zero balance, zero counters, never reset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `amount` to the balance. A sum past `Decimal::MAX` is rejected
    /// as `InvalidAmount` and leaves the account unchanged.
    pub fn credit(&mut self, amount: Amount) -> Result<()> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(Error::InvalidAmount)?;
        Ok(())
    }

    /// Debits `amount` and charges it to both withdrawal counters. The caller
    /// has already checked it against the balance and limits; on overflow
    /// nothing is changed.
    pub fn record_withdrawal(&mut self, amount: Amount) -> Result<()> {
        let balance = self.balance.checked_sub(amount);
        let daily = self.daily_withdrawn.checked_add(amount);
        let monthly = self.monthly_withdrawn.checked_add(amount);
        let (Some(balance), Some(daily), Some(monthly)) = (balance, daily, monthly) else {
            return Err(Error::InvalidAmount);
        };
        self.balance = balance;
        self.daily_withdrawn = daily;
        self.monthly_withdrawn = monthly;
        Ok(())
    }
}

/// `last_reset` is stored as `YYYY-MM-DD`, or `""` before the first login.
pub(crate) mod serde_reset_date {
    use chrono::NaiveDate;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S>(value: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(date) => serializer.serialize_str(&date.format(FORMAT).to_string()),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        if raw.is_empty() {
            return Ok(None);
        }
        NaiveDate::parse_from_str(&raw, FORMAT)
            .map(Some)
            .map_err(D::Error::custom)
    }
}
