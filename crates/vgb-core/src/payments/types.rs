use std::{fmt, str::FromStr};

use crate::payments::{PaymentError, SecondaryInstructions};

/// Opaque payer metadata merged into the gateway request body.
pub type PayerInfo = serde_json::Map<String, serde_json::Value>;

/// A currency-scoped amount held in minor units (cents).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount {
    cents: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid amount: {0:?}")]
pub struct ParseAmountError(pub String);

impl Amount {
    pub const fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Convert a gateway-reported major-unit number (`10.5`) into an amount.
    pub fn from_major(value: f64) -> Self {
        Self {
            cents: (value * 100.0).round() as i64,
        }
    }

    pub const fn cents(self) -> i64 {
        self.cents
    }

    pub const fn is_positive(self) -> bool {
        self.cents > 0
    }

    /// Major-unit value as sent to the gateway.
    pub fn as_major(self) -> f64 {
        self.cents as f64 / 100.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.cents < 0 { "-" } else { "" };
        let abs = self.cents.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl FromStr for Amount {
    type Err = ParseAmountError;

    /// Accepts `10`, `10.5`, `10.00` and the comma form `10,00`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseAmountError(s.to_string());
        let raw = s.trim().replace(',', ".");
        let (negative, digits) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw.as_str()),
        };

        let (int_part, frac_part) = match digits.split_once('.') {
            Some((i, f)) => (i, f),
            None => (digits, ""),
        };
        if int_part.is_empty()
            || frac_part.len() > 2
            || !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(err());
        }

        let whole: i64 = int_part.parse().map_err(|_| err())?;
        let frac: i64 = match frac_part.len() {
            0 => 0,
            1 => frac_part.parse::<i64>().map_err(|_| err())? * 10,
            _ => frac_part.parse().map_err(|_| err())?,
        };
        let cents = whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(frac))
            .ok_or_else(err)?;

        Ok(Self {
            cents: if negative { -cents } else { cents },
        })
    }
}

/// Outcome of a charge creation attempt.
#[derive(Clone, Debug, PartialEq)]
pub enum ChargeResult {
    Succeeded {
        charge_id: String,
        display_code: String,
        amount: Amount,
    },
    FellBackToSecondary {
        instructions: SecondaryInstructions,
        cause: PaymentError,
    },
    Failed(PaymentError),
}

impl ChargeResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

/// Gateway-reported payment lifecycle status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Paid,
    Expired,
    Cancelled,
    Other(String),
}

impl PaymentStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "pending" | "waiting" | "created" => Self::Pending,
            "paid" | "approved" | "completed" | "confirmed" => Self::Paid,
            "expired" => Self::Expired,
            "cancelled" | "canceled" | "refunded" => Self::Cancelled,
            _ => Self::Other(raw.trim().to_string()),
        }
    }

    pub fn is_paid(&self) -> bool {
        matches!(self, Self::Paid)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Paid => f.write_str("paid"),
            Self::Expired => f.write_str("expired"),
            Self::Cancelled => f.write_str("cancelled"),
            Self::Other(s) => f.write_str(s),
        }
    }
}
