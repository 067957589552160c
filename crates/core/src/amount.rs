//! Token amounts in integer base units.

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

/// A non-negative quantity of tokens.
///
/// Balances and transfer amounts share this type, so `balance >= 0` holds by
/// construction. Raw caller input arrives as `i64` and is validated through
/// [`Amount::positive`] or [`Amount::non_negative`].
#[derive(
    Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Self = Self(0);

    pub const fn new(units: u64) -> Self {
        Self(units)
    }

    pub const fn units(self) -> u64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Validate an amount that must be strictly greater than zero.
    pub fn positive(raw: i64) -> LedgerResult<Self> {
        if raw <= 0 {
            return Err(LedgerError::validation(format!(
                "amount must be positive (got {raw})"
            )));
        }
        Ok(Self(raw as u64))
    }

    /// Validate an amount that may be zero but not negative.
    pub fn non_negative(raw: i64) -> LedgerResult<Self> {
        if raw < 0 {
            return Err(LedgerError::validation(format!(
                "amount cannot be negative (got {raw})"
            )));
        }
        Ok(Self(raw as u64))
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }
}

impl core::fmt::Display for Amount {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<u64> for Amount {
    fn from(units: u64) -> Self {
        Self(units)
    }
}

impl From<Amount> for u64 {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}
