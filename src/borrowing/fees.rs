//! Late fee computation
//!
//! Integer-day based: `days_late = floor(return_date - due_date)` in whole
//! days, `fee = days_late * rate_per_day`. A return on or before the due
//! date costs exactly zero.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Non-negative amount in minor currency units (1 unit = 100 minor)
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_minor(minor_units: u64) -> Self {
        Self(minor_units)
    }

    pub const fn from_units(units: u64) -> Self {
        Self(units.saturating_mul(100))
    }

    pub fn minor_units(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn saturating_mul(self, factor: u64) -> Self {
        Self(self.0.saturating_mul(factor))
    }

    pub fn saturating_add(self, other: Money) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// Per-day late fee rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSchedule {
    rate_per_day: Money,
}

impl FeeSchedule {
    pub fn new(rate_per_day: Money) -> Self {
        Self { rate_per_day }
    }

    pub fn rate_per_day(&self) -> Money {
        self.rate_per_day
    }

    /// Whole days between due date and return, zero when on time
    pub fn days_late(&self, due_date: DateTime<Utc>, returned_at: DateTime<Utc>) -> u64 {
        if returned_at <= due_date {
            return 0;
        }
        u64::try_from((returned_at - due_date).num_days()).unwrap_or(0)
    }

    pub fn late_fee(&self, due_date: DateTime<Utc>, returned_at: DateTime<Utc>) -> Money {
        match self.days_late(due_date, returned_at) {
            0 => Money::ZERO,
            days => self.rate_per_day.saturating_mul(days),
        }
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self::new(Money::from_units(1))
    }
}
