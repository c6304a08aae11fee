//! Copy counters for one title
//!
//! ## Invariant
//! `0 <= available <= quantity` holds after every method, including the
//! failing ones: a refused transition leaves the counters untouched.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a counter transition was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AvailabilityError {
    /// A release arrived while every copy was already on the shelf
    #[error("release would raise available above quantity {quantity}")]
    ReleaseOverflow { quantity: u32 },

    /// Shrinking below the number of copies currently lent out
    #[error("quantity {requested} is below the {on_loan} copies on loan")]
    BelowOnLoan { requested: u32, on_loan: u32 },

    /// Persisted counters that violate the invariant
    #[error("available {available} exceeds quantity {quantity}")]
    Invalid { quantity: u32, available: u32 },
}

/// Quantity owned and copies currently loanable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    quantity: u32,
    available: u32,
}

impl Availability {
    /// A freshly cataloged title: every copy is on the shelf
    pub fn new(quantity: u32) -> Self {
        Self {
            quantity,
            available: quantity,
        }
    }

    /// Rebuild counters read back from storage
    pub fn from_counts(quantity: u32, available: u32) -> Result<Self, AvailabilityError> {
        if available > quantity {
            return Err(AvailabilityError::Invalid {
                quantity,
                available,
            });
        }
        Ok(Self {
            quantity,
            available,
        })
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn available(&self) -> u32 {
        self.available
    }

    pub fn on_loan(&self) -> u32 {
        self.quantity - self.available
    }

    pub fn is_valid(&self) -> bool {
        self.available <= self.quantity
    }

    pub(crate) fn try_reserve(&mut self) -> bool {
        if self.available == 0 {
            return false;
        }
        self.available -= 1;
        true
    }

    pub(crate) fn check_release(&self) -> Result<(), AvailabilityError> {
        if self.available >= self.quantity {
            return Err(AvailabilityError::ReleaseOverflow {
                quantity: self.quantity,
            });
        }
        Ok(())
    }

    pub(crate) fn release(&mut self) -> Result<(), AvailabilityError> {
        self.check_release()?;
        self.available += 1;
        Ok(())
    }

    pub(crate) fn resize(&mut self, quantity: u32) -> Result<(), AvailabilityError> {
        let on_loan = self.on_loan();
        if quantity < on_loan {
            return Err(AvailabilityError::BelowOnLoan {
                requested: quantity,
                on_loan,
            });
        }
        self.quantity = quantity;
        self.available = quantity - on_loan;
        Ok(())
    }

    /// Recompute `available` from the authoritative open-loan count.
    ///
    /// Returns the counters as they were before, or `None` when nothing
    /// changed. More open loans than copies floors `available` at zero.
    pub(crate) fn reconcile(&mut self, open_loans: u32) -> Option<Availability> {
        let before = *self;
        self.available = self.quantity.saturating_sub(open_loans);
        (before != *self).then_some(before)
    }
}
