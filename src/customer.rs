use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{CreditError, Result};
use crate::types::CustomerId;

/// customer credit profile: borrowing ceiling and committed capacity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub surname: String,
    /// borrowing ceiling
    pub credit_limit: Money,
    /// capacity committed to active loans (principal plus interest)
    pub used_credit_limit: Money,
    /// optimistic-lock sequence, bumped by the store on every save
    pub version: u64,
}

impl Customer {
    pub fn new(name: String, surname: String, credit_limit: Money) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            surname,
            credit_limit,
            used_credit_limit: Money::ZERO,
            version: 0,
        }
    }

    /// capacity still available for new loans
    pub fn available_credit(&self) -> Money {
        self.credit_limit - self.used_credit_limit
    }

    /// commit capacity to a new loan
    pub fn reserve(&mut self, amount: Money) -> Result<()> {
        if self.available_credit() < amount {
            return Err(CreditError::InsufficientCredit {
                available: self.available_credit(),
                requested: amount,
            });
        }
        self.used_credit_limit += amount;
        Ok(())
    }

    /// hand capacity back after a full payoff
    pub fn release(&mut self, amount: Money) {
        self.used_credit_limit = (self.used_credit_limit - amount).max(Money::ZERO);
    }
}
