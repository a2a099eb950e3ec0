use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::customer::Customer;
use crate::decimal::Money;
use crate::errors::{CreditError, Result};
use crate::store::{CustomerStore, LedgerStore};
use crate::types::{CustomerId, EntryId, LoanId};

/// direction of a credit ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    Reserve,
    Release,
}

/// one append-only record mirroring a guard mutation of `used_credit_limit`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditEntry {
    pub id: EntryId,
    pub customer_id: CustomerId,
    pub loan_id: LoanId,
    pub kind: EntryKind,
    pub amount: Money,
    pub recorded_at: DateTime<Utc>,
}

impl CreditEntry {
    pub fn reserve(
        customer_id: CustomerId,
        loan_id: LoanId,
        amount: Money,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer_id,
            loan_id,
            kind: EntryKind::Reserve,
            amount,
            recorded_at,
        }
    }

    pub fn release(
        customer_id: CustomerId,
        loan_id: LoanId,
        amount: Money,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer_id,
            loan_id,
            kind: EntryKind::Release,
            amount,
            recorded_at,
        }
    }
}

/// net reserved capacity implied by a sequence of ledger entries
pub fn ledger_balance(entries: &[CreditEntry]) -> Money {
    entries.iter().fold(Money::ZERO, |acc, entry| match entry.kind {
        EntryKind::Reserve => acc + entry.amount,
        EntryKind::Release => acc - entry.amount,
    })
}

/// guards the customer's credit capacity: reserves on origination, releases
/// on full payoff, and mirrors every counter mutation into the ledger
pub struct CreditLimitGuard<'a> {
    customers: &'a dyn CustomerStore,
    ledger: &'a dyn LedgerStore,
}

impl<'a> CreditLimitGuard<'a> {
    pub fn new(customers: &'a dyn CustomerStore, ledger: &'a dyn LedgerStore) -> Self {
        Self { customers, ledger }
    }

    /// commit capacity for a new loan; the version-checked save is the
    /// origination commit gate, so a concurrent writer fails here with
    /// nothing written
    pub fn reserve(
        &self,
        mut customer: Customer,
        loan_id: LoanId,
        amount: Money,
        at: DateTime<Utc>,
    ) -> Result<Customer> {
        customer.reserve(amount)?;
        let stored = self.customers.save(customer)?;
        self.ledger
            .append(CreditEntry::reserve(stored.id, loan_id, amount, at))?;

        info!(
            customer_id = %stored.id,
            loan_id = %loan_id,
            amount = %amount,
            used_after = %stored.used_credit_limit,
            "credit reserved"
        );
        Ok(stored)
    }

    /// hand capacity back after a full payoff; re-reads the customer so the
    /// version check runs against the current row
    pub fn release(
        &self,
        customer_id: CustomerId,
        loan_id: LoanId,
        amount: Money,
        at: DateTime<Utc>,
    ) -> Result<Customer> {
        let mut customer = self
            .customers
            .find_by_id(customer_id)?
            .ok_or(CreditError::CustomerNotFound { id: customer_id })?;

        customer.release(amount);
        let stored = self.customers.save(customer)?;
        self.ledger
            .append(CreditEntry::release(stored.id, loan_id, amount, at))?;

        info!(
            customer_id = %stored.id,
            loan_id = %loan_id,
            amount = %amount,
            used_after = %stored.used_credit_limit,
            "credit released"
        );
        Ok(stored)
    }
}
