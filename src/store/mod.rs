/// storage seams consumed by the engine; backends must make each call
/// atomic and enforce the version checks described on `save`
use chrono::NaiveDate;

use crate::customer::Customer;
use crate::errors::Result;
use crate::ledger::CreditEntry;
use crate::loan::{Installment, Loan};
use crate::types::{CustomerId, LoanId};

pub mod memory;

pub use memory::InMemoryStore;

/// customer rows; `save` is version-checked: it persists and bumps the
/// version only when the incoming version matches the stored row, and
/// fails with a stale-version error otherwise
pub trait CustomerStore: Send + Sync {
    fn find_by_id(&self, id: CustomerId) -> Result<Option<Customer>>;
    fn save(&self, customer: Customer) -> Result<Customer>;
}

/// loan rows; `save` follows the same version-checked discipline
pub trait LoanStore: Send + Sync {
    fn find_by_id(&self, id: LoanId) -> Result<Option<Loan>>;
    fn find_by_customer_id(&self, customer_id: CustomerId) -> Result<Vec<Loan>>;
    fn save(&self, loan: Loan) -> Result<Loan>;
}

/// installment rows, always returned in due-date order
pub trait InstallmentStore: Send + Sync {
    fn find_by_loan_id(&self, loan_id: LoanId) -> Result<Vec<Installment>>;

    /// unpaid installments with `due_date <= max_due_date`, ascending by
    /// due date; the eligibility query behind payment allocation
    fn find_unpaid_due_through(
        &self,
        loan_id: LoanId,
        max_due_date: NaiveDate,
    ) -> Result<Vec<Installment>>;

    fn count_unpaid(&self, loan_id: LoanId) -> Result<u64>;

    /// upsert by id
    fn save_all(&self, installments: Vec<Installment>) -> Result<()>;
}

/// append-only reservation/release log
pub trait LedgerStore: Send + Sync {
    fn append(&self, entry: CreditEntry) -> Result<()>;

    /// entries in insertion order
    fn entries_for_customer(&self, customer_id: CustomerId) -> Result<Vec<CreditEntry>>;
}
