use uuid::Uuid;

/// unique identifier for a customer
pub type CustomerId = Uuid;

/// unique identifier for a loan
pub type LoanId = Uuid;

/// unique identifier for an installment
pub type InstallmentId = Uuid;

/// unique identifier for a credit ledger entry
pub type EntryId = Uuid;
