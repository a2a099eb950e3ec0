pub mod customer;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod loan;
pub mod payment;
pub mod policy;
pub mod schedule;
pub mod service;
pub mod store;
pub mod types;
pub mod views;

// re-export key types
pub use customer::Customer;
pub use decimal::{Money, Rate};
pub use errors::{CreditError, Result};
pub use events::{Event, EventStore};
pub use ledger::{ledger_balance, CreditEntry, CreditLimitGuard, EntryKind};
pub use loan::{Installment, Loan};
pub use payment::{AdjustedAmount, Allocation, PaymentAllocator, PaymentResult, SettledInstallment};
pub use policy::LendingPolicy;
pub use schedule::{InstallmentSchedule, ScheduledInstallment};
pub use service::{CustomerProfile, LoanApplication, LoanService};
pub use store::{CustomerStore, InMemoryStore, InstallmentStore, LedgerStore, LoanStore};
pub use types::{CustomerId, EntryId, InstallmentId, LoanId};
pub use views::{InstallmentView, LoanView};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
