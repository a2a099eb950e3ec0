/// in-memory reference backend: one mutex over all tables, so every store
/// call is atomic; version checks on customer/loan saves supply the
/// cross-call serialization the engine's write protocol relies on
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;
use uuid::Uuid;

use crate::customer::Customer;
use crate::errors::{CreditError, Result};
use crate::ledger::CreditEntry;
use crate::loan::{Installment, Loan};
use crate::store::{CustomerStore, InstallmentStore, LedgerStore, LoanStore};
use crate::types::{CustomerId, LoanId};

#[derive(Debug, Default)]
struct Tables {
    customers: HashMap<Uuid, Customer>,
    loans: HashMap<Uuid, Loan>,
    installments: HashMap<Uuid, Installment>,
    entries: Vec<CreditEntry>,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables.lock().map_err(|_| CreditError::Storage {
            message: "store mutex poisoned".to_string(),
        })
    }
}

/// reject the save unless the incoming version matches the stored row
fn check_version(stored: Option<u64>, incoming: u64, entity: &'static str, id: Uuid) -> Result<()> {
    match stored {
        Some(current) if current != incoming => Err(CreditError::StaleVersion { entity, id }),
        _ => Ok(()),
    }
}

impl CustomerStore for InMemoryStore {
    fn find_by_id(&self, id: CustomerId) -> Result<Option<Customer>> {
        Ok(self.lock()?.customers.get(&id).cloned())
    }

    fn save(&self, mut customer: Customer) -> Result<Customer> {
        let mut tables = self.lock()?;
        let stored = tables.customers.get(&customer.id).map(|c| c.version);
        check_version(stored, customer.version, "customer", customer.id)?;
        customer.version += 1;
        tables.customers.insert(customer.id, customer.clone());
        Ok(customer)
    }
}

impl LoanStore for InMemoryStore {
    fn find_by_id(&self, id: LoanId) -> Result<Option<Loan>> {
        Ok(self.lock()?.loans.get(&id).cloned())
    }

    fn find_by_customer_id(&self, customer_id: CustomerId) -> Result<Vec<Loan>> {
        let tables = self.lock()?;
        let mut loans: Vec<Loan> = tables
            .loans
            .values()
            .filter(|loan| loan.customer_id == customer_id)
            .cloned()
            .collect();
        loans.sort_by_key(|loan| loan.create_date);
        Ok(loans)
    }

    fn save(&self, mut loan: Loan) -> Result<Loan> {
        let mut tables = self.lock()?;
        let stored = tables.loans.get(&loan.id).map(|l| l.version);
        check_version(stored, loan.version, "loan", loan.id)?;
        loan.version += 1;
        tables.loans.insert(loan.id, loan.clone());
        Ok(loan)
    }
}

impl InstallmentStore for InMemoryStore {
    fn find_by_loan_id(&self, loan_id: LoanId) -> Result<Vec<Installment>> {
        let tables = self.lock()?;
        let mut rows: Vec<Installment> = tables
            .installments
            .values()
            .filter(|inst| inst.loan_id == loan_id)
            .cloned()
            .collect();
        rows.sort_by_key(|inst| inst.due_date);
        Ok(rows)
    }

    fn find_unpaid_due_through(
        &self,
        loan_id: LoanId,
        max_due_date: NaiveDate,
    ) -> Result<Vec<Installment>> {
        let tables = self.lock()?;
        let mut rows: Vec<Installment> = tables
            .installments
            .values()
            .filter(|inst| {
                inst.loan_id == loan_id && !inst.is_paid && inst.due_date <= max_due_date
            })
            .cloned()
            .collect();
        rows.sort_by_key(|inst| inst.due_date);
        Ok(rows)
    }

    fn count_unpaid(&self, loan_id: LoanId) -> Result<u64> {
        let tables = self.lock()?;
        Ok(tables
            .installments
            .values()
            .filter(|inst| inst.loan_id == loan_id && !inst.is_paid)
            .count() as u64)
    }

    fn save_all(&self, installments: Vec<Installment>) -> Result<()> {
        let mut tables = self.lock()?;
        for installment in installments {
            tables.installments.insert(installment.id, installment);
        }
        Ok(())
    }
}

impl LedgerStore for InMemoryStore {
    fn append(&self, entry: CreditEntry) -> Result<()> {
        self.lock()?.entries.push(entry);
        Ok(())
    }

    fn entries_for_customer(&self, customer_id: CustomerId) -> Result<Vec<CreditEntry>> {
        let tables = self.lock()?;
        Ok(tables
            .entries
            .iter()
            .filter(|entry| entry.customer_id == customer_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::{Money, Rate};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_customer() -> Customer {
        Customer::new("Mehmet".to_string(), "Kaya".to_string(), Money::from_major(5000))
    }

    #[test]
    fn test_save_bumps_version_each_time() {
        let store = InMemoryStore::new();
        let stored = CustomerStore::save(&store, sample_customer()).unwrap();
        assert_eq!(stored.version, 1);

        let again = CustomerStore::save(&store, stored).unwrap();
        assert_eq!(again.version, 2);
    }

    #[test]
    fn test_stale_save_is_rejected_and_writes_nothing() {
        let store = InMemoryStore::new();
        let v1 = CustomerStore::save(&store, sample_customer()).unwrap();

        let mut winner = v1.clone();
        winner.used_credit_limit = Money::from_major(100);
        CustomerStore::save(&store, winner).unwrap();

        let mut loser = v1;
        loser.used_credit_limit = Money::from_major(999);
        let err = CustomerStore::save(&store, loser.clone()).unwrap_err();
        assert!(matches!(err, CreditError::StaleVersion { entity: "customer", id } if id == loser.id));

        let current = CustomerStore::find_by_id(&store, loser.id).unwrap().unwrap();
        assert_eq!(current.used_credit_limit, Money::from_major(100));
    }

    #[test]
    fn test_loans_sorted_by_create_date() {
        let store = InMemoryStore::new();
        let customer_id = Uuid::new_v4();
        let t0 = Utc::now();

        let late = Loan::originate(
            customer_id,
            Money::from_major(2000),
            Rate::from_decimal(dec!(0.2)),
            9,
            t0 + chrono::Duration::days(1),
        );
        let early = Loan::originate(
            customer_id,
            Money::from_major(1000),
            Rate::from_decimal(dec!(0.1)),
            6,
            t0,
        );
        LoanStore::save(&store, late.clone()).unwrap();
        LoanStore::save(&store, early.clone()).unwrap();

        let loans = store.find_by_customer_id(customer_id).unwrap();
        assert_eq!(loans.len(), 2);
        assert_eq!(loans[0].id, early.id);
        assert_eq!(loans[1].id, late.id);
    }

    #[test]
    fn test_unpaid_window_query_filters_and_orders() {
        let store = InMemoryStore::new();
        let loan_id = Uuid::new_v4();

        let mut paid = Installment::scheduled(loan_id, Money::from_major(100), date(2024, 2, 1));
        paid.settle(Money::from_major(100), date(2024, 2, 1)).unwrap();
        let in_window_late = Installment::scheduled(loan_id, Money::from_major(100), date(2024, 4, 1));
        let in_window_soon = Installment::scheduled(loan_id, Money::from_major(100), date(2024, 3, 1));
        let beyond = Installment::scheduled(loan_id, Money::from_major(100), date(2024, 8, 1));

        store
            .save_all(vec![
                paid,
                in_window_late.clone(),
                in_window_soon.clone(),
                beyond,
            ])
            .unwrap();

        let eligible = store
            .find_unpaid_due_through(loan_id, date(2024, 5, 15))
            .unwrap();
        assert_eq!(eligible.len(), 2);
        assert_eq!(eligible[0].id, in_window_soon.id);
        assert_eq!(eligible[1].id, in_window_late.id);

        assert_eq!(store.count_unpaid(loan_id).unwrap(), 3);
    }

    #[test]
    fn test_save_all_upserts_by_id() {
        let store = InMemoryStore::new();
        let loan_id = Uuid::new_v4();
        let mut inst = Installment::scheduled(loan_id, Money::from_major(100), date(2024, 3, 1));
        store.save_all(vec![inst.clone()]).unwrap();

        inst.settle(Money::from_major(97), date(2024, 2, 1)).unwrap();
        store.save_all(vec![inst.clone()]).unwrap();

        let rows = store.find_by_loan_id(loan_id).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].is_paid);
        assert_eq!(rows[0].paid_amount, Money::from_major(97));
    }
}
