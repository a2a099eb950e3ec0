use std::sync::Arc;

use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::customer::Customer;
use crate::decimal::{Money, Rate};
use crate::errors::{CreditError, Result};
use crate::events::{Event, EventStore};
use crate::ledger::CreditLimitGuard;
use crate::loan::{Installment, Loan};
use crate::payment::{PaymentAllocator, PaymentResult};
use crate::policy::LendingPolicy;
use crate::schedule::InstallmentSchedule;
use crate::store::{CustomerStore, InMemoryStore, InstallmentStore, LedgerStore, LoanStore};
use crate::types::{CustomerId, LoanId};
use crate::views::{InstallmentView, LoanView};

/// registration input for a new customer credit profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub name: String,
    pub surname: String,
    pub credit_limit: Money,
}

/// origination input for a new installment loan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanApplication {
    pub customer_id: CustomerId,
    pub amount: Money,
    pub interest_rate: Rate,
    pub installment_count: u32,
}

/// orchestrates the engine: origination over the guard and the schedule
/// builder, payment over the allocator, listings over the stores
pub struct LoanService {
    customers: Arc<dyn CustomerStore>,
    loans: Arc<dyn LoanStore>,
    installments: Arc<dyn InstallmentStore>,
    ledger: Arc<dyn LedgerStore>,
    policy: LendingPolicy,
    events: EventStore,
}

impl LoanService {
    pub fn new(
        customers: Arc<dyn CustomerStore>,
        loans: Arc<dyn LoanStore>,
        installments: Arc<dyn InstallmentStore>,
        ledger: Arc<dyn LedgerStore>,
        policy: LendingPolicy,
    ) -> Self {
        Self {
            customers,
            loans,
            installments,
            ledger,
            policy,
            events: EventStore::new(),
        }
    }

    /// service over the in-memory reference backend with standard policy
    pub fn in_memory() -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store,
            LendingPolicy::standard(),
        )
    }

    fn guard(&self) -> CreditLimitGuard<'_> {
        CreditLimitGuard::new(self.customers.as_ref(), self.ledger.as_ref())
    }

    /// register a customer credit profile with zero used capacity
    pub fn register_customer(&mut self, profile: CustomerProfile) -> Result<Customer> {
        if profile.credit_limit.is_negative() {
            return Err(CreditError::InvalidCreditLimit {
                limit: profile.credit_limit,
            });
        }

        let customer = Customer::new(profile.name, profile.surname, profile.credit_limit);
        let stored = self.customers.save(customer)?;

        info!(
            customer_id = %stored.id,
            credit_limit = %stored.credit_limit,
            "customer registered"
        );
        self.events.emit(Event::CustomerRegistered {
            customer_id: stored.id,
            credit_limit: stored.credit_limit,
        });

        Ok(stored)
    }

    /// originate a loan: validate, reserve capacity (the commit gate),
    /// persist the loan row and its schedule
    pub fn create_loan(
        &mut self,
        application: LoanApplication,
        time_provider: &SafeTimeProvider,
    ) -> Result<LoanView> {
        self.policy.validate_principal(application.amount)?;
        self.policy.validate_rate(application.interest_rate)?;
        self.policy
            .validate_installment_count(application.installment_count)?;

        let customer = self
            .customers
            .find_by_id(application.customer_id)?
            .ok_or(CreditError::CustomerNotFound {
                id: application.customer_id,
            })?;

        let now = time_provider.now();
        let today = now.date_naive();
        let schedule = InstallmentSchedule::build(
            application.amount,
            application.interest_rate,
            application.installment_count,
            today,
        )?;

        let loan = Loan::originate(
            customer.id,
            application.amount,
            application.interest_rate,
            application.installment_count,
            now,
        );

        // commit gate: a concurrent origination against the same customer
        // fails here with nothing written
        let reserved = self
            .guard()
            .reserve(customer, loan.id, schedule.total_amount, now)?;
        self.events.emit(Event::CreditReserved {
            customer_id: reserved.id,
            loan_id: loan.id,
            amount: schedule.total_amount,
            used_after: reserved.used_credit_limit,
            timestamp: now,
        });

        let loan_id = loan.id;
        let stored = match self.persist_origination(loan, &schedule) {
            Ok(stored) => stored,
            Err(persist_err) => {
                // roll the reservation back before propagating
                let rollback = self
                    .guard()
                    .release(reserved.id, loan_id, schedule.total_amount, now);
                match rollback {
                    Ok(after) => {
                        self.events.emit(Event::CreditReleased {
                            customer_id: after.id,
                            loan_id,
                            amount: schedule.total_amount,
                            used_after: after.used_credit_limit,
                            timestamp: now,
                        });
                    }
                    Err(release_err) => {
                        error!(
                            customer_id = %reserved.id,
                            error = %release_err,
                            "failed to roll back credit reservation"
                        );
                    }
                }
                return Err(persist_err);
            }
        };

        info!(
            loan_id = %stored.id,
            customer_id = %stored.customer_id,
            principal = %stored.loan_amount,
            total = %schedule.total_amount,
            installments = stored.installment_count,
            "loan originated"
        );
        self.events.emit(Event::LoanOriginated {
            loan_id: stored.id,
            customer_id: stored.customer_id,
            principal: stored.loan_amount,
            total_amount: schedule.total_amount,
            installment_count: stored.installment_count,
            first_due_date: schedule.installments[0].due_date,
            timestamp: now,
        });

        Ok(LoanView::from_loan(&stored))
    }

    fn persist_origination(&self, loan: Loan, schedule: &InstallmentSchedule) -> Result<Loan> {
        let stored = self.loans.save(loan)?;
        let rows: Vec<Installment> = schedule
            .installments
            .iter()
            .map(|row| Installment::scheduled(stored.id, row.amount, row.due_date))
            .collect();
        self.installments.save_all(rows)?;
        Ok(stored)
    }

    /// loans of a customer in origination order
    pub fn loans_for_customer(&self, customer_id: CustomerId) -> Result<Vec<LoanView>> {
        let loans = self.loans.find_by_customer_id(customer_id)?;
        if loans.is_empty() {
            return Err(CreditError::NoLoansForCustomer { customer_id });
        }
        Ok(loans.iter().map(LoanView::from_loan).collect())
    }

    /// installments of a loan in due-date order
    pub fn installments_for_loan(&self, loan_id: LoanId) -> Result<Vec<InstallmentView>> {
        let rows = self.installments.find_by_loan_id(loan_id)?;
        if rows.is_empty() {
            return Err(CreditError::NoInstallmentsForLoan { loan_id });
        }
        Ok(rows.iter().map(InstallmentView::from_installment).collect())
    }

    /// allocate a payment across the eligible installments of a loan,
    /// earliest due first; releases the customer's capacity on full payoff
    pub fn apply_payment(
        &mut self,
        loan_id: LoanId,
        amount: Money,
        time_provider: &SafeTimeProvider,
    ) -> Result<PaymentResult> {
        self.policy.validate_payment(amount)?;

        let mut loan = self
            .loans
            .find_by_id(loan_id)?
            .ok_or(CreditError::LoanNotFound { id: loan_id })?;
        if loan.is_paid {
            return Err(CreditError::LoanAlreadyPaid { id: loan_id });
        }

        let now = time_provider.now();
        let today = now.date_naive();
        let horizon = self.policy.settlement_horizon(today)?;

        let eligible = self.installments.find_unpaid_due_through(loan_id, horizon)?;
        if eligible.is_empty() {
            return Err(CreditError::NoEligibleInstallments { loan_id });
        }
        debug!(
            loan_id = %loan_id,
            eligible = eligible.len(),
            horizon = %horizon,
            "selected eligible installments"
        );

        let allocator = PaymentAllocator::new(&self.policy);
        let allocation = allocator.allocate(&eligible, amount, today)?;

        let unpaid_before = self.installments.count_unpaid(loan_id)?;
        let fully_paid = allocation.settled.len() as u64 == unpaid_before;

        let customer_id = loan.customer_id;
        let total_amount = loan.total_amount();
        if fully_paid {
            loan.mark_settled()?;
        }

        // commit gate: every payment bumps the loan version, so two
        // payments racing on one loan cannot both commit
        self.loans.save(loan)?;

        let mut paid_rows = Vec::with_capacity(allocation.settled.len());
        for (mut row, settled) in eligible.into_iter().zip(&allocation.settled) {
            row.settle(settled.adjusted, today)?;
            self.events.emit(Event::InstallmentSettled {
                loan_id,
                installment_id: row.id,
                scheduled: settled.scheduled,
                paid: settled.adjusted,
                days_offset: settled.days_offset,
                settled_on: today,
            });
            paid_rows.push(row);
        }
        self.installments.save_all(paid_rows)?;

        if fully_paid {
            let after = self
                .guard()
                .release(customer_id, loan_id, total_amount, now)?;
            self.events.emit(Event::CreditReleased {
                customer_id,
                loan_id,
                amount: total_amount,
                used_after: after.used_credit_limit,
                timestamp: now,
            });
            self.events.emit(Event::LoanSettled {
                loan_id,
                customer_id,
                released_amount: total_amount,
                timestamp: now,
            });
        }

        let installments_paid = allocation.settled.len() as u32;
        info!(
            loan_id = %loan_id,
            offered = %amount,
            spent = %allocation.amount_spent,
            installments_paid,
            fully_paid,
            "payment applied"
        );
        self.events.emit(Event::PaymentApplied {
            loan_id,
            amount_offered: amount,
            amount_spent: allocation.amount_spent,
            installments_paid,
            timestamp: now,
        });

        Ok(PaymentResult {
            installments_paid,
            amount_spent: allocation.amount_spent,
            loan_fully_paid: fully_paid,
        })
    }

    /// drain events emitted since the last call
    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.take_events()
    }

    /// events emitted so far, without draining
    pub fn events(&self) -> &[Event] {
        self.events.events()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{ledger_balance, EntryKind};
    use chrono::{NaiveDate, TimeZone, Utc};
    use hourglass_rs::TimeSource;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn money(s: &str) -> Money {
        Money::from_str_exact(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn test_time() -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap(),
        ))
    }

    fn registered_customer(service: &mut LoanService, limit: i64) -> Customer {
        service
            .register_customer(CustomerProfile {
                name: "Ayse".to_string(),
                surname: "Yilmaz".to_string(),
                credit_limit: Money::from_major(limit),
            })
            .unwrap()
    }

    fn standard_application(customer_id: CustomerId) -> LoanApplication {
        LoanApplication {
            customer_id,
            amount: Money::from_major(1000),
            interest_rate: Rate::from_decimal(dec!(0.1)),
            installment_count: 6,
        }
    }

    #[test]
    fn test_register_rejects_negative_limit() {
        let mut service = LoanService::in_memory();
        let err = service
            .register_customer(CustomerProfile {
                name: "Ali".to_string(),
                surname: "Celik".to_string(),
                credit_limit: Money::from_major(-1),
            })
            .unwrap_err();
        assert!(matches!(err, CreditError::InvalidCreditLimit { .. }));
    }

    #[test]
    fn test_create_loan_reserves_capacity_and_builds_schedule() {
        let mut service = LoanService::in_memory();
        let time = test_time();
        let customer = registered_customer(&mut service, 10_000);

        let view = service
            .create_loan(standard_application(customer.id), &time)
            .unwrap();

        assert_eq!(view.total_amount, money("1100.00"));
        assert_eq!(view.installment_count, 6);
        assert!(!view.is_paid);

        let reread = service.customers.find_by_id(customer.id).unwrap().unwrap();
        assert_eq!(reread.used_credit_limit, money("1100.00"));

        let rows = service.installments_for_loan(view.id).unwrap();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].due_date, date(2024, 2, 1));
        assert_eq!(rows[0].amount, money("183.33"));
        assert_eq!(rows[5].due_date, date(2024, 7, 1));
        assert_eq!(rows[5].amount, money("183.35"));
    }

    #[test]
    fn test_create_loan_fails_on_insufficient_credit() {
        let mut service = LoanService::in_memory();
        let time = test_time();
        let customer = registered_customer(&mut service, 10_000);

        // use up most of the capacity first
        let mut used = service.customers.find_by_id(customer.id).unwrap().unwrap();
        used.used_credit_limit = money("9500.00");
        service.customers.save(used).unwrap();

        let err = service
            .create_loan(standard_application(customer.id), &time)
            .unwrap_err();
        match err {
            CreditError::InsufficientCredit { available, requested } => {
                assert_eq!(available, money("500.00"));
                assert_eq!(requested, money("1100.00"));
            }
            other => panic!("unexpected error: {other}"),
        }

        // no loan row, no ledger entry
        assert!(matches!(
            service.loans_for_customer(customer.id),
            Err(CreditError::NoLoansForCustomer { .. })
        ));
        assert!(service
            .ledger
            .entries_for_customer(customer.id)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_create_loan_validates_before_any_write() {
        let mut service = LoanService::in_memory();
        let time = test_time();
        let customer = registered_customer(&mut service, 10_000);

        let mut bad_rate = standard_application(customer.id);
        bad_rate.interest_rate = Rate::from_decimal(dec!(0.05));
        assert!(matches!(
            service.create_loan(bad_rate, &time),
            Err(CreditError::InvalidInterestRate { .. })
        ));

        let mut bad_count = standard_application(customer.id);
        bad_count.installment_count = 7;
        assert!(matches!(
            service.create_loan(bad_count, &time),
            Err(CreditError::InvalidInstallmentCount { count: 7 })
        ));

        let mut bad_amount = standard_application(customer.id);
        bad_amount.amount = Money::ZERO;
        assert!(matches!(
            service.create_loan(bad_amount, &time),
            Err(CreditError::InvalidLoanAmount { .. })
        ));

        let reread = service.customers.find_by_id(customer.id).unwrap().unwrap();
        assert_eq!(reread.used_credit_limit, Money::ZERO);
    }

    #[test]
    fn test_create_loan_unknown_customer() {
        let mut service = LoanService::in_memory();
        let time = test_time();
        let ghost = Uuid::new_v4();

        let err = service
            .create_loan(standard_application(ghost), &time)
            .unwrap_err();
        assert!(matches!(err, CreditError::CustomerNotFound { id } if id == ghost));
    }

    #[test]
    fn test_payment_pays_earliest_eligible_first() {
        let mut service = LoanService::in_memory();
        let time = test_time();
        let customer = registered_customer(&mut service, 10_000);
        let loan = service
            .create_loan(standard_application(customer.id), &time)
            .unwrap();

        // paying on 2024-01-15: the 2024-02-01 row is 17 days early,
        // adjusted 183.33 - 3.12 = 180.21
        let result = service
            .apply_payment(loan.id, money("183.33"), &time)
            .unwrap();

        assert_eq!(result.installments_paid, 1);
        assert_eq!(result.amount_spent, money("180.21"));
        assert!(!result.loan_fully_paid);

        let rows = service.installments_for_loan(loan.id).unwrap();
        assert!(rows[0].is_paid);
        assert_eq!(rows[0].paid_amount, money("180.21"));
        assert_eq!(rows[0].payment_date, Some(date(2024, 1, 15)));
        assert!(rows[1..].iter().all(|row| !row.is_paid));
    }

    #[test]
    fn test_insufficient_payment_mutates_nothing() {
        let mut service = LoanService::in_memory();
        let time = test_time();
        let customer = registered_customer(&mut service, 10_000);
        let loan = service
            .create_loan(standard_application(customer.id), &time)
            .unwrap();

        let err = service
            .apply_payment(loan.id, money("100.00"), &time)
            .unwrap_err();
        match err {
            CreditError::InsufficientPayment { provided, required } => {
                assert_eq!(provided, money("100.00"));
                assert_eq!(required, money("180.21"));
            }
            other => panic!("unexpected error: {other}"),
        }

        let rows = service.installments_for_loan(loan.id).unwrap();
        assert!(rows.iter().all(|row| !row.is_paid));
        assert_eq!(service.installments.count_unpaid(loan.id).unwrap(), 6);
    }

    #[test]
    fn test_payment_respects_three_month_window() {
        let mut service = LoanService::in_memory();
        let time = test_time();
        let customer = registered_customer(&mut service, 10_000);
        let loan = service
            .create_loan(standard_application(customer.id), &time)
            .unwrap();

        // eligible on 2024-01-15: due 02-01 (180.21), 03-01 (174.90),
        // 04-01 (169.21); the 05-01 row is past the 04-15 horizon
        let result = service.apply_payment(loan.id, money("600.00"), &time).unwrap();
        assert_eq!(result.installments_paid, 3);
        assert_eq!(result.amount_spent, money("524.32"));
        assert!(!result.loan_fully_paid);

        // nothing left inside the window
        let err = service
            .apply_payment(loan.id, money("600.00"), &time)
            .unwrap_err();
        assert!(matches!(err, CreditError::NoEligibleInstallments { loan_id } if loan_id == loan.id));
    }

    #[test]
    fn test_full_payoff_releases_capacity() {
        let mut service = LoanService::in_memory();
        let time = test_time();
        let controller = time.test_control().unwrap();
        let customer = registered_customer(&mut service, 10_000);
        let loan = service
            .create_loan(standard_application(customer.id), &time)
            .unwrap();

        service.apply_payment(loan.id, money("600.00"), &time).unwrap();

        // move to 2024-04-14 so the remaining three rows fall in the window
        controller.advance(chrono::Duration::days(90));
        let result = service.apply_payment(loan.id, money("600.00"), &time).unwrap();

        assert_eq!(result.installments_paid, 3);
        assert!(result.loan_fully_paid);

        let loans = service.loans_for_customer(customer.id).unwrap();
        assert!(loans[0].is_paid);

        let reread = service.customers.find_by_id(customer.id).unwrap().unwrap();
        assert_eq!(reread.used_credit_limit, Money::ZERO);

        // closed loans accept no further payments
        let err = service
            .apply_payment(loan.id, money("100.00"), &time)
            .unwrap_err();
        assert!(matches!(err, CreditError::LoanAlreadyPaid { id } if id == loan.id));
    }

    #[test]
    fn test_ledger_replays_to_used_credit_limit() {
        let mut service = LoanService::in_memory();
        let time = test_time();
        let controller = time.test_control().unwrap();
        let customer = registered_customer(&mut service, 10_000);

        let first = service
            .create_loan(standard_application(customer.id), &time)
            .unwrap();
        let second = service
            .create_loan(
                LoanApplication {
                    customer_id: customer.id,
                    amount: Money::from_major(2000),
                    interest_rate: Rate::from_decimal(dec!(0.2)),
                    installment_count: 12,
                },
                &time,
            )
            .unwrap();

        // retire the first loan completely
        service.apply_payment(first.id, money("600.00"), &time).unwrap();
        controller.advance(chrono::Duration::days(90));
        service.apply_payment(first.id, money("600.00"), &time).unwrap();

        let entries = service.ledger.entries_for_customer(customer.id).unwrap();
        let reread = service.customers.find_by_id(customer.id).unwrap().unwrap();

        assert_eq!(ledger_balance(&entries), reread.used_credit_limit);
        assert_eq!(reread.used_credit_limit, second.total_amount);
        assert_eq!(
            entries.iter().filter(|e| e.kind == EntryKind::Release).count(),
            1
        );
    }

    #[test]
    fn test_late_payment_carries_penalty() {
        let mut service = LoanService::in_memory();
        let time = test_time();
        let controller = time.test_control().unwrap();
        let customer = registered_customer(&mut service, 10_000);
        let loan = service
            .create_loan(standard_application(customer.id), &time)
            .unwrap();

        // 2024-03-02: the 02-01 row is 30 days overdue, 183.33 + 5.50
        controller.advance(chrono::Duration::days(47));
        let result = service
            .apply_payment(loan.id, money("188.83"), &time)
            .unwrap();

        assert_eq!(result.installments_paid, 1);
        assert_eq!(result.amount_spent, money("188.83"));

        let rows = service.installments_for_loan(loan.id).unwrap();
        assert_eq!(rows[0].paid_amount, money("188.83"));
        assert_eq!(rows[0].payment_date, Some(date(2024, 3, 2)));
    }

    #[test]
    fn test_payment_on_unknown_loan() {
        let mut service = LoanService::in_memory();
        let time = test_time();
        let ghost = Uuid::new_v4();

        let err = service.apply_payment(ghost, money("100.00"), &time).unwrap_err();
        assert!(matches!(err, CreditError::LoanNotFound { id } if id == ghost));

        let err = service.apply_payment(ghost, Money::ZERO, &time).unwrap_err();
        assert!(matches!(err, CreditError::InvalidPaymentAmount { .. }));
    }

    #[test]
    fn test_listing_empty_results_fail() {
        let service = LoanService::in_memory();
        let ghost = Uuid::new_v4();

        assert!(matches!(
            service.loans_for_customer(ghost),
            Err(CreditError::NoLoansForCustomer { customer_id }) if customer_id == ghost
        ));
        assert!(matches!(
            service.installments_for_loan(ghost),
            Err(CreditError::NoInstallmentsForLoan { loan_id }) if loan_id == ghost
        ));
    }

    #[test]
    fn test_operations_emit_events_in_order() {
        let mut service = LoanService::in_memory();
        let time = test_time();
        let customer = registered_customer(&mut service, 10_000);
        let loan = service
            .create_loan(standard_application(customer.id), &time)
            .unwrap();
        service.apply_payment(loan.id, money("183.33"), &time).unwrap();

        let events = service.take_events();
        assert!(matches!(events[0], Event::CustomerRegistered { .. }));
        assert!(matches!(events[1], Event::CreditReserved { .. }));
        assert!(matches!(events[2], Event::LoanOriginated { .. }));
        assert!(matches!(events[3], Event::InstallmentSettled { .. }));
        assert!(matches!(events[4], Event::PaymentApplied { .. }));

        // drained
        assert!(service.events().is_empty());
    }

    mod rollback {
        use super::*;
        use crate::store::memory::InMemoryStore;
        use chrono::NaiveDate;

        /// installment store that refuses writes, for exercising the
        /// origination compensation path
        struct ReadOnlyInstallments {
            inner: Arc<InMemoryStore>,
        }

        impl InstallmentStore for ReadOnlyInstallments {
            fn find_by_loan_id(&self, loan_id: LoanId) -> Result<Vec<Installment>> {
                self.inner.find_by_loan_id(loan_id)
            }

            fn find_unpaid_due_through(
                &self,
                loan_id: LoanId,
                max_due_date: NaiveDate,
            ) -> Result<Vec<Installment>> {
                self.inner.find_unpaid_due_through(loan_id, max_due_date)
            }

            fn count_unpaid(&self, loan_id: LoanId) -> Result<u64> {
                self.inner.count_unpaid(loan_id)
            }

            fn save_all(&self, _installments: Vec<Installment>) -> Result<()> {
                Err(CreditError::Storage {
                    message: "installment table unavailable".to_string(),
                })
            }
        }

        #[test]
        fn test_failed_persistence_rolls_back_reservation() {
            let store = Arc::new(InMemoryStore::new());
            let mut service = LoanService::new(
                store.clone(),
                store.clone(),
                Arc::new(ReadOnlyInstallments { inner: store.clone() }),
                store.clone(),
                LendingPolicy::standard(),
            );
            let time = test_time();
            let customer = registered_customer(&mut service, 10_000);

            let err = service
                .create_loan(standard_application(customer.id), &time)
                .unwrap_err();
            assert!(matches!(err, CreditError::Storage { .. }));

            // the reservation was compensated, no capacity leaked
            let reread = CustomerStore::find_by_id(store.as_ref(), customer.id)
                .unwrap()
                .unwrap();
            assert_eq!(reread.used_credit_limit, Money::ZERO);

            let entries = store.entries_for_customer(customer.id).unwrap();
            assert_eq!(entries.len(), 2);
            assert_eq!(ledger_balance(&entries), Money::ZERO);
        }
    }
}
