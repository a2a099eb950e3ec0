use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{CustomerId, InstallmentId, LoanId};

/// all events emitted by engine operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    CustomerRegistered {
        customer_id: CustomerId,
        credit_limit: Money,
    },

    // capacity events
    CreditReserved {
        customer_id: CustomerId,
        loan_id: LoanId,
        amount: Money,
        used_after: Money,
        timestamp: DateTime<Utc>,
    },
    CreditReleased {
        customer_id: CustomerId,
        loan_id: LoanId,
        amount: Money,
        used_after: Money,
        timestamp: DateTime<Utc>,
    },

    // loan lifecycle events
    LoanOriginated {
        loan_id: LoanId,
        customer_id: CustomerId,
        principal: Money,
        total_amount: Money,
        installment_count: u32,
        first_due_date: NaiveDate,
        timestamp: DateTime<Utc>,
    },
    LoanSettled {
        loan_id: LoanId,
        customer_id: CustomerId,
        released_amount: Money,
        timestamp: DateTime<Utc>,
    },

    // payment events
    InstallmentSettled {
        loan_id: LoanId,
        installment_id: InstallmentId,
        scheduled: Money,
        paid: Money,
        days_offset: i64,
        settled_on: NaiveDate,
    },
    PaymentApplied {
        loan_id: LoanId,
        amount_offered: Money,
        amount_spent: Money,
        installments_paid: u32,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
