use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::errors::{CreditError, Result};
use crate::types::{CustomerId, InstallmentId, LoanId};

/// consumer installment loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub customer_id: CustomerId,
    /// principal before interest
    pub loan_amount: Money,
    /// flat rate applied once at origination
    pub interest_rate: Rate,
    pub installment_count: u32,
    pub create_date: DateTime<Utc>,
    pub is_paid: bool,
    /// optimistic-lock sequence, bumped by the store on every save
    pub version: u64,
}

impl Loan {
    pub fn originate(
        customer_id: CustomerId,
        loan_amount: Money,
        interest_rate: Rate,
        installment_count: u32,
        create_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer_id,
            loan_amount,
            interest_rate,
            installment_count,
            create_date,
            is_paid: false,
            version: 0,
        }
    }

    /// principal plus flat interest: the amount amortized across installments
    /// and the amount reserved against the customer's credit limit
    pub fn total_amount(&self) -> Money {
        self.loan_amount.with_flat_rate(self.interest_rate)
    }

    /// one-way transition once every installment is settled
    pub fn mark_settled(&mut self) -> Result<()> {
        if self.is_paid {
            return Err(CreditError::LoanAlreadyPaid { id: self.id });
        }
        self.is_paid = true;
        Ok(())
    }
}

/// one scheduled repayment of a loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    pub id: InstallmentId,
    pub loan_id: LoanId,
    /// scheduled amount, fixed at origination
    pub amount: Money,
    /// adjusted amount actually applied; zero until paid
    pub paid_amount: Money,
    pub due_date: NaiveDate,
    pub payment_date: Option<NaiveDate>,
    pub is_paid: bool,
}

impl Installment {
    pub fn scheduled(loan_id: LoanId, amount: Money, due_date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            loan_id,
            amount,
            paid_amount: Money::ZERO,
            due_date,
            payment_date: None,
            is_paid: false,
        }
    }

    /// one-way transition; records the adjusted amount actually applied
    pub fn settle(&mut self, paid_amount: Money, on: NaiveDate) -> Result<()> {
        if self.is_paid {
            return Err(CreditError::InstallmentAlreadyPaid { id: self.id });
        }
        self.paid_amount = paid_amount;
        self.payment_date = Some(on);
        self.is_paid = true;
        Ok(())
    }
}
