/// serializable views decoupling the transport layer from entities
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::loan::{Installment, Loan};
use crate::types::{CustomerId, InstallmentId, LoanId};

/// read model of a loan with its derived total
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanView {
    pub id: LoanId,
    pub customer_id: CustomerId,
    pub loan_amount: Money,
    pub interest_rate: Rate,
    pub installment_count: u32,
    pub total_amount: Money,
    pub create_date: DateTime<Utc>,
    pub is_paid: bool,
}

impl LoanView {
    pub fn from_loan(loan: &Loan) -> Self {
        Self {
            id: loan.id,
            customer_id: loan.customer_id,
            loan_amount: loan.loan_amount,
            interest_rate: loan.interest_rate,
            installment_count: loan.installment_count,
            total_amount: loan.total_amount(),
            create_date: loan.create_date,
            is_paid: loan.is_paid,
        }
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// read model of one installment row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallmentView {
    pub id: InstallmentId,
    pub loan_id: LoanId,
    pub amount: Money,
    pub paid_amount: Money,
    pub due_date: NaiveDate,
    pub payment_date: Option<NaiveDate>,
    pub is_paid: bool,
}

impl InstallmentView {
    pub fn from_installment(installment: &Installment) -> Self {
        Self {
            id: installment.id,
            loan_id: installment.loan_id,
            amount: installment.amount,
            paid_amount: installment.paid_amount,
            due_date: installment.due_date,
            payment_date: installment.payment_date,
            is_paid: installment.is_paid,
        }
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
