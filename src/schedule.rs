use chrono::{Datelike, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{CreditError, Result};

/// one row of a repayment schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledInstallment {
    pub sequence: u32,
    pub amount: Money,
    pub due_date: NaiveDate,
}

/// equal-installment schedule for a flat-rate loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallmentSchedule {
    pub principal: Money,
    pub interest_rate: Rate,
    pub installment_count: u32,
    pub total_amount: Money,
    pub installments: Vec<ScheduledInstallment>,
}

impl InstallmentSchedule {
    /// build a schedule of equal installments rounded half-up, due monthly
    /// starting on the first day of the month after `today`; the final
    /// installment absorbs the rounding remainder so the rows sum exactly
    /// to the interest-loaded total
    pub fn build(
        principal: Money,
        interest_rate: Rate,
        installment_count: u32,
        today: NaiveDate,
    ) -> Result<Self> {
        if installment_count == 0 {
            return Err(CreditError::InvalidInstallmentCount {
                count: installment_count,
            });
        }

        let total_amount = principal.with_flat_rate(interest_rate);
        let per_installment = total_amount / Decimal::from(installment_count);
        let final_installment =
            total_amount - per_installment * Decimal::from(installment_count - 1);

        if !per_installment.is_positive() || !final_installment.is_positive() {
            return Err(CreditError::CalculationError {
                message: format!(
                    "total {} cannot be split into {} positive installments",
                    total_amount, installment_count
                ),
            });
        }

        let first_due = first_of_next_month(today)?;
        let mut installments = Vec::with_capacity(installment_count as usize);
        for i in 0..installment_count {
            let due_date = step_months(first_due, i)?;
            let amount = if i + 1 == installment_count {
                final_installment
            } else {
                per_installment
            };
            installments.push(ScheduledInstallment {
                sequence: i + 1,
                amount,
                due_date,
            });
        }

        Ok(Self {
            principal,
            interest_rate,
            installment_count,
            total_amount,
            installments,
        })
    }

    /// sum of scheduled amounts; equals `total_amount` by construction
    pub fn scheduled_total(&self) -> Money {
        self.installments.iter().map(|i| i.amount).sum()
    }
}

/// first day of the month following the given date
fn first_of_next_month(date: NaiveDate) -> Result<NaiveDate> {
    date.with_day(1)
        .and_then(|first| first.checked_add_months(Months::new(1)))
        .ok_or_else(|| CreditError::InvalidDate {
            message: format!("no month after {}", date),
        })
}

/// step a first-of-month date forward by whole months
fn step_months(first_due: NaiveDate, months: u32) -> Result<NaiveDate> {
    first_due
        .checked_add_months(Months::new(months))
        .ok_or_else(|| CreditError::InvalidDate {
            message: format!("due date overflow stepping {} months from {}", months, first_due),
        })
}
