use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{CreditError, Result};
use crate::loan::Installment;
use crate::policy::LendingPolicy;
use crate::types::InstallmentId;

/// date-adjusted price of one installment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjustedAmount {
    pub amount: Money,
    /// days from payment day to due date; positive means paying early
    pub days_offset: i64,
}

/// one installment settled by an allocation pass
#[derive(Debug, Clone, PartialEq)]
pub struct SettledInstallment {
    pub installment_id: InstallmentId,
    pub scheduled: Money,
    pub adjusted: Money,
    pub days_offset: i64,
}

/// outcome of one allocation pass over the eligible installments
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub settled: Vec<SettledInstallment>,
    pub amount_spent: Money,
    pub remaining: Money,
}

/// result of a payment operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentResult {
    pub installments_paid: u32,
    pub amount_spent: Money,
    pub loan_fully_paid: bool,
}

/// allocates a payment across eligible installments, earliest due first
pub struct PaymentAllocator<'a> {
    policy: &'a LendingPolicy,
}

impl<'a> PaymentAllocator<'a> {
    pub fn new(policy: &'a LendingPolicy) -> Self {
        Self { policy }
    }

    /// discount (early) or penalty (late) relative to the due date; the
    /// combined per-day factor is applied in a single rounded multiplication
    pub fn adjusted_amount(
        &self,
        scheduled: Money,
        due_date: NaiveDate,
        today: NaiveDate,
    ) -> AdjustedAmount {
        let days_offset = (due_date - today).num_days();
        let factor = self.policy.daily_adjustment_rate.as_decimal()
            * Decimal::from(days_offset.unsigned_abs());
        let delta = scheduled * factor;

        let amount = if days_offset > 0 {
            scheduled - delta
        } else if days_offset < 0 {
            scheduled + delta
        } else {
            scheduled
        };

        AdjustedAmount { amount, days_offset }
    }

    /// greedily consume the payment in the given order, settling only whole
    /// installments and stopping at the first one the balance cannot cover;
    /// callers pass the eligible selection already ordered by due date
    pub fn allocate(
        &self,
        eligible: &[Installment],
        payment: Money,
        today: NaiveDate,
    ) -> Result<Allocation> {
        let mut remaining = payment;
        let mut amount_spent = Money::ZERO;
        let mut settled = Vec::new();
        let mut first_required = None;

        for installment in eligible {
            let quote = self.adjusted_amount(installment.amount, installment.due_date, today);
            if first_required.is_none() {
                first_required = Some(quote.amount);
            }
            if remaining < quote.amount {
                break;
            }

            remaining -= quote.amount;
            amount_spent += quote.amount;
            settled.push(SettledInstallment {
                installment_id: installment.id,
                scheduled: installment.amount,
                adjusted: quote.amount,
                days_offset: quote.days_offset,
            });
        }

        if settled.is_empty() {
            return Err(CreditError::InsufficientPayment {
                provided: payment,
                required: first_required.unwrap_or(Money::ZERO),
            });
        }

        Ok(Allocation {
            settled,
            amount_spent,
            remaining,
        })
    }
}
