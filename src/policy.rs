use chrono::{Months, NaiveDate};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{CreditError, Result};

/// lending policy: validation bounds and engine constants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LendingPolicy {
    /// accepted installment counts
    pub installment_options: Vec<u32>,
    /// inclusive lower bound on the flat interest rate
    pub min_interest_rate: Rate,
    /// inclusive upper bound on the flat interest rate
    pub max_interest_rate: Rate,
    /// per-day discount (early) or penalty (late) applied at settlement
    pub daily_adjustment_rate: Rate,
    /// how many months ahead of today an unpaid installment may be settled
    pub settlement_window_months: u32,
}

impl LendingPolicy {
    /// standard consumer installment terms
    pub fn standard() -> Self {
        Self {
            installment_options: vec![6, 9, 12, 24],
            min_interest_rate: Rate::from_decimal(dec!(0.1)),
            max_interest_rate: Rate::from_decimal(dec!(0.5)),
            daily_adjustment_rate: Rate::from_decimal(dec!(0.001)),
            settlement_window_months: 3,
        }
    }

    /// principal must be strictly positive
    pub fn validate_principal(&self, amount: Money) -> Result<()> {
        if !amount.is_positive() {
            return Err(CreditError::InvalidLoanAmount { amount });
        }
        Ok(())
    }

    /// rate must lie within the inclusive bounds
    pub fn validate_rate(&self, rate: Rate) -> Result<()> {
        if rate < self.min_interest_rate || rate > self.max_interest_rate {
            return Err(CreditError::InvalidInterestRate {
                rate,
                min: self.min_interest_rate,
                max: self.max_interest_rate,
            });
        }
        Ok(())
    }

    /// installment count must be one of the accepted options
    pub fn validate_installment_count(&self, count: u32) -> Result<()> {
        if !self.installment_options.contains(&count) {
            return Err(CreditError::InvalidInstallmentCount { count });
        }
        Ok(())
    }

    /// payment amount must be strictly positive
    pub fn validate_payment(&self, amount: Money) -> Result<()> {
        if !amount.is_positive() {
            return Err(CreditError::InvalidPaymentAmount { amount });
        }
        Ok(())
    }

    /// latest due date that is settleable as of the given day
    pub fn settlement_horizon(&self, today: NaiveDate) -> Result<NaiveDate> {
        today
            .checked_add_months(Months::new(self.settlement_window_months))
            .ok_or_else(|| CreditError::InvalidDate {
                message: format!("settlement horizon out of range from {}", today),
            })
    }
}

impl Default for LendingPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_rate_bounds_are_inclusive() {
        let policy = LendingPolicy::standard();
        assert!(policy.validate_rate(Rate::from_decimal(dec!(0.1))).is_ok());
        assert!(policy.validate_rate(Rate::from_decimal(dec!(0.5))).is_ok());
        assert!(policy.validate_rate(Rate::from_decimal(dec!(0.3))).is_ok());

        assert!(matches!(
            policy.validate_rate(Rate::from_decimal(dec!(0.09))),
            Err(CreditError::InvalidInterestRate { .. })
        ));
        assert!(matches!(
            policy.validate_rate(Rate::from_decimal(dec!(0.51))),
            Err(CreditError::InvalidInterestRate { .. })
        ));
    }

    #[test]
    fn test_installment_count_options() {
        let policy = LendingPolicy::standard();
        for count in [6, 9, 12, 24] {
            assert!(policy.validate_installment_count(count).is_ok());
        }
        for count in [0, 5, 7, 13, 36] {
            assert!(matches!(
                policy.validate_installment_count(count),
                Err(CreditError::InvalidInstallmentCount { .. })
            ));
        }
    }

    #[test]
    fn test_rejects_non_positive_amounts() {
        let policy = LendingPolicy::standard();
        assert!(policy.validate_principal(Money::from_major(1000)).is_ok());
        assert!(matches!(
            policy.validate_principal(Money::ZERO),
            Err(CreditError::InvalidLoanAmount { .. })
        ));
        assert!(matches!(
            policy.validate_payment(Money::from_major(-10)),
            Err(CreditError::InvalidPaymentAmount { .. })
        ));
    }

    #[test]
    fn test_settlement_horizon_steps_calendar_months() {
        let policy = LendingPolicy::standard();
        assert_eq!(
            policy.settlement_horizon(date(2024, 1, 15)).unwrap(),
            date(2024, 4, 15)
        );
        // month-end clamping follows the calendar
        assert_eq!(
            policy.settlement_horizon(date(2024, 11, 30)).unwrap(),
            date(2025, 2, 28)
        );
    }
}
