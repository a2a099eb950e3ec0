use thiserror::Error;
use uuid::Uuid;

use crate::decimal::{Money, Rate};

#[derive(Error, Debug)]
pub enum CreditError {
    #[error("customer not found: {id}")]
    CustomerNotFound {
        id: Uuid,
    },

    #[error("loan not found: {id}")]
    LoanNotFound {
        id: Uuid,
    },

    #[error("no loans for customer: {customer_id}")]
    NoLoansForCustomer {
        customer_id: Uuid,
    },

    #[error("no installments for loan: {loan_id}")]
    NoInstallmentsForLoan {
        loan_id: Uuid,
    },

    #[error("invalid loan amount: {amount}")]
    InvalidLoanAmount {
        amount: Money,
    },

    #[error("invalid interest rate: {rate} (allowed range {min} to {max})")]
    InvalidInterestRate {
        rate: Rate,
        min: Rate,
        max: Rate,
    },

    #[error("invalid installment count: {count}")]
    InvalidInstallmentCount {
        count: u32,
    },

    #[error("invalid payment amount: {amount}")]
    InvalidPaymentAmount {
        amount: Money,
    },

    #[error("invalid credit limit: {limit}")]
    InvalidCreditLimit {
        limit: Money,
    },

    #[error("insufficient credit: available {available}, requested {requested}")]
    InsufficientCredit {
        available: Money,
        requested: Money,
    },

    #[error("loan already paid: {id}")]
    LoanAlreadyPaid {
        id: Uuid,
    },

    #[error("installment already paid: {id}")]
    InstallmentAlreadyPaid {
        id: Uuid,
    },

    #[error("no eligible installments for loan: {loan_id}")]
    NoEligibleInstallments {
        loan_id: Uuid,
    },

    #[error("insufficient payment: provided {provided}, earliest installment requires {required}")]
    InsufficientPayment {
        provided: Money,
        required: Money,
    },

    #[error("stale version: {entity} {id} was modified since it was read")]
    StaleVersion {
        entity: &'static str,
        id: Uuid,
    },

    #[error("invalid date: {message}")]
    InvalidDate {
        message: String,
    },

    #[error("calculation error: {message}")]
    CalculationError {
        message: String,
    },

    #[error("storage error: {message}")]
    Storage {
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, CreditError>;
